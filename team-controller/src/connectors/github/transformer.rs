use team_provider::resource::{TeamObservation, TeamParameters};

use super::api::{NewTeam, RemoteTeam};

/// Build the create/edit request body for a team.
///
/// `name` is the external name. Optional fields pass through as-is: an absent
/// field is omitted from the request rather than defaulted or cleared.
pub fn team_to_request(name: &str, spec: &TeamParameters) -> NewTeam {
    NewTeam {
        name: name.to_string(),
        description: spec.description.clone(),
        privacy: spec.privacy.clone(),
    }
}

/// Extract the fields recorded on the managed resource's status.
pub fn remote_to_observation(remote: &RemoteTeam) -> TeamObservation {
    TeamObservation {
        node_id: remote.node_id.clone(),
    }
}

/// Whether the remote team satisfies every field the desired state sets.
///
/// Unset desired fields are "don't care": they never cause drift whatever the
/// remote value. A set desired field against a null remote field is drift.
pub fn is_up_to_date(spec: &TeamParameters, remote: &RemoteTeam) -> bool {
    field_matches(spec.description.as_deref(), remote.description.as_deref())
        && field_matches(spec.privacy.as_deref(), remote.privacy.as_deref())
}

fn field_matches(desired: Option<&str>, observed: Option<&str>) -> bool {
    match desired {
        None => true,
        Some(want) => observed == Some(want),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(description: Option<&str>, privacy: Option<&str>) -> RemoteTeam {
        RemoteTeam {
            id: 1,
            node_id: Some("T_1".to_string()),
            name: "platform".to_string(),
            slug: "platform".to_string(),
            description: description.map(str::to_string),
            privacy: privacy.map(str::to_string),
        }
    }

    fn spec(description: Option<&str>, privacy: Option<&str>) -> TeamParameters {
        TeamParameters {
            org: "acme".to_string(),
            description: description.map(str::to_string),
            privacy: privacy.map(str::to_string),
        }
    }

    #[test]
    fn test_all_set_fields_match() {
        assert!(is_up_to_date(
            &spec(Some("Platform team"), Some("secret")),
            &remote(Some("Platform team"), Some("secret"))
        ));
    }

    #[test]
    fn test_any_single_field_flips_drift() {
        let desired = spec(Some("Platform team"), Some("secret"));
        assert!(!is_up_to_date(&desired, &remote(Some("Old desc"), Some("secret"))));
        assert!(!is_up_to_date(&desired, &remote(Some("Platform team"), Some("closed"))));

        let remote_team = remote(Some("Platform team"), Some("secret"));
        assert!(!is_up_to_date(&spec(Some("Other"), Some("secret")), &remote_team));
        assert!(!is_up_to_date(&spec(Some("Platform team"), Some("closed")), &remote_team));
    }

    #[test]
    fn test_unset_fields_are_dont_care() {
        let desired = spec(None, None);
        for r in [
            remote(None, None),
            remote(Some("anything"), None),
            remote(None, Some("closed")),
            remote(Some("x"), Some("secret")),
        ] {
            assert!(is_up_to_date(&desired, &r));
        }

        // Only privacy set: the remote description is ignored
        assert!(is_up_to_date(
            &spec(None, Some("closed")),
            &remote(Some("A"), Some("closed"))
        ));
    }

    #[test]
    fn test_set_field_against_null_remote_is_drift() {
        assert!(!is_up_to_date(&spec(Some("desc"), None), &remote(None, None)));
        assert!(!is_up_to_date(&spec(None, Some("secret")), &remote(None, None)));
    }

    #[test]
    fn test_empty_string_is_a_value() {
        assert!(is_up_to_date(&spec(Some(""), None), &remote(Some(""), None)));
        assert!(!is_up_to_date(&spec(Some(""), None), &remote(None, None)));
    }

    #[test]
    fn test_team_to_request_passes_fields_verbatim() {
        let request = team_to_request("platform", &spec(None, Some("secret")));
        assert_eq!(
            request,
            NewTeam {
                name: "platform".to_string(),
                description: None,
                privacy: Some("secret".to_string()),
            }
        );
    }

    #[test]
    fn test_remote_to_observation() {
        let observation = remote_to_observation(&remote(None, None));
        assert_eq!(observation.node_id.as_deref(), Some("T_1"));
    }
}
