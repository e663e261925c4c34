use super::*;

fn platform_team() -> Team {
    Team::new(
        "platform",
        TeamParameters {
            org: "acme".to_string(),
            description: Some("Platform team".to_string()),
            privacy: Some("secret".to_string()),
        },
    )
}

#[test]
fn test_kind_and_key() {
    let resource = ManagedResource::from(platform_team());
    assert_eq!(resource.kind(), ResourceKind::Team);
    assert_eq!(resource.key(), "Team/platform");
    assert!(resource.as_team().is_some());

    let membership = ManagedResource::from(Membership {
        metadata: ObjectMeta::new("alice"),
        spec: MembershipParameters {
            org: "acme".to_string(),
            user: "alice".to_string(),
            role: None,
        },
        status: MembershipStatus::default(),
    });
    assert_eq!(membership.kind(), ResourceKind::Membership);
    assert!(membership.as_team().is_none());
}

#[test]
fn test_initialize_external_name() {
    let mut meta = ObjectMeta::new("platform");
    assert_eq!(meta.external_name(), None);

    assert!(meta.initialize_external_name());
    assert_eq!(meta.external_name(), Some("platform"));

    // Never overwritten once set
    meta.name = "renamed".to_string();
    assert!(!meta.initialize_external_name());
    assert_eq!(meta.external_name(), Some("platform"));
}

#[test]
fn test_empty_external_name_counts_as_unset() {
    let mut meta = ObjectMeta::new("platform");
    meta.external_name = Some(String::new());
    assert_eq!(meta.external_name(), None);
    assert!(meta.initialize_external_name());
    assert_eq!(meta.external_name(), Some("platform"));
}

#[test]
fn test_set_condition_replaces_same_type() {
    let mut resource = ManagedResource::from(platform_team());
    resource.set_condition(Condition::creating());
    resource.set_condition(Condition::reconcile_success());
    assert_eq!(resource.conditions().len(), 2);

    resource.set_condition(Condition::available());
    assert_eq!(resource.conditions().len(), 2);

    let ready = resource.condition(ConditionType::Ready).unwrap();
    assert!(ready.status);
    assert_eq!(ready.reason, "Available");
}

#[test]
fn test_set_condition_keeps_transition_time_when_unchanged() {
    let mut conditions = Vec::new();
    let first = Condition::available();
    let first_time = first.last_transition_time;
    set_condition(&mut conditions, first);

    let mut later = Condition::available();
    later.last_transition_time = first_time + chrono::Duration::seconds(30);
    set_condition(&mut conditions, later);

    assert_eq!(conditions.len(), 1);
    assert_eq!(conditions[0].last_transition_time, first_time);
}

#[test]
fn test_reconcile_error_condition_has_message() {
    let condition = Condition::reconcile_error("boom");
    assert_eq!(condition.kind, ConditionType::Synced);
    assert!(!condition.status);
    assert_eq!(condition.message.as_deref(), Some("boom"));
}

#[test]
fn test_deserialize_tagged_resource() {
    let toml = r#"
        kind = "Team"

        [metadata]
        name = "platform"
        external_name = "platform-team"

        [spec]
        org = "acme"
        privacy = "closed"
    "#;

    let resource: ManagedResource = toml::from_str(toml).unwrap();
    let team = resource.as_team().unwrap();
    assert_eq!(team.metadata.external_name(), Some("platform-team"));
    assert_eq!(team.metadata.provider_config_ref, DEFAULT_PROVIDER_CONFIG);
    assert!(!team.metadata.deletion_requested);
    assert_eq!(team.spec.org, "acme");
    assert_eq!(team.spec.description, None);
    assert_eq!(team.spec.privacy.as_deref(), Some("closed"));
    assert!(team.status.conditions.is_empty());
}
