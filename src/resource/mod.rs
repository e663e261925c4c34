//! Managed resource model.
//!
//! A managed resource is the declarative record that a controller reconciles
//! against an external API. Resources are a closed set of kinds; each
//! external-client implementation recognizes exactly one of them and rejects
//! the rest.
//!
//! ```text
//! ManagedResource
//!   ├── Team        (reconciled against GitHub organization teams)
//!   └── Membership  (declared, no adapter registered)
//! ```

mod condition;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use condition::{set_condition, Condition, ConditionType};

/// Provider config used when a resource does not name one.
pub const DEFAULT_PROVIDER_CONFIG: &str = "default";

/// Kinds of managed resources known to this provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Team,
    Membership,
}

impl ResourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Team => "Team",
            ResourceKind::Membership => "Membership",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata shared by every managed resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectMeta {
    /// Name of the managed resource itself (unique per kind).
    pub name: String,

    /// Identifier of the external object. Once set it is never changed.
    #[serde(default)]
    pub external_name: Option<String>,

    /// Name of the provider config supplying credentials.
    #[serde(default = "default_provider_config_ref")]
    pub provider_config_ref: String,

    /// Set when the record is being removed and the external object must go too.
    #[serde(default)]
    pub deletion_requested: bool,
}

fn default_provider_config_ref() -> String {
    DEFAULT_PROVIDER_CONFIG.to_string()
}

impl ObjectMeta {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            external_name: None,
            provider_config_ref: default_provider_config_ref(),
            deletion_requested: false,
        }
    }

    /// Returns the external name, if one has been assigned.
    pub fn external_name(&self) -> Option<&str> {
        self.external_name.as_deref().filter(|n| !n.is_empty())
    }

    /// Defaults the external name to the resource name when unset.
    ///
    /// Returns true if the external name was assigned by this call.
    pub fn initialize_external_name(&mut self) -> bool {
        if self.external_name().is_some() {
            return false;
        }
        self.external_name = Some(self.name.clone());
        true
    }
}

/// Desired state of a GitHub organization team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamParameters {
    /// Organization owning the team.
    pub org: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Team visibility: `secret` or `closed`.
    #[serde(default)]
    pub privacy: Option<String>,
}

/// Fields observed on the external team.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamObservation {
    /// GraphQL node ID of the remote team.
    #[serde(default)]
    pub node_id: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStatus {
    #[serde(default)]
    pub at_provider: TeamObservation,
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// A GitHub team managed resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub metadata: ObjectMeta,
    pub spec: TeamParameters,
    #[serde(default)]
    pub status: TeamStatus,
}

impl Team {
    pub fn new(name: impl Into<String>, spec: TeamParameters) -> Self {
        Self {
            metadata: ObjectMeta::new(name),
            spec,
            status: TeamStatus::default(),
        }
    }

    /// Sets the external name explicitly.
    pub fn with_external_name(mut self, external_name: impl Into<String>) -> Self {
        self.metadata.external_name = Some(external_name.into());
        self
    }
}

/// Desired state of an organization membership.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipParameters {
    pub org: String,
    pub user: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MembershipStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

/// An organization membership managed resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    pub metadata: ObjectMeta,
    pub spec: MembershipParameters,
    #[serde(default)]
    pub status: MembershipStatus,
}

/// Any managed resource, tagged by kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ManagedResource {
    Team(Team),
    Membership(Membership),
}

impl ManagedResource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ManagedResource::Team(_) => ResourceKind::Team,
            ManagedResource::Membership(_) => ResourceKind::Membership,
        }
    }

    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ManagedResource::Team(t) => &t.metadata,
            ManagedResource::Membership(m) => &m.metadata,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ManagedResource::Team(t) => &mut t.metadata,
            ManagedResource::Membership(m) => &mut m.metadata,
        }
    }

    pub fn conditions(&self) -> &[Condition] {
        match self {
            ManagedResource::Team(t) => &t.status.conditions,
            ManagedResource::Membership(m) => &m.status.conditions,
        }
    }

    /// Sets (or replaces) the condition of the same type.
    pub fn set_condition(&mut self, condition: Condition) {
        let conditions = match self {
            ManagedResource::Team(t) => &mut t.status.conditions,
            ManagedResource::Membership(m) => &mut m.status.conditions,
        };
        set_condition(conditions, condition);
    }

    /// Returns the condition of the given type, if set.
    pub fn condition(&self, kind: ConditionType) -> Option<&Condition> {
        self.conditions().iter().find(|c| c.kind == kind)
    }

    pub fn as_team(&self) -> Option<&Team> {
        match self {
            ManagedResource::Team(t) => Some(t),
            _ => None,
        }
    }

    /// Stable identity used for logging and status keys: `Kind/name`.
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind(), self.meta().name)
    }
}

impl From<Team> for ManagedResource {
    fn from(team: Team) -> Self {
        ManagedResource::Team(team)
    }
}

impl From<Membership> for ManagedResource {
    fn from(membership: Membership) -> Self {
        ManagedResource::Membership(membership)
    }
}
