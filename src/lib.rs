// Managed resource model (Team, Membership) and status conditions
pub mod resource;

// Provider credentials and provider-config usage tracking
pub mod credentials;

// Controller configuration
pub mod config;

pub use resource::{ManagedResource, ResourceKind, Team, TeamParameters};
