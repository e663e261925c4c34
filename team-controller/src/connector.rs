use async_trait::async_trait;
use team_provider::resource::{ManagedResource, ResourceKind, TeamObservation};

use crate::context::Context;
use crate::error::ReconcileError;

/// Produces an [`ExternalClient`] for one managed resource.
///
/// Connectors are stateless factories: they resolve credentials, record that
/// the resource uses its provider config, and build an authenticated client.
/// They make no calls against the external API.
///
/// # Lifecycle
/// 1. Reconciler calls `connect(resource)` at the start of every pass
/// 2. Reconciler calls `observe` on the returned client
/// 3. Depending on the observation: `create`, `update`, or nothing
/// 4. `delete` runs instead of 2-3 once deletion is requested
/// 5. The client is dropped at the end of the pass
#[async_trait]
pub trait ExternalConnector: Send + Sync {
    /// The only resource kind this connector accepts.
    fn kind(&self) -> ResourceKind;

    /// Builds a client bound to the resource's provider config.
    ///
    /// # Errors
    /// * `WrongResourceKind` - `resource` is not of [`Self::kind`]
    /// * `CredentialResolution` - provider config or credentials unavailable
    async fn connect(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<Box<dyn ExternalClient>, ReconcileError>;
}

/// Observes, then creates, updates, or deletes one external object so it
/// reflects the managed resource's desired state.
///
/// Every operation makes exactly one remote call, never retries, and
/// rejects records of the wrong kind with `WrongResourceKind`.
#[async_trait]
pub trait ExternalClient: Send + Sync {
    async fn observe(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalObservation, ReconcileError>;

    async fn create(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalCreation, ReconcileError>;

    async fn update(
        &self,
        ctx: &Context,
        resource: &ManagedResource,
    ) -> Result<ExternalUpdate, ReconcileError>;

    async fn delete(&self, ctx: &Context, resource: &ManagedResource) -> Result<(), ReconcileError>;
}

/// Fields observed on the external object, by resource kind.
#[derive(Clone, Debug, PartialEq)]
pub enum AtProvider {
    Team(TeamObservation),
}

/// Result of an observe call.
#[derive(Clone, Debug, PartialEq)]
pub struct ExternalObservation {
    /// False when the external object does not exist: the reconciler must create it.
    pub resource_exists: bool,

    /// False when the object exists but has drifted. Meaningless when absent.
    pub resource_up_to_date: bool,

    /// Observed fields to write back onto the resource status.
    pub at_provider: Option<AtProvider>,
}

impl ExternalObservation {
    pub fn absent() -> Self {
        Self {
            resource_exists: false,
            resource_up_to_date: false,
            at_provider: None,
        }
    }

    /// Writes observed fields onto `resource`. Returns true if anything changed.
    ///
    /// Fields the observation leaves empty keep their previous value.
    pub fn apply_to(&self, resource: &mut ManagedResource) -> bool {
        match (&self.at_provider, resource) {
            (Some(AtProvider::Team(observed)), ManagedResource::Team(team)) => {
                let at_provider = &mut team.status.at_provider;
                match &observed.node_id {
                    Some(node_id) if at_provider.node_id.as_ref() != Some(node_id) => {
                        at_provider.node_id = Some(node_id.clone());
                        true
                    }
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

/// Result of a create call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalCreation {
    /// Remote identifier reported by the API, for logging only.
    pub remote_id: Option<u64>,
}

/// Result of an update call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ExternalUpdate {
    pub remote_id: Option<u64>,
}
