//! One reconcile pass over a managed resource.
//!
//! ```text
//!            connect
//!               │
//!     deletion requested? ──yes──► delete ──► Deleted
//!               │ no
//!            observe ──► write back at_provider
//!         /     |      \
//!    absent   stale   current
//!       │       │        │
//!    create   update   (no-op)
//! ```

use std::fmt;
use std::sync::Arc;
use team_provider::resource::{Condition, ManagedResource};
use tracing::{debug, info, warn};

use crate::connector::ExternalConnector;
use crate::context::Context;
use crate::error::{display_chain, ReconcileError};

/// What a successful pass did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Created,
    Updated,
    UpToDate,
    Deleted,
}

impl fmt::Display for ReconcileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReconcileOutcome::Created => "created",
            ReconcileOutcome::Updated => "updated",
            ReconcileOutcome::UpToDate => "up-to-date",
            ReconcileOutcome::Deleted => "deleted",
        })
    }
}

/// Drives one resource through connect → observe → create/update/delete.
///
/// Holds no state between passes besides the connector; the external client
/// is built fresh each pass and dropped at the end of it.
#[derive(Clone)]
pub struct ManagedReconciler {
    connector: Arc<dyn ExternalConnector>,
}

impl ManagedReconciler {
    pub fn new(connector: Arc<dyn ExternalConnector>) -> Self {
        Self { connector }
    }

    /// Runs one pass, recording the `Synced` condition on the resource.
    ///
    /// # Errors
    /// Whatever the connector or external client returned. No retries happen here.
    pub async fn reconcile(
        &self,
        ctx: &Context,
        resource: &mut ManagedResource,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match self.reconcile_once(ctx, resource).await {
            Ok(outcome) => {
                resource.set_condition(Condition::reconcile_success());
                Ok(outcome)
            }
            Err(e) => {
                let message = display_chain(&e);
                warn!(resource = %resource.key(), error = %message, "Reconcile failed");
                resource.set_condition(Condition::reconcile_error(message));
                Err(e)
            }
        }
    }

    async fn reconcile_once(
        &self,
        ctx: &Context,
        resource: &mut ManagedResource,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = resource.key();

        if resource.meta_mut().initialize_external_name() {
            debug!(resource = %key, "Defaulted external name to resource name");
        }

        let external = self.connector.connect(ctx, resource).await?;

        if resource.meta().deletion_requested {
            resource.set_condition(Condition::deleting());
            external.delete(ctx, resource).await?;
            info!(resource = %key, "External resource deleted");
            return Ok(ReconcileOutcome::Deleted);
        }

        let observation = external.observe(ctx, resource).await?;
        observation.apply_to(resource);

        if !observation.resource_exists {
            resource.set_condition(Condition::creating());
            let creation = external.create(ctx, resource).await?;
            info!(resource = %key, remote_id = ?creation.remote_id, "External resource created");
            return Ok(ReconcileOutcome::Created);
        }

        resource.set_condition(Condition::available());

        if !observation.resource_up_to_date {
            let update = external.update(ctx, resource).await?;
            info!(resource = %key, remote_id = ?update.remote_id, "External resource updated");
            return Ok(ReconcileOutcome::Updated);
        }

        debug!(resource = %key, "External resource is up to date");
        Ok(ReconcileOutcome::UpToDate)
    }
}
