pub mod reconciler;
pub mod scheduler;

pub use reconciler::{ManagedReconciler, ReconcileOutcome};
pub use scheduler::{backoff_delay, ReconcileStatus, ResourceScheduler};
