//! Team Controller - reconciles GitHub organization teams against declared state.
//!
//! Each managed `Team` resource names an organization, a slug (its external
//! name) and optional description and privacy. The controller keeps the
//! remote team matching those fields, creating it when absent and deleting it
//! once deletion is requested.
//!
//! # Architecture
//!
//! ```text
//!     ControllerManager
//!          ↓  one per resource
//!     ResourceScheduler (poll interval, backoff)
//!          ↓  one per pass
//!     ManagedReconciler
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │   ExternalConnector::connect            │
//! │   (resolve credentials, track usage)    │
//! └─────────────────────────────────────────┘
//!          ↓
//! ┌─────────────────────────────────────────┐
//! │   ExternalClient                        │
//! │   observe / create / update / delete    │
//! └─────────────────────────────────────────┘
//!          ↓
//!      GitHub REST API
//! ```
//!
//! # Core Types
//!
//! - [`ExternalConnector`] - builds a client for one resource
//! - [`ExternalClient`] - the four lifecycle operations
//! - [`Context`] - cancellation and deadlines for every remote call
//! - [`ReconcileError`] - what any of the above can fail with

pub mod admin;
pub mod connector;
pub mod connectors;
pub mod context;
pub mod error;
pub mod manager;
pub mod registry;
pub mod runners;

#[cfg(test)]
mod testing;

pub use connector::{
    AtProvider, ExternalClient, ExternalConnector, ExternalCreation, ExternalObservation,
    ExternalUpdate,
};
pub use context::{CancelHandle, Context};
pub use error::{CancelReason, Operation, ReconcileError};
