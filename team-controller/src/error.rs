//! Error taxonomy returned by connectors and external clients.

use std::fmt;
use team_provider::ResourceKind;
use thiserror::Error;

use crate::connectors::github::api::ApiError;

/// Remote mutation that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// Why an operation was abandoned before the remote call completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller's cancel signal fired.
    Cancelled,
    /// The caller's deadline passed.
    DeadlineExceeded,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CancelReason::Cancelled => "cancelled",
            CancelReason::DeadlineExceeded => "deadline exceeded",
        })
    }
}

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The record is not the kind this client manages. Retrying cannot fix it.
    #[error("managed resource is not a {expected} custom resource (got {actual})")]
    WrongResourceKind {
        expected: ResourceKind,
        actual: ResourceKind,
    },

    /// A required identifying field is empty: a caller contract violation.
    #[error("invalid managed resource: {0}")]
    InvalidResource(String),

    #[error("failed to create client service")]
    CredentialResolution(#[source] anyhow::Error),

    /// Observe lookup failed for a reason other than "not found".
    #[error("failed to observe external resource")]
    RemoteLookup(#[source] ApiError),

    #[error("failed to {op} external resource")]
    RemoteCall {
        op: Operation,
        #[source]
        source: ApiError,
    },

    #[error("operation {0}")]
    Cancelled(CancelReason),
}

impl ReconcileError {
    pub fn wrong_kind(expected: ResourceKind, actual: ResourceKind) -> Self {
        ReconcileError::WrongResourceKind { expected, actual }
    }

    /// Whether a later attempt could succeed without the record changing.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            ReconcileError::WrongResourceKind { .. } | ReconcileError::InvalidResource(_)
        )
    }
}

/// Renders an error and all of its sources as `outer: inner: root`.
pub fn display_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
