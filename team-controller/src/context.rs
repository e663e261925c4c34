//! Cancellation and deadlines for external-client calls.
//!
//! A [`Context`] is handed to every connector and external-client operation.
//! Remote calls run through [`Context::run`], which abandons the in-flight
//! future as soon as the cancel signal fires or the deadline passes.

use std::future::Future;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::error::{CancelReason, ReconcileError};

/// Cancel signal plus optional deadline. Cheap to clone.
#[derive(Clone, Debug, Default)]
pub struct Context {
    cancel: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

/// Owner side of a cancel signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// A context that observes this handle.
    pub fn context(&self) -> Context {
        Context {
            cancel: Some(self.tx.subscribe()),
            deadline: None,
        }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl Context {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derives a context whose deadline is at most `timeout` from now.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a context with `deadline`, keeping an earlier existing one.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        };
        Self {
            cancel: self.cancel.clone(),
            deadline: Some(deadline),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the reason this context is done, if it is.
    pub fn done_reason(&self) -> Option<CancelReason> {
        if self.cancel.as_ref().is_some_and(|rx| *rx.borrow()) {
            return Some(CancelReason::Cancelled);
        }
        if self.deadline.is_some_and(|d| d <= Instant::now()) {
            return Some(CancelReason::DeadlineExceeded);
        }
        None
    }

    pub fn is_done(&self) -> bool {
        self.done_reason().is_some()
    }

    /// Fails with `Cancelled` if the context is already done.
    pub fn check(&self) -> Result<(), ReconcileError> {
        match self.done_reason() {
            Some(reason) => Err(ReconcileError::Cancelled(reason)),
            None => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> CancelReason {
        let cancelled = async {
            match &self.cancel {
                Some(rx) => {
                    let mut rx = rx.clone();
                    loop {
                        if *rx.borrow_and_update() {
                            break;
                        }
                        if rx.changed().await.is_err() {
                            // Handle dropped without cancelling: never fires.
                            std::future::pending::<()>().await;
                        }
                    }
                }
                None => std::future::pending::<()>().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancelled => CancelReason::Cancelled,
            _ = expired => CancelReason::DeadlineExceeded,
        }
    }

    /// Drives `fut` to completion unless the context finishes first, in which
    /// case `fut` is dropped and `Cancelled` is returned.
    pub async fn run<F>(&self, fut: F) -> Result<F::Output, ReconcileError>
    where
        F: Future,
    {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(ReconcileError::Cancelled(reason)),
            output = fut => Ok(output),
        }
    }

    /// Sleeps for `duration`, returning early with `Cancelled` if the context finishes.
    pub async fn sleep(&self, duration: Duration) -> Result<(), ReconcileError> {
        self.run(tokio::time::sleep(duration)).await
    }
}
