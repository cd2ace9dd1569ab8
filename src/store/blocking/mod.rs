
use std::future::Future;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::runtime::Runtime;
use tracing::{error, warn};

/// Bound on how long a bridged store call may take before the caller gives
/// up and treats the operation as having made no observable progress.
pub const STORE_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Bridges non-blocking store clients into bounded synchronous calls.
///
/// Operations run on the bridge's own runtime while the caller waits on a
/// one-shot channel, so the wait never lands on a thread the store client
/// schedules work onto. Store errors are logged here and surface to callers
/// only as an absent result; a timeout does not cancel the underlying call.
#[derive(Debug)]
pub struct BlockingBridge {
    runtime: Runtime,
    wait_timeout: Duration,
}

impl BlockingBridge {
    #[inline]
    pub fn new() -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("Failed to start store runtime")?;

        Ok(Self {
            runtime,
            wait_timeout: STORE_WAIT_TIMEOUT,
        })
    }

    #[inline]
    pub fn with_wait_timeout(mut self, timeout: Duration) -> Self {
        self.wait_timeout = timeout;
        self
    }

    /// Run one store operation to completion and return its result, or
    /// `None` when the operation fails or the wait times out.
    #[inline]
    pub fn call<T, F>(&self, label: &str, operation: F) -> Option<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        self.runtime.spawn(async move {
            let _ = tx.send(operation.await);
        });

        match rx.recv_timeout(self.wait_timeout) {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                error!("Store operation [{}] failed: {:#}", label, e);
                None
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    "Store operation [{}] produced no result within {:?}",
                    label, self.wait_timeout
                );
                None
            }
            Err(RecvTimeoutError::Disconnected) => {
                error!("Store operation [{}] was dropped before completing", label);
                None
            }
        }
    }
}
