use std::sync::Arc;

use thiserror::Error;

use crate::sku::{self, CodeError, Sku};
use crate::store::{CounterStore, StoreError};

#[derive(Debug, Error)]
pub enum IssueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Code(#[from] CodeError),

    #[error("issuance task failed: {0}")]
    Task(String),
}

/// A value taken from the counter and the code it encodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Issued {
    pub value: i64,
    pub sku: Sku,
}

/// Takes values from a [`CounterStore`] and renders them as codes.
#[derive(Clone)]
pub struct Issuer {
    store: Arc<dyn CounterStore>,
}

impl Issuer {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self { store }
    }

    /// Best-effort schema setup for process start.
    ///
    /// A failure is logged and otherwise ignored; the store retries on the
    /// first issue and reports the real error there.
    pub fn prepare(&self) -> bool {
        match self.store.ensure_schema() {
            Ok(()) => true,
            Err(err) if err.is_transient() => {
                tracing::warn!(error = %err, "counter store not ready at startup; will retry on first issue");
                false
            }
            Err(err) => {
                tracing::error!(error = %err, "counter store misconfigured");
                false
            }
        }
    }

    pub fn issue(&self) -> Result<Issued, IssueError> {
        let value = self.store.next()?;
        let sku = sku::encode(value)?;
        Ok(Issued { value, sku })
    }

    /// [`issue`](Self::issue) on the blocking pool; store calls may wait on a lock.
    pub async fn issue_async(&self) -> Result<Issued, IssueError> {
        let issuer = self.clone();
        tokio::task::spawn_blocking(move || issuer.issue())
            .await
            .map_err(|err| IssueError::Task(err.to_string()))?
    }
}
