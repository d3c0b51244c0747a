//! Durable counter backing code issuance.
//!
//! The cursor holds the next value to hand out. It is only ever written
//! through [`CounterStore::next`], which returns the current value and
//! advances the cursor by one as a single atomic step. A value whose advance
//! has been committed is spent for good: callers that fail afterwards leave a
//! gap, never a duplicate.

mod memory;
mod sqlite;

pub use memory::MemoryCounterStore;
pub use sqlite::SqliteCounterStore;

use rusqlite::ffi::ErrorCode;
use std::time::Duration;
use thiserror::Error;

use crate::sku::{INITIAL_CURSOR, MAX_COUNT};

#[derive(Debug, Error)]
pub enum StoreError {
    /// Every code in the space has been issued. Permanent.
    #[error("no more codes: all {} codes have been issued", MAX_COUNT)]
    SpaceExhausted { cursor: i64 },

    /// The write lock was not acquired within the busy timeout.
    #[error("counter store busy: {0}")]
    Busy(String),

    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("initial cursor {0} is outside the code space")]
    InvalidInitialValue(i64),
}

impl StoreError {
    /// Whether a later attempt may succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Busy(_) | StoreError::Unavailable(_))
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if matches!(
            err.sqlite_error_code(),
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
        ) {
            StoreError::Busy(err.to_string())
        } else {
            StoreError::Unavailable(err.to_string())
        }
    }
}

/// Atomic read-and-advance over a single durable cursor.
///
/// Implementations must be safe to call from any number of threads, and for
/// durable stores from any number of processes sharing the same backing
/// store.
pub trait CounterStore: Send + Sync + 'static {
    /// Create the cursor and the audit structure if they do not exist yet.
    ///
    /// Idempotent: never resets a cursor that has already advanced.
    fn ensure_schema(&self) -> Result<(), StoreError>;

    /// Return the cursor and advance it by one.
    ///
    /// Fails with [`StoreError::SpaceExhausted`] without advancing once the
    /// cursor has reached [`MAX_COUNT`].
    fn next(&self) -> Result<i64, StoreError>;

    /// Next value [`next`](CounterStore::next) would hand out. Read-only.
    fn cursor(&self) -> Result<i64, StoreError>;
}

/// Configuration shared by the store adapters.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cursor value written when the cursor is first created (default: 304426,
    /// which encodes to `"999A"`)
    pub initial_value: i64,
    /// Maximum wait for the write lock before failing with `Busy` (default: 5 seconds)
    pub busy_timeout: Duration,
    /// Record each issued value in the audit table (default: true)
    pub audit: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_value: INITIAL_CURSOR,
            busy_timeout: Duration::from_secs(5),
            audit: true,
        }
    }
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cursor seed
    pub fn initial_value(mut self, value: i64) -> Self {
        self.initial_value = value;
        self
    }

    /// Set the write-lock wait bound
    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Enable or disable the audit table
    pub fn audit(mut self, enabled: bool) -> Self {
        self.audit = enabled;
        self
    }

    /// A seed of exactly `MAX_COUNT` is accepted: it describes a store whose
    /// space is already used up.
    pub(crate) fn validate(&self) -> Result<(), StoreError> {
        if (0..=MAX_COUNT).contains(&self.initial_value) {
            Ok(())
        } else {
            Err(StoreError::InvalidInitialValue(self.initial_value))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_builder_overrides_defaults() {
        let config = StoreConfig::new()
            .initial_value(7)
            .busy_timeout(Duration::from_millis(250))
            .audit(false);
        assert_eq!(config.initial_value, 7);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert!(!config.audit);

        let defaults = StoreConfig::default();
        assert_eq!(defaults.initial_value, INITIAL_CURSOR);
        assert!(defaults.audit);
    }

    #[test]
    fn seed_must_lie_in_code_space() {
        assert!(StoreConfig::new().initial_value(0).validate().is_ok());
        assert!(StoreConfig::new().initial_value(MAX_COUNT).validate().is_ok());
        assert!(matches!(
            StoreConfig::new().initial_value(-1).validate(),
            Err(StoreError::InvalidInitialValue(-1))
        ));
        assert!(
            StoreConfig::new()
                .initial_value(MAX_COUNT + 1)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn busy_sqlite_errors_are_transient() {
        let busy = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = StoreError::from(busy);
        assert!(matches!(err, StoreError::Busy(_)));
        assert!(err.is_transient());

        let other = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(other, StoreError::Unavailable(_)));
        assert!(!StoreError::SpaceExhausted { cursor: MAX_COUNT }.is_transient());
    }
}
