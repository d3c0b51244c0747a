use std::sync::Mutex;

use super::{CounterStore, StoreConfig, StoreError};
use crate::sku::MAX_COUNT;

/// Process-local cursor. Unique within one process, forgotten on exit.
#[derive(Debug)]
pub struct MemoryCounterStore {
    cursor: Mutex<i64>,
}

impl MemoryCounterStore {
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        Ok(Self {
            cursor: Mutex::new(config.initial_value),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, i64>, StoreError> {
        self.cursor
            .lock()
            .map_err(|_| StoreError::Unavailable("memory cursor poisoned".to_string()))
    }
}

impl CounterStore for MemoryCounterStore {
    fn ensure_schema(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn next(&self) -> Result<i64, StoreError> {
        let mut cursor = self.lock()?;
        let current = *cursor;
        if current >= MAX_COUNT {
            return Err(StoreError::SpaceExhausted { cursor: current });
        }
        *cursor = current + 1;
        Ok(current)
    }

    fn cursor(&self) -> Result<i64, StoreError> {
        Ok(*self.lock()?)
    }
}
