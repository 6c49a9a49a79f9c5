//! In-memory result store for tests and single-process experiments.

use crate::error::{NovoxError, Result};
use crate::pipeline::types::SeparatedResult;
use crate::store::ResultStore;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// Result store backed by a `BTreeMap`, so listings are ascending for free.
///
/// Not durable: a process crash loses everything. Use `DirStore` for the
/// two-process setup.
#[derive(Debug, Default)]
pub struct MemStore {
    inner: Mutex<BTreeMap<u64, SeparatedResult>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ResultStore for MemStore {
    fn put(&self, result: &SeparatedResult) -> Result<()> {
        let mut inner = self.inner.lock().map_err(|e| NovoxError::Relay {
            message: format!("Store lock poisoned: {}", e),
        })?;
        if inner.contains_key(&result.index) {
            return Err(NovoxError::Relay {
                message: format!("Result for chunk {} already stored", result.index),
            });
        }
        inner.insert(result.index, result.clone());
        Ok(())
    }

    fn list(&self) -> Result<Vec<u64>> {
        let inner = self.inner.lock().map_err(|e| NovoxError::Relay {
            message: format!("Store lock poisoned: {}", e),
        })?;
        Ok(inner.keys().copied().collect())
    }

    fn take(&self, index: u64) -> Result<SeparatedResult> {
        let mut inner = self.inner.lock().map_err(|e| NovoxError::Relay {
            message: format!("Store lock poisoned: {}", e),
        })?;
        inner
            .remove(&index)
            .ok_or(NovoxError::ResultNotFound { index })
    }
}
