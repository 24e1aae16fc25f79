//! # Outbound Ports (Driven Ports / SPI)
//!
//! Byte-level key-value storage under the queue.

use crate::domain::errors::StoreError;

/// Result of a prefix scan.
pub type ScanResult = Vec<(Vec<u8>, Vec<u8>)>;

/// Abstract key-value store.
///
/// Production: `FileBackedKVStore`
/// Testing: `InMemoryKVStore`
pub trait KeyValueStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Put a single key-value pair.
    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError>;

    /// Delete a key.
    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError>;

    /// Execute an atomic batch write.
    ///
    /// Either all operations are applied or none are.
    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError>;

    /// Every key-value pair whose key starts with `prefix`.
    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError>;

    /// `Err(Corrupted)` when the store refused its backing data on open.
    fn check_integrity(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Batch operation for atomic writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Put a key-value pair.
    Put { key: Vec<u8>, value: Vec<u8> },
    /// Delete a key.
    Delete { key: Vec<u8> },
}

impl BatchOperation {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Delete operation.
    pub fn delete(key: impl Into<Vec<u8>>) -> Self {
        BatchOperation::Delete { key: key.into() }
    }
}
