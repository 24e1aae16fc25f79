use std::collections::BTreeMap;

use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

/// In-memory key-value store for tests and ephemeral queues.
#[derive(Debug, Default)]
pub struct InMemoryKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    corrupted: Option<String>,
}

impl InMemoryKVStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store preloaded with raw entries, bypassing the queue.
    pub fn with_entries(entries: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>) -> Self {
        Self {
            data: entries.into_iter().collect(),
            corrupted: None,
        }
    }

    /// Put the store into the corrupted state: reads see nothing, writes fail.
    pub fn mark_corrupted(&mut self, reason: impl Into<String>) {
        self.corrupted = Some(reason.into());
    }

    /// Number of raw entries.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        match &self.corrupted {
            Some(reason) => Err(StoreError::Corrupted(reason.clone())),
            None => Ok(()),
        }
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        if self.corrupted.is_some() {
            return Ok(None);
        }
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.check_writable()?;
        self.data.remove(key);
        Ok(())
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        self.check_writable()?;
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    self.data.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        if self.corrupted.is_some() {
            return Ok(Vec::new());
        }
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn check_integrity(&self) -> Result<(), StoreError> {
        self.check_writable()
    }
}
