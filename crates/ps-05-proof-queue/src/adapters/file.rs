//! # File-Backed Store
//!
//! Whole-file snapshot of the key space, rewritten through a temp file and
//! rename on every write so a crash leaves either the old or the new file.
//!
//! ```text
//! "PSQSTORE" | version[1] | ([key_len:u32 LE][key][value_len:u32 LE][value])*
//! ```

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::domain::errors::StoreError;
use crate::ports::outbound::{BatchOperation, KeyValueStore, ScanResult};

const MAGIC: &[u8; 8] = b"PSQSTORE";
const FORMAT_VERSION: u8 = 1;

type Entries = BTreeMap<Vec<u8>, Vec<u8>>;

/// File-backed key-value store.
///
/// A file that fails to parse puts the store in the corrupted state:
/// reads see an empty store and every write fails until `quarantine`.
pub struct FileBackedKVStore {
    data: Entries,
    path: PathBuf,
    corrupted: Option<String>,
}

impl FileBackedKVStore {
    /// Open the store at `path`, creating nothing until the first write.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();

        match Self::load_from_file(&path) {
            Ok(Some(data)) => {
                info!("[ps-05] Loaded {} keys from {}", data.len(), path.display());
                Self {
                    data,
                    path,
                    corrupted: None,
                }
            }
            Ok(None) => {
                info!("[ps-05] No existing store at {}", path.display());
                Self {
                    data: Entries::new(),
                    path,
                    corrupted: None,
                }
            }
            Err(reason) => {
                warn!("[ps-05] Store {} is corrupted: {}", path.display(), reason);
                Self {
                    data: Entries::new(),
                    path,
                    corrupted: Some(reason),
                }
            }
        }
    }

    /// Backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reason the store refused to load, if it did.
    pub fn corruption(&self) -> Option<&str> {
        self.corrupted.as_deref()
    }

    /// Move a corrupted file aside and continue with an empty store.
    ///
    /// Returns the path the damaged file was moved to.
    pub fn quarantine(&mut self) -> Result<Option<PathBuf>, StoreError> {
        if self.corrupted.is_none() {
            return Ok(None);
        }
        let aside = self.path.with_extension("corrupt");
        if self.path.exists() {
            std::fs::rename(&self.path, &aside).map_err(io_error)?;
        }
        warn!("[ps-05] Quarantined corrupted store to {}", aside.display());
        self.corrupted = None;
        self.data.clear();
        Ok(Some(aside))
    }

    /// `Ok(None)` when no file exists, `Err(reason)` when it cannot be parsed.
    fn load_from_file(path: &Path) -> Result<Option<Entries>, String> {
        let mut file = match std::fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes).map_err(|e| e.to_string())?;

        if bytes.len() < MAGIC.len() + 1 || &bytes[..MAGIC.len()] != MAGIC {
            return Err("missing store header".into());
        }
        if bytes[MAGIC.len()] != FORMAT_VERSION {
            return Err(format!("unsupported store version {}", bytes[MAGIC.len()]));
        }

        let mut data = Entries::new();
        let mut cursor = MAGIC.len() + 1;
        while cursor < bytes.len() {
            let key = read_chunk(&bytes, &mut cursor).ok_or("truncated key")?;
            let value = read_chunk(&bytes, &mut cursor).ok_or("truncated value")?;
            data.insert(key, value);
        }
        Ok(Some(data))
    }

    fn save_to_file(&self, data: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut bytes = Vec::with_capacity(MAGIC.len() + 1);
        bytes.extend_from_slice(MAGIC);
        bytes.push(FORMAT_VERSION);
        for (key, value) in data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file = std::fs::File::create(&temp_path).map_err(io_error)?;
        file.write_all(&bytes).map_err(io_error)?;
        file.sync_all().map_err(io_error)?;
        std::fs::rename(&temp_path, &self.path).map_err(io_error)?;
        Ok(())
    }

    /// Apply `operations` to a copy, persist it, then swap it in.
    fn commit(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        if let Some(reason) = &self.corrupted {
            return Err(StoreError::Corrupted(reason.clone()));
        }
        let mut next = self.data.clone();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        self.save_to_file(&next)?;
        self.data = next;
        Ok(())
    }
}

fn read_chunk(bytes: &[u8], cursor: &mut usize) -> Option<Vec<u8>> {
    let len_end = cursor.checked_add(4)?;
    let len = u32::from_le_bytes(bytes.get(*cursor..len_end)?.try_into().ok()?) as usize;
    let end = len_end.checked_add(len)?;
    let chunk = bytes.get(len_end..end)?.to_vec();
    *cursor = end;
    Some(chunk)
}

fn io_error(e: std::io::Error) -> StoreError {
    StoreError::Io {
        message: e.to_string(),
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<(), StoreError> {
        self.commit(vec![BatchOperation::put(key, value)])
    }

    fn delete(&mut self, key: &[u8]) -> Result<(), StoreError> {
        self.commit(vec![BatchOperation::delete(key)])
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<(), StoreError> {
        self.commit(operations)
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult, StoreError> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn check_integrity(&self) -> Result<(), StoreError> {
        match &self.corrupted {
            Some(reason) => Err(StoreError::Corrupted(reason.clone())),
            None => Ok(()),
        }
    }
}
