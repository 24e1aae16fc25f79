//! # Storage Adapters

pub mod file;
pub mod lock;
pub mod memory;

pub use file::FileBackedKVStore;
pub use lock::{DirectoryLock, LockError};
pub use memory::InMemoryKVStore;
