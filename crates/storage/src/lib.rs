#![forbid(unsafe_code)]

pub mod progress_store;
pub mod repository;
pub mod sqlite;

pub use progress_store::{MASTERED_KEY, PROGRESS_KEY, ProgressDecodeError, ProgressStore};
pub use repository::{InMemoryKeyValueStore, KeyValueStore, Storage, StorageError};
