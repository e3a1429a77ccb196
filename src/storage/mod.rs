//! Persistent key-value storage module
//!
//! The timer and the task log keep their durable state behind the
//! `KeyValueStore` capability so they never touch the filesystem directly.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::StoreError;

/// Key under which the locked timer record is kept
pub const TIMER_KEY: &str = "focusmirror-locked-task";

/// Key under which the task log is kept
pub const LOGS_KEY: &str = "focusmirror-logs";

/// Durable string-keyed storage
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`, if any
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
