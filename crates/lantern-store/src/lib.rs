//! SQLite persistence for lantern messages: an append-only table keyed
//! by increasing integer id, read through visibility-filtered queries.

pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::MessageStore;

use std::path::PathBuf;

/// Base data directory: `LANTERN_DATA_DIR` when set, else `~/.lantern`.
pub fn default_base_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("LANTERN_DATA_DIR") {
        return PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".lantern")
}
