//! Application services
//!
//! Concrete service implementations that orchestrate domain logic.
//! Services depend on the `FileSystem` boundary trait
//! but are themselves concrete structs, not traits.

mod manager;
mod store;

pub use manager::{EntryManager, LoadPolicy, LoadReport, SkippedFile};
pub use store::{EntryStore, DEFAULT_JSON_INDENT, ENTRY_FILE_EXTENSION};
