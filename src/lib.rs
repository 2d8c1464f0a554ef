//! Hierarchical outlines of titled entries, persisted as one JSON file per tree.
//!
//! - [`domain`]: the arena-backed [`Outline`](domain::Outline) and its document shape
//! - [`application`]: [`EntryStore`](application::services::EntryStore) file persistence
//!   and the directory-scoped [`EntryManager`](application::services::EntryManager)
//! - [`infrastructure`]: the real filesystem and service wiring
//! - [`cli`]: the `outliner` command line

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::services::{EntryManager, EntryStore, LoadPolicy, LoadReport};
pub use application::{ApplicationError, ApplicationResult};
pub use domain::{DomainError, EntryDocument, EntryId, EntryRef, Outline};
