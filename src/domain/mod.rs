//! Domain layer: the outline tree and its document shape
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod document;
pub mod error;
pub mod outline;
pub mod render;

pub use document::EntryDocument;
pub use error::{DomainError, DomainResult};
pub use outline::{EntryId, EntryNode, EntryRef, Outline, PreOrderIterator};
pub use render::TreeNodeConvert;
