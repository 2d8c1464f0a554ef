//! Entry file persistence
//!
//! One root entry per `<title>.json` file, pretty-printed.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::{debug, instrument};

use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{DomainError, DomainResult, EntryDocument, EntryId, Outline};
use crate::infrastructure::traits::FileSystem;

/// Suffix that marks a file as an entry tree.
pub const ENTRY_FILE_EXTENSION: &str = "json";

/// Spaces per nesting level in written files.
pub const DEFAULT_JSON_INDENT: usize = 4;

/// Reads and writes entry trees as JSON files.
#[derive(Clone)]
pub struct EntryStore {
    fs: Arc<dyn FileSystem>,
    indent: usize,
}

impl EntryStore {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            indent: DEFAULT_JSON_INDENT,
        }
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// File name an entry titled `title` is saved under.
    ///
    /// Titles are used verbatim; ones that would escape the directory or
    /// produce no stem are rejected.
    pub fn file_name_for(title: &str) -> DomainResult<String> {
        if title.is_empty() || title.contains(|c: char| matches!(c, '/' | '\\' | '\0')) {
            return Err(DomainError::InvalidTitle(title.to_string()));
        }
        Ok(format!("{}.{}", title, ENTRY_FILE_EXTENSION))
    }

    /// True when the file name ends in `.json`.
    pub fn is_entry_file(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(&format!(".{}", ENTRY_FILE_EXTENSION)))
            .unwrap_or(false)
    }

    /// Pretty-print a document with the configured indent.
    pub fn encode(&self, document: &EntryDocument) -> ApplicationResult<String> {
        let indent = " ".repeat(self.indent);
        let mut buf = Vec::new();
        let formatter = PrettyFormatter::with_indent(indent.as_bytes());
        let mut serializer = Serializer::with_formatter(&mut buf, formatter);
        document
            .serialize(&mut serializer)
            .map_err(|e| DomainError::malformed(e.to_string()))?;
        let mut text =
            String::from_utf8(buf).map_err(|e| DomainError::malformed(e.to_string()))?;
        text.push('\n');
        Ok(text)
    }

    /// Write the tree rooted at `id` to `<dir>/<title>.json`.
    ///
    /// Creates `dir` and any missing parents. Overwrites an existing file.
    #[instrument(level = "debug", skip(self, outline))]
    pub fn save(&self, outline: &Outline, id: EntryId, dir: &Path) -> ApplicationResult<PathBuf> {
        let entry = outline.entry(id)?;
        let file_name = Self::file_name_for(entry.title())?;
        let content = self.encode(&outline.to_document(id)?)?;

        if !self.fs.is_dir(dir) {
            debug!("creating storage directory {}", dir.display());
            self.fs
                .create_dir_all(dir)
                .with_path_context("create directory", dir)?;
        }

        let path = dir.join(file_name);
        self.fs
            .write(&path, &content)
            .with_path_context("write entry file", &path)?;
        debug!("saved '{}' to {}", entry.title(), path.display());
        Ok(path)
    }

    /// Read and decode one entry file without touching any outline.
    #[instrument(level = "debug", skip(self))]
    pub fn load_document(&self, path: &Path) -> ApplicationResult<EntryDocument> {
        let content = match self.fs.read_to_string(path) {
            // Content that is not UTF-8 cannot be JSON.
            Err(e) if e.kind() == io::ErrorKind::InvalidData => {
                return Err(DomainError::malformed(format!(
                    "{}: invalid UTF-8: {}",
                    path.display(),
                    e
                ))
                .into());
            }
            read => read.with_path_context("read entry file", path)?,
        };
        let document = EntryDocument::parse(&content).map_err(|e| match e {
            DomainError::Malformed { message } => {
                DomainError::malformed(format!("{}: {}", path.display(), message))
            }
            other => other,
        })?;
        Ok(document)
    }

    /// Read one entry file and insert it into `outline` as a new root.
    pub fn load(&self, outline: &mut Outline, path: &Path) -> ApplicationResult<EntryId> {
        let document = self.load_document(path)?;
        Ok(outline.from_document(&document))
    }
}

impl std::fmt::Debug for EntryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStore")
            .field("indent", &self.indent)
            .finish_non_exhaustive()
    }
}
