//! Directory-scoped collection of root entries
//!
//! Loads every `*.json` file of one directory into a shared outline and
//! writes each root back under its title.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::application::services::store::EntryStore;
use crate::application::{ApplicationResult, IoResultExt};
use crate::domain::{EntryDocument, EntryId, EntryRef, Outline};
use crate::infrastructure::traits::FileSystem;

/// What `load_all` does with a file whose content is not an entry tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadPolicy {
    /// The first bad file aborts the whole call; nothing is appended.
    #[default]
    FailFast,
    /// Malformed files are skipped and reported. I/O errors still abort.
    SkipMalformed,
}

impl LoadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadPolicy::FailFast => "fail-fast",
            LoadPolicy::SkipMalformed => "skip-malformed",
        }
    }
}

impl std::str::FromStr for LoadPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "fail-fast" => Ok(LoadPolicy::FailFast),
            "skip-malformed" => Ok(LoadPolicy::SkipMalformed),
            other => Err(format!(
                "unknown load policy '{}' (expected fail-fast or skip-malformed)",
                other
            )),
        }
    }
}

impl std::fmt::Display for LoadPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file `load_all` passed over under [`LoadPolicy::SkipMalformed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of one `load_all` call.
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Roots appended by this call, in directory listing order
    pub loaded: Vec<EntryId>,
    pub skipped: Vec<SkippedFile>,
}

/// Owns the root entries bound to one storage directory.
///
/// Not synchronized: concurrent writers to the same directory must be
/// serialized by the caller.
#[derive(Debug)]
pub struct EntryManager {
    storage_path: PathBuf,
    store: EntryStore,
    policy: LoadPolicy,
    outline: Outline,
    roots: Vec<EntryId>,
}

impl EntryManager {
    pub fn new(storage_path: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self::with_store(storage_path, EntryStore::new(fs))
    }

    pub fn with_store(storage_path: impl Into<PathBuf>, store: EntryStore) -> Self {
        Self {
            storage_path: storage_path.into(),
            store,
            policy: LoadPolicy::default(),
            outline: Outline::new(),
            roots: Vec::new(),
        }
    }

    pub fn with_policy(mut self, policy: LoadPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn storage_path(&self) -> &Path {
        &self.storage_path
    }

    pub fn policy(&self) -> LoadPolicy {
        self.policy
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    pub fn outline(&self) -> &Outline {
        &self.outline
    }

    pub fn outline_mut(&mut self) -> &mut Outline {
        &mut self.outline
    }

    pub fn roots(&self) -> &[EntryId] {
        &self.roots
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// The root at position `index` in `roots` order.
    pub fn root(&self, index: usize) -> Option<EntryRef<'_>> {
        self.roots
            .get(index)
            .and_then(|&id| self.outline.entry(id).ok())
    }

    /// Last root titled `title`, the one whose file wins on `save_all`.
    pub fn find_root(&self, title: &str) -> Option<EntryId> {
        self.roots.iter().rev().copied().find(|&id| {
            self.outline
                .get(id)
                .map(|node| node.title == title)
                .unwrap_or(false)
        })
    }

    /// Append a new childless root. Disk is not touched.
    #[instrument(level = "debug", skip(self))]
    pub fn add_root(&mut self, title: &str) -> EntryId {
        let id = self.outline.create_entry(title);
        self.roots.push(id);
        id
    }

    /// Attach `child` below `parent`; a child that was a root leaves `roots`.
    pub fn attach_child(&mut self, parent: EntryId, child: EntryId) -> ApplicationResult<()> {
        self.outline.attach_child(parent, child)?;
        self.roots.retain(|&id| id != child);
        Ok(())
    }

    /// Save one tree into the storage directory.
    pub fn save_entry(&self, id: EntryId) -> ApplicationResult<PathBuf> {
        self.store.save(&self.outline, id, &self.storage_path)
    }

    /// Save every root in `roots` order.
    ///
    /// Stops at the first failure; files already written stay on disk.
    #[instrument(level = "debug", skip(self), fields(storage = %self.storage_path.display()))]
    pub fn save_all(&self) -> ApplicationResult<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.roots.len());
        for &id in &self.roots {
            written.push(self.save_entry(id)?);
        }
        info!("saved {} entries to {}", written.len(), self.storage_path.display());
        Ok(written)
    }

    /// Load one file from anywhere and append it to `roots`.
    pub fn load_file(&mut self, path: &Path) -> ApplicationResult<EntryId> {
        let id = self.store.load(&mut self.outline, path)?;
        self.roots.push(id);
        Ok(id)
    }

    /// Append every `*.json` file directly inside the storage directory.
    ///
    /// Accumulates: calling twice appends the same trees twice.
    /// Subdirectories and other files are ignored. Order follows the
    /// platform's directory listing.
    #[instrument(level = "debug", skip(self), fields(storage = %self.storage_path.display()))]
    pub fn load_all(&mut self) -> ApplicationResult<LoadReport> {
        let paths = self
            .store
            .fs()
            .list_dir(&self.storage_path)
            .with_path_context("list storage directory", &self.storage_path)?;

        let mut documents: Vec<EntryDocument> = Vec::new();
        let mut skipped = Vec::new();
        for path in paths {
            if !EntryStore::is_entry_file(&path) || !self.store.fs().is_file(&path) {
                debug!("ignoring {}", path.display());
                continue;
            }
            match self.store.load_document(&path) {
                Ok(document) => documents.push(document),
                Err(e) if self.policy == LoadPolicy::SkipMalformed && e.is_malformed() => {
                    warn!("skipping {}: {}", path.display(), e);
                    skipped.push(SkippedFile {
                        path,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // Nothing is appended until every file has decoded.
        let loaded: Vec<EntryId> = documents
            .iter()
            .map(|doc| self.outline.from_document(doc))
            .collect();
        self.roots.extend(&loaded);
        info!(
            "loaded {} entries from {} ({} skipped)",
            loaded.len(),
            self.storage_path.display(),
            skipped.len()
        );
        Ok(LoadReport { loaded, skipped })
    }
}
