//! Service container for dependency injection
//!
//! Wires up the entry services with their dependencies.

use std::sync::Arc;

use crate::application::services::{EntryManager, EntryStore};
use crate::config::Settings;
use crate::infrastructure::traits::{FileSystem, RealFileSystem};

/// Container holding settings and the I/O boundary shared by all services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        Self::with_deps(settings, Arc::new(RealFileSystem))
    }

    /// Create a service container with custom dependencies (for testing).
    pub fn with_deps(settings: Settings, fs: Arc<dyn FileSystem>) -> Self {
        let settings = Arc::new(settings);

        Self { settings, fs }
    }

    /// Entry store using the configured JSON indent.
    pub fn entry_store(&self) -> EntryStore {
        EntryStore::new(Arc::clone(&self.fs)).with_indent(self.settings.json_indent)
    }

    /// Fresh manager bound to the configured storage directory.
    pub fn entry_manager(&self) -> EntryManager {
        EntryManager::with_store(self.settings.storage_dir.clone(), self.entry_store())
            .with_policy(self.settings.load_policy)
    }
}
