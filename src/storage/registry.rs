//! Backend lookup by file store kind

use super::{AzureBackend, GcsBackend, HdfsBackend, LocalBackend, S3Backend, Stager, StorageBackend};
use crate::error::Result;
use crate::settings::Settings;
use crate::types::FileStoreKind;
use std::collections::HashMap;
use std::sync::Arc;

/// Maps each `FileStoreKind` to its backend
#[derive(Clone, Default)]
pub struct BackendRegistry {
    backends: HashMap<FileStoreKind, Arc<dyn StorageBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// All five backends configured from process settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let stager = Stager::new(settings.staging_dir());
        let timeout = settings.request_timeout();

        let mut registry = Self::new();
        registry.register(Arc::new(LocalBackend::new(&settings.datastore_dir)));
        registry.register(Arc::new(S3Backend::new(stager.clone(), timeout)));
        registry.register(Arc::new(GcsBackend::new(stager.clone(), timeout)));
        registry.register(Arc::new(AzureBackend::new(stager.clone(), timeout)?));
        registry.register(Arc::new(HdfsBackend::new(
            stager,
            timeout,
            settings.hdfs_user.clone(),
        )?));
        Ok(registry)
    }

    /// Register (or replace) the backend for its kind
    pub fn register(&mut self, backend: Arc<dyn StorageBackend>) {
        self.backends.insert(backend.kind(), backend);
    }

    /// Builder-style `register`
    #[must_use]
    pub fn with(mut self, backend: Arc<dyn StorageBackend>) -> Self {
        self.register(backend);
        self
    }

    /// Backend for a kind
    pub fn get(&self, kind: FileStoreKind) -> Option<Arc<dyn StorageBackend>> {
        self.backends.get(&kind).cloned()
    }

    /// Registered kinds
    pub fn kinds(&self) -> Vec<FileStoreKind> {
        FileStoreKind::ALL
            .into_iter()
            .filter(|kind| self.backends.contains_key(kind))
            .collect()
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}
