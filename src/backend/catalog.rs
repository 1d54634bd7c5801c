//! Selection catalog
//!
//! Maps each provisioned resource to the implementation id that backs it, so
//! a reload selects the same implementation deterministically. The engine
//! consumes the trait; `MemoryCatalog` backs tests and embedded use, and
//! `JsonFileCatalog` is a single-file reference for simple deployments.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use crate::term::FullyQualifiedClauseIndicator;

use super::errors::{SelectionError, SelectionResult};
use super::ImplementationId;

/// Persistent record of which implementation backs which resource
pub trait SelectionCatalog: Send + Sync {
    /// Records the winner for a scope. The loader guarantees the scope is
    /// unbacked before calling this.
    fn record(
        &self,
        scope: &FullyQualifiedClauseIndicator,
        id: &ImplementationId,
    ) -> SelectionResult<()>;

    /// Looks up the recorded implementation for a scope
    fn lookup(&self, scope: &FullyQualifiedClauseIndicator) -> Option<ImplementationId>;

    /// Forgets the record for a scope
    fn remove(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()>;
}

/// In-memory catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: Mutex<HashMap<FullyQualifiedClauseIndicator, ImplementationId>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionCatalog for MemoryCatalog {
    fn record(
        &self,
        scope: &FullyQualifiedClauseIndicator,
        id: &ImplementationId,
    ) -> SelectionResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(scope.clone(), id.clone());
        Ok(())
    }

    fn lookup(&self, scope: &FullyQualifiedClauseIndicator) -> Option<ImplementationId> {
        self.entries.lock().unwrap().get(scope).cloned()
    }

    fn remove(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()> {
        self.entries.lock().unwrap().remove(scope);
        Ok(())
    }
}

/// Catalog persisted as one JSON file, rewritten whole on every change
pub struct JsonFileCatalog {
    path: PathBuf,
    entries: Mutex<HashMap<String, ImplementationId>>,
}

impl JsonFileCatalog {
    /// Opens the catalog, loading existing entries if the file exists
    pub fn open(path: impl Into<PathBuf>) -> SelectionResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| SelectionError::Catalog(e.to_string()))?;
            serde_json::from_str(&raw).map_err(|e| SelectionError::Catalog(e.to_string()))?
        } else {
            HashMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn flush(&self, entries: &HashMap<String, ImplementationId>) -> SelectionResult<()> {
        let raw = serde_json::to_string_pretty(entries)
            .map_err(|e| SelectionError::Catalog(e.to_string()))?;
        std::fs::write(&self.path, raw).map_err(|e| SelectionError::Catalog(e.to_string()))
    }
}

impl SelectionCatalog for JsonFileCatalog {
    fn record(
        &self,
        scope: &FullyQualifiedClauseIndicator,
        id: &ImplementationId,
    ) -> SelectionResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(scope.to_string(), id.clone());
        self.flush(&entries)
    }

    fn lookup(&self, scope: &FullyQualifiedClauseIndicator) -> Option<ImplementationId> {
        self.entries.lock().unwrap().get(&scope.to_string()).cloned()
    }

    fn remove(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()> {
        let mut entries = self.entries.lock().unwrap();
        entries.remove(&scope.to_string());
        self.flush(&entries)
    }
}
