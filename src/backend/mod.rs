//! Pluggable backend selection
//!
//! Fact stores, fact indices and similar resources are provisioned from a
//! pool of interchangeable implementations, each tagged with the capability
//! features it supports. Selection is deterministic: required features
//! filter, desired features score, and the winning implementation's stable
//! id is recorded so reloading picks the same implementation again.

mod catalog;
mod errors;
mod loader;
mod selection;

pub use catalog::{JsonFileCatalog, MemoryCatalog, SelectionCatalog};
pub use errors::{SelectionError, SelectionResult};
pub use loader::BackendLoader;
pub use selection::select_implementation;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::FullyQualifiedClauseIndicator;

/// Opaque, ground capability tag
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Feature(String);

impl Feature {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier of a backend implementation, persisted with each
/// provisioned resource for exact reload
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImplementationId(String);

impl ImplementationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImplementationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability surface of one candidate implementation
pub trait FeatureSupport {
    fn implementation_id(&self) -> &ImplementationId;

    fn supported_features(&self) -> &[Feature];

    fn supports(&self, feature: &Feature) -> bool {
        self.supported_features().contains(feature)
    }
}

/// Factory able to create, reload and destroy backends of one kind
///
/// `scope` names the resource a backend belongs to, typically a predicate
/// indicator. One scope holds at most one backend per kind.
pub trait BackendFactory<B>: FeatureSupport + Send + Sync {
    fn create(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<B>;

    fn load(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<B>;

    fn destroy(&self, scope: &FullyQualifiedClauseIndicator) -> SelectionResult<()>;
}
