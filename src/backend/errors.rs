//! Selection error types
//!
//! All of these are reported before any backend object is constructed, so a
//! failed provisioning leaves no partial state behind.

use thiserror::Error;

use crate::term::FullyQualifiedClauseIndicator;

use super::{Feature, ImplementationId};

/// Result type for backend selection and provisioning
pub type SelectionResult<T> = Result<T, SelectionError>;

/// Errors from implementation selection and the backend loader
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    /// No implementation is registered at all
    #[error("no candidate implementations registered")]
    NoCandidates,

    /// One specific required feature has no supporting candidate
    #[error("required feature {0} is not supported by any implementation")]
    FeatureUnsupported(Feature),

    /// Every required feature is individually supported, but no single
    /// candidate supports the whole conjunction
    #[error("conflicting requirements: no implementation supports all of {}", format_features(.0))]
    ConflictingRequirements(Vec<Feature>),

    /// The resource already has a backend; creation must not proceed
    #[error("resource {0} is already backed")]
    AlreadyProvisioned(FullyQualifiedClauseIndicator),

    /// A recorded or requested implementation id has no registered factory
    #[error("unknown implementation id {0}")]
    UnknownImplementation(ImplementationId),

    /// The factory failed to build or reload the backend
    #[error("backend construction failed: {0}")]
    ConstructionFailed(String),

    /// The selection catalog could not be read or written
    #[error("selection catalog error: {0}")]
    Catalog(String),
}

fn format_features(features: &[Feature]) -> String {
    features
        .iter()
        .map(Feature::name)
        .collect::<Vec<_>>()
        .join(", ")
}
