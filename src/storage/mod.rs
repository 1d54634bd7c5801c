//! Fact storage contracts
//!
//! A fact store holds the persisted facts of exactly one predicate, keyed by
//! opaque persistence ids that only the issuing store can interpret. The
//! engine consumes the contract; the concrete B-tree/hash-tree structures
//! live behind it. Stores must be safe for concurrent use by multiple open
//! sequences against the same predicate; the engine does not serialize that
//! access.
//!
//! `MemoryFactStore` and `MemoryFactIndex` are the in-process reference
//! implementations used by tests and by knowledge bases that need no
//! durability.

mod index;
mod memory;

pub use index::{FactIndex, IndexKey};
pub use memory::{MemoryFactIndex, MemoryFactStore};

use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::errors::StorageError;
use crate::sequence::{LazySequence, Principal};
use crate::term::Term;

/// Opaque per-store key for a stored fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PersistenceId(u64);

impl PersistenceId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for PersistenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Persistent storage for one predicate's facts
///
/// The future-returning methods are the only storage suspension points in
/// the engine; a sequence awaiting one of them propagates its failure or
/// cancellation faithfully.
pub trait FactStore: Send + Sync {
    /// Persists a fact and returns its new id
    fn store(
        &self,
        principal: Principal,
        fact: Term,
    ) -> BoxFuture<'_, Result<PersistenceId, StorageError>>;

    /// Point lookup; `None` when the id does not name a live fact
    fn retrieve(
        &self,
        principal: Principal,
        id: PersistenceId,
    ) -> BoxFuture<'_, Result<Option<Term>, StorageError>>;

    /// Removes by id; returns whether a fact was actually deleted
    fn delete(
        &self,
        principal: Principal,
        id: PersistenceId,
    ) -> BoxFuture<'_, Result<bool, StorageError>>;

    /// Lazy enumeration of all live facts, in the store's stable order
    fn all(&self, principal: Principal) -> LazySequence<(PersistenceId, Term)>;

    /// Releases store resources
    fn close(&self);
}
