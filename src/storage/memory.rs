//! In-memory reference implementations
//!
//! Mutex-protected maps with deterministic enumeration order (ascending
//! persistence id). `all` snapshots under the lock; a disk-backed store
//! would stream instead, which is why the contract returns a lazy sequence.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use futures_util::future::BoxFuture;

use crate::errors::{EvalError, SchemaError, StorageError};
use crate::sequence::{LazySequence, Principal};
use crate::term::{FullyQualifiedClauseIndicator, Term, Variable};

use super::index::{FactIndex, IndexKey};
use super::{FactStore, PersistenceId};

#[derive(Debug)]
struct StoreState {
    facts: BTreeMap<PersistenceId, Term>,
    next_id: u64,
    closed: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            facts: BTreeMap::new(),
            // ids are 1-based; 0 never names a fact
            next_id: 1,
            closed: false,
        }
    }
}

/// Concurrency-safe in-memory fact store for one predicate
#[derive(Debug, Default)]
pub struct MemoryFactStore {
    state: Mutex<StoreState>,
}

impl MemoryFactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convenience for seeding test and bootstrap data
    pub fn with_facts(facts: impl IntoIterator<Item = Term>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.lock().unwrap();
            for fact in facts {
                let id = PersistenceId::new(state.next_id);
                state.next_id += 1;
                state.facts.insert(id, fact);
            }
        }
        store
    }

    pub fn len(&self) -> usize {
        self.state.lock().unwrap().facts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn guard_open(state: &StoreState) -> Result<(), StorageError> {
        if state.closed {
            Err(StorageError::Failed("store is closed".into()))
        } else {
            Ok(())
        }
    }
}

impl FactStore for MemoryFactStore {
    fn store(
        &self,
        _principal: Principal,
        fact: Term,
    ) -> BoxFuture<'_, Result<PersistenceId, StorageError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            Self::guard_open(&state)?;
            let id = PersistenceId::new(state.next_id);
            state.next_id += 1;
            state.facts.insert(id, fact);
            Ok(id)
        })
    }

    fn retrieve(
        &self,
        _principal: Principal,
        id: PersistenceId,
    ) -> BoxFuture<'_, Result<Option<Term>, StorageError>> {
        Box::pin(async move {
            let state = self.state.lock().unwrap();
            Self::guard_open(&state)?;
            Ok(state.facts.get(&id).cloned())
        })
    }

    fn delete(
        &self,
        _principal: Principal,
        id: PersistenceId,
    ) -> BoxFuture<'_, Result<bool, StorageError>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            Self::guard_open(&state)?;
            Ok(state.facts.remove(&id).is_some())
        })
    }

    fn all(&self, principal: Principal) -> LazySequence<(PersistenceId, Term)> {
        let state = self.state.lock().unwrap();
        if state.closed {
            return LazySequence::failed(principal, StorageError::Failed("store is closed".into()).into());
        }
        let snapshot: Vec<(PersistenceId, Term)> = state
            .facts
            .iter()
            .map(|(id, fact)| (*id, fact.clone()))
            .collect();
        LazySequence::from_iter(principal, snapshot)
    }

    fn close(&self) {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        state.facts.clear();
    }
}

/// In-memory exact-match fact index
pub struct MemoryFactIndex {
    indicator: FullyQualifiedClauseIndicator,
    key_variables: Vec<Variable>,
    entries: Mutex<HashMap<String, Vec<PersistenceId>>>,
}

impl MemoryFactIndex {
    pub fn new(indicator: FullyQualifiedClauseIndicator, key_variables: Vec<Variable>) -> Self {
        Self {
            indicator,
            key_variables,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn validate(&self, key: &IndexKey) -> Result<String, EvalError> {
        if let Some(variable) = key.unbound_variable(self.key_variables.iter()) {
            return Err(SchemaError::InvalidIndexKey {
                indicator: self.indicator.clone(),
                variable,
            }
            .into());
        }
        Ok(key.to_string())
    }
}

impl FactIndex for MemoryFactIndex {
    fn indicator(&self) -> &FullyQualifiedClauseIndicator {
        &self.indicator
    }

    fn key_variables(&self) -> &[Variable] {
        &self.key_variables
    }

    fn find(&self, key: &IndexKey) -> Result<Vec<PersistenceId>, EvalError> {
        let canonical = self.validate(key)?;
        let entries = self.entries.lock().unwrap();
        Ok(entries.get(&canonical).cloned().unwrap_or_default())
    }

    fn on_inserted(&self, id: PersistenceId, key: IndexKey) {
        let mut entries = self.entries.lock().unwrap();
        entries.entry(key.to_string()).or_default().push(id);
    }

    fn on_removed(&self, id: PersistenceId, key: &IndexKey) {
        let mut entries = self.entries.lock().unwrap();
        if let Some(ids) = entries.get_mut(&key.to_string()) {
            ids.retain(|existing| *existing != id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ClauseIndicator;

    fn principal() -> Principal {
        Principal::new()
    }

    fn fqi() -> FullyQualifiedClauseIndicator {
        FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new("q", 1))
    }

    #[tokio::test]
    async fn test_store_retrieve_delete_roundtrip() {
        let store = MemoryFactStore::new();
        let id = store
            .store(principal(), Term::compound("q", vec![Term::int(1)]))
            .await
            .unwrap();

        let fact = store.retrieve(principal(), id).await.unwrap();
        assert_eq!(fact, Some(Term::compound("q", vec![Term::int(1)])));

        assert!(store.delete(principal(), id).await.unwrap());
        // second delete reports nothing was removed
        assert!(!store.delete(principal(), id).await.unwrap());
        assert_eq!(store.retrieve(principal(), id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_all_enumerates_in_insertion_order() {
        let store = MemoryFactStore::with_facts([
            Term::compound("q", vec![Term::int(1)]),
            Term::compound("q", vec![Term::int(2)]),
            Term::compound("q", vec![Term::int(3)]),
        ]);

        let mut seq = store.all(principal());
        let mut values = Vec::new();
        while let Some((_, fact)) = seq.try_advance().await.unwrap() {
            values.push(fact);
        }
        assert_eq!(
            values,
            vec![
                Term::compound("q", vec![Term::int(1)]),
                Term::compound("q", vec![Term::int(2)]),
                Term::compound("q", vec![Term::int(3)]),
            ]
        );
    }

    #[tokio::test]
    async fn test_closed_store_fails_operations() {
        let store = MemoryFactStore::new();
        store.close();
        let err = store
            .store(principal(), Term::atom("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Failed(_)));
    }

    #[test]
    fn test_index_rejects_non_ground_key() {
        let index = MemoryFactIndex::new(fqi(), vec![Variable::new("X")]);
        let key = IndexKey::new().with(Variable::new("X"), Term::var("Y"));
        let err = index.find(&key).unwrap_err();
        assert!(matches!(
            err,
            EvalError::Schema(SchemaError::InvalidIndexKey { .. })
        ));
    }

    #[test]
    fn test_index_insert_find_remove() {
        let index = MemoryFactIndex::new(fqi(), vec![Variable::new("X")]);
        let key = IndexKey::new().with(Variable::new("X"), Term::int(5));

        index.on_inserted(PersistenceId::new(1), key.clone());
        index.on_inserted(PersistenceId::new(2), key.clone());
        assert_eq!(
            index.find(&key).unwrap(),
            vec![PersistenceId::new(1), PersistenceId::new(2)]
        );

        index.on_removed(PersistenceId::new(1), &key);
        assert_eq!(index.find(&key).unwrap(), vec![PersistenceId::new(2)]);
    }

    #[test]
    fn test_range_lookup_unsupported_by_default() {
        let index = MemoryFactIndex::new(fqi(), vec![Variable::new("X")]);
        let err = index
            .find_between(&Term::int(1), true, &Term::int(9), false)
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::Schema(SchemaError::IndexUnsupported(_))
        ));
    }
}
