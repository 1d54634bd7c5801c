//! Fact index contract
//!
//! An index accelerates lookups over one predicate's facts. The key is a
//! projection of a fact onto the index's variables and must be fully ground;
//! an unbound key variable is a schema error, not a miss. Range lookups are
//! optional — indices that cannot do them report that as a capability gap.

use std::collections::BTreeMap;
use std::fmt;

use crate::errors::{EvalError, SchemaError};
use crate::storage::PersistenceId;
use crate::term::{FullyQualifiedClauseIndicator, Term, Variable};

/// Ground projection of a fact onto an index's variables
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexKey {
    entries: BTreeMap<Variable, Term>,
}

impl IndexKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, variable: Variable, term: Term) -> Self {
        self.entries.insert(variable, term);
        self
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.entries.get(variable)
    }

    /// The first index variable this key leaves unbound or non-ground,
    /// if any. Such a key cannot be looked up.
    pub fn unbound_variable<'a>(
        &self,
        key_variables: impl IntoIterator<Item = &'a Variable>,
    ) -> Option<Variable> {
        for variable in key_variables {
            match self.entries.get(variable) {
                Some(term) if term.is_ground() => {}
                _ => return Some(variable.clone()),
            }
        }
        None
    }
}

impl fmt::Display for IndexKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, (variable, term)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", variable, term)?;
        }
        write!(f, "]")
    }
}

/// Secondary access path over one predicate's fact store
pub trait FactIndex: Send + Sync {
    /// The predicate this index belongs to
    fn indicator(&self) -> &FullyQualifiedClauseIndicator;

    /// The variables a lookup key must bind
    fn key_variables(&self) -> &[Variable];

    /// Exact lookup. Fails with `InvalidIndexKey` when the key is not fully
    /// ground over `key_variables`.
    fn find(&self, key: &IndexKey) -> Result<Vec<PersistenceId>, EvalError>;

    /// Maintenance hook: a fact with this key was stored
    fn on_inserted(&self, id: PersistenceId, key: IndexKey);

    /// Maintenance hook: the fact with this id and key was removed
    fn on_removed(&self, id: PersistenceId, key: &IndexKey);

    /// Optional range lookup between two key values
    fn find_between(
        &self,
        _lower: &Term,
        _lower_inclusive: bool,
        _upper: &Term,
        _upper_inclusive: bool,
    ) -> Result<Vec<PersistenceId>, EvalError> {
        Err(SchemaError::IndexUnsupported(self.indicator().clone()).into())
    }
}
