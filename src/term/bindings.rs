//! Binding environments
//!
//! An append-only mapping from variables to terms. Within one proof branch a
//! variable, once instantiated, is never retracted; branching is expressed by
//! cloning the environment (a snapshot) and letting each branch append
//! independently.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use thiserror::Error;

use super::{Term, Variable};

/// Two environments (or a bind call) disagreed on a shared variable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("contradictory binding for {variable}: {existing} vs {incoming}")]
pub struct ContradictionError {
    pub variable: Variable,
    pub existing: Term,
    pub incoming: Term,
}

/// Append-only variable -> term mapping
///
/// A `BTreeMap` keeps iteration and display deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings {
    map: BTreeMap<Variable, Term>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn get(&self, variable: &Variable) -> Option<&Term> {
        self.map.get(variable)
    }

    /// Instantiates a variable. Re-binding to the same term is a no-op;
    /// re-binding to a different term is a contradiction, never an update.
    pub fn bind(&mut self, variable: Variable, term: Term) -> Result<(), ContradictionError> {
        match self.map.get(&variable) {
            Some(existing) if *existing != term => Err(ContradictionError {
                variable,
                existing: existing.clone(),
                incoming: term,
            }),
            Some(_) => Ok(()),
            None => {
                self.map.insert(variable, term);
                Ok(())
            }
        }
    }

    /// Projects the environment onto the given variable set
    pub fn subset(&self, variables: &HashSet<Variable>) -> Bindings {
        Bindings {
            map: self
                .map
                .iter()
                .filter(|(v, _)| variables.contains(v))
                .map(|(v, t)| (v.clone(), t.clone()))
                .collect(),
        }
    }

    /// Merges two environments, failing if they disagree on a shared variable
    pub fn combined_with(&self, other: &Bindings) -> Result<Bindings, ContradictionError> {
        let mut combined = self.clone();
        for (variable, term) in &other.map {
            combined.bind(variable.clone(), term.clone())?;
        }
        Ok(combined)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Variable, &Term)> {
        self.map.iter()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.map.keys()
    }
}

impl fmt::Display for Bindings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (variable, term)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} = {}", variable, term)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(Variable, Term)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (Variable, Term)>>(iter: I) -> Self {
        Bindings {
            map: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_is_append_only() {
        let mut env = Bindings::new();
        env.bind(Variable::new("X"), Term::int(1)).unwrap();
        // same term again is fine
        env.bind(Variable::new("X"), Term::int(1)).unwrap();
        // a different term is a contradiction
        let err = env.bind(Variable::new("X"), Term::int(2)).unwrap_err();
        assert_eq!(err.variable, Variable::new("X"));
        assert_eq!(env.get(&Variable::new("X")), Some(&Term::int(1)));
    }

    #[test]
    fn test_subset_projects() {
        let env: Bindings = [
            (Variable::new("X"), Term::int(1)),
            (Variable::new("Y"), Term::int(2)),
        ]
        .into_iter()
        .collect();
        let keep: HashSet<Variable> = [Variable::new("X")].into_iter().collect();
        let projected = env.subset(&keep);
        assert_eq!(projected.len(), 1);
        assert_eq!(projected.get(&Variable::new("X")), Some(&Term::int(1)));
    }

    #[test]
    fn test_combined_with_agreement() {
        let a: Bindings = [(Variable::new("X"), Term::int(1))].into_iter().collect();
        let b: Bindings = [
            (Variable::new("X"), Term::int(1)),
            (Variable::new("Y"), Term::atom("yes")),
        ]
        .into_iter()
        .collect();
        let merged = a.combined_with(&b).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_combined_with_disagreement() {
        let a: Bindings = [(Variable::new("X"), Term::int(1))].into_iter().collect();
        let b: Bindings = [(Variable::new("X"), Term::int(2))].into_iter().collect();
        assert!(a.combined_with(&b).is_err());
    }

    #[test]
    fn test_display_deterministic() {
        let env: Bindings = [
            (Variable::new("B"), Term::int(2)),
            (Variable::new("A"), Term::int(1)),
        ]
        .into_iter()
        .collect();
        assert_eq!(env.to_string(), "{A = 1, B = 2}");
    }
}
