//! Predicate indicators
//!
//! A `ClauseIndicator` (name/arity) identifies a predicate's rules and facts
//! within a module; the fully-qualified form adds the owning module name and
//! is what stores, indices and permissions are keyed by.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Term;

/// (name, arity) pair identifying a predicate
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClauseIndicator {
    name: String,
    arity: usize,
}

impl ClauseIndicator {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }

    /// Derives the indicator of a goal term. Variables and integers are not
    /// callable, so they have no indicator.
    pub fn of(term: &Term) -> Option<Self> {
        match term {
            Term::Atom(name) => Some(Self::new(name.clone(), 0)),
            Term::Compound(functor, args) => Some(Self::new(functor.clone(), args.len())),
            Term::Variable(_) | Term::Integer(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Symbolic `name/arity` term for explanation output
    pub fn to_term(&self) -> Term {
        Term::compound(
            "/",
            vec![Term::atom(self.name.clone()), Term::int(self.arity as i64)],
        )
    }
}

impl fmt::Display for ClauseIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Indicator plus the owning module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FullyQualifiedClauseIndicator {
    module: String,
    indicator: ClauseIndicator,
}

impl FullyQualifiedClauseIndicator {
    pub fn new(module: impl Into<String>, indicator: ClauseIndicator) -> Self {
        Self {
            module: module.into(),
            indicator,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn indicator(&self) -> &ClauseIndicator {
        &self.indicator
    }

    /// Symbolic `module:name/arity` term for explanation output
    pub fn to_term(&self) -> Term {
        Term::compound(
            ":",
            vec![Term::atom(self.module.clone()), self.indicator.to_term()],
        )
    }
}

impl fmt::Display for FullyQualifiedClauseIndicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.module, self.indicator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indicator_of_goal() {
        let goal = Term::compound("parent", vec![Term::atom("tom"), Term::var("X")]);
        assert_eq!(
            ClauseIndicator::of(&goal),
            Some(ClauseIndicator::new("parent", 2))
        );
        assert_eq!(ClauseIndicator::of(&Term::atom("halt")), Some(ClauseIndicator::new("halt", 0)));
        assert_eq!(ClauseIndicator::of(&Term::var("X")), None);
        assert_eq!(ClauseIndicator::of(&Term::int(1)), None);
    }

    #[test]
    fn test_display() {
        let fqi = FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new("parent", 2));
        assert_eq!(fqi.to_string(), "user:parent/2");
        assert_eq!(fqi.to_term().to_string(), "user:parent/2");
    }
}
