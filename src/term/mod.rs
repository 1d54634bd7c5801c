//! First-order term model
//!
//! Concrete terms, predicate indicators, append-only binding environments,
//! structural unification and activation-scoped variable renaming. The rest
//! of the engine treats terms as opaque values; only this module knows their
//! structure.

mod bindings;
mod indicator;
mod rename;
mod unify;

pub use bindings::{Bindings, ContradictionError};
pub use indicator::{ClauseIndicator, FullyQualifiedClauseIndicator};
pub use rename::{map_variables, rename_term, RenamingArena};
pub use unify::{substitute, unify};

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A logic variable, identified by name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A first-order term: variable, atom, integer or compound
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Term {
    Variable(Variable),
    Atom(String),
    Integer(i64),
    Compound(String, Vec<Term>),
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Variable(Variable::new(name))
    }

    pub fn atom(name: impl Into<String>) -> Self {
        Term::Atom(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Integer(value)
    }

    pub fn compound(functor: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Compound(functor.into(), args)
    }

    /// Collects every variable occurring in the term
    pub fn variables(&self) -> HashSet<Variable> {
        let mut out = HashSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut HashSet<Variable>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Atom(_) | Term::Integer(_) => {}
            Term::Compound(_, args) => {
                for arg in args {
                    arg.collect_variables(out);
                }
            }
        }
    }

    /// True if the term contains no variables
    pub fn is_ground(&self) -> bool {
        match self {
            Term::Variable(_) => false,
            Term::Atom(_) | Term::Integer(_) => true,
            Term::Compound(_, args) => args.iter().all(Term::is_ground),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Variable(v) => write!(f, "{}", v),
            Term::Atom(name) => write!(f, "{}", name),
            Term::Integer(i) => write!(f, "{}", i),
            // |, ; and : render infix so explanation terms read like plans
            Term::Compound(functor, args) if args.len() == 2 && functor == "|" => {
                write!(f, "({} | {})", args[0], args[1])
            }
            Term::Compound(functor, args) if args.len() == 2 && functor == ";" => {
                write!(f, "({} ; {})", args[0], args[1])
            }
            Term::Compound(functor, args) if args.len() == 2 && functor == ":" => {
                write!(f, "{}:{}", args[0], args[1])
            }
            Term::Compound(functor, args) if args.len() == 2 && functor == "/" => {
                write!(f, "{}/{}", args[0], args[1])
            }
            Term::Compound(functor, args) => {
                write!(f, "{}(", functor)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
        }
    }
}
