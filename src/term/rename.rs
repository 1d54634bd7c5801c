//! Activation-scoped variable renaming
//!
//! Every rule activation works on renamed copies of the goal and the rule so
//! that recursive re-entry into the same rule can never capture variables.
//! Fresh names are allocated from an arena whose nonce makes them disjoint
//! from every other arena's names without any global counter; two maps filled
//! from the same arena are disjoint from each other as well.

use std::collections::HashMap;

use uuid::Uuid;

use super::{Term, Variable};

/// Fresh-variable allocator scoped to one activation
#[derive(Debug)]
pub struct RenamingArena {
    nonce: String,
    counter: u64,
}

impl RenamingArena {
    pub fn new() -> Self {
        let id = Uuid::new_v4().simple().to_string();
        Self {
            nonce: id[..8].to_string(),
            counter: 0,
        }
    }

    /// Allocates a variable no other arena can produce
    pub fn fresh(&mut self) -> Variable {
        let v = Variable::new(format!("_R{}_{}", self.nonce, self.counter));
        self.counter += 1;
        v
    }
}

impl Default for RenamingArena {
    fn default() -> Self {
        Self::new()
    }
}

/// Renames every variable in `term` to a fresh one, recording the old -> new
/// mapping in `map`. Repeated occurrences of a variable share one fresh name.
pub fn rename_term(
    term: &Term,
    arena: &mut RenamingArena,
    map: &mut HashMap<Variable, Variable>,
) -> Term {
    match term {
        Term::Variable(v) => {
            let fresh = map.entry(v.clone()).or_insert_with(|| arena.fresh());
            Term::Variable(fresh.clone())
        }
        Term::Atom(_) | Term::Integer(_) => term.clone(),
        Term::Compound(functor, args) => Term::Compound(
            functor.clone(),
            args.iter()
                .map(|arg| rename_term(arg, arena, map))
                .collect(),
        ),
    }
}

/// Replaces variables according to `map`, leaving unmapped variables as-is.
/// Used to translate renamed solution terms back to caller names.
pub fn map_variables(term: &Term, map: &HashMap<Variable, Variable>) -> Term {
    match term {
        Term::Variable(v) => match map.get(v) {
            Some(target) => Term::Variable(target.clone()),
            None => term.clone(),
        },
        Term::Atom(_) | Term::Integer(_) => term.clone(),
        Term::Compound(functor, args) => Term::Compound(
            functor.clone(),
            args.iter().map(|arg| map_variables(arg, map)).collect(),
        ),
    }
}
