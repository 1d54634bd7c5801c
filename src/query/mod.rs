//! Goal trees
//!
//! A query is a tree of predicate goals combined by conjunction and
//! disjunction. Rule bodies are queries; the planner compiles a query into an
//! operator tree. The empty conjunction is `true` and the empty disjunction
//! is `false`, which is what lets facts be stored as rules with empty bodies.

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::term::{rename_term, substitute, Bindings, RenamingArena, Term, Variable};

/// A provable goal expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Query {
    /// A single predicate goal
    Predicate(Term),
    /// Conjunction, evaluated left to right; empty means `true`
    And(Vec<Query>),
    /// Disjunction, branches emitted in order; empty means `false`
    Or(Vec<Query>),
}

impl Query {
    pub fn goal(term: Term) -> Self {
        Query::Predicate(term)
    }

    /// The always-true query (empty conjunction)
    pub fn truth() -> Self {
        Query::And(Vec::new())
    }

    /// Applies an environment to every goal in the query
    pub fn substitute(&self, env: &Bindings) -> Query {
        match self {
            Query::Predicate(goal) => Query::Predicate(substitute(goal, env)),
            Query::And(qs) => Query::And(qs.iter().map(|q| q.substitute(env)).collect()),
            Query::Or(qs) => Query::Or(qs.iter().map(|q| q.substitute(env)).collect()),
        }
    }

    /// Collects every variable occurring in the query
    pub fn variables(&self) -> HashSet<Variable> {
        match self {
            Query::Predicate(goal) => goal.variables(),
            Query::And(qs) | Query::Or(qs) => {
                qs.iter().flat_map(|q| q.variables()).collect()
            }
        }
    }

    /// Renames every variable through the shared activation map
    pub fn rename(
        &self,
        arena: &mut RenamingArena,
        map: &mut HashMap<Variable, Variable>,
    ) -> Query {
        match self {
            Query::Predicate(goal) => Query::Predicate(rename_term(goal, arena, map)),
            Query::And(qs) => Query::And(qs.iter().map(|q| q.rename(arena, map)).collect()),
            Query::Or(qs) => Query::Or(qs.iter().map(|q| q.rename(arena, map)).collect()),
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Predicate(goal) => write!(f, "{}", goal),
            Query::And(qs) if qs.is_empty() => write!(f, "true"),
            Query::Or(qs) if qs.is_empty() => write!(f, "false"),
            Query::And(qs) => join(f, qs, ", "),
            Query::Or(qs) => join(f, qs, " ; "),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, qs: &[Query], sep: &str) -> fmt::Result {
    write!(f, "(")?;
    for (i, q) in qs.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", sep)?;
        }
        write!(f, "{}", q)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_reaches_every_goal() {
        let q = Query::And(vec![
            Query::goal(Term::compound("p", vec![Term::var("X")])),
            Query::goal(Term::compound("q", vec![Term::var("X")])),
        ]);
        let env: Bindings = [(Variable::new("X"), Term::int(1))].into_iter().collect();
        let expected = Query::And(vec![
            Query::goal(Term::compound("p", vec![Term::int(1)])),
            Query::goal(Term::compound("q", vec![Term::int(1)])),
        ]);
        assert_eq!(q.substitute(&env), expected);
    }

    #[test]
    fn test_rename_shares_map_across_goals() {
        let q = Query::And(vec![
            Query::goal(Term::compound("p", vec![Term::var("X")])),
            Query::goal(Term::compound("q", vec![Term::var("X")])),
        ]);
        let mut arena = RenamingArena::new();
        let mut map = HashMap::new();
        let renamed = q.rename(&mut arena, &mut map);
        // both occurrences of X must share one fresh variable
        assert_eq!(renamed.variables().len(), 1);
    }

    #[test]
    fn test_display() {
        let q = Query::And(vec![
            Query::goal(Term::compound("p", vec![Term::var("X")])),
            Query::goal(Term::atom("q")),
        ]);
        assert_eq!(q.to_string(), "(p(X), q)");
        assert_eq!(Query::truth().to_string(), "true");
    }
}
