//! Plan explanation
//!
//! An operator's `explanation` term already carries the whole structure;
//! this module renders it for humans. Output is deterministic: the same
//! plan always renders the same report.

use std::fmt;

use crate::term::Term;

use super::{PlanOperator, UnitOperator};

/// Human-readable rendering of a compiled plan
pub struct ExplainReport {
    root: Term,
}

impl ExplainReport {
    pub fn of(plan: &UnitOperator) -> Self {
        Self {
            root: plan.explanation(),
        }
    }

    pub fn from_term(root: Term) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Term {
        &self.root
    }
}

impl fmt::Display for ExplainReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== PLAN ===")?;
        writeln!(f, "{}", self.root)?;
        write_node(f, &self.root, 0)
    }
}

/// Structural connectives render as a tree; leaves render inline
fn write_node(f: &mut fmt::Formatter<'_>, term: &Term, depth: usize) -> fmt::Result {
    let indent = "  ".repeat(depth);
    match term {
        Term::Compound(functor, args) if is_connective(functor) => {
            writeln!(f, "{}{}", indent, connective_label(functor))?;
            for arg in args {
                write_node(f, arg, depth + 1)?;
            }
            Ok(())
        }
        other => writeln!(f, "{}{}", indent, other),
    }
}

fn is_connective(functor: &str) -> bool {
    matches!(functor, "|" | ";" | "each" | "discard")
}

fn connective_label(functor: &str) -> &'static str {
    match functor {
        "|" => "pipe",
        ";" => "union",
        "each" => "each",
        _ => "discard",
    }
}
