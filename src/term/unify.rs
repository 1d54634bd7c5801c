//! Structural unification and substitution
//!
//! First-order unification without an occurs check, the standard Prolog
//! default. Substitution resolves variables transitively and guards against
//! reference cycles a missing occurs check can introduce.

use std::collections::HashSet;

use super::{Bindings, Term, Variable};

/// Structurally unifies two terms, returning the most general unifier or
/// `None` when the terms do not unify.
pub fn unify(lhs: &Term, rhs: &Term) -> Option<Bindings> {
    let mut unifier = Bindings::new();
    let mut worklist = vec![(lhs.clone(), rhs.clone())];

    while let Some((a, b)) = worklist.pop() {
        let a = walk(a, &unifier);
        let b = walk(b, &unifier);

        match (a, b) {
            (Term::Variable(va), Term::Variable(vb)) if va == vb => {}
            (Term::Variable(v), other) | (other, Term::Variable(v)) => {
                // walk() resolved both sides, so v is unbound here
                unifier.bind(v, other).ok()?;
            }
            (Term::Atom(a), Term::Atom(b)) => {
                if a != b {
                    return None;
                }
            }
            (Term::Integer(a), Term::Integer(b)) => {
                if a != b {
                    return None;
                }
            }
            (Term::Compound(fa, args_a), Term::Compound(fb, args_b)) => {
                if fa != fb || args_a.len() != args_b.len() {
                    return None;
                }
                worklist.extend(args_a.into_iter().zip(args_b));
            }
            _ => return None,
        }
    }

    Some(unifier)
}

/// Resolves a term one level: variables are chased through the unifier until
/// an unbound variable or a non-variable term is reached.
fn walk(mut term: Term, unifier: &Bindings) -> Term {
    let mut seen: HashSet<Variable> = HashSet::new();
    while let Term::Variable(v) = &term {
        if !seen.insert(v.clone()) {
            break;
        }
        match unifier.get(v) {
            Some(next) => term = next.clone(),
            None => break,
        }
    }
    term
}

/// Applies an environment to a term, resolving variables transitively
pub fn substitute(term: &Term, env: &Bindings) -> Term {
    let mut on_path = HashSet::new();
    substitute_guarded(term, env, &mut on_path)
}

fn substitute_guarded(term: &Term, env: &Bindings, on_path: &mut HashSet<Variable>) -> Term {
    match term {
        Term::Variable(v) => match env.get(v) {
            Some(bound) if !on_path.contains(v) => {
                on_path.insert(v.clone());
                let resolved = substitute_guarded(bound, env, on_path);
                on_path.remove(v);
                resolved
            }
            _ => term.clone(),
        },
        Term::Atom(_) | Term::Integer(_) => term.clone(),
        Term::Compound(functor, args) => Term::Compound(
            functor.clone(),
            args.iter()
                .map(|arg| substitute_guarded(arg, env, on_path))
                .collect(),
        ),
    }
}
