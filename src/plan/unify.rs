//! Unification filter
//!
//! Matches each scanned fact against a goal template. The template is
//! renamed fresh per fact so bindings from one fact never leak into the
//! next; surviving bindings are restored to the template's own variables
//! before merging into the row's environment.

use std::collections::HashMap;
use std::sync::Arc;

use crate::engine::ProofSearchContext;
use crate::storage::PersistenceId;
use crate::term::{
    map_variables, rename_term, substitute, unify, Bindings, RenamingArena, Term, Variable,
};

use super::{PlanOperator, RowSequence};

/// Filters `(id, fact)` rows by unifiability with a template
///
/// With `instantiate` set, the merged environment carries the template
/// variables' new values; without it, matching rows pass with their
/// environment untouched.
pub struct UnifyFilter {
    template: Term,
    instantiate: bool,
}

impl UnifyFilter {
    pub fn new(template: Term, instantiate: bool) -> Self {
        Self {
            template,
            instantiate,
        }
    }
}

impl PlanOperator for UnifyFilter {
    type In = (PersistenceId, Term);
    type Out = ();

    fn invoke(
        &self,
        _ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<(PersistenceId, Term)>,
    ) -> RowSequence<()> {
        let template = self.template.clone();
        let instantiate = self.instantiate;
        input.filter_map(move |(env, (_id, fact))| {
            // the environment's view of the template is what must match
            let grounded = substitute(&template, &env);
            let merged = reconcile(&grounded, &fact, &env)?;
            if instantiate {
                Some((merged, ()))
            } else {
                Some((env, ()))
            }
        })
    }

    fn explanation(&self) -> Term {
        let verb = if self.instantiate { "unify" } else { "filter" };
        Term::compound(verb, vec![self.template.clone()])
    }
}

/// Unifies a renamed copy of `template` against `fact` and maps the
/// surviving bindings back onto the template's variables, merged with `env`
fn reconcile(template: &Term, fact: &Term, env: &Bindings) -> Option<Bindings> {
    let mut arena = RenamingArena::new();
    let mut renaming: HashMap<Variable, Variable> = HashMap::new();
    let renamed = rename_term(template, &mut arena, &mut renaming);

    let unifier = unify(&renamed, fact)?;

    let inverse: HashMap<Variable, Variable> = renaming
        .iter()
        .map(|(original, fresh)| (fresh.clone(), original.clone()))
        .collect();

    let mut delta = Bindings::new();
    for (original, fresh) in &renaming {
        let Some(bound) = unifier.get(fresh) else {
            continue;
        };
        let resolved = substitute(bound, &unifier);
        let restored = map_variables(&resolved, &inverse);
        if restored == Term::Variable(original.clone()) {
            continue;
        }
        delta.bind(original.clone(), restored).ok()?;
    }
    env.combined_with(&delta).ok()
}
