//! Callable invocation
//!
//! Routes a goal to a natively-implemented predicate. The callable sees
//! the goal with the row's environment already applied and yields binding
//! sets, which merge back into the environment. A goal planned for
//! invocation whose callable has since vanished is a schema error at the
//! first pull.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::engine::ProofSearchContext;
use crate::errors::{EvalResult, PermissionError, SchemaError};
use crate::sequence::{LazySequence, Principal, Producer, Step};
use crate::term::{substitute, Bindings, FullyQualifiedClauseIndicator, Term};

use super::{PlanOperator, Row, RowSequence};

/// Solves a goal through a registered callable
pub struct Invocation {
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
}

impl Invocation {
    pub fn new(indicator: FullyQualifiedClauseIndicator, goal: Term) -> Self {
        Self { indicator, goal }
    }
}

impl PlanOperator for Invocation {
    type In = ();
    type Out = ();

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<()>,
    ) -> RowSequence<()> {
        let principal = input.principal();
        if !ctx.authorization().may_read(&self.indicator) {
            drop(input);
            return LazySequence::failed(
                principal,
                PermissionError::read(self.indicator.clone(), self.goal.to_string()).into(),
            );
        }
        LazySequence::new(
            principal,
            InvokeProducer {
                ctx,
                principal,
                indicator: self.indicator.clone(),
                goal: self.goal.clone(),
                input,
                active: None,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound(
            "invoke",
            vec![Term::compound(
                ":",
                vec![Term::atom(self.indicator.module()), self.goal.clone()],
            )],
        )
    }
}

struct InvokeProducer {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
    input: RowSequence<()>,
    active: Option<(Bindings, LazySequence<Bindings>)>,
}

impl Producer<Row<()>> for InvokeProducer {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<()>>>> {
        Box::pin(async move {
            loop {
                if let Some((env, solutions)) = &mut self.active {
                    match solutions.try_advance().await? {
                        Some(solution) => match env.combined_with(&solution) {
                            Ok(merged) => return Ok(Step::Item((merged, ()))),
                            // contradictory solutions do not match this row
                            Err(_) => continue,
                        },
                        None => {
                            self.active = None;
                            continue;
                        }
                    }
                }

                match self.input.try_advance().await? {
                    Some((env, ())) => {
                        let callable = self
                            .ctx
                            .callable(&self.indicator)
                            .ok_or_else(|| SchemaError::UnresolvedCallable(self.indicator.clone()))?;
                        let instance = substitute(&self.goal, &env);
                        let solutions =
                            callable.call(self.ctx.clone(), self.principal, instance);
                        self.active = Some((env, solutions));
                    }
                    None => return Ok(Step::Done),
                }
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
        if let Some((_, solutions)) = &mut self.active {
            solutions.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Callable, KnowledgeBaseContext};
    use crate::term::{ClauseIndicator, Variable};

    /// Callable answering succ(N, M) for integer N
    struct Succ;

    impl Callable for Succ {
        fn call(
            &self,
            _ctx: Arc<dyn ProofSearchContext>,
            principal: Principal,
            goal: Term,
        ) -> LazySequence<Bindings> {
            let Term::Compound(_, args) = &goal else {
                return LazySequence::empty(principal);
            };
            let (Term::Integer(n), Term::Variable(m)) = (&args[0], &args[1]) else {
                return LazySequence::empty(principal);
            };
            let mut env = Bindings::new();
            if env.bind(m.clone(), Term::int(n + 1)).is_err() {
                return LazySequence::empty(principal);
            }
            LazySequence::once(principal, env)
        }
    }

    fn succ_goal() -> Term {
        Term::compound("succ", vec![Term::var("N"), Term::var("M")])
    }

    #[tokio::test]
    async fn test_invocation_merges_callable_bindings() {
        let ctx = Arc::new(
            KnowledgeBaseContext::new("user")
                .with_callable(ClauseIndicator::new("succ", 2), Arc::new(Succ)),
        );
        let indicator = ctx.qualify(ClauseIndicator::new("succ", 2));

        let mut env = Bindings::new();
        env.bind(Variable::new("N"), Term::int(4)).unwrap();
        let input = LazySequence::once(Principal::new(), (env, ()));

        let op = Invocation::new(indicator, succ_goal());
        let mut seq = op.invoke(ctx, input);
        let (out, ()) = seq.try_advance().await.unwrap().unwrap();
        assert_eq!(out.get(&Variable::new("M")), Some(&Term::int(5)));
        // the caller's own binding survives the merge
        assert_eq!(out.get(&Variable::new("N")), Some(&Term::int(4)));
    }

    #[tokio::test]
    async fn test_missing_callable_is_schema_error_at_pull() {
        let ctx = Arc::new(KnowledgeBaseContext::new("user"));
        let indicator = ctx.qualify(ClauseIndicator::new("succ", 2));
        let op = Invocation::new(indicator, succ_goal());
        let input = LazySequence::once(Principal::new(), (Bindings::new(), ()));
        let mut seq = op.invoke(ctx, input);
        let err = seq.try_advance().await.unwrap_err();
        assert!(matches!(
            err,
            crate::errors::EvalError::Schema(SchemaError::UnresolvedCallable(_))
        ));
    }
}
