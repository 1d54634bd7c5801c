//! Fact-store access operators
//!
//! ## Invariants
//! - Scanning a predicate without a fact store yields nothing; a point
//!   lookup against the same predicate is a schema error. Scans answer
//!   "what facts exist", lookups answer "what does this id name".
//! - Permission is checked once at invoke; the denial is the sequence's
//!   failure before any row is produced
//! - Store order is preserved; one fact is fetched per pull

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::engine::ProofSearchContext;
use crate::errors::{EvalResult, PermissionError, SchemaError};
use crate::sequence::{LazySequence, Principal, Producer, Step};
use crate::storage::{FactStore, PersistenceId};
use crate::term::{Bindings, FullyQualifiedClauseIndicator, Term};

use super::{PlanOperator, Row, RowSequence};

/// Enumerates all facts of one predicate for each input row
pub struct FactScan {
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
}

impl FactScan {
    pub fn new(indicator: FullyQualifiedClauseIndicator, goal: Term) -> Self {
        Self { indicator, goal }
    }
}

impl PlanOperator for FactScan {
    type In = ();
    type Out = (PersistenceId, Term);

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<()>,
    ) -> RowSequence<(PersistenceId, Term)> {
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
            ScanProducer {
                ctx,
                principal,
                indicator: self.indicator.clone(),
                input,
                env: None,
                facts: None,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("fact_scan", vec![self.indicator.to_term()])
    }
}

struct ScanProducer {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    indicator: FullyQualifiedClauseIndicator,
    input: RowSequence<()>,
    env: Option<Bindings>,
    facts: Option<LazySequence<(PersistenceId, Term)>>,
}

impl Producer<Row<(PersistenceId, Term)>> for ScanProducer {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<(PersistenceId, Term)>>>> {
        Box::pin(async move {
            loop {
                if let Some(facts) = &mut self.facts {
                    match facts.try_advance().await? {
                        Some(fact) => {
                            let env = self.env.clone().unwrap_or_default();
                            return Ok(Step::Item((env, fact)));
                        }
                        None => {
                            self.facts = None;
                            self.env = None;
                            continue;
                        }
                    }
                }

                match self.input.try_advance().await? {
                    Some((env, ())) => {
                        // absent store means the predicate simply has no facts
                        if let Some(store) = self.ctx.fact_store(&self.indicator) {
                            self.facts = Some(store.all(self.principal));
                            self.env = Some(env);
                        }
                    }
                    None => return Ok(Step::Done),
                }
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
        if let Some(facts) = &mut self.facts {
            facts.close();
        }
    }
}

/// Point lookup by persistence id
pub struct FactGet {
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
}

impl FactGet {
    pub fn new(indicator: FullyQualifiedClauseIndicator, goal: Term) -> Self {
        Self { indicator, goal }
    }
}

impl PlanOperator for FactGet {
    type In = PersistenceId;
    type Out = (PersistenceId, Term);

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<PersistenceId>,
    ) -> RowSequence<(PersistenceId, Term)> {
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
            GetProducer {
                ctx,
                principal,
                indicator: self.indicator.clone(),
                input,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("fact_get", vec![self.indicator.to_term()])
    }
}

struct GetProducer {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    indicator: FullyQualifiedClauseIndicator,
    input: RowSequence<PersistenceId>,
}

impl Producer<Row<(PersistenceId, Term)>> for GetProducer {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<(PersistenceId, Term)>>>> {
        Box::pin(async move {
            match self.input.try_advance().await? {
                Some((env, id)) => {
                    let store = self
                        .ctx
                        .fact_store(&self.indicator)
                        .ok_or_else(|| SchemaError::NoFactStore(self.indicator.clone()))?;
                    match store.retrieve(self.principal, id).await? {
                        Some(fact) => Ok(Step::Item((env, (id, fact)))),
                        None => Ok(Step::Continue),
                    }
                }
                None => Ok(Step::Done),
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
    }
}

/// Deletes by persistence id, re-emitting the row with its id for each
/// fact actually removed
pub struct FactDelete {
    indicator: FullyQualifiedClauseIndicator,
    goal: Term,
}

impl FactDelete {
    pub fn new(indicator: FullyQualifiedClauseIndicator, goal: Term) -> Self {
        Self { indicator, goal }
    }
}

impl PlanOperator for FactDelete {
    type In = PersistenceId;
    type Out = PersistenceId;

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<PersistenceId>,
    ) -> RowSequence<PersistenceId> {
        let principal = input.principal();
        if !ctx.authorization().may_write(&self.indicator) {
            drop(input);
            return LazySequence::failed(
                principal,
                PermissionError::write(self.indicator.clone(), self.goal.to_string()).into(),
            );
        }
        LazySequence::new(
            principal,
            DeleteProducer {
                ctx,
                principal,
                indicator: self.indicator.clone(),
                input,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("fact_delete", vec![self.indicator.to_term()])
    }
}

struct DeleteProducer {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    indicator: FullyQualifiedClauseIndicator,
    input: RowSequence<PersistenceId>,
}

impl Producer<Row<PersistenceId>> for DeleteProducer {
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<PersistenceId>>>> {
        Box::pin(async move {
            match self.input.try_advance().await? {
                Some((env, id)) => {
                    // no store, nothing to delete
                    let Some(store) = self.ctx.fact_store(&self.indicator) else {
                        return Ok(Step::Continue);
                    };
                    if store.delete(self.principal, id).await? {
                        Ok(Step::Item((env, id)))
                    } else {
                        Ok(Step::Continue)
                    }
                }
                None => Ok(Step::Done),
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
    }
}
