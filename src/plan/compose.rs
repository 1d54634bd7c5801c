//! Composition operators
//!
//! ## Invariants
//! - `Pipe` feeds the first operator's entire output stream to the second;
//!   nothing is materialized
//! - `Union` runs its branches strictly in order; the input rows are
//!   replayed to every branch, so the input itself is drained up front
//! - `MultiPipe` runs every step against each row before pulling the next
//!   row
//! - `Discard` drains its inner operator per row and re-emits the row
//!   untouched

use std::marker::PhantomData;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::engine::ProofSearchContext;
use crate::errors::EvalResult;
use crate::sequence::{LazySequence, Principal, Producer, Step};
use crate::term::Term;

use super::{PlanOperator, Row, RowSequence, SharedOperator};

/// Sequential composition: the output of `first` is the input of `second`
pub struct Pipe<A, B> {
    first: A,
    second: B,
}

impl<A, B> Pipe<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }
}

impl<A, B> PlanOperator for Pipe<A, B>
where
    A: PlanOperator,
    B: PlanOperator<In = A::Out>,
{
    type In = A::In;
    type Out = B::Out;

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<Self::In>,
    ) -> RowSequence<Self::Out> {
        let mid = self.first.invoke(ctx.clone(), input);
        self.second.invoke(ctx, mid)
    }

    fn explanation(&self) -> Term {
        Term::compound("|", vec![self.first.explanation(), self.second.explanation()])
    }
}

/// Ordered alternation: every branch sees every input row
///
/// The input is drained in full before the first branch produces, so it
/// must be finite; an unbounded input would stall the union on its first
/// pull.
pub struct Union<I, O> {
    branches: Vec<SharedOperator<I, O>>,
}

impl<I, O> Union<I, O> {
    pub fn new(branches: Vec<SharedOperator<I, O>>) -> Self {
        Self { branches }
    }
}

impl<I, O> PlanOperator for Union<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    type In = I;
    type Out = O;

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<I>,
    ) -> RowSequence<O> {
        let principal = input.principal();
        LazySequence::new(
            principal,
            UnionProducer {
                ctx,
                principal,
                branches: self.branches.clone(),
                input: Some(input),
                rows: None,
                index: 0,
                current: None,
            },
        )
    }

    fn explanation(&self) -> Term {
        self.branches
            .iter()
            .map(|b| b.explanation())
            .reduce(|a, b| Term::compound(";", vec![a, b]))
            .unwrap_or_else(|| Term::atom("false"))
    }
}

struct UnionProducer<I, O> {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    branches: Vec<SharedOperator<I, O>>,
    input: Option<RowSequence<I>>,
    rows: Option<Vec<Row<I>>>,
    index: usize,
    current: Option<RowSequence<O>>,
}

impl<I, O> Producer<Row<O>> for UnionProducer<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<O>>>> {
        Box::pin(async move {
            loop {
                if let Some(current) = &mut self.current {
                    match current.try_advance().await? {
                        Some(row) => return Ok(Step::Item(row)),
                        None => {
                            self.current = None;
                            continue;
                        }
                    }
                }

                if self.rows.is_none() {
                    let mut rows = Vec::new();
                    if let Some(input) = &mut self.input {
                        while let Some(row) = input.try_advance().await? {
                            rows.push(row);
                        }
                    }
                    self.input = None;
                    self.rows = Some(rows);
                }

                if self.index >= self.branches.len() {
                    return Ok(Step::Done);
                }
                let branch = self.branches[self.index].clone();
                self.index += 1;
                let last = self.index == self.branches.len();

                // the final branch owns the rows; earlier branches replay a copy
                let rows = match &mut self.rows {
                    Some(rows) if last => std::mem::take(rows),
                    Some(rows) => rows.clone(),
                    None => Vec::new(),
                };
                let replay = LazySequence::from_iter(self.principal, rows);
                let seq = branch.invoke(self.ctx.clone(), replay);
                if last {
                    return Ok(Step::Become(seq));
                }
                self.current = Some(seq);
            }
        })
    }

    fn close(&mut self) {
        if let Some(input) = &mut self.input {
            input.close();
        }
        if let Some(current) = &mut self.current {
            current.close();
        }
    }
}

/// Per-row fan-out: every step runs against each row in turn
pub struct MultiPipe<P> {
    steps: Vec<SharedOperator<P, P>>,
}

impl<P> MultiPipe<P> {
    pub fn new(steps: Vec<SharedOperator<P, P>>) -> Self {
        Self { steps }
    }
}

impl<P> PlanOperator for MultiPipe<P>
where
    P: Clone + Send + 'static,
{
    type In = P;
    type Out = P;

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<P>,
    ) -> RowSequence<P> {
        let principal = input.principal();
        LazySequence::new(
            principal,
            MultiPipeProducer {
                ctx,
                principal,
                steps: self.steps.clone(),
                input,
                row: None,
                step_index: 0,
                current: None,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("each", self.steps.iter().map(|s| s.explanation()).collect())
    }
}

struct MultiPipeProducer<P> {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    steps: Vec<SharedOperator<P, P>>,
    input: RowSequence<P>,
    row: Option<Row<P>>,
    step_index: usize,
    current: Option<RowSequence<P>>,
}

impl<P> Producer<Row<P>> for MultiPipeProducer<P>
where
    P: Clone + Send + 'static,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<P>>>> {
        Box::pin(async move {
            loop {
                if let Some(current) = &mut self.current {
                    match current.try_advance().await? {
                        Some(row) => return Ok(Step::Item(row)),
                        None => {
                            self.current = None;
                            continue;
                        }
                    }
                }

                if let Some(row) = &self.row {
                    if self.step_index < self.steps.len() {
                        let step = self.steps[self.step_index].clone();
                        self.step_index += 1;
                        let single = LazySequence::once(self.principal, row.clone());
                        self.current = Some(step.invoke(self.ctx.clone(), single));
                        continue;
                    }
                    self.row = None;
                }

                match self.input.try_advance().await? {
                    Some(row) => {
                        self.row = Some(row);
                        self.step_index = 0;
                    }
                    None => return Ok(Step::Done),
                }
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
        if let Some(current) = &mut self.current {
            current.close();
        }
    }
}

/// Runs the inner operator per row for its effects, then re-emits the row
pub struct Discard<I, O> {
    inner: SharedOperator<I, O>,
}

impl<I, O> Discard<I, O> {
    pub fn new(inner: SharedOperator<I, O>) -> Self {
        Self { inner }
    }
}

impl<I, O> PlanOperator for Discard<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    type In = I;
    type Out = I;

    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<I>,
    ) -> RowSequence<I> {
        let principal = input.principal();
        LazySequence::new(
            principal,
            DiscardProducer {
                ctx,
                principal,
                inner: self.inner.clone(),
                input,
            },
        )
    }

    fn explanation(&self) -> Term {
        Term::compound("discard", vec![self.inner.explanation()])
    }
}

struct DiscardProducer<I, O> {
    ctx: Arc<dyn ProofSearchContext>,
    principal: Principal,
    inner: SharedOperator<I, O>,
    input: RowSequence<I>,
}

impl<I, O> Producer<Row<I>> for DiscardProducer<I, O>
where
    I: Clone + Send + 'static,
    O: Send + 'static,
{
    fn next(&mut self) -> BoxFuture<'_, EvalResult<Step<Row<I>>>> {
        Box::pin(async move {
            match self.input.try_advance().await? {
                Some(row) => {
                    let single = LazySequence::once(self.principal, row.clone());
                    let mut effects = self.inner.invoke(self.ctx.clone(), single);
                    while effects.try_advance().await?.is_some() {}
                    Ok(Step::Item(row))
                }
                None => Ok(Step::Done),
            }
        })
    }

    fn close(&mut self) {
        self.input.close();
    }
}

/// Identity operator; the plan of the trivially true query
pub struct Noop<P> {
    _marker: PhantomData<fn(P) -> P>,
}

impl<P> Noop<P> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<P> Default for Noop<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> PlanOperator for Noop<P>
where
    P: Send + 'static,
{
    type In = P;
    type Out = P;

    fn invoke(
        &self,
        _ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<P>,
    ) -> RowSequence<P> {
        input
    }

    fn explanation(&self) -> Term {
        Term::atom("noop")
    }
}
