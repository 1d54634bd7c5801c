//! Plan operator algebra
//!
//! Queries compile into trees of typed operators. Each operator maps a lazy
//! sequence of rows to another lazy sequence of rows, where a row pairs the
//! logical environment with an operator-specific payload.
//!
//! ## Invariants
//! - Invoking an operator performs no storage work; everything happens on
//!   pull of the returned sequence
//! - Permission denials fail the returned sequence before its first pull;
//!   schema and storage errors surface at production time
//! - Output order is deterministic given input order and store order

mod compose;
mod deduce;
mod explain;
mod facts;
mod invoke;
mod planner;
mod unify;

pub use compose::{Discard, MultiPipe, Noop, Pipe, Union};
pub use deduce::Deduction;
pub use explain::ExplainReport;
pub use facts::{FactDelete, FactGet, FactScan};
pub use invoke::Invocation;
pub use planner::plan_query;
pub use unify::UnifyFilter;

use std::sync::Arc;

use crate::engine::ProofSearchContext;
use crate::sequence::LazySequence;
use crate::term::{Bindings, Term};

/// One unit of plan dataflow: the environment plus a payload
pub type Row<P> = (Bindings, P);

/// Lazy stream of rows
pub type RowSequence<P> = LazySequence<Row<P>>;

/// Shared, type-erased operator handle
pub type SharedOperator<I, O> = Arc<dyn PlanOperator<In = I, Out = O>>;

/// A unit-to-unit operator, the shape whole queries compile to
pub type UnitOperator = SharedOperator<(), ()>;

/// Typed plan operator
pub trait PlanOperator: Send + Sync {
    type In: Send + 'static;
    type Out: Send + 'static;

    /// Wires the operator over an input stream. Must not touch storage.
    fn invoke(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        input: RowSequence<Self::In>,
    ) -> RowSequence<Self::Out>;

    /// Structural description of the operator as a term
    fn explanation(&self) -> Term;
}

impl<I, O> std::fmt::Debug for dyn PlanOperator<In = I, Out = O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PlanOperator({})", self.explanation())
    }
}

impl<I, O> PlanOperator for Arc<dyn PlanOperator<In = I, Out = O>>
where
    I: Send + 'static,
    O: Send + 'static,
{
    type In = I;
    type Out = O;

    fn invoke(&self, ctx: Arc<dyn ProofSearchContext>, input: RowSequence<I>) -> RowSequence<O> {
        self.as_ref().invoke(ctx, input)
    }

    fn explanation(&self) -> Term {
        self.as_ref().explanation()
    }
}
