//! Query planner
//!
//! Compiles a query into a unit-to-unit operator tree. Planning is pure
//! and cheap; all storage work is deferred to the plan's first pull.
//!
//! - A conjunction pipes its conjuncts left to right; the empty
//!   conjunction is the identity
//! - A disjunction unions its disjuncts in order
//! - A predicate goal resolves to a callable when one is registered,
//!   otherwise to stored facts first and rule deduction second

use std::sync::Arc;

use crate::engine::ProofSearchContext;
use crate::errors::{EvalResult, SchemaError};
use crate::query::Query;
use crate::term::{ClauseIndicator, FullyQualifiedClauseIndicator, Term};

use super::compose::{Noop, Pipe, Union};
use super::deduce::Deduction;
use super::facts::FactScan;
use super::invoke::Invocation;
use super::unify::UnifyFilter;
use super::UnitOperator;

/// Compiles `query` against the context's registered schema
pub fn plan_query(ctx: &dyn ProofSearchContext, query: &Query) -> EvalResult<UnitOperator> {
    match query {
        Query::Predicate(goal) => plan_goal(ctx, goal),
        Query::And(conjuncts) => {
            let mut plans = Vec::with_capacity(conjuncts.len());
            for conjunct in conjuncts {
                plans.push(plan_query(ctx, conjunct)?);
            }
            let mut plans = plans.into_iter();
            let Some(first) = plans.next() else {
                return Ok(Arc::new(Noop::new()));
            };
            Ok(plans.fold(first, |acc, next| Arc::new(Pipe::new(acc, next))))
        }
        Query::Or(disjuncts) => {
            let mut branches = Vec::with_capacity(disjuncts.len());
            for disjunct in disjuncts {
                branches.push(plan_query(ctx, disjunct)?);
            }
            Ok(Arc::new(Union::new(branches)))
        }
    }
}

fn plan_goal(ctx: &dyn ProofSearchContext, goal: &Term) -> EvalResult<UnitOperator> {
    let indicator = ClauseIndicator::of(goal)
        .ok_or_else(|| SchemaError::InvalidGoal(goal.to_string()))?;
    let qualified = FullyQualifiedClauseIndicator::new(ctx.module(), indicator);

    if ctx.callable(&qualified).is_some() {
        return Ok(Arc::new(Invocation::new(qualified, goal.clone())));
    }

    let scan: UnitOperator = Arc::new(Pipe::new(
        FactScan::new(qualified.clone(), goal.clone()),
        UnifyFilter::new(goal.clone(), true),
    ));
    if ctx.rules(&qualified).is_empty() {
        return Ok(scan);
    }
    let deduce: UnitOperator = Arc::new(Deduction::new(qualified, goal.clone()));
    Ok(Arc::new(Union::new(vec![scan, deduce])))
}
