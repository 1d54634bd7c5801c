//! Knowledge-base context
//!
//! ## Invariants
//! - The rule set and schema handles are fixed at construction; proof
//!   search never observes a predicate changing shape mid-query
//! - `fulfill_attach` plans lazily: planning errors surface as an already
//!   failed sequence, never as a panic
//! - Rules for one predicate are kept in program order; solution order
//!   follows it

use std::collections::HashMap;
use std::sync::Arc;

use crate::errors::SchemaError;
use crate::observability::{Logger, Severity};
use crate::plan::plan_query;
use crate::query::Query;
use crate::sequence::{LazySequence, Principal};
use crate::storage::{FactIndex, FactStore};
use crate::term::{Bindings, ClauseIndicator, FullyQualifiedClauseIndicator, Term};

use super::authorization::{Authorization, Permissive};

/// One deduction rule: `head :- body`
///
/// A stored fact is the degenerate rule whose body is `true`; contexts are
/// free to keep ground knowledge either here or in a fact store.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    head: Term,
    body: Query,
    indicator: ClauseIndicator,
}

impl Rule {
    /// Builds a rule, rejecting heads that do not name a predicate
    pub fn new(head: Term, body: Query) -> Result<Self, SchemaError> {
        let indicator =
            ClauseIndicator::of(&head).ok_or_else(|| SchemaError::InvalidGoal(head.to_string()))?;
        Ok(Self {
            head,
            body,
            indicator,
        })
    }

    /// A rule with a trivially true body
    pub fn fact(head: Term) -> Result<Self, SchemaError> {
        Self::new(head, Query::truth())
    }

    pub fn head(&self) -> &Term {
        &self.head
    }

    pub fn body(&self) -> &Query {
        &self.body
    }

    pub fn indicator(&self) -> &ClauseIndicator {
        &self.indicator
    }
}

/// Natively-implemented predicate
///
/// A callable receives the goal with the caller's environment already
/// applied and yields binding sets for the goal's variables.
pub trait Callable: Send + Sync {
    fn call(
        &self,
        ctx: Arc<dyn ProofSearchContext>,
        principal: Principal,
        goal: Term,
    ) -> LazySequence<Bindings>;
}

/// Everything proof search needs from its surroundings
///
/// Operators hold the context behind an `Arc` so that recursively spawned
/// sequences can outlive the frame that created them.
pub trait ProofSearchContext: Send + Sync {
    /// Principal all storage and permission checks run as
    fn principal(&self) -> Principal;

    /// Module unqualified goals resolve in
    fn module(&self) -> &str;

    fn authorization(&self) -> &dyn Authorization;

    /// Rules for a predicate, in program order
    fn rules(&self, indicator: &FullyQualifiedClauseIndicator) -> Vec<Rule>;

    fn fact_store(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn FactStore>>;

    fn fact_index(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn FactIndex>>;

    fn callable(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn Callable>>;

    /// Plans `query` and runs it with `env` attached to the single input
    /// row. This is the recursion point rule bodies re-enter through.
    fn fulfill_attach(self: Arc<Self>, query: Query, env: Bindings) -> LazySequence<Bindings>;
}

/// Immutable context over registered rules, stores, indices and callables
pub struct KnowledgeBaseContext {
    principal: Principal,
    module: String,
    authorization: Arc<dyn Authorization>,
    rules: HashMap<FullyQualifiedClauseIndicator, Vec<Rule>>,
    stores: HashMap<FullyQualifiedClauseIndicator, Arc<dyn FactStore>>,
    indices: HashMap<FullyQualifiedClauseIndicator, Arc<dyn FactIndex>>,
    callables: HashMap<FullyQualifiedClauseIndicator, Arc<dyn Callable>>,
}

impl KnowledgeBaseContext {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            principal: Principal::new(),
            module: module.into(),
            authorization: Arc::new(Permissive),
            rules: HashMap::new(),
            stores: HashMap::new(),
            indices: HashMap::new(),
            callables: HashMap::new(),
        }
    }

    pub fn with_principal(mut self, principal: Principal) -> Self {
        self.principal = principal;
        self
    }

    pub fn with_authorization(mut self, authorization: Arc<dyn Authorization>) -> Self {
        self.authorization = authorization;
        self
    }

    /// Registers a rule under its head's indicator, qualified with the
    /// context module. Program order is registration order.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        let qualified = self.qualify(rule.indicator().clone());
        self.rules.entry(qualified).or_default().push(rule);
        self
    }

    pub fn with_fact_store(
        mut self,
        indicator: ClauseIndicator,
        store: Arc<dyn FactStore>,
    ) -> Self {
        let qualified = self.qualify(indicator);
        self.stores.insert(qualified, store);
        self
    }

    pub fn with_fact_index(
        mut self,
        indicator: ClauseIndicator,
        index: Arc<dyn FactIndex>,
    ) -> Self {
        let qualified = self.qualify(indicator);
        self.indices.insert(qualified, index);
        self
    }

    pub fn with_callable(
        mut self,
        indicator: ClauseIndicator,
        callable: Arc<dyn Callable>,
    ) -> Self {
        let qualified = self.qualify(indicator);
        self.callables.insert(qualified, callable);
        self
    }

    /// Qualifies an indicator with this context's module
    pub fn qualify(&self, indicator: ClauseIndicator) -> FullyQualifiedClauseIndicator {
        FullyQualifiedClauseIndicator::new(self.module.clone(), indicator)
    }

    /// Convenience entry point: solves a query under an empty environment
    pub fn fulfill(self: Arc<Self>, query: Query) -> LazySequence<Bindings> {
        self.fulfill_attach(query, Bindings::new())
    }
}

impl ProofSearchContext for KnowledgeBaseContext {
    fn principal(&self) -> Principal {
        self.principal
    }

    fn module(&self) -> &str {
        &self.module
    }

    fn authorization(&self) -> &dyn Authorization {
        self.authorization.as_ref()
    }

    fn rules(&self, indicator: &FullyQualifiedClauseIndicator) -> Vec<Rule> {
        self.rules.get(indicator).cloned().unwrap_or_default()
    }

    fn fact_store(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn FactStore>> {
        self.stores.get(indicator).cloned()
    }

    fn fact_index(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn FactIndex>> {
        self.indices.get(indicator).cloned()
    }

    fn callable(&self, indicator: &FullyQualifiedClauseIndicator) -> Option<Arc<dyn Callable>> {
        self.callables.get(indicator).cloned()
    }

    fn fulfill_attach(self: Arc<Self>, query: Query, env: Bindings) -> LazySequence<Bindings> {
        let principal = self.principal;
        Logger::log(
            Severity::Trace,
            "QUERY_PLANNED",
            &[
                ("principal", &principal.to_string()),
                ("query", &query.to_string()),
            ],
        );
        let ctx: Arc<dyn ProofSearchContext> = self;
        match plan_query(ctx.as_ref(), &query) {
            Ok(plan) => {
                let input = LazySequence::once(principal, (env, ()));
                plan.invoke(ctx, input).map(|(solution, ())| solution)
            }
            Err(error) => LazySequence::failed(principal, error),
        }
    }
}
