//! Proof-search context and authorization
//!
//! The context supplies everything an operator tree needs at run time:
//! principal identity, per-predicate permissions, the immutable rule set,
//! storage handles, native callables and the recursive `fulfill_attach`
//! entry point used by rule bodies.

mod authorization;
mod context;

pub use authorization::{Authorization, Permissive, StaticAuthorization};
pub use context::{Callable, KnowledgeBaseContext, ProofSearchContext, Rule};
