//! clausedb - lazy query evaluation core for a Prolog-oriented database
//!
//! The engine computes, one solution at a time, every variable binding that
//! satisfies a goal against stored facts and rules. Plans are trees of small
//! dataflow operators streaming `(bindings, payload)` rows; nothing is
//! computed before the caller pulls for it, and closing the outer stream
//! cascade-cancels every nested one.

pub mod backend;
pub mod engine;
pub mod errors;
pub mod observability;
pub mod plan;
pub mod query;
pub mod sequence;
pub mod storage;
pub mod term;
