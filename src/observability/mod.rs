//! Observability for clausedb
//!
//! Structured JSON logging with deterministic key ordering, plus scope
//! helpers for begin/complete event pairs.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on evaluation
//! 3. No async or background threads
//! 4. Deterministic output

mod logger;
mod scope;

pub use logger::{Logger, Severity};
pub use scope::ObservationScope;
