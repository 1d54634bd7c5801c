//! Per-predicate permissions
//!
//! ## Invariants
//! - No silent bypass: an unlisted predicate is denied unless the policy
//!   explicitly allows unlisted predicates
//! - Checks are pure; denial is reported by the operator that needed the
//!   access, annotated with the goal that required it

use std::collections::HashSet;

use crate::term::FullyQualifiedClauseIndicator;

/// Read/write capability checks for predicates
pub trait Authorization: Send + Sync {
    fn may_read(&self, indicator: &FullyQualifiedClauseIndicator) -> bool;

    fn may_write(&self, indicator: &FullyQualifiedClauseIndicator) -> bool;
}

/// Allows everything; for tests and trusted embedders
#[derive(Debug, Default, Clone, Copy)]
pub struct Permissive;

impl Authorization for Permissive {
    fn may_read(&self, _indicator: &FullyQualifiedClauseIndicator) -> bool {
        true
    }

    fn may_write(&self, _indicator: &FullyQualifiedClauseIndicator) -> bool {
        true
    }
}

/// Explicit allow-lists per access mode
#[derive(Debug, Default, Clone)]
pub struct StaticAuthorization {
    readable: HashSet<FullyQualifiedClauseIndicator>,
    writable: HashSet<FullyQualifiedClauseIndicator>,
    allow_unlisted: bool,
}

impl StaticAuthorization {
    /// Policy denying everything not explicitly allowed
    pub fn deny_unlisted() -> Self {
        Self::default()
    }

    /// Policy allowing everything not explicitly restricted
    pub fn allow_unlisted() -> Self {
        Self {
            allow_unlisted: true,
            ..Self::default()
        }
    }

    pub fn allow_read(mut self, indicator: FullyQualifiedClauseIndicator) -> Self {
        self.readable.insert(indicator);
        self
    }

    pub fn allow_write(mut self, indicator: FullyQualifiedClauseIndicator) -> Self {
        self.writable.insert(indicator);
        self
    }
}

impl Authorization for StaticAuthorization {
    fn may_read(&self, indicator: &FullyQualifiedClauseIndicator) -> bool {
        self.allow_unlisted || self.readable.contains(indicator)
    }

    fn may_write(&self, indicator: &FullyQualifiedClauseIndicator) -> bool {
        self.allow_unlisted || self.writable.contains(indicator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ClauseIndicator;

    fn fqi(name: &str) -> FullyQualifiedClauseIndicator {
        FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new(name, 1))
    }

    #[test]
    fn test_deny_unlisted() {
        let auth = StaticAuthorization::deny_unlisted().allow_read(fqi("p"));
        assert!(auth.may_read(&fqi("p")));
        assert!(!auth.may_write(&fqi("p")));
        assert!(!auth.may_read(&fqi("q")));
    }

    #[test]
    fn test_allow_unlisted() {
        let auth = StaticAuthorization::allow_unlisted();
        assert!(auth.may_read(&fqi("anything")));
        assert!(auth.may_write(&fqi("anything")));
    }

    #[test]
    fn test_permissive() {
        assert!(Permissive.may_read(&fqi("p")));
        assert!(Permissive.may_write(&fqi("p")));
    }
}
