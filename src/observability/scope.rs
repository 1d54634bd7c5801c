//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` when `complete()` is called
//! - Logs `{name}_ABORTED` on drop if not completed

use std::cell::Cell;

use super::logger::Logger;

/// A scope that logs paired lifecycle events
pub struct ObservationScope<'a> {
    name: &'a str,
    completed: Cell<bool>,
    fields: Vec<(&'a str, String)>,
}

impl<'a> ObservationScope<'a> {
    /// Create a new observation scope, logging `{name}_BEGIN` immediately
    pub fn new(name: &'a str) -> Self {
        Self::with_fields(name, &[])
    }

    /// Create a scope carrying fields repeated on every event
    pub fn with_fields(name: &'a str, fields: &[(&'a str, &str)]) -> Self {
        let scope = Self {
            name,
            completed: Cell::new(false),
            fields: fields.iter().map(|(k, v)| (*k, v.to_string())).collect(),
        };
        scope.emit("BEGIN");
        scope
    }

    /// Marks the scope successful, logging `{name}_COMPLETE`
    pub fn complete(self) {
        self.completed.set(true);
        self.emit("COMPLETE");
    }

    fn emit(&self, suffix: &str) {
        let event = format!("{}_{}", self.name, suffix);
        let refs: Vec<(&str, &str)> = self
            .fields
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();
        Logger::info(&event, &refs);
    }
}

impl Drop for ObservationScope<'_> {
    fn drop(&mut self) {
        if !self.completed.get() {
            let event = format!("{}_ABORTED", self.name);
            let refs: Vec<(&str, &str)> = self
                .fields
                .iter()
                .map(|(k, v)| (*k, v.as_str()))
                .collect();
            Logger::warn(&event, &refs);
        }
    }
}
