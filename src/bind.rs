//! Bind table: maps an event name to a list of expansion triggers fired in
//! its place, enabling macro-like composition (§3, §4.6, glossary "Bind").
//!
//! Grounded on `original_source/`'s Input_map/Event_names shape: binds key
//! off the exact event name and expand to ordered `(name, arg_template)`
//! pairs evaluated against the firing channel's Environment.

use std::collections::HashMap;

use serde_json::Value;

/// One entry in a bind's expansion list.
#[derive(Debug, Clone)]
pub struct BindExpansion {
    pub event_name: String,
    /// Argument template: may itself contain `$var`/`$random` markers,
    /// evaluated through `Environment::evaluate` the same as any trigger.
    pub arg_template: Value,
}

#[derive(Debug, Default, Clone)]
pub struct BindTable {
    binds: HashMap<String, Vec<BindExpansion>>,
}

/// Recursion-depth guard: an authoring mistake that binds a name to itself
/// (directly or through a cycle) must not hang the renderer (§7: rendering
/// never raises, and by extension never loops forever).
pub const MAX_BIND_DEPTH: usize = 8;

impl BindTable {
    pub fn new() -> Self {
        BindTable { binds: HashMap::new() }
    }

    pub fn insert(&mut self, event_name: impl Into<String>, expansions: Vec<BindExpansion>) {
        self.binds.insert(event_name.into(), expansions);
    }

    pub fn expansions_for(&self, event_name: &str) -> Option<&[BindExpansion]> {
        self.binds.get(event_name).map(|v| v.as_slice())
    }

    /// Flattens a fired event name into the full ordered list of triggers to
    /// actually dispatch, following bind expansions recursively up to
    /// `MAX_BIND_DEPTH`. The originating event itself is always first.
    pub fn expand(&self, event_name: &str, arg: Value) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        self.expand_into(event_name, arg, 0, &mut out);
        out
    }

    fn expand_into(&self, event_name: &str, arg: Value, depth: usize, out: &mut Vec<(String, Value)>) {
        out.push((event_name.to_string(), arg));
        if depth >= MAX_BIND_DEPTH {
            return;
        }
        if let Some(expansions) = self.binds.get(event_name) {
            for exp in expansions {
                self.expand_into(&exp.event_name, exp.arg_template.clone(), depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_includes_originating_event_first() {
        let table = BindTable::new();
        let out = table.expand("n+", Value::from(0));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, "n+");
    }

    #[test]
    fn expand_flattens_one_level() {
        let mut table = BindTable::new();
        table.insert("n+", vec![BindExpansion { event_name: "cv.f".into(), arg_template: Value::from(1.0) }]);
        let out = table.expand("n+", Value::Null);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].0, "cv.f");
    }

    #[test]
    fn recursive_bind_is_depth_limited() {
        let mut table = BindTable::new();
        table.insert("a", vec![BindExpansion { event_name: "a".into(), arg_template: Value::Null }]);
        let out = table.expand("a", Value::Null);
        assert_eq!(out.len(), MAX_BIND_DEPTH + 1);
    }
}
