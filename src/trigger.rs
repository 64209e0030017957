//! Trigger value type (§3): `(position, event_name, raw_arg_json, type)`.

use serde_json::Value;

use crate::tstamp::Tstamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    Control,
    General,
    Master,
    Channel,
    Au,
}

#[derive(Debug, Clone)]
pub struct Trigger {
    pub position: Tstamp,
    /// Event name, at most 12 characters per the module format.
    pub event_name: String,
    /// Unparsed argument; re-parsed and expression-evaluated on every fire
    /// rather than once at load (§3), since it may reference environment
    /// or random values.
    pub raw_arg_json: String,
    pub event_type: EventType,
}

impl Trigger {
    pub fn new(position: Tstamp, event_name: impl Into<String>, raw_arg_json: impl Into<String>, event_type: EventType) -> Self {
        Trigger { position, event_name: event_name.into(), raw_arg_json: raw_arg_json.into(), event_type }
    }

    /// Parses `raw_arg_json` into a JSON value. A parse failure is not
    /// fatal to rendering (§7): the caller records a no-op and moves on.
    pub fn parse_arg(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.raw_arg_json)
    }
}

/// A sorted run of triggers within one pattern column. Column invariant
/// (§3): sorted by position, ties preserve insertion order — `Vec` already
/// gives us stable ordering as long as insertion sorts with a stable sort.
#[derive(Debug, Clone, Default)]
pub struct Column {
    triggers: Vec<Trigger>,
}

impl Column {
    pub fn new(mut triggers: Vec<Trigger>) -> Self {
        triggers.sort_by_key(|t| t.position);
        Column { triggers }
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Index of the first trigger at or after `from`, used by the column
    /// iterator to find the next breakpoint.
    pub fn next_at_or_after(&self, from: Tstamp) -> Option<usize> {
        self.triggers.iter().position(|t| t.position >= from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_sorts_by_position_stably() {
        let col = Column::new(vec![
            Trigger::new(Tstamp::from_beats(1), "n+", "0", EventType::Channel),
            Trigger::new(Tstamp::from_beats(0), "n-", "null", EventType::Channel),
        ]);
        assert_eq!(col.triggers()[0].event_name, "n-");
    }

    #[test]
    fn parse_arg_rejects_malformed_json() {
        let t = Trigger::new(Tstamp::ZERO, "n+", "{not json", EventType::Channel);
        assert!(t.parse_arg().is_err());
    }
}
