//! Column iterator (§4.2): walks one pattern column's sorted triggers in
//! position order, tracking how far playback has advanced within the
//! column so the master loop can ask "what's next" without re-scanning.
//!
//! Grounded on the teacher's `scheduler.rs` (a cursor over a sorted event
//! list, advanced one step per tick).

use crate::module::{Pattern, PatternInstanceRef};
use crate::trigger::Trigger;
use crate::tstamp::Tstamp;

#[derive(Debug, Clone)]
pub struct ColumnIterator {
    pub piref: PatternInstanceRef,
    pub column_index: usize,
    pub pos: Tstamp,
    /// Index of the next not-yet-returned trigger, or the column's length
    /// once exhausted.
    next_index: usize,
    /// Set once `get_trigger_row` has been called for the current `pos`,
    /// cleared by `clear_returned_status` — prevents re-firing the same row
    /// when the master loop revisits a position after a jump.
    returned: bool,
}

impl ColumnIterator {
    pub fn init(piref: PatternInstanceRef, column_index: usize) -> Self {
        ColumnIterator { piref, column_index, pos: Tstamp::ZERO, next_index: 0, returned: false }
    }

    pub fn reset(&mut self, pos: Tstamp, pattern: &Pattern) {
        self.pos = pos;
        self.returned = false;
        self.next_index = pattern
            .columns
            .get(self.column_index)
            .and_then(|c| c.next_at_or_after(pos))
            .unwrap_or(pattern.columns.get(self.column_index).map(|c| c.triggers().len()).unwrap_or(0));
    }

    /// Returns the trigger sitting at the iterator's current position, if
    /// any and if it hasn't already been returned this visit.
    pub fn get_trigger_row<'a>(&mut self, pattern: &'a Pattern) -> Option<&'a Trigger> {
        if self.returned {
            return None;
        }
        let col = pattern.columns.get(self.column_index)?;
        let trigger = col.triggers().get(self.next_index)?;
        if trigger.position != self.pos {
            return None;
        }
        self.returned = true;
        Some(trigger)
    }

    pub fn clear_returned_status(&mut self) {
        self.returned = false;
    }

    /// Distance from the current position to the next trigger in this
    /// column, or `None` if the column has no more triggers.
    pub fn get_local_bp_dist(&self, pattern: &Pattern) -> Option<Tstamp> {
        let col = pattern.columns.get(self.column_index)?;
        let idx = if self.returned { self.next_index + 1 } else { self.next_index };
        col.triggers().get(idx).map(|t| t.position - self.pos)
    }

    pub fn advance(&mut self, dist: Tstamp, pattern: &Pattern) {
        self.pos = self.pos + dist;
        self.returned = false;
        if let Some(col) = pattern.columns.get(self.column_index) {
            while self.next_index < col.triggers().len() && col.triggers()[self.next_index].position < self.pos {
                self.next_index += 1;
            }
        }
    }

    pub fn has_finished(&self, pattern: &Pattern) -> bool {
        self.pos >= pattern.length
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trigger::{Column, EventType};

    fn pattern_with_one_trigger() -> Pattern {
        let mut pat = Pattern::new(Tstamp::from_beats(4));
        pat.columns[0] = Column::new(vec![Trigger::new(Tstamp::from_beats(1), "n+", "0", EventType::Channel)]);
        pat
    }

    #[test]
    fn returns_trigger_only_at_exact_position() {
        let pat = pattern_with_one_trigger();
        let mut it = ColumnIterator::init(PatternInstanceRef { pattern: 0, instance: 0 }, 0);
        it.reset(Tstamp::from_beats(1), &pat);
        assert!(it.get_trigger_row(&pat).is_some());
        assert!(it.get_trigger_row(&pat).is_none());
    }

    #[test]
    fn clear_returned_status_allows_refire() {
        let pat = pattern_with_one_trigger();
        let mut it = ColumnIterator::init(PatternInstanceRef { pattern: 0, instance: 0 }, 0);
        it.reset(Tstamp::from_beats(1), &pat);
        assert!(it.get_trigger_row(&pat).is_some());
        it.clear_returned_status();
        assert!(it.get_trigger_row(&pat).is_some());
    }

    #[test]
    fn has_finished_at_pattern_end() {
        let pat = pattern_with_one_trigger();
        let mut it = ColumnIterator::init(PatternInstanceRef { pattern: 0, instance: 0 }, 0);
        it.reset(Tstamp::from_beats(4), &pat);
        assert!(it.has_finished(&pat));
    }
}
