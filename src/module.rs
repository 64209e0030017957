//! Immutable module tree (§3 "Module"): everything loaded from storage and
//! never mutated by playback. Grounded on the teacher's `state/graph_def.rs`
//! (the immutable scene-graph definition loaded once, distinct from the
//! mutable runtime state layered on top of it).

use crate::audio_unit::AudioUnit;
use crate::bind::BindTable;
use crate::connections::Connections;
use crate::environment::Environment;
use crate::tstamp::Tstamp;
use crate::trigger::Column;
use crate::tuning::TuningTable;

pub const KQT_AUDIO_UNITS_MAX: usize = 256;
pub const KQT_COLUMNS_MAX: usize = 64;

#[derive(Debug, Clone)]
pub struct Pattern {
    pub length: Tstamp,
    pub columns: Vec<Column>,
}

impl Pattern {
    pub fn new(length: Tstamp) -> Self {
        Pattern { length, columns: (0..KQT_COLUMNS_MAX).map(|_| Column::new(Vec::new())).collect() }
    }
}

/// A reference to one pattern played at one point in a song's order list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatternInstanceRef {
    pub pattern: usize,
    pub instance: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Song {
    pub order_list: Vec<PatternInstanceRef>,
    pub initial_tempo: f64,
}

#[derive(Debug, Default)]
pub struct Module {
    pub audio_units: Vec<AudioUnit>,
    pub connections: Connections,
    pub songs: Vec<Song>,
    pub patterns: Vec<Pattern>,
    pub tuning_tables: Vec<TuningTable>,
    pub binds: BindTable,
    pub environment: Environment,
}

impl Module {
    pub fn new() -> Self {
        Module {
            audio_units: Vec::new(),
            connections: Connections::new(),
            songs: Vec::new(),
            patterns: Vec::new(),
            tuning_tables: Vec::new(),
            binds: BindTable::default(),
            environment: Environment::default(),
        }
    }

    pub fn pattern_instance(&self, piref: PatternInstanceRef) -> Option<&Pattern> {
        self.patterns.get(piref.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_module_has_no_audio_units() {
        let module = Module::new();
        assert!(module.audio_units.is_empty());
    }

    #[test]
    fn pattern_new_allocates_all_columns() {
        let pat = Pattern::new(Tstamp::from_beats(4));
        assert_eq!(pat.columns.len(), KQT_COLUMNS_MAX);
    }
}
