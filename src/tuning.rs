//! Tuning table and tuning state (§4.9).

/// Reference pitch (Hz) a channel's pitch of 0 cents resolves to absent any
/// tuning table retuning. Matches the worked example in §8 scenario 2
/// (-1200 cents from the reference resolves to 55 Hz, an octave below
/// 110 Hz).
pub const DEFAULT_REF_PITCH_HZ: f64 = 110.0;

/// Converts a pitch in cents (relative to `DEFAULT_REF_PITCH_HZ`) to Hz
/// (§3, §8 scenario 2): `hz = ref_hz * 2^(cents/1200)`.
pub fn cents_to_hz(cents: f64) -> f64 {
    DEFAULT_REF_PITCH_HZ * 2f64.powf(cents / 1200.0)
}

#[derive(Debug, Clone)]
pub struct TuningTable {
    /// Scale degree, as an offset from the reference note in cents.
    pub note_offsets: Vec<f64>,
    pub ref_note: usize,
    pub ref_pitch_offset: f64,
    /// Octave width in cents (1200.0 for an equal-tempered octave).
    pub octave_width: f64,
}

impl TuningTable {
    pub fn new(note_offsets: Vec<f64>, ref_note: usize, ref_pitch_offset: f64, octave_width: f64) -> Self {
        TuningTable { note_offsets, ref_note, ref_pitch_offset, octave_width }
    }

    pub fn degree_count(&self) -> usize {
        self.note_offsets.len()
    }
}

/// Wraps a table with mutable retuning state: a global offset, a target
/// reference pitch, and an estimate of how far the last retune drifted the
/// tuning (useful for UI feedback, not used in rendering math itself).
#[derive(Debug, Clone)]
pub struct TuningState {
    pub table: TuningTable,
    pub global_offset: f64,
    pub ref_pitch: f64,
    pub drift_estimate: f64,
}

impl TuningState {
    pub fn new(table: TuningTable) -> Self {
        let ref_pitch = table.ref_pitch_offset;
        TuningState { table, global_offset: 0.0, ref_pitch, drift_estimate: 0.0 }
    }

    /// Quantises `cents` (an equal-tempered pitch in cents relative to the
    /// reference) to the nearest scale degree, applies the configured
    /// offsets, and returns the retuned pitch in cents.
    pub fn get_retuned_pitch(&self, cents: f64) -> f64 {
        let degrees = self.table.degree_count().max(1) as f64;
        let cents_per_degree = self.table.octave_width / degrees;
        if cents_per_degree <= 0.0 {
            return cents + self.global_offset;
        }
        let degree_f = (cents - self.ref_pitch) / cents_per_degree;
        let degree = degree_f.round() as i64;
        let wrapped = degree.rem_euclid(self.table.degree_count().max(1) as i64) as usize;
        let octave = (degree as f64 / degrees).floor();
        let base = self.ref_pitch + octave * self.table.octave_width;
        base + self.table.note_offsets[wrapped] + self.global_offset
    }

    /// Shifts all degrees so `new_ref` lies where the original reference
    /// pitch was, keeping `fixed_degree` invariant.
    pub fn retune(&mut self, new_ref: f64, fixed_degree: usize) {
        if fixed_degree >= self.table.note_offsets.len() {
            return;
        }
        let old_fixed = self.table.note_offsets[fixed_degree];
        let shift = new_ref - self.ref_pitch - old_fixed;
        self.drift_estimate = shift;
        self.ref_pitch = new_ref;
        for v in &mut self.table.note_offsets {
            *v -= shift;
        }
    }

    /// Copies degree offsets from another table, provided they share a
    /// degree count.
    pub fn retune_with_source(&mut self, other: &TuningTable) -> bool {
        if other.degree_count() != self.table.degree_count() {
            return false;
        }
        self.table.note_offsets = other.note_offsets.clone();
        true
    }
}
