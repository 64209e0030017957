//! Master playback parameters (§3, §4.7): the transport state shared by
//! every channel's rendering — tempo, position, jump bookkeeping — plus the
//! active tuning states a module's audio units retune against.
//!
//! Grounded on the teacher's `transport.rs` (the single source of truth for
//! play position and tempo that every render call reads from).

use std::collections::HashMap;

use crate::module::PatternInstanceRef;
use crate::tstamp::Tstamp;
use crate::tuning::TuningState;

/// Safety cap on chained jumps/gotos within one row evaluation (§4.7),
/// mirroring the original's goto safety counter: an authoring mistake that
/// jumps to itself must not hang the renderer.
pub const GOTO_SAFETY_MAX: u32 = 1024;

#[derive(Debug, Clone, Copy, Default)]
pub struct JumpContext {
    pub piref: PatternInstanceRef,
    pub row: Tstamp,
    pub ch_num: usize,
    pub trigger_index: usize,
    pub counter: i64,
    pub target_piref: PatternInstanceRef,
    pub target_row: Tstamp,
}

/// Tick granularity for tempo slides (§4.7, §9 "hard-coded, required
/// contract for reproducibility"): one slide step every 1/24 beat.
pub const TEMPO_SLIDE_TICK: i64 = crate::tstamp::BEAT / 24;

/// A tempo slide from `start` to `target` over `length` of musical time,
/// interpolated linearly against elapsed progress. Scenario 3 (§8) asks for
/// the midpoint of a 60→120 BPM / 4-beat slide to read ~90 BPM after 2
/// beats — the arithmetic mean, not the log-mean a literal reading of
/// "linear-in-log" would give — so linear-in-tempo is the interpretation
/// implemented here (documented as a resolved ambiguity in DESIGN.md).
#[derive(Debug, Clone)]
pub struct TempoSlider {
    pub active: bool,
    pub start: f64,
    pub target: f64,
    pub length: Tstamp,
    pub elapsed: Tstamp,
}

impl Default for TempoSlider {
    fn default() -> Self {
        TempoSlider { active: false, start: 120.0, target: 120.0, length: Tstamp::ZERO, elapsed: Tstamp::ZERO }
    }
}

impl TempoSlider {
    pub fn start(&mut self, start_tempo: f64, target: f64, length: Tstamp) {
        if length.is_zero() {
            self.active = false;
            return;
        }
        self.active = true;
        self.start = start_tempo;
        self.target = target;
        self.length = length;
        self.elapsed = Tstamp::ZERO;
    }

    /// Distance to the next 1/24-beat tick, capped at the remaining slide
    /// length, or `None` if no slide is in progress.
    pub fn dist_to_next_tick(&self) -> Option<Tstamp> {
        if !self.active {
            return None;
        }
        let remaining = self.length - self.elapsed;
        let tick = Tstamp::new(0, TEMPO_SLIDE_TICK);
        Some(if tick < remaining { tick } else { remaining })
    }

    fn tempo_at(&self, elapsed: Tstamp) -> f64 {
        let frac = (elapsed.to_f64() / self.length.to_f64()).clamp(0.0, 1.0);
        self.start + (self.target - self.start) * frac
    }
}

#[derive(Debug, Clone)]
pub struct MasterParams {
    pub playback_id: u64,
    pub cur_pos: Tstamp,
    pub cur_piref: PatternInstanceRef,
    /// Index into `module.songs` of the song currently playing.
    pub current_song: usize,
    /// Index into that song's `order_list` of the pattern instance
    /// currently playing (`cur_piref` mirrors `order_list[order_index]`).
    pub order_index: usize,
    pub cur_ch: usize,
    pub cur_trigger: usize,
    /// Frames remaining before the next row is due, carried across render
    /// calls that end mid-row.
    pub delay_left: Tstamp,
    pub tempo: f64,
    pub tempo_slider: TempoSlider,
    pub volume_slider: f64,
    pub active_jumps: Vec<JumpContext>,
    pub jump_cache: HashMap<(usize, usize), PatternInstanceRef>,
    pub tuning_states: Vec<TuningState>,
    pub do_jump: bool,
    pub do_goto: bool,
    pub stopped: bool,
}

impl MasterParams {
    pub fn new(initial_tempo: f64) -> Self {
        MasterParams {
            playback_id: 1,
            cur_pos: Tstamp::ZERO,
            cur_piref: PatternInstanceRef::default(),
            current_song: 0,
            order_index: 0,
            cur_ch: 0,
            cur_trigger: 0,
            delay_left: Tstamp::ZERO,
            tempo: initial_tempo,
            tempo_slider: TempoSlider::default(),
            volume_slider: 1.0,
            active_jumps: Vec::new(),
            jump_cache: HashMap::new(),
            tuning_states: Vec::new(),
            do_jump: false,
            do_goto: false,
            stopped: false,
        }
    }

    /// Advances an in-progress tempo slide by `d` (capped by the caller to
    /// `dist_to_next_tick`) and recomputes the instantaneous tempo.
    pub fn step_tempo_slide(&mut self, d: Tstamp) {
        if !self.tempo_slider.active {
            return;
        }
        self.tempo_slider.elapsed = self.tempo_slider.elapsed + d;
        self.tempo = self.tempo_slider.tempo_at(self.tempo_slider.elapsed);
        if self.tempo_slider.elapsed >= self.tempo_slider.length {
            self.tempo_slider.active = false;
            self.tempo = self.tempo_slider.target;
        }
    }

    pub fn request_jump(&mut self, ctx: JumpContext) {
        self.active_jumps.push(ctx);
        self.do_jump = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tempo_slide_reaches_midpoint_linearly() {
        let mut mp = MasterParams::new(60.0);
        mp.tempo_slider.start(60.0, 120.0, Tstamp::from_beats(4));
        mp.step_tempo_slide(Tstamp::from_beats(2));
        assert!((mp.tempo - 90.0).abs() < 1e-9);
    }

    #[test]
    fn tempo_slide_finishes_exactly_at_target() {
        let mut mp = MasterParams::new(60.0);
        mp.tempo_slider.start(60.0, 120.0, Tstamp::from_beats(4));
        mp.step_tempo_slide(Tstamp::from_beats(4));
        assert_eq!(mp.tempo, 120.0);
        assert!(!mp.tempo_slider.active);
    }
}
