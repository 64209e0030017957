//! Per-channel playback/control state (§3 "Channel state").
//!
//! The teacher has no direct analogue (its `state/session.rs` mirrors
//! transport position for the UI, not per-channel musical control state);
//! grounded on spec §3 plus the glossary's carry-flag/foreground-voice
//! description, shaped the way `state/session.rs` shapes its own state
//! struct (plain fields, no internal invalidation machinery).

use std::collections::HashMap;

use crate::environment::EnvValue;
use crate::random::Random;
use crate::voice::VoiceHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameCategory {
    ControlVar,
    Stream,
    Expression,
    DeviceEvent,
}

#[derive(Debug, Clone, Default)]
pub struct CarryFlags {
    flags: HashMap<NameCategory, bool>,
}

impl CarryFlags {
    pub fn set(&mut self, cat: NameCategory, on: bool) {
        self.flags.insert(cat, on);
    }

    pub fn get(&self, cat: NameCategory) -> bool {
        self.flags.get(&cat).copied().unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArpeggioState {
    pub active: bool,
    /// Pitch (cents) the arpeggio cycles around, captured from
    /// `Channel::pitch_cents` when the arpeggio is switched on.
    pub ref_pitch: f64,
    pub tone_offsets: Vec<f64>,
    pub speed_hz: f64,
    index: usize,
    phase: f64,
}

impl ArpeggioState {
    /// Resets the tone cursor and phase, used whenever the tone offsets or
    /// the arpeggio itself is (re)started so it always begins on the first
    /// tone.
    pub fn reset_phase(&mut self) {
        self.index = 0;
        self.phase = 0.0;
    }

    /// Advances `frames` worth of time at `audio_rate` and returns the
    /// pitch offset (cents, relative to `ref_pitch`) of the tone currently
    /// selected. A no-op, returning `0.0`, while inactive or with no tones
    /// to cycle through.
    pub fn step(&mut self, frames: usize, audio_rate: f64) -> f64 {
        if !self.active || self.tone_offsets.is_empty() || self.speed_hz <= 0.0 {
            return 0.0;
        }
        self.phase += self.speed_hz * frames as f64 / audio_rate;
        let steps = self.phase.floor();
        if steps > 0.0 {
            self.index = (self.index + steps as usize) % self.tone_offsets.len();
            self.phase -= steps;
        }
        self.index %= self.tone_offsets.len();
        self.tone_offsets[self.index]
    }
}

/// Sinusoidal pitch modulation (§2 L7), stepped once per channel per block.
#[derive(Debug, Clone, Default)]
pub struct VibratoState {
    pub active: bool,
    pub depth_cents: f64,
    pub speed_hz: f64,
    phase: f64,
}

impl VibratoState {
    /// Returns the pitch offset (cents) to add this block; `0.0` while
    /// inactive.
    pub fn step(&mut self, frames: usize, audio_rate: f64) -> f64 {
        if !self.active || self.speed_hz <= 0.0 {
            return 0.0;
        }
        let value = self.depth_cents * (self.phase * std::f64::consts::TAU).sin();
        self.phase += self.speed_hz * frames as f64 / audio_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        value
    }
}

/// Sinusoidal amplitude modulation (§2 L7), stepped once per channel per
/// block. `depth` is a fraction of force in `[0, 1]`: the returned gain
/// multiplier ranges over `[1 - depth, 1]`.
#[derive(Debug, Clone, Default)]
pub struct TremoloState {
    pub active: bool,
    pub depth: f64,
    pub speed_hz: f64,
    phase: f64,
}

impl TremoloState {
    /// Returns the gain multiplier to apply this block; `1.0` while
    /// inactive.
    pub fn step(&mut self, frames: usize, audio_rate: f64) -> f64 {
        if !self.active || self.speed_hz <= 0.0 {
            return 1.0;
        }
        let osc = (self.phase * std::f64::consts::TAU).sin();
        let mult = 1.0 - self.depth.clamp(0.0, 1.0) * (0.5 - 0.5 * osc);
        self.phase += self.speed_hz * frames as f64 / audio_rate;
        if self.phase >= 1.0 {
            self.phase -= self.phase.floor();
        }
        mult
    }
}

#[derive(Debug, Clone)]
pub struct Channel {
    pub index: usize,
    /// Index of the audio unit currently bound to this channel's input.
    pub au_index: Option<usize>,
    pub active_names: HashMap<NameCategory, String>,
    pub carry: CarryFlags,
    pub arpeggio: ArpeggioState,
    pub vibrato: VibratoState,
    pub tremolo: TremoloState,
    /// One handle per processor slot in the bound audio unit that currently
    /// holds this channel's foreground voice for that slot.
    pub fg_voices: HashMap<usize, VoiceHandle>,
    pub note_off_pending: bool,
    pub control_vars: HashMap<String, EnvValue>,
    /// Values set by `.s`, keyed by the currently active stream name (§4.8
    /// "Stream"): consulted by whichever processor names itself as that
    /// stream's target in the bound audio unit's stream map.
    pub stream_values: HashMap<String, f64>,
    pub rng: Random,
    pub force: f64,
    pub pitch_cents: f64,
    pub filter_cutoff_cents: f64,
    pub pan: f64,
    pub volume: f64,
    /// Group id shared by every voice of the note currently sounding on
    /// this channel, if any (§3 "Voice group").
    pub current_group_id: Option<u64>,
}

impl Channel {
    pub fn new(index: usize, seed: u64) -> Self {
        Channel {
            index,
            au_index: None,
            active_names: HashMap::new(),
            carry: CarryFlags::default(),
            arpeggio: ArpeggioState::default(),
            vibrato: VibratoState::default(),
            tremolo: TremoloState::default(),
            fg_voices: HashMap::new(),
            note_off_pending: false,
            control_vars: HashMap::new(),
            stream_values: HashMap::new(),
            rng: Random::new(seed),
            force: 1.0,
            pitch_cents: 0.0,
            filter_cutoff_cents: 0.0,
            pan: 0.0,
            volume: 1.0,
            current_group_id: None,
        }
    }

    pub fn active_name(&self, cat: NameCategory) -> Option<&str> {
        self.active_names.get(&cat).map(|s| s.as_str())
    }

    pub fn set_active_name(&mut self, cat: NameCategory, name: impl Into<String>) {
        self.active_names.insert(cat, name.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn carry_flags_default_to_off() {
        let flags = CarryFlags::default();
        assert!(!flags.get(NameCategory::Stream));
    }

    #[test]
    fn active_name_round_trips() {
        let mut ch = Channel::new(0, 1);
        ch.set_active_name(NameCategory::Stream, "cutoff");
        assert_eq!(ch.active_name(NameCategory::Stream), Some("cutoff"));
    }

    #[test]
    fn arpeggio_cycles_through_tones_over_time() {
        let mut arp = ArpeggioState { active: true, speed_hz: 10.0, tone_offsets: vec![0.0, 400.0, 700.0], ..Default::default() };
        assert_eq!(arp.step(0, 44100.0), 0.0);
        // 10 Hz over 4410 frames at 44100 Hz is exactly one full step.
        assert_eq!(arp.step(4410, 44100.0), 400.0);
        assert_eq!(arp.step(4410, 44100.0), 700.0);
        assert_eq!(arp.step(4410, 44100.0), 0.0);
    }

    #[test]
    fn arpeggio_inactive_never_advances() {
        let mut arp = ArpeggioState { active: false, speed_hz: 10.0, tone_offsets: vec![0.0, 400.0], ..Default::default() };
        assert_eq!(arp.step(44100, 44100.0), 0.0);
    }

    #[test]
    fn vibrato_inactive_returns_zero() {
        let mut vib = VibratoState::default();
        assert_eq!(vib.step(512, 44100.0), 0.0);
    }

    #[test]
    fn vibrato_oscillates_within_depth() {
        let mut vib = VibratoState { active: true, depth_cents: 50.0, speed_hz: 5.0, ..Default::default() };
        for _ in 0..64 {
            let v = vib.step(64, 44100.0);
            assert!(v.abs() <= 50.0 + 1e-9);
        }
    }

    #[test]
    fn tremolo_inactive_returns_unity_gain() {
        let mut trem = TremoloState::default();
        assert_eq!(trem.step(512, 44100.0), 1.0);
    }

    #[test]
    fn tremolo_multiplier_stays_within_depth_band() {
        let mut trem = TremoloState { active: true, depth: 0.4, speed_hz: 5.0, ..Default::default() };
        for _ in 0..64 {
            let m = trem.step(64, 44100.0);
            assert!((0.6..=1.0 + 1e-9).contains(&m));
        }
    }
}
