//! Public façade (§6): `render`, `get_audio`, `fire_event`, event buffer
//! readout, and cursor/error accessors — the single `Handle` design note
//! §9 asks for in place of the original's split engine/session objects.
//!
//! Grounded on the teacher's `bridge.rs` (`EngineHandle`/`SessionHandle`),
//! collapsed into one owning struct since the core has no multi-process
//! boundary to preserve.

use serde_json::Value;

use crate::error::{ErrorKind, KunquatError};
use crate::module::{Module, PatternInstanceRef};
use crate::player::Player;
use crate::tstamp::Tstamp;

pub struct Handle {
    player: Player,
    out_channels: usize,
    audio_rate: f64,
    last_rendered: usize,
    output: Vec<f32>,
    last_error: Option<KunquatError>,
}

impl Handle {
    pub fn new(module: Module, num_channels: usize, out_channels: usize, audio_rate: f64) -> Self {
        Handle {
            player: Player::new(module, num_channels, audio_rate),
            out_channels,
            audio_rate,
            last_rendered: 0,
            output: Vec::new(),
            last_error: None,
        }
    }

    /// Renders up to `nframes` and returns the number actually produced.
    pub fn render(&mut self, nframes: usize) -> usize {
        self.output.clear();
        self.output.resize(nframes * self.out_channels, 0.0);
        self.last_rendered = self.player.render(nframes, self.out_channels, &mut self.output);
        self.last_rendered
    }

    /// Returns the samples for one output channel from the last `render`
    /// call, de-interleaved.
    pub fn get_audio(&self, channel: usize) -> Result<Vec<f32>, KunquatError> {
        if channel >= self.out_channels {
            return Err(KunquatError::argument(format!("channel {channel} out of range")));
        }
        Ok((0..self.last_rendered).map(|frame| self.output[frame * self.out_channels + channel]).collect())
    }

    pub fn fire_event(&mut self, ch_num: usize, event_json: &str) -> bool {
        let Ok(parsed) = serde_json::from_str::<Value>(event_json) else {
            self.last_error = Some(KunquatError::new(ErrorKind::Argument, "malformed event JSON"));
            return false;
        };
        let Some(arr) = parsed.as_array() else {
            self.last_error = Some(KunquatError::new(ErrorKind::Argument, "event_json must be [name, arg]"));
            return false;
        };
        let Some(name) = arr.first().and_then(Value::as_str) else {
            self.last_error = Some(KunquatError::new(ErrorKind::Argument, "event_json missing name"));
            return false;
        };
        let arg = arr.get(1).cloned().unwrap_or(Value::Null);
        self.player.fire_event(ch_num, name, arg)
    }

    pub fn get_events(&self) -> Value {
        Value::Array(
            self.player
                .events()
                .iter()
                .map(|(name, arg)| Value::Array(vec![Value::String(name.clone()), arg.clone()]))
                .collect(),
        )
    }

    pub fn clear_events(&mut self) {
        self.player.clear_events();
    }

    /// Binds a channel to the audio unit that its `n+`/`hit` triggers will
    /// voice. Ordinarily set by an authored control event; exposed directly
    /// since the core does not parse instrument-routing triggers itself.
    pub fn set_channel_audio_unit(&mut self, ch_num: usize, au_index: usize) {
        if let Some(ch) = self.player.channels.get_mut(ch_num) {
            ch.au_index = Some(au_index);
        }
    }

    pub fn set_position_ns(&mut self, piref: PatternInstanceRef, ns: u64) {
        let frames = ns as f64 * self.audio_rate / 1_000_000_000.0;
        let pos = Tstamp::from_frames(frames, self.player.master.tempo, self.audio_rate);
        self.player.set_position(piref, pos);
    }

    pub fn get_position_ns(&self) -> u64 {
        let frames = self.player.master.cur_pos.to_frames(self.player.master.tempo, self.audio_rate);
        (frames * 1_000_000_000.0 / self.audio_rate) as u64
    }

    pub fn has_stopped(&self) -> bool {
        self.player.has_stopped()
    }

    pub fn get_error(&self) -> Option<&KunquatError> {
        self.last_error.as_ref()
    }

    pub fn clear_error(&mut self) {
        self.last_error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_unit::{AudioUnit, AudioUnitKind};
    use crate::connections::{Connections, ROOT_ID};
    use crate::module::{Pattern, Song};
    use crate::processor::Processor;
    use crate::processors::oscillators::Debug;
    use crate::trigger::{Column, EventType, Trigger};

    fn single_pulse_module() -> Module {
        let mut conn = Connections::new();
        conn.connect(0, 0, ROOT_ID, 0);
        let proc_table: Vec<Box<dyn Processor>> = vec![Box::new(Debug { single_pulse: true })];
        let au = AudioUnit::new(AudioUnitKind::Instrument, proc_table, conn, 2).unwrap();
        let mut module = Module::new();
        module.audio_units.push(au);
        let piref = PatternInstanceRef { pattern: 0, instance: 0 };
        let mut pattern = Pattern::new(Tstamp::from_beats(4));
        pattern.columns[0] = Column::new(vec![Trigger::new(Tstamp::ZERO, "n+", "0", EventType::Channel)]);
        module.patterns.push(pattern);
        module.songs.push(Song { order_list: vec![piref], initial_tempo: 120.0 });
        module
    }

    #[test]
    fn fire_event_parses_name_and_arg() {
        let module = single_pulse_module();
        let mut handle = Handle::new(module, 1, 2, 44100.0);
        handle.set_channel_audio_unit(0, 0);
        assert!(handle.fire_event(0, r#"["n+", 0]"#));
        assert!(handle.get_error().is_none());
    }

    #[test]
    fn fire_event_rejects_malformed_json() {
        let module = single_pulse_module();
        let mut handle = Handle::new(module, 1, 2, 44100.0);
        assert!(!handle.fire_event(0, "not json"));
        assert!(handle.get_error().is_some());
    }

    #[test]
    fn get_audio_rejects_out_of_range_channel() {
        let module = single_pulse_module();
        let mut handle = Handle::new(module, 1, 2, 44100.0);
        handle.render(16);
        assert!(handle.get_audio(5).is_err());
    }
}
