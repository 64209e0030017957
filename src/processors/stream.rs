//! Stream processor (§4.8): a control-rate signal source with an initial
//! value, a linear slider target, and a sinusoidal LFO, consumed by a
//! target processor named in the owning audio unit's stream map.

use crate::audio_buffer::AudioBuffer;
use crate::device_state::RenderContext;
use crate::processor::{ProcVoiceState, Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone)]
pub struct Stream {
    pub value: f64,
    pub slide_target: Option<f64>,
    pub slide_per_frame: f64,
    pub lfo_speed_hz: f64,
    pub lfo_depth: f64,
    lfo_phase: f64,
}

impl Stream {
    pub fn new(init_value: f64) -> Self {
        Stream { value: init_value, slide_target: None, slide_per_frame: 0.0, lfo_speed_hz: 0.0, lfo_depth: 0.0, lfo_phase: 0.0 }
    }

    pub fn set_value(&mut self, v: f64) {
        self.value = v;
        self.slide_target = None;
    }

    pub fn slide_to(&mut self, target: f64, frames: f64) {
        if frames <= 0.0 {
            self.value = target;
            self.slide_target = None;
            return;
        }
        self.slide_target = Some(target);
        self.slide_per_frame = (target - self.value) / frames;
    }

    /// Advances one frame and returns the control value to route to the
    /// target processor.
    pub fn step(&mut self, ctx: RenderContext) -> f64 {
        if let Some(target) = self.slide_target {
            self.value += self.slide_per_frame;
            if (self.slide_per_frame >= 0.0 && self.value >= target)
                || (self.slide_per_frame < 0.0 && self.value <= target)
            {
                self.value = target;
                self.slide_target = None;
            }
        }
        let lfo = self.lfo_depth * (self.lfo_phase * std::f64::consts::TAU).sin();
        self.lfo_phase += self.lfo_speed_hz / ctx.audio_rate;
        if self.lfo_phase >= 1.0 {
            self.lfo_phase -= self.lfo_phase.floor();
        }
        self.value + lfo
    }
}

impl Processor for Stream {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::None
    }

    /// Taps the currently held value as a constant-amplitude signal. The
    /// value itself is updated by `receive_stream`, called from the owning
    /// audio unit's `render_voice_chain` before the chain renders — not
    /// here, since this takes `&self` and can't mutate the slide/LFO state
    /// `step`/`slide_to` carry.
    fn render_voice(
        &self,
        _state: &mut ProcVoiceState,
        _wbs: &WorkBuffers,
        out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        _ctx: RenderContext,
    ) -> usize {
        let v = self.value as f32;
        for sample in &mut out.channel_mut(0)[start..stop] {
            *sample = v;
        }
        stop
    }

    fn receive_stream(&mut self, value: f64) {
        self.set_value(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slide_reaches_target_exactly() {
        let mut s = Stream::new(0.0);
        let ctx = RenderContext::new(10.0, 120.0);
        s.slide_to(10.0, 10.0);
        for _ in 0..10 {
            s.step(ctx);
        }
        assert!((s.value - 10.0).abs() < 1e-9);
    }

    #[test]
    fn set_value_cancels_active_slide() {
        let mut s = Stream::new(0.0);
        s.slide_to(10.0, 100.0);
        s.set_value(5.0);
        assert!(s.slide_target.is_none());
        assert_eq!(s.value, 5.0);
    }

    #[test]
    fn receive_stream_is_visible_on_next_render_voice_call() {
        let mut s = Stream::new(0.0);
        let mut state = s.create_voice_state();
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(44100.0, 120.0);
        s.receive_stream(42.0);
        s.render_voice(&mut state, &WorkBuffers::new(), &mut out, 0, 8, ctx);
        assert_eq!(out.channel(0)[0], 42.0);
    }
}
