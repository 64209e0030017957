//! Debug pulse and periodic waveform generators (§4.8).

use std::f64::consts::TAU;

use crate::audio_buffer::AudioBuffer;
use crate::device_state::RenderContext;
use crate::error::KunquatError;
use crate::processor::{Polyphony, ProcVoiceState, Processor, SignalType};
use crate::work_buffer::WorkBuffers;

/// Emits exactly one sample of amplitude 1.0 at the start of the voice's
/// life, then silence forever after — used by the test/debug audio unit
/// to verify single-pulse timing (spec concrete scenario 1).
#[derive(Debug, Clone)]
pub struct Debug {
    pub single_pulse: bool,
}

impl Processor for Debug {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::Debug { fired: false, keep_alive_stop: None }
    }

    fn render_voice(
        &self,
        state: &mut ProcVoiceState,
        _wbs: &WorkBuffers,
        out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        _ctx: RenderContext,
    ) -> usize {
        let ProcVoiceState::Debug { fired, .. } = state else {
            return start;
        };
        if *fired || start >= stop {
            return start;
        }
        out.channel_mut(0)[start] = 1.0;
        *fired = true;
        if !self.single_pulse {
            return stop;
        }
        start + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Triangle,
    Square,
    Sawtooth,
    Noise,
}

/// Periodic oscillator: maintains a per-voice phase accumulator advanced by
/// `pitch_hz / audio_rate` each frame (§4.8).
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub waveform: Waveform,
}

impl Oscillator {
    fn sample(&self, phase: f64, rng_state: &mut u64) -> f32 {
        match self.waveform {
            Waveform::Sine => (phase * TAU).sin() as f32,
            Waveform::Triangle => {
                let t = phase.fract();
                (if t < 0.5 { 4.0 * t - 1.0 } else { 3.0 - 4.0 * t }) as f32
            }
            Waveform::Square => {
                if phase.fract() < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => (2.0 * phase.fract() - 1.0) as f32,
            Waveform::Noise => {
                // Cheap xorshift so a voice-local noise oscillator doesn't
                // need to borrow the shared channel Random stream.
                let mut x = *rng_state;
                x ^= x << 13;
                x ^= x >> 7;
                x ^= x << 17;
                *rng_state = x;
                (x as f32 / u64::MAX as f32) * 2.0 - 1.0
            }
        }
    }
}

impl Processor for Oscillator {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn polyphony(&self) -> Polyphony {
        Polyphony::PerVoice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::Phase { phase: 0.0, rng_state: 0x2545F4914F6CDD1D }
    }

    fn render_voice(
        &self,
        state: &mut ProcVoiceState,
        wbs: &WorkBuffers,
        out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        ctx: RenderContext,
    ) -> usize {
        let ProcVoiceState::Phase { phase, rng_state } = state else { return stop };
        let pitch = wbs.pitch.as_slice(stop);
        let buf = out.channel_mut(0);
        for i in start..stop {
            buf[i] = self.sample(*phase, rng_state);
            let hz = pitch.get(i).copied().unwrap_or(440.0) as f64;
            *phase += hz / ctx.audio_rate;
            if *phase >= 1.0 {
                *phase -= phase.floor();
            }
        }
        stop
    }

    fn set_param(&mut self, _key: &str, _value: &serde_json::Value) -> Result<(), KunquatError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::AudioBuffer;
    use crate::device_state::RenderContext;

    #[test]
    fn single_pulse_writes_one_sample_then_silence() {
        let proc = Debug { single_pulse: true };
        let mut state = proc.create_voice_state();
        let wbs = WorkBuffers::new();
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(44100.0, 120.0);
        let new_stop = proc.render_voice(&mut state, &wbs, &mut out, 0, 128, ctx);
        assert_eq!(new_stop, 1);
        assert_eq!(out.channel(0)[0], 1.0);
        assert_eq!(out.channel(0)[1], 0.0);
    }

    #[test]
    fn sine_matches_expected_frequency() {
        let proc = Oscillator { waveform: Waveform::Sine };
        let mut state = proc.create_voice_state();
        let mut wbs = WorkBuffers::new();
        wbs.pitch.fill_const(440, 55.0);
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(220.0, 120.0);
        proc.render_voice(&mut state, &wbs, &mut out, 0, 440, ctx);
        for n in 0..440 {
            let expected = (std::f64::consts::TAU * 55.0 * n as f64 / 220.0).sin();
            assert!((out.channel(0)[n] as f64 - expected).abs() < 0.01, "n={n}");
        }
    }

    #[test]
    fn noise_rng_state_persists_across_render_calls() {
        let proc = Oscillator { waveform: Waveform::Noise };
        let mut state = proc.create_voice_state();
        let mut wbs = WorkBuffers::new();
        wbs.pitch.fill_const(64, 110.0);
        let ctx = RenderContext::new(44100.0, 120.0);

        let mut out_a = AudioBuffer::new(1);
        proc.render_voice(&mut state, &wbs, &mut out_a, 0, 32, ctx);
        let mut out_b = AudioBuffer::new(1);
        proc.render_voice(&mut state, &wbs, &mut out_b, 32, 64, ctx);

        // If the rng reset every call, the second block would repeat the
        // first sample the first block produced.
        assert_ne!(out_a.channel(0)[0], out_b.channel(0)[32]);
    }
}
