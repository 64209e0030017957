//! Second-order resonant filter (§4.8): low-pass or high-pass, coefficients
//! recomputed only when cutoff drifts by more than a quarter-tone, with a
//! short crossfade between old/new coefficient biquads to avoid clicks.

use crate::audio_buffer::AudioBuffer;
use crate::device_state::RenderContext;
use crate::processor::{ProcVoiceState, Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterType {
    LowPass,
    HighPass,
}

/// Recompute threshold: a quarter-tone in cents.
const CUTOFF_RECOMPUTE_CENTS: f64 = 25.0;
const XFADE_MS: f64 = 1.0;

#[derive(Debug, Clone, Copy)]
struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

fn design(filter_type: FilterType, cutoff_hz: f64, resonance: f64, rate: f64) -> BiquadCoeffs {
    let w0 = std::f64::consts::TAU * (cutoff_hz / rate).clamp(1e-6, 0.499);
    let q = resonance.max(0.01);
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    let (b0, b1, b2, a0, a1, a2) = match filter_type {
        FilterType::LowPass => {
            let b1 = 1.0 - cos_w0;
            let b0 = b1 / 2.0;
            let b2 = b0;
            (b0, b1, b2, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
        FilterType::HighPass => {
            let b1 = -(1.0 + cos_w0);
            let b0 = -b1 / 2.0;
            let b2 = b0;
            (b0, b1, b2, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
        }
    };
    BiquadCoeffs {
        b0: (b0 / a0) as f32,
        b1: (b1 / a0) as f32,
        b2: (b2 / a0) as f32,
        a1: (a1 / a0) as f32,
        a2: (a2 / a0) as f32,
    }
}

fn cents_diff(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return f64::MAX;
    }
    (1200.0 * (a / b).log2()).abs()
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub filter_type: FilterType,
    pub resonance: f64,
}

impl Processor for Filter {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::Filter { z: [[0.0; 2]; 2], cur_cutoff: -1.0, prev_cutoff: -1.0, xfade: 1.0 }
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
        let ProcVoiceState::Filter { z, cur_cutoff, prev_cutoff, xfade } = state else { return stop };
        let cutoff_signal = wbs.aux.as_slice(stop);
        let xfade_step = (1.0 / (XFADE_MS / 1000.0 * ctx.audio_rate)) as f32;

        let mut cur_coeffs = design(self.filter_type, (*cur_cutoff).max(20.0), self.resonance, ctx.audio_rate);
        let mut prev_coeffs = cur_coeffs;

        let buf = out.channel_mut(0);
        for i in start..stop {
            let requested = cutoff_signal.get(i).copied().unwrap_or(*cur_cutoff as f32) as f64;
            if cents_diff(requested, *cur_cutoff) > CUTOFF_RECOMPUTE_CENTS {
                *prev_cutoff = *cur_cutoff;
                prev_coeffs = cur_coeffs;
                *cur_cutoff = requested;
                cur_coeffs = design(self.filter_type, requested.max(20.0), self.resonance, ctx.audio_rate);
                *xfade = 0.0;
            }

            let x = buf[i];
            let y_new = cur_coeffs.b0 * x + z[0][0];
            z[0][0] = cur_coeffs.b1 * x - cur_coeffs.a1 * y_new + z[0][1];
            z[0][1] = cur_coeffs.b2 * x - cur_coeffs.a2 * y_new;

            let y = if *xfade < 1.0 {
                let y_old = prev_coeffs.b0 * x + z[1][0];
                z[1][0] = prev_coeffs.b1 * x - prev_coeffs.a1 * y_old + z[1][1];
                z[1][1] = prev_coeffs.b2 * x - prev_coeffs.a2 * y_old;
                *xfade = (*xfade + xfade_step).min(1.0);
                y_old * (1.0 - *xfade) + y_new * *xfade
            } else {
                y_new
            };

            buf[i] = y;
        }
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowpass_attenuates_dc_passes_silence() {
        let proc = Filter { filter_type: FilterType::LowPass, resonance: 0.707 };
        let mut state = proc.create_voice_state();
        let mut wbs = WorkBuffers::new();
        wbs.aux.fill_const(64, 1000.0);
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(44100.0, 120.0);
        proc.render_voice(&mut state, &wbs, &mut out, 0, 64, ctx);
        assert!(out.channel(0).iter().all(|v| v.abs() < 1e-6));
    }
}
