//! Small utility kernels from the L4 table: gain compensation, panning,
//! volume, force and pitch taps. None of these get detailed semantics in
//! §4.8's "selected semantics" list, so their behaviour is the obvious
//! reading of their name, resolved as an Open Question in DESIGN.md:
//! `Panning`/`Volume`/`Gaincomp` are mixed-signal audio-stream shapers;
//! `Force`/`Pitch` are voice-signal taps that expose the work-buffer
//! control signal directly as audio, for metering/testing audio units.

use crate::audio_buffer::AudioBuffer;
use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{ProcVoiceState, Processor, SignalType};
use crate::work_buffer::WorkBuffers;

/// Multiplies input by a fixed linear gain, used to compensate loudness
/// differences between processor types sharing one audio unit.
#[derive(Debug, Clone)]
pub struct Gaincomp {
    pub gain: f64,
}

impl Processor for Gaincomp {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, _ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let gain = self.gain as f32;
        for ch in 0..out_port.num_channels().min(in_port.num_channels().max(1)) {
            for i in start..stop {
                out_port.channel_mut(ch)[i] = in_port.channel(ch)[i] * gain;
            }
        }
    }
}

/// Constant-power stereo pan: `pan` in `[-1, 1]`, 0 is centered.
#[derive(Debug, Clone)]
pub struct Panning {
    pub pan: f64,
}

impl Processor for Panning {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, _ctx: RenderContext) {
        if dstate.ports.len() < 2 || dstate.ports[1].num_channels() < 2 {
            return;
        }
        let theta = (self.pan.clamp(-1.0, 1.0) + 1.0) * std::f64::consts::FRAC_PI_4;
        let (left_gain, right_gain) = (theta.cos() as f32, theta.sin() as f32);
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        for i in start..stop {
            let mono = in_port.channel(0)[i];
            out_port.channel_mut(0)[i] = mono * left_gain;
            out_port.channel_mut(1)[i] = mono * right_gain;
        }
    }
}

/// Linear volume scaler, reading a dB target converted by the caller.
#[derive(Debug, Clone)]
pub struct Volume {
    pub linear_gain: f64,
}

impl Processor for Volume {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, _ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let gain = self.linear_gain as f32;
        for ch in 0..out_port.num_channels().min(in_port.num_channels().max(1)) {
            for i in start..stop {
                out_port.channel_mut(ch)[i] = in_port.channel(ch)[i] * gain;
            }
        }
    }
}

fn tap_voice(buf: &mut AudioBuffer, wb: &crate::work_buffer::WorkBuffer, start: usize, stop: usize) -> usize {
    let src = wb.as_slice(stop);
    let dst = buf.channel_mut(0);
    for i in start..stop {
        dst[i] = src.get(i).copied().unwrap_or(0.0);
    }
    stop
}

/// Exposes the current force control signal as audio, for metering or
/// driving a downstream processor that expects an audio-rate force input.
#[derive(Debug, Clone, Default)]
pub struct Force;

impl Processor for Force {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::None
    }

    fn render_voice(
        &self,
        _state: &mut ProcVoiceState,
        wbs: &WorkBuffers,
        out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        _ctx: RenderContext,
    ) -> usize {
        tap_voice(out, &wbs.force, start, stop)
    }
}

/// Exposes the current pitch control signal (in Hz, normalized by the
/// caller if audio-rate scale is desired) as audio.
#[derive(Debug, Clone, Default)]
pub struct Pitch;

impl Processor for Pitch {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::None
    }

    fn render_voice(
        &self,
        _state: &mut ProcVoiceState,
        wbs: &WorkBuffers,
        out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        _ctx: RenderContext,
    ) -> usize {
        tap_voice(out, &wbs.pitch, start, stop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panning_center_splits_equally() {
        let mut pan = Panning { pan: 0.0 };
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(1), AudioBuffer::new(2)] };
        dstate.ports[0].channel_mut(0)[0] = 1.0;
        let ctx = RenderContext::new(44100.0, 120.0);
        let wbs = WorkBuffers::new();
        pan.render_mixed(&mut dstate, &wbs, 0, 1, ctx);
        assert!((dstate.ports[1].channel(0)[0] - dstate.ports[1].channel(1)[0]).abs() < 1e-6);
    }

    #[test]
    fn gaincomp_scales_linearly() {
        let mut gc = Gaincomp { gain: 2.0 };
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(1), AudioBuffer::new(1)] };
        dstate.ports[0].channel_mut(0)[0] = 0.5;
        let ctx = RenderContext::new(44100.0, 120.0);
        let wbs = WorkBuffers::new();
        gc.render_mixed(&mut dstate, &wbs, 0, 1, ctx);
        assert_eq!(dstate.ports[1].channel(0)[0], 1.0);
    }
}
