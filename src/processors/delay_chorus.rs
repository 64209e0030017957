//! Delay and chorus (§4.8): both built on a per-channel circular buffer
//! read at a time-varying tap.

use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{Processor, SignalType};
use crate::tstamp::Tstamp;
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone)]
struct RingBuffer {
    data: Vec<f32>,
    write_pos: usize,
}

impl RingBuffer {
    fn new(len: usize) -> Self {
        RingBuffer { data: vec![0.0; len.max(1)], write_pos: 0 }
    }

    fn push(&mut self, x: f32) {
        self.data[self.write_pos] = x;
        self.write_pos = (self.write_pos + 1) % self.data.len();
    }

    /// Linear-interpolated read `delay_frames` behind the write head.
    fn read(&self, delay_frames: f64) -> f32 {
        let len = self.data.len() as f64;
        let delay_frames = delay_frames.clamp(0.0, len - 1.0);
        let read_pos = (self.write_pos as f64 - delay_frames).rem_euclid(len);
        let i0 = read_pos.floor() as usize;
        let i1 = (i0 + 1) % self.data.len();
        let frac = (read_pos - read_pos.floor()) as f32;
        self.data[i0] * (1.0 - frac) + self.data[i1] * frac
    }
}

#[derive(Debug, Clone)]
pub struct Delay {
    pub delay_time: Tstamp,
    pub feedback: f64,
    pub wet: f64,
    buffers: Vec<RingBuffer>,
    max_frames: usize,
}

impl Delay {
    pub fn new(delay_time: Tstamp, feedback: f64, wet: f64, max_seconds: f64, audio_rate: f64) -> Self {
        let max_frames = (max_seconds * audio_rate) as usize + 1;
        Delay { delay_time, feedback, wet, buffers: Vec::new(), max_frames }
    }

    fn delay_frames(&self, ctx: RenderContext) -> f64 {
        self.delay_time.to_f64() * 60.0 * ctx.audio_rate / ctx.tempo.max(1.0)
    }
}

impl Processor for Delay {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let n_ch = dstate.ports[0].num_channels().max(1);
        if self.buffers.len() != n_ch {
            self.buffers = (0..n_ch).map(|_| RingBuffer::new(self.max_frames)).collect();
        }
        let delay_frames = self.delay_frames(ctx);
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        for ch in 0..n_ch {
            let ring = &mut self.buffers[ch];
            for i in start..stop {
                let dry = in_port.channel(ch)[i];
                let wet = ring.read(delay_frames);
                ring.push(dry + wet * self.feedback as f32);
                out_port.channel_mut(ch)[i] = dry * (1.0 - self.wet as f32) + wet * self.wet as f32;
            }
        }
    }
}

/// Chorus: a short modulated delay whose tap sweeps sinusoidally, grounded
/// on the same ring-buffer shape as `Delay`.
#[derive(Debug, Clone)]
pub struct Chorus {
    pub base_delay_ms: f64,
    pub depth_ms: f64,
    pub rate_hz: f64,
    pub wet: f64,
    buffers: Vec<RingBuffer>,
    phase: f64,
    max_frames: usize,
}

impl Chorus {
    pub fn new(base_delay_ms: f64, depth_ms: f64, rate_hz: f64, wet: f64, audio_rate: f64) -> Self {
        let max_frames = (((base_delay_ms + depth_ms) / 1000.0) * audio_rate) as usize + 2;
        Chorus { base_delay_ms, depth_ms, rate_hz, wet, buffers: Vec::new(), phase: 0.0, max_frames }
    }
}

impl Processor for Chorus {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let n_ch = dstate.ports[0].num_channels().max(1);
        if self.buffers.len() != n_ch {
            self.buffers = (0..n_ch).map(|_| RingBuffer::new(self.max_frames)).collect();
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let phase_step = self.rate_hz / ctx.audio_rate;
        for i in start..stop {
            let lfo = (self.phase * std::f64::consts::TAU).sin();
            let delay_ms = self.base_delay_ms + self.depth_ms * lfo;
            let delay_frames = delay_ms / 1000.0 * ctx.audio_rate;
            for ch in 0..n_ch {
                let ring = &mut self.buffers[ch];
                let dry = in_port.channel(ch)[i];
                ring.push(dry);
                let wet = ring.read(delay_frames);
                out_port.channel_mut(ch)[i] = dry * (1.0 - self.wet as f32) + wet * self.wet as f32;
            }
            self.phase += phase_step;
            if self.phase >= 1.0 {
                self.phase -= self.phase.floor();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::AudioBuffer;

    #[test]
    fn delay_tap_reads_past_input_after_fill() {
        let ctx = RenderContext::new(1000.0, 60.0);
        let mut delay = Delay::new(Tstamp::from_beats(1), 0.0, 1.0, 2.0, ctx.audio_rate);
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(1), AudioBuffer::new(1)] };
        dstate.ports[0].channel_mut(0)[0] = 1.0;
        let wbs = WorkBuffers::new();
        delay.render_mixed(&mut dstate, &wbs, 0, 1, ctx);
        // With feedback 0 and wet 1.0, a single impulse must show up later,
        // not on the same frame (the tap reads strictly behind the write head).
        assert_eq!(dstate.ports[1].channel(0)[0], 0.0);
    }
}
