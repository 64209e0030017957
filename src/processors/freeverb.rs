//! Freeverb-style Schroeder reverb (§4.8): 8 parallel combs + 4 series
//! allpasses per channel. The teacher's own reverb (`nodes/effects.rs`) uses
//! a simplified 4-comb/2-allpass topology; `original_source/` (the real
//! Freeverb-derived implementation) uses the full 8/4 topology, which this
//! kernel follows instead, per SPEC_FULL's instruction to resolve silent
//! ambiguity from the original source.

use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{Processor, SignalType};
use crate::work_buffer::WorkBuffers;

const COMB_TUNINGS_L: [usize; 8] = [1116, 1188, 1277, 1356, 1422, 1491, 1557, 1617];
const ALLPASS_TUNINGS_L: [usize; 4] = [556, 441, 341, 225];
/// Stereo spread applied to the right channel's buffer sizes, matching the
/// classic Freeverb constant.
const STEREO_SPREAD: usize = 23;

#[derive(Debug, Clone)]
struct Comb {
    buffer: Vec<f32>,
    pos: usize,
    filter_store: f32,
    feedback: f32,
    damp1: f32,
    damp2: f32,
}

impl Comb {
    fn new(size: usize, feedback: f32, damp: f32) -> Self {
        Comb { buffer: vec![0.0; size], pos: 0, filter_store: 0.0, feedback, damp1: damp, damp2: 1.0 - damp }
    }

    fn process(&mut self, input: f32) -> f32 {
        let output = self.buffer[self.pos];
        self.filter_store = output * self.damp2 + self.filter_store * self.damp1;
        self.buffer[self.pos] = input + self.filter_store * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct Allpass {
    buffer: Vec<f32>,
    pos: usize,
    feedback: f32,
}

impl Allpass {
    fn new(size: usize, feedback: f32) -> Self {
        Allpass { buffer: vec![0.0; size], pos: 0, feedback }
    }

    fn process(&mut self, input: f32) -> f32 {
        let bufout = self.buffer[self.pos];
        let output = -input + bufout;
        self.buffer[self.pos] = input + bufout * self.feedback;
        self.pos = (self.pos + 1) % self.buffer.len();
        output
    }
}

#[derive(Debug, Clone)]
struct ChannelChain {
    combs: Vec<Comb>,
    allpasses: Vec<Allpass>,
}

impl ChannelChain {
    fn new(spread: usize, feedback: f32, damp: f32) -> Self {
        let combs = COMB_TUNINGS_L.iter().map(|&t| Comb::new(t + spread, feedback, damp)).collect();
        let allpasses = ALLPASS_TUNINGS_L.iter().map(|&t| Allpass::new(t + spread, 0.5)).collect();
        ChannelChain { combs, allpasses }
    }

    fn process(&mut self, input: f32) -> f32 {
        let mut out = 0.0;
        for comb in &mut self.combs {
            out += comb.process(input);
        }
        for ap in &mut self.allpasses {
            out = ap.process(out);
        }
        out
    }
}

#[derive(Debug, Clone)]
pub struct Freeverb {
    pub room_size: f64,
    pub damping: f64,
    pub wet: f64,
    left: ChannelChain,
    right: ChannelChain,
}

impl Freeverb {
    pub fn new(room_size: f64, damping: f64, wet: f64) -> Self {
        let feedback = (0.28 + room_size.clamp(0.0, 1.0) * 0.7) as f32;
        let damp = (damping.clamp(0.0, 1.0) * 0.4) as f32;
        Freeverb {
            room_size,
            damping,
            wet,
            left: ChannelChain::new(0, feedback, damp),
            right: ChannelChain::new(STEREO_SPREAD, feedback, damp),
        }
    }
}

impl Processor for Freeverb {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, _ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let n_out_ch = out_port.num_channels();
        for i in start..stop {
            let mono_in = if in_port.num_channels() >= 2 {
                (in_port.channel(0)[i] + in_port.channel(1)[i]) * 0.5
            } else {
                in_port.channel(0)[i]
            };
            let wet_l = self.left.process(mono_in);
            let wet_r = self.right.process(mono_in);
            let dry = mono_in * (1.0 - self.wet as f32);
            if n_out_ch >= 2 {
                out_port.channel_mut(0)[i] = dry + wet_l * self.wet as f32;
                out_port.channel_mut(1)[i] = dry + wet_r * self.wet as f32;
            } else {
                out_port.channel_mut(0)[i] = dry + (wet_l + wet_r) * 0.5 * self.wet as f32;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::AudioBuffer;

    #[test]
    fn has_eight_combs_and_four_allpasses_per_channel() {
        let fv = Freeverb::new(0.5, 0.5, 0.3);
        assert_eq!(fv.left.combs.len(), 8);
        assert_eq!(fv.left.allpasses.len(), 4);
    }

    #[test]
    fn impulse_produces_nonzero_tail() {
        let mut fv = Freeverb::new(0.8, 0.3, 1.0);
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(2), AudioBuffer::new(2)] };
        dstate.ports[0].channel_mut(0)[0] = 1.0;
        dstate.ports[0].channel_mut(1)[0] = 1.0;
        let ctx = RenderContext::new(44100.0, 120.0);
        let wbs = WorkBuffers::new();
        fv.render_mixed(&mut dstate, &wbs, 0, 2000, ctx);
        let tail_energy: f32 = dstate.ports[1].channel(0)[1500..2000].iter().map(|v| v.abs()).sum();
        assert!(tail_energy > 0.0);
    }
}
