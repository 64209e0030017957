//! Bitcrusher (§4.8): bit-depth quantisation and sample-and-hold rate
//! reduction, mixed-signal.

use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone)]
pub struct Bitcrusher {
    pub resolution_bits: f64,
    pub res_ignore_min: f64,
    pub crush_rate_hz: f64,
    hold_counter: usize,
    held_value: [f32; 2],
}

impl Bitcrusher {
    pub fn new(resolution_bits: f64, res_ignore_min: f64, crush_rate_hz: f64) -> Self {
        Bitcrusher { resolution_bits, res_ignore_min, crush_rate_hz, hold_counter: 0, held_value: [0.0, 0.0] }
    }

    fn quantize(&self, x: f32) -> f32 {
        if self.resolution_bits < self.res_ignore_min {
            return x;
        }
        let levels = (2f64.powf(self.resolution_bits)).max(2.0);
        (x as f64 * levels).round() as f32 / levels as f32
    }
}

impl Processor for Bitcrusher {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let hold_frames = (ctx.audio_rate / self.crush_rate_hz.max(1.0)).max(1.0) as usize;
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        for i in start..stop {
            if self.hold_counter == 0 {
                for ch in 0..out_port.num_channels().min(2) {
                    self.held_value[ch] = self.quantize(in_port.channel(ch.min(in_port.num_channels() - 1))[i]);
                }
                self.hold_counter = hold_frames;
            }
            for ch in 0..out_port.num_channels() {
                out_port.channel_mut(ch)[i] = self.held_value[ch.min(1)];
            }
            self.hold_counter -= 1;
        }
    }
}
