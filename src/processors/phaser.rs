//! Phaser (§2 L4 kernel list): a bank of first-order all-pass stages whose
//! cutoff is swept by an LFO, summed with the dry signal to produce notches.

use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone, Default)]
struct AllpassStage {
    z: f32,
}

impl AllpassStage {
    fn process(&mut self, input: f32, coeff: f32) -> f32 {
        let output = -coeff * input + self.z;
        self.z = input + coeff * output;
        output
    }
}

#[derive(Debug, Clone)]
pub struct Phaser {
    pub stage_count: usize,
    pub rate_hz: f64,
    pub depth: f64,
    pub feedback: f64,
    pub wet: f64,
    stages: Vec<AllpassStage>,
    phase: f64,
    last_out: f32,
}

impl Phaser {
    pub fn new(stage_count: usize, rate_hz: f64, depth: f64, feedback: f64, wet: f64) -> Self {
        Phaser {
            stage_count,
            rate_hz,
            depth,
            feedback,
            wet,
            stages: vec![AllpassStage::default(); stage_count.max(1)],
            phase: 0.0,
            last_out: 0.0,
        }
    }
}

impl Processor for Phaser {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let phase_step = self.rate_hz / ctx.audio_rate;
        for i in start..stop {
            let lfo = 0.5 + 0.5 * (self.phase * std::f64::consts::TAU).sin();
            let coeff = (self.depth * lfo).clamp(0.0, 0.99) as f32;
            let input = in_port.channel(0)[i] + self.last_out * self.feedback as f32;
            let mut x = input;
            for stage in &mut self.stages {
                x = stage.process(x, coeff);
            }
            self.last_out = x;
            let dry = in_port.channel(0)[i];
            out_port.channel_mut(0)[i] = dry * (1.0 - self.wet as f32) + x * self.wet as f32;

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
    fn dry_passes_through_when_wet_is_zero() {
        let mut phaser = Phaser::new(4, 0.5, 0.8, 0.0, 0.0);
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(1), AudioBuffer::new(1)] };
        dstate.ports[0].channel_mut(0)[0] = 0.5;
        let ctx = RenderContext::new(44100.0, 120.0);
        let wbs = WorkBuffers::new();
        phaser.render_mixed(&mut dstate, &wbs, 0, 1, ctx);
        assert_eq!(dstate.ports[1].channel(0)[0], 0.5);
    }
}
