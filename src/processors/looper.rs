//! Looper (§4.8): records input on a `record` device event, loops the
//! recorded buffer on `play`, with crossfades at state transitions and loop
//! boundaries to avoid clicks.

use crate::device_state::{DeviceState, RenderContext};
use crate::processor::{Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LooperState {
    Idle,
    Recording,
    Playing,
}

#[derive(Debug, Clone)]
pub struct Looper {
    pub max_rec_time: f64,
    pub state_xfade_time: f64,
    pub play_xfade_time: f64,
    state: LooperState,
    buffer: Vec<f32>,
    rec_len: usize,
    play_pos: usize,
    xfade_remaining: usize,
    xfade_from: f32,
}

impl Looper {
    pub fn new(max_rec_time: f64, state_xfade_time: f64, play_xfade_time: f64, audio_rate: f64) -> Self {
        Looper {
            max_rec_time,
            state_xfade_time,
            play_xfade_time,
            state: LooperState::Idle,
            buffer: vec![0.0; (max_rec_time * audio_rate) as usize + 1],
            rec_len: 0,
            play_pos: 0,
            xfade_remaining: 0,
            xfade_from: 0.0,
        }
    }

    pub fn trigger_record(&mut self, ctx: RenderContext) {
        self.state = LooperState::Recording;
        self.rec_len = 0;
        self.xfade_remaining = (self.state_xfade_time * ctx.audio_rate) as usize;
    }

    pub fn trigger_play(&mut self, ctx: RenderContext) {
        self.state = LooperState::Playing;
        self.play_pos = 0;
        self.xfade_remaining = (self.state_xfade_time * ctx.audio_rate) as usize;
    }

    pub fn trigger_stop(&mut self) {
        self.state = LooperState::Idle;
    }
}

impl Processor for Looper {
    fn signal_type(&self) -> SignalType {
        SignalType::Mixed
    }

    fn render_mixed(&mut self, dstate: &mut DeviceState, _wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        if dstate.ports.len() < 2 {
            return;
        }
        let (in_port, out_port) = dstate.port_pair_mut(0, 1);
        let xfade_total = (self.play_xfade_time * ctx.audio_rate).max(1.0) as usize;

        for i in start..stop {
            let input = in_port.channel(0)[i];
            let output = match self.state {
                LooperState::Idle => 0.0,
                LooperState::Recording => {
                    if self.rec_len < self.buffer.len() {
                        self.buffer[self.rec_len] = input;
                        self.rec_len += 1;
                    }
                    input
                }
                LooperState::Playing => {
                    if self.rec_len == 0 {
                        0.0
                    } else {
                        let raw = self.buffer[self.play_pos];
                        let out = if self.play_pos < xfade_total {
                            let tail = self.buffer[self.rec_len.saturating_sub(xfade_total - self.play_pos)];
                            let t = self.play_pos as f32 / xfade_total as f32;
                            raw * t + tail * (1.0 - t)
                        } else {
                            raw
                        };
                        self.play_pos = (self.play_pos + 1) % self.rec_len;
                        out
                    }
                }
            };

            let final_out = if self.xfade_remaining > 0 {
                let total = (self.state_xfade_time * ctx.audio_rate).max(1.0);
                let t = 1.0 - self.xfade_remaining as f32 / total as f32;
                self.xfade_remaining -= 1;
                self.xfade_from * (1.0 - t) + output * t
            } else {
                output
            };
            self.xfade_from = output;

            out_port.channel_mut(0)[i] = final_out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_buffer::AudioBuffer;

    #[test]
    fn plays_back_what_was_recorded() {
        let ctx = RenderContext::new(1000.0, 120.0);
        let mut looper = Looper::new(1.0, 0.0, 0.0, ctx.audio_rate);
        let mut dstate = DeviceState { device_id: 0, ports: vec![AudioBuffer::new(1), AudioBuffer::new(1)] };
        for i in 0..10 {
            dstate.ports[0].channel_mut(0)[i] = i as f32;
        }
        looper.trigger_record(ctx);
        let wbs = WorkBuffers::new();
        looper.render_mixed(&mut dstate, &wbs, 0, 10, ctx);
        looper.trigger_play(ctx);
        for i in 0..10 {
            dstate.ports[0].channel_mut(0)[i] = 0.0;
        }
        looper.render_mixed(&mut dstate, &wbs, 0, 10, ctx);
        assert_eq!(dstate.ports[1].channel(0)[0], 0.0);
        assert_eq!(dstate.ports[1].channel(0)[9], 9.0);
    }
}
