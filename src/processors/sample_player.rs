//! Sample player processor (§4.8): linear-interpolated playback with
//! off/uni/bi loop modes, direction flips at loop boundaries.

use crate::audio_buffer::AudioBuffer;
use crate::device_state::RenderContext;
use crate::processor::{ProcVoiceState, Processor, SignalType};
use crate::sample::{LoopMode, Sample};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone)]
pub struct SamplePlayer {
    pub sample: Sample,
}

impl Processor for SamplePlayer {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn num_channels(&self) -> usize {
        self.sample.num_channels().max(1)
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::SamplePlayer { pos: 0.0, dir: 1.0, finished: false }
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
        let ProcVoiceState::SamplePlayer { pos, dir, finished } = state else { return stop };
        if *finished || self.sample.is_empty() {
            return start;
        }
        let pitch = wbs.pitch.as_slice(stop);
        let n_ch = self.sample.num_channels();
        let mut last_written = start;
        for i in start..stop {
            let hz = pitch.get(i).copied().unwrap_or(self.sample.mid_freq as f32) as f64;
            let playback_rate = self.sample.mid_freq * (hz / self.sample.mid_freq.max(1e-9)) / ctx.audio_rate;

            for ch in 0..n_ch.min(out.num_channels().max(1)) {
                out.channel_mut(ch)[i] = self.sample.interpolated(ch, *pos);
            }
            last_written = i + 1;

            *pos += *dir as f64 * playback_rate;

            match self.sample.loop_mode {
                LoopMode::Off => {
                    if *pos < 0.0 || *pos >= self.sample.len() as f64 {
                        *finished = true;
                        return last_written;
                    }
                }
                LoopMode::Uni => {
                    let span = (self.sample.loop_end - self.sample.loop_start) as f64;
                    if span <= 0.0 {
                        *finished = true;
                        return last_written;
                    }
                    if *pos >= self.sample.loop_end as f64 {
                        *pos -= span;
                    }
                }
                LoopMode::Bi => {
                    if *pos >= self.sample.loop_end as f64 {
                        *pos = self.sample.loop_end as f64 - (*pos - self.sample.loop_end as f64);
                        *dir = -1.0;
                    } else if *pos <= self.sample.loop_start as f64 {
                        *pos = self.sample.loop_start as f64 + (self.sample.loop_start as f64 - *pos);
                        *dir = 1.0;
                    }
                }
            }
        }
        stop
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finishes_at_end_of_sample_without_loop() {
        let sample = Sample::new(vec![vec![0.0; 4]], 100.0);
        let proc = SamplePlayer { sample };
        let mut state = proc.create_voice_state();
        let mut wbs = WorkBuffers::new();
        wbs.pitch.fill_const(16, 100.0);
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(100.0, 120.0);
        let new_stop = proc.render_voice(&mut state, &wbs, &mut out, 0, 16, ctx);
        assert!(new_stop <= 4);
    }

    #[test]
    fn unidirectional_loop_wraps() {
        let sample = Sample::new(vec![vec![1.0, 2.0, 3.0, 4.0]], 100.0).with_loop(LoopMode::Uni, 0, 4);
        let proc = SamplePlayer { sample };
        let mut state = proc.create_voice_state();
        let mut wbs = WorkBuffers::new();
        wbs.pitch.fill_const(100, 100.0);
        let mut out = AudioBuffer::new(1);
        let ctx = RenderContext::new(100.0, 120.0);
        let new_stop = proc.render_voice(&mut state, &wbs, &mut out, 0, 100, ctx);
        assert_eq!(new_stop, 100);
    }
}
