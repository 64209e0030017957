//! Time-varying envelope playback (§4.8 "Envgen"): env-force scales output
//! by an envelope evaluated at a position advancing at `rate · scale(pitch -
//! center)`, letting the envelope speed track pitch. `env-force-rel` takes
//! over on note-off.

use crate::audio_buffer::AudioBuffer;
use crate::device_state::RenderContext;
use crate::envelope::Envelope;
use crate::processor::{ProcVoiceState, Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone)]
pub struct Envgen {
    pub sustain_env: Envelope,
    pub release_env: Option<Envelope>,
    pub center_pitch: f64,
    pub pitch_speed_scale: f64,
}

impl Envgen {
    fn speed(&self, pitch_hz: f64) -> f64 {
        if self.pitch_speed_scale == 0.0 || self.center_pitch <= 0.0 || pitch_hz <= 0.0 {
            return 1.0;
        }
        let semitone_offset = 12.0 * (pitch_hz / self.center_pitch).log2();
        (1.0 + self.pitch_speed_scale * semitone_offset / 12.0).max(0.01)
    }
}

impl Processor for Envgen {
    fn signal_type(&self) -> SignalType {
        SignalType::Voice
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::Envgen { time: 0.0, released: false }
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
        let ProcVoiceState::Envgen { time, released } = state else { return stop };
        let pitch = wbs.pitch.as_slice(stop);
        let buf = out.channel_mut(0);
        let dt = 1.0 / ctx.audio_rate;

        for i in start..stop {
            let hz = pitch.get(i).copied().unwrap_or(self.center_pitch as f32) as f64;
            let env = if *released {
                self.release_env.as_ref().unwrap_or(&self.sustain_env)
            } else {
                &self.sustain_env
            };
            let value = env.eval(*time);
            buf[i] *= value as f32;
            *time += dt * self.speed(hz);

            if *released {
                if let Some(rel) = &self.release_env {
                    if *time >= rel.last_x() {
                        return i + 1;
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
    use crate::envelope::EnvNode;

    #[test]
    fn release_envelope_ends_voice_when_exhausted() {
        let sustain = Envelope::new(vec![EnvNode { x: 0.0, y: 1.0 }, EnvNode { x: 10.0, y: 1.0 }]);
        let release = Envelope::new(vec![EnvNode { x: 0.0, y: 1.0 }, EnvNode { x: 0.00001, y: 0.0 }]);
        let proc = Envgen { sustain_env: sustain, release_env: Some(release), center_pitch: 440.0, pitch_speed_scale: 0.0 };
        let mut state = proc.create_voice_state();
        if let ProcVoiceState::Envgen { released, .. } = &mut state {
            *released = true;
        }
        let mut wbs = WorkBuffers::new();
        wbs.pitch.fill_const(64, 440.0);
        let mut out = AudioBuffer::new(1);
        out.channel_mut(0)[0..64].fill(1.0);
        let ctx = RenderContext::new(44100.0, 120.0);
        let new_stop = proc.render_voice(&mut state, &wbs, &mut out, 0, 64, ctx);
        assert!(new_stop < 64);
    }
}
