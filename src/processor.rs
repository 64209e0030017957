//! Processor trait and the per-voice state enum (L4), grounded on the
//! teacher's `node.rs::Node` trait and `Polyphony` split, generalized to the
//! spec's voice-signal/mixed-signal distinction (§3 "Processor").

use serde_json::Value;

use crate::audio_buffer::AudioBuffer;
use crate::device_state::{DeviceState, RenderContext};
use crate::error::KunquatError;
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalType {
    Voice,
    Mixed,
}

/// Whether a processor's parameters are instanced once per module
/// (`Global`) or once per voice (`PerVoice`) — carried over from the
/// teacher's `Polyphony` enum, which the spec's per-voice `create_voice_state`
/// factory corresponds to directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polyphony {
    Global,
    PerVoice,
}

/// Fixed-size per-voice state, tagged by processor kind to avoid per-note
/// heap allocation (design note §9). Mixed-signal processors never use
/// this — their state lives in `DeviceState`/the processor struct itself.
#[derive(Debug, Clone, Copy)]
pub enum ProcVoiceState {
    None,
    Debug { fired: bool, keep_alive_stop: Option<usize> },
    /// `rng_state` is only meaningful for `Oscillator`'s `Waveform::Noise`,
    /// carried here instead of re-seeded every `render_voice` call so the
    /// noise sequence doesn't reset every block.
    Phase { phase: f64, rng_state: u64 },
    SamplePlayer { pos: f64, dir: f32, finished: bool },
    Filter { z: [[f32; 2]; 2], cur_cutoff: f64, prev_cutoff: f64, xfade: f32 },
    Envgen { time: f64, released: bool },
}

impl ProcVoiceState {
    pub fn phase_mut(&mut self) -> &mut f64 {
        match self {
            ProcVoiceState::Phase { phase, .. } => phase,
            _ => panic!("voice state is not a Phase variant"),
        }
    }
}

/// A leaf DSP node. Exactly one of `render_voice`/`render_mixed` is
/// meaningful for a given processor, selected by `signal_type`.
pub trait Processor: std::fmt::Debug {
    fn signal_type(&self) -> SignalType;
    fn polyphony(&self) -> Polyphony {
        Polyphony::PerVoice
    }
    fn num_channels(&self) -> usize {
        1
    }

    fn create_voice_state(&self) -> ProcVoiceState {
        ProcVoiceState::None
    }

    /// Renders `[start, stop)` of one voice's output into `out`. Returns
    /// `new_stop`: `new_stop < stop` means the voice has gone permanently
    /// silent from `new_stop` onward and may be retired.
    fn render_voice(
        &self,
        _state: &mut ProcVoiceState,
        _wbs: &WorkBuffers,
        _out: &mut AudioBuffer,
        start: usize,
        stop: usize,
        _ctx: RenderContext,
    ) -> usize {
        stop.max(start)
    }

    /// Renders `[start, stop)` of a mixed-signal device, reading its
    /// already-summed input ports from `dstate` and writing its output
    /// ports in place. Mixed-signal processors are not polyphonic, so
    /// unlike `render_voice` this takes `&mut self` and may hold its own
    /// persistent buffers (delay lines, comb filters) directly.
    fn render_mixed(
        &mut self,
        _dstate: &mut DeviceState,
        _wbs: &WorkBuffers,
        _start: usize,
        _stop: usize,
        _ctx: RenderContext,
    ) {
    }

    fn set_param(&mut self, _key: &str, _value: &Value) -> Result<(), KunquatError> {
        Ok(())
    }

    /// Delivers a control-rate value from the firing channel's stream map
    /// (§3 "Audio Unit optional streams"), resolved by name through the
    /// owning audio unit's `stream_map` and applied before the voice chain
    /// renders. Only processors that expose a stream target override this;
    /// the default is a no-op.
    fn receive_stream(&mut self, _value: f64) {}
}
