//! Base render context shared by every device instance (L3): audio rate,
//! block size, current tempo, plus the device's own port buffers.
//!
//! Grounded on the teacher's `node.rs::ProcessContext`, generalized from a
//! single implicit sample rate into the explicit rate/tempo pair the spec's
//! Tstamp-to-frames conversion needs.

use crate::audio_buffer::AudioBuffer;

/// Render-time constants that do not change mid-block.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub audio_rate: f64,
    pub tempo: f64,
}

impl RenderContext {
    pub fn new(audio_rate: f64, tempo: f64) -> Self {
        RenderContext { audio_rate, tempo }
    }
}

/// A device's instantiated per-port buffers: `ports[port_index]`. Both
/// mixed-signal devices (one `DeviceState` per audio unit/processor) and
/// the module-level root output use this shape.
#[derive(Debug, Clone)]
pub struct DeviceState {
    pub device_id: u32,
    pub ports: Vec<AudioBuffer>,
}

impl DeviceState {
    pub fn new(device_id: u32, port_channel_counts: &[usize]) -> Self {
        DeviceState {
            device_id,
            ports: port_channel_counts.iter().map(|&c| AudioBuffer::new(c)).collect(),
        }
    }

    pub fn clear_all(&mut self, start: usize, stop: usize) {
        for p in &mut self.ports {
            p.clear(start, stop);
        }
    }

    /// Borrows an input port and a distinct output port simultaneously,
    /// without cloning the input buffer. Panics if `in_idx == out_idx` —
    /// callers always use disjoint in/out ports for mixed-signal processors.
    pub fn port_pair_mut(&mut self, in_idx: usize, out_idx: usize) -> (&AudioBuffer, &mut AudioBuffer) {
        assert_ne!(in_idx, out_idx, "in/out ports must be disjoint");
        if in_idx < out_idx {
            let (left, right) = self.ports.split_at_mut(out_idx);
            (&left[in_idx], &mut right[0])
        } else {
            let (left, right) = self.ports.split_at_mut(in_idx);
            (&right[0], &mut left[out_idx])
        }
    }
}
