//! Fixed-size scratch arenas reused across render calls (L1).
//!
//! Grounded on the teacher's `audio_buffer.rs` pooled-buffer idea, split out
//! into its own module because the spec treats work buffers (control-signal
//! scratch: pitch, force, panning) as distinct from the audio port buffers
//! in `audio_buffer.rs`.

pub const MAX_BLOCK_SIZE: usize = 2048;

/// One named scratch channel, fixed capacity, cleared at the start of each
/// render call rather than reallocated.
#[derive(Debug, Clone)]
pub struct WorkBuffer {
    data: Vec<f32>,
}

impl WorkBuffer {
    pub fn new() -> Self {
        WorkBuffer { data: vec![0.0; MAX_BLOCK_SIZE] }
    }

    pub fn as_slice(&self, len: usize) -> &[f32] {
        &self.data[..len.min(MAX_BLOCK_SIZE)]
    }

    pub fn as_mut_slice(&mut self, len: usize) -> &mut [f32] {
        let len = len.min(MAX_BLOCK_SIZE);
        &mut self.data[..len]
    }

    pub fn clear(&mut self, len: usize) {
        self.as_mut_slice(len).fill(0.0);
    }

    pub fn fill_const(&mut self, len: usize, value: f32) {
        self.as_mut_slice(len).fill(value);
    }

    /// Fills `[start, stop)` only, leaving the rest of the buffer as-is —
    /// used to write one voice's slice of a shared per-block work buffer
    /// without disturbing other voices' already-written ranges.
    pub fn fill_range(&mut self, start: usize, stop: usize, value: f32) {
        let stop = stop.min(MAX_BLOCK_SIZE);
        let start = start.min(stop);
        self.data[start..stop].fill(value);
    }
}

impl Default for WorkBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The control-signal scratch a voice processor reads while rendering:
/// pitch (Hz), force (linear gain), and panning (-1..1), one `f32` per
/// frame within the current block's `[start, stop)` range. Populated once
/// per channel per block by `Player::render_voices` from that channel's
/// pitch/force/filter-cutoff/pan state (converted to Hz/linear gain per
/// §3) before any voice in the chain renders, then written into each
/// active voice's own `[start, stop)` slice via `fill_range`.
#[derive(Debug, Clone)]
pub struct WorkBuffers {
    pub pitch: WorkBuffer,
    pub force: WorkBuffer,
    pub panning: WorkBuffer,
    /// A second per-voice control signal read directly by whichever
    /// processor in the chain needs one (currently the filter kernel's
    /// cutoff-in-Hz input).
    pub aux: WorkBuffer,
}

impl WorkBuffers {
    pub fn new() -> Self {
        WorkBuffers {
            pitch: WorkBuffer::new(),
            force: WorkBuffer::new(),
            panning: WorkBuffer::new(),
            aux: WorkBuffer::new(),
        }
    }
}

impl Default for WorkBuffers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_zeroes_requested_range() {
        let mut wb = WorkBuffer::new();
        wb.fill_const(16, 2.5);
        wb.clear(16);
        assert!(wb.as_slice(16).iter().all(|&v| v == 0.0));
    }

    #[test]
    fn slice_is_capped_at_max_block() {
        let wb = WorkBuffer::new();
        assert_eq!(wb.as_slice(MAX_BLOCK_SIZE + 100).len(), MAX_BLOCK_SIZE);
    }

    #[test]
    fn fill_range_leaves_outside_range_untouched() {
        let mut wb = WorkBuffer::new();
        wb.fill_const(16, 1.0);
        wb.fill_range(4, 8, 9.0);
        let s = wb.as_slice(16);
        assert_eq!(s[3], 1.0);
        assert_eq!(s[4], 9.0);
        assert_eq!(s[7], 9.0);
        assert_eq!(s[8], 1.0);
    }
}
