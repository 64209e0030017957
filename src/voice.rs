//! Per-voice runtime state (§3 "Voice", §4.3 state machine).
//!
//! Grounded on the teacher's `voice.rs` shape and `original_source/Voice.h`'s
//! priority ordering (`INACTIVE=0, BG, FG, NEW`).

use crate::processor::ProcVoiceState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum VoicePriority {
    Inactive = 0,
    Bg = 1,
    Fg = 2,
    New = 3,
}

/// A stable reference to a pool slot: `(slot, generation)`, validated
/// before use so a stale handle from a reused slot is never mistaken for
/// the voice it used to point to (design note §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoiceHandle {
    pub slot: usize,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub struct Voice {
    pub generation: u64,
    pub group_id: u64,
    pub priority: VoicePriority,
    pub channel: usize,
    /// Which audio unit this voice belongs to (module-level index).
    pub au_index: usize,
    /// Index into that audio unit's `voice_chains` — an ordered run of
    /// voice-signal processors this voice renders through each block.
    pub chain_index: usize,
    /// One `ProcVoiceState` per processor in the chain, in chain order.
    pub states: Vec<ProcVoiceState>,
    /// Set whenever the voice is rendered this block; the pool clears it
    /// at the start of each render call and uses it to detect voices that
    /// went untouched (e.g. muted channel) for bookkeeping.
    pub updated: bool,
    /// Buffer position past which this voice insists on being rendered
    /// even if it would otherwise be retired this block — used by the
    /// debug single-pulse processor so its one sample isn't skipped when
    /// an event fires inside a zero-length render slice.
    pub keep_alive_stop: Option<usize>,
}

impl Voice {
    pub fn inactive() -> Self {
        Voice {
            generation: 0,
            group_id: 0,
            priority: VoicePriority::Inactive,
            channel: 0,
            au_index: 0,
            chain_index: 0,
            states: Vec::new(),
            updated: false,
            keep_alive_stop: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.priority != VoicePriority::Inactive
    }
}
