//! Voice pool allocation (§4.4), grounded on `original_source/Voice_pool.h`:
//! a fixed-size array of slots; `get_voice` either hands back the caller's
//! existing reservation or steals the lowest-priority slot, modernized into
//! the arena+generation handle design note prescribes (§9) in place of the
//! original's raw-pointer + id comparison.

use crate::voice::{Voice, VoiceHandle, VoicePriority};

pub struct VoicePool {
    slots: Vec<Voice>,
    next_generation: u64,
    next_group_id: u64,
}

impl VoicePool {
    pub fn new(capacity: usize) -> Self {
        VoicePool {
            slots: (0..capacity).map(|_| Voice::inactive()).collect(),
            next_generation: 1,
            next_group_id: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn new_group_id(&mut self) -> u64 {
        let id = self.next_group_id;
        self.next_group_id += 1;
        id
    }

    pub fn get(&self, handle: VoiceHandle) -> Option<&Voice> {
        self.slots.get(handle.slot).filter(|v| v.generation == handle.generation)
    }

    pub fn get_mut(&mut self, handle: VoiceHandle) -> Option<&mut Voice> {
        self.slots.get_mut(handle.slot).filter(|v| v.generation == handle.generation)
    }

    /// §4.4 `get_voice(prev, prev_id)`:
    /// 1. If `prev` still holds the original voice (matching generation,
    ///    not retired), return it.
    /// 2. Otherwise pick the lowest-priority slot (ties -> lowest index),
    ///    reset it, and assign a fresh generation.
    pub fn get_voice(&mut self, prev: Option<VoiceHandle>) -> VoiceHandle {
        if let Some(h) = prev {
            if let Some(v) = self.slots.get(h.slot) {
                if v.generation == h.generation && v.priority != VoicePriority::Inactive {
                    return h;
                }
            }
        }

        let victim = self
            .slots
            .iter()
            .enumerate()
            .min_by_key(|(idx, v)| (v.priority, *idx))
            .map(|(idx, _)| idx)
            .expect("voice pool has at least one slot");

        let generation = self.next_generation;
        self.next_generation += 1;
        self.slots[victim] = Voice { generation, ..Voice::inactive() };
        VoiceHandle { slot: victim, generation }
    }

    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|v| v.is_active()).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &Voice)> {
        self.slots.iter().enumerate().filter(|(_, v)| v.is_active())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Voice)> {
        self.slots.iter_mut().enumerate().filter(|(_, v)| v.is_active())
    }

    pub fn clear_updated_flags(&mut self) {
        for v in &mut self.slots {
            v.updated = false;
        }
    }

    /// Transitions every `Fg` voice belonging to `(channel, group_id)` to
    /// `Bg` — fired on note-off so release envelopes continue rendering.
    pub fn release_group(&mut self, channel: usize, group_id: u64) {
        for v in &mut self.slots {
            if v.channel == channel && v.group_id == group_id && v.priority == VoicePriority::Fg {
                v.priority = VoicePriority::Bg;
            }
        }
    }

    /// Retires a voice to `Inactive`, called once its processor reports
    /// permanent silence.
    pub fn retire(&mut self, slot: usize) {
        if let Some(v) = self.slots.get_mut(slot) {
            v.priority = VoicePriority::Inactive;
        }
    }

    pub fn reset(&mut self) {
        for v in &mut self.slots {
            *v = Voice::inactive();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuses_matching_generation() {
        let mut pool = VoicePool::new(4);
        let h = pool.get_voice(None);
        pool.get_mut(h).unwrap().priority = VoicePriority::Fg;
        let h2 = pool.get_voice(Some(h));
        assert_eq!(h, h2);
    }

    #[test]
    fn steals_lowest_priority_when_full() {
        let mut pool = VoicePool::new(2);
        let h0 = pool.get_voice(None);
        pool.get_mut(h0).unwrap().priority = VoicePriority::Bg;
        pool.get_mut(h0).unwrap().channel = 0;
        let h1 = pool.get_voice(None);
        pool.get_mut(h1).unwrap().priority = VoicePriority::Fg;
        pool.get_mut(h1).unwrap().channel = 1;

        // Pool is full (both active); next allocation steals h0 (Bg < Fg).
        let h2 = pool.get_voice(None);
        assert_eq!(h2.slot, h0.slot);
        assert_ne!(h2.generation, h0.generation);
        assert!(pool.get(h0).is_none());
    }

    #[test]
    fn release_group_demotes_foreground_voices() {
        let mut pool = VoicePool::new(2);
        let h = pool.get_voice(None);
        {
            let v = pool.get_mut(h).unwrap();
            v.priority = VoicePriority::Fg;
            v.channel = 0;
            v.group_id = 7;
        }
        pool.release_group(0, 7);
        assert_eq!(pool.get(h).unwrap().priority, VoicePriority::Bg);
    }
}
