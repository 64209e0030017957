//! Top-level render loop (§4.7, L10). Grounded on the teacher's
//! `engine.rs`: owns the full mutable playback state and exposes a single
//! `render` entry point the caller pumps for each audio callback.
//!
//! Jump contexts (§3 "Jump context") are authored alongside a pattern
//! rather than carried in the `mj` trigger's own argument (scenario 4, §8,
//! fires `["mj", null]`); callers populate `master.active_jumps` up front
//! (normally the module loader's job, out of this core's scope per §1).
//! Audio-unit output mixing across multiple units at module level is not
//! modelled — the first audio unit's root port is treated as the driven
//! output, matching every concrete scenario in §8, which exercises a
//! single instrument.

use std::collections::HashMap;

use serde_json::Value;

use crate::audio_buffer::AudioBuffer;
use crate::channel::Channel;
use crate::cgiter::ColumnIterator;
use crate::device_state::RenderContext;
use crate::event::au::AuStates;
use crate::event::{self, EventContext};
use crate::master_params::{MasterParams, GOTO_SAFETY_MAX};
use crate::module::{Module, PatternInstanceRef};
use crate::tstamp::Tstamp;
use crate::tuning;
use crate::voice::VoicePriority;
use crate::work_buffer::{WorkBuffers, MAX_BLOCK_SIZE};
use crate::voice_pool::VoicePool;

pub struct Player {
    pub module: Module,
    pub channels: Vec<Channel>,
    pub voices: VoicePool,
    pub au_states: AuStates,
    pub master: MasterParams,
    cgiters: Vec<ColumnIterator>,
    wbs: WorkBuffers,
    scratch: AudioBuffer,
    sample_rate: f64,
    events: Vec<(String, Value)>,
    goto_safety: u32,
}

impl Player {
    pub fn new(module: Module, num_channels: usize, sample_rate: f64) -> Self {
        let initial_tempo = module.songs.first().map(|s| s.initial_tempo).unwrap_or(120.0);
        let channels = (0..num_channels).map(|i| Channel::new(i, i as u64 + 1)).collect();
        let au_count = module.audio_units.len();
        let mut player = Player {
            module,
            channels,
            voices: VoicePool::new(256),
            au_states: AuStates::new(au_count),
            master: MasterParams::new(initial_tempo),
            cgiters: Vec::new(),
            wbs: WorkBuffers::new(),
            scratch: AudioBuffer::new(2),
            sample_rate,
            events: Vec::new(),
            goto_safety: 0,
        };
        player.reset_cgiters();
        player
    }

    pub fn set_position(&mut self, piref: PatternInstanceRef, pos: Tstamp) {
        self.master.cur_piref = piref;
        self.master.cur_pos = pos;
        self.master.stopped = false;
        self.reset_cgiters();
    }

    pub fn has_stopped(&self) -> bool {
        self.master.stopped
    }

    pub fn events(&self) -> &[(String, Value)] {
        &self.events
    }

    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    fn reset_cgiters(&mut self) {
        self.cgiters.clear();
        if let Some(pattern) = self.module.pattern_instance(self.master.cur_piref) {
            for idx in 0..pattern.columns.len() {
                let mut it = ColumnIterator::init(self.master.cur_piref, idx);
                it.reset(self.master.cur_pos, pattern);
                self.cgiters.push(it);
            }
        }
    }

    /// §4.6 `fire_event`, exposed at the player level for external control
    /// input (§6 `fire_event(handle, ch_num, event_json)`).
    pub fn fire_event(&mut self, ch_num: usize, name: &str, arg: Value) -> bool {
        let Player { module, master, channels, voices, au_states, events, .. } = self;
        let mut ctx = EventContext {
            module,
            master,
            channels,
            voices,
            au_states,
            binds: &module.binds,
            environment: &module.environment,
        };
        let ok = event::trigger(&mut ctx, ch_num, name, arg.clone());
        events.push((name.to_string(), arg));
        ok
    }

    /// Renders `nframes` into `out` (interleaved, `out_channels` per
    /// frame), looping in blocks of at most `MAX_BLOCK_SIZE`. Returns the
    /// number of frames actually rendered (less than `nframes` once
    /// playback stops).
    pub fn render(&mut self, nframes: usize, out_channels: usize, out: &mut [f32]) -> usize {
        let mut produced = 0;
        while produced < nframes {
            if self.master.stopped {
                break;
            }
            let chunk_len = (nframes - produced).min(MAX_BLOCK_SIZE);
            let slice = &mut out[produced * out_channels..(produced + chunk_len) * out_channels];
            self.render_chunk(chunk_len, slice);
            produced += chunk_len;
        }
        produced
    }

    fn render_chunk(&mut self, chunk_len: usize, out: &mut [f32]) {
        for au in &mut self.module.audio_units {
            au.clear_block(0, chunk_len);
        }

        let mut pos_in_chunk = 0usize;
        while pos_in_chunk < chunk_len {
            if self.master.stopped {
                break;
            }
            let Some(pattern) = self.module.pattern_instance(self.master.cur_piref).cloned() else {
                self.master.stopped = true;
                break;
            };

            let pattern_end_dist =
                if self.master.cur_pos < pattern.length { pattern.length - self.master.cur_pos } else { Tstamp::ZERO };
            let col_dist = self.cgiters.iter().filter_map(|it| it.get_local_bp_dist(&pattern)).min();
            let mut d_trigger = match col_dist {
                Some(d) => d.min(pattern_end_dist),
                None => pattern_end_dist,
            };
            if self.master.delay_left > Tstamp::ZERO {
                // A pending "w" pause holds the next row's trigger off until
                // it has fully elapsed, even past where the pattern's own
                // columns would otherwise fire.
                d_trigger = d_trigger.max(self.master.delay_left);
            }
            let d_tempo = self.master.tempo_slider.dist_to_next_tick();
            let remaining_in_chunk = chunk_len - pos_in_chunk;
            let d_cap = Tstamp::from_frames(remaining_in_chunk as f64, self.master.tempo, self.sample_rate);

            let mut d = if d_trigger < d_cap { d_trigger } else { d_cap };
            if let Some(dt) = d_tempo {
                if dt < d {
                    d = dt;
                }
            }

            let frames_f = d.to_frames(self.master.tempo, self.sample_rate);
            let f = (frames_f.round() as usize).min(remaining_in_chunk);

            let ctx = RenderContext::new(self.sample_rate, self.master.tempo);
            if f > 0 {
                self.render_voices(pos_in_chunk, pos_in_chunk + f, ctx);
                for au in &mut self.module.audio_units {
                    au.render_mixed_plan(&self.wbs, pos_in_chunk, pos_in_chunk + f, ctx);
                }
            }

            self.master.cur_pos = self.master.cur_pos + d;
            if self.master.delay_left > Tstamp::ZERO {
                self.master.delay_left =
                    if d >= self.master.delay_left { Tstamp::ZERO } else { self.master.delay_left - d };
            }
            for it in &mut self.cgiters {
                it.advance(d, &pattern);
            }
            if d_tempo.is_some() {
                self.master.step_tempo_slide(d);
            }
            pos_in_chunk += f;

            // `d == d_trigger` only means the row *boundary* was reached;
            // a trailing silent pattern has no triggers left to fire there,
            // so exhaustion detection below needs to know whether anything
            // was actually dispatched, not just that the boundary matched.
            let fired_row = d == d_trigger && self.fire_row(&pattern);

            if self.master.do_goto {
                self.master.do_goto = false;
                self.goto_safety += 1;
                if self.goto_safety > GOTO_SAFETY_MAX {
                    self.master.stopped = true;
                }
                self.reset_cgiters();
            } else if f > 0 {
                self.goto_safety = 0;
            }

            if self.master.do_jump {
                self.master.do_jump = false;
                self.apply_pending_jump();
            }

            if f == 0 && !fired_row && !self.master.do_goto {
                // Nothing advanced and no row fired: pattern exhausted or a
                // pathological zero-distance loop. Move to the next
                // order-list entry if there is one, otherwise stop rather
                // than spin.
                if pattern.length.is_zero() || self.master.cur_pos >= pattern.length {
                    if !self.advance_order_list() {
                        self.master.stopped = true;
                    }
                }
                break;
            }
        }

        if let Some(au) = self.module.audio_units.first() {
            if let Some(root) = au.root_output() {
                root.copy_to_interleaved(0, chunk_len, out);
            }
        }
    }

    /// Advances to the next entry in the current song's order list (§3
    /// "Song" / `Song::order_list`), used when a pattern has exhausted
    /// without an explicit jump or goto. Returns `false` (leaving playback
    /// position untouched) once the order list itself is exhausted, so the
    /// caller can fall back to stopping.
    fn advance_order_list(&mut self) -> bool {
        let Some(song) = self.module.songs.get(self.master.current_song) else { return false };
        let next_index = self.master.order_index + 1;
        let Some(&next_piref) = song.order_list.get(next_index) else { return false };
        self.master.order_index = next_index;
        self.master.cur_piref = next_piref;
        self.master.cur_pos = Tstamp::ZERO;
        self.reset_cgiters();
        true
    }

    /// Converts each channel's pitch/force/filter-cutoff/pan state to the
    /// Hz/linear-gain form voice processors read (§3), stepping that
    /// channel's vibrato/tremolo/arpeggio LFOs once for the block, then
    /// writes every active voice's slice of the shared per-block work
    /// buffers from its owning channel's converted values before rendering
    /// the voice's chain.
    fn render_voices(&mut self, start: usize, stop: usize, ctx: RenderContext) {
        let frames = stop - start;
        let sample_rate = self.sample_rate;
        let mut effective: Vec<(f32, f32, f32, f32)> = Vec::with_capacity(self.channels.len());
        for channel in &mut self.channels {
            let vib_cents = channel.vibrato.step(frames, sample_rate);
            let trem_mult = channel.tremolo.step(frames, sample_rate);
            let arp_cents = channel.arpeggio.step(frames, sample_rate);
            let pitch_hz = tuning::cents_to_hz(channel.pitch_cents + vib_cents + arp_cents);
            let force = channel.force * trem_mult;
            let cutoff_hz = tuning::cents_to_hz(channel.filter_cutoff_cents);
            effective.push((pitch_hz as f32, force as f32, cutoff_hz as f32, channel.pan as f32));
        }

        let Player { module, voices, channels, scratch, wbs, .. } = self;
        for (_, voice) in voices.iter_mut() {
            let Some(au) = module.audio_units.get_mut(voice.au_index) else { continue };
            if voice.chain_index >= au.voice_chains().len() {
                continue;
            }
            let (pitch_hz, force, cutoff_hz, pan) = effective.get(voice.channel).copied().unwrap_or((0.0, 0.0, 0.0, 0.0));
            wbs.pitch.fill_range(start, stop, pitch_hz);
            wbs.force.fill_range(start, stop, force);
            wbs.aux.fill_range(start, stop, cutoff_hz);
            wbs.panning.fill_range(start, stop, pan);

            let empty_streams = HashMap::new();
            let stream_values = channels.get(voice.channel).map(|c| &c.stream_values).unwrap_or(&empty_streams);
            let new_stop =
                au.render_voice_chain(voice.chain_index, &mut voice.states, wbs, scratch, start, stop, ctx, stream_values);
            voice.updated = true;
            if voice.priority == VoicePriority::New {
                voice.priority = VoicePriority::Fg;
            }
            let keep_alive = voice.keep_alive_stop.map_or(false, |k| new_stop < k);
            if new_stop < stop && !keep_alive {
                voice.priority = VoicePriority::Inactive;
            }
        }
    }

    /// Fires every column's due trigger at the current row, if any.
    /// Returns whether at least one trigger actually fired — distinct from
    /// "a row boundary was reached", since a pattern can have columns with
    /// no further triggers at all (trailing silence), in which case there
    /// is nothing to dispatch even though `d == d_trigger` held.
    fn fire_row(&mut self, pattern: &crate::module::Pattern) -> bool {
        let mut any_fired = false;
        for idx in 0..self.cgiters.len() {
            if let Some(trigger) = self.cgiters[idx].get_trigger_row(pattern) {
                let name = trigger.event_name.clone();
                let arg = trigger.parse_arg().unwrap_or(Value::Null);
                self.master.cur_ch = idx;
                self.master.cur_trigger = idx;
                self.fire_event(idx, &name, arg);
                any_fired = true;
            }
        }
        any_fired
    }

    /// Resolves a `mj` flagged this row against `master.active_jumps`
    /// (§4.7 "Jumps"): decrements the matching context's counter and, if
    /// it was still positive, seeks to the target row.
    fn apply_pending_jump(&mut self) {
        let piref = self.master.cur_piref;
        let row = self.master.cur_pos;
        let Some(idx) = self.master.active_jumps.iter().position(|j| j.piref == piref && j.row == row) else {
            return;
        };
        if self.master.active_jumps[idx].counter > 0 {
            self.master.active_jumps[idx].counter -= 1;
            let target_piref = self.master.active_jumps[idx].target_piref;
            let target_row = self.master.active_jumps[idx].target_row;
            self.master.cur_piref = target_piref;
            self.master.cur_pos = target_row;
            self.reset_cgiters();
        }
    }
}
