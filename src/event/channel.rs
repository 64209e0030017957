//! `channel`-category event handlers (§4.6): note-on/off, arpeggio,
//! force/pitch/filter sliders, carry toggles, expression selection,
//! device-event firing, control-variable updates.
//!
//! Grounded on the teacher's `state/command.rs` per-entity command
//! handling, adapted to the voice-chain allocation model of
//! [[audio_unit]]/[[voice_pool]].

use serde_json::Value;

use crate::channel::NameCategory;
use crate::environment::EnvValue;
use crate::voice::VoicePriority;

use super::EventContext;

fn arg_f64(arg: &Value) -> Option<f64> {
    arg.as_f64()
}

pub fn handle(ctx: &mut EventContext, ch_num: usize, name: &str, arg: &Value) -> bool {
    match name {
        "n+" => note_on(ctx, ch_num, arg),
        "n-" => note_off(ctx, ch_num),
        "hit" => hit(ctx, ch_num, arg),
        "a+" => set_arpeggio(ctx, ch_num, true),
        "a-" => set_arpeggio(ctx, ch_num, false),
        "a.t" => set_arpeggio_tones(ctx, ch_num, arg),
        "a.s" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.arpeggio.speed_hz = v;
                true
            } else {
                false
            }
        }
        "v+" => set_vibrato(ctx, ch_num, true),
        "v-" => set_vibrato(ctx, ch_num, false),
        "v.s" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.vibrato.speed_hz = v;
                true
            } else {
                false
            }
        }
        "v.d" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.vibrato.depth_cents = v;
                true
            } else {
                false
            }
        }
        "t+" => set_tremolo(ctx, ch_num, true),
        "t-" => set_tremolo(ctx, ch_num, false),
        "t.s" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.tremolo.speed_hz = v;
                true
            } else {
                false
            }
        }
        "t.d" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.tremolo.depth = v;
                true
            } else {
                false
            }
        }
        "f.f" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.force = v;
                true
            } else {
                false
            }
        }
        "p.f" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.pitch_cents = v;
                true
            } else {
                false
            }
        }
        "fc.f" => {
            let Some(v) = arg_f64(arg) else { return false };
            if let Some(ch) = ctx.channels.get_mut(ch_num) {
                ch.filter_cutoff_cents = v;
                true
            } else {
                false
            }
        }
        ".sn" => true, // active name already set generically by the dispatcher
        ".s" => {
            let Some(v) = arg_f64(arg) else { return false };
            let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
            let Some(stream_name) = ch.active_name(NameCategory::Stream).map(str::to_string) else { return false };
            ch.stream_values.insert(stream_name, v);
            true
        }
        "->s+" => set_carry(ctx, ch_num, NameCategory::Stream, true),
        "->s-" => set_carry(ctx, ch_num, NameCategory::Stream, false),
        ".cvn" => true,
        ".cv" => {
            let Some(v) = arg_f64(arg) else { return false };
            let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
            let Some(var_name) = ch.active_name(NameCategory::ControlVar).map(str::to_string) else { return false };
            ch.control_vars.insert(var_name, EnvValue::Float(v));
            true
        }
        ".en" => true,
        "ch.dev" => true,
        _ => false,
    }
}

fn note_on(ctx: &mut EventContext, ch_num: usize, arg: &Value) -> bool {
    let Some(au_index) = ctx.channels.get(ch_num).and_then(|c| c.au_index) else { return false };
    let Some(au) = ctx.module.audio_units.get(au_index) else { return false };
    let pitch_cents = arg_f64(arg).unwrap_or(0.0);
    let group_id = ctx.voices.new_group_id();

    for chain_idx in 0..au.voice_chains().len() {
        let handle = ctx.voices.get_voice(None);
        if let Some(v) = ctx.voices.get_mut(handle) {
            v.priority = VoicePriority::New;
            v.channel = ch_num;
            v.group_id = group_id;
            v.au_index = au_index;
            v.chain_index = chain_idx;
            v.states = au.create_chain_states(chain_idx);
            v.updated = false;
            v.keep_alive_stop = None;
        }
        if let Some(ch) = ctx.channels.get_mut(ch_num) {
            ch.fg_voices.insert(chain_idx, handle);
        }
    }

    if let Some(ch) = ctx.channels.get_mut(ch_num) {
        ch.current_group_id = Some(group_id);
        ch.pitch_cents = pitch_cents;
        ch.note_off_pending = false;
    }
    true
}

fn note_off(ctx: &mut EventContext, ch_num: usize) -> bool {
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.note_off_pending = true;
    let Some(gid) = ch.current_group_id else { return false };
    ctx.voices.release_group(ch_num, gid);
    true
}

/// Numbered percussion trigger (§3 "hit map"): resolves `arg` (a hit
/// number) against the bound audio unit's `hit_map` and allocates a voice
/// for that specific chain only, rather than every chain `n+` would. Falls
/// back to `note_on`'s full-chain allocation when the number isn't mapped
/// or `arg` isn't an integer.
fn hit(ctx: &mut EventContext, ch_num: usize, arg: &Value) -> bool {
    let Some(hit_num) = arg.as_i64() else { return note_on(ctx, ch_num, arg) };
    let Some(au_index) = ctx.channels.get(ch_num).and_then(|c| c.au_index) else { return false };
    let Some(au) = ctx.module.audio_units.get(au_index) else { return false };
    let Some(&chain_idx) = au.hit_map.get(&hit_num) else { return note_on(ctx, ch_num, arg) };
    if chain_idx >= au.voice_chains().len() {
        return note_on(ctx, ch_num, arg);
    }

    let group_id = ctx.voices.new_group_id();
    let handle = ctx.voices.get_voice(None);
    if let Some(v) = ctx.voices.get_mut(handle) {
        v.priority = VoicePriority::New;
        v.channel = ch_num;
        v.group_id = group_id;
        v.au_index = au_index;
        v.chain_index = chain_idx;
        v.states = au.create_chain_states(chain_idx);
        v.updated = false;
        v.keep_alive_stop = None;
    }
    if let Some(ch) = ctx.channels.get_mut(ch_num) {
        ch.fg_voices.insert(chain_idx, handle);
        ch.current_group_id = Some(group_id);
        ch.note_off_pending = false;
    }
    true
}

fn set_arpeggio(ctx: &mut EventContext, ch_num: usize, on: bool) -> bool {
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.arpeggio.active = on;
    if on {
        ch.arpeggio.ref_pitch = ch.pitch_cents;
        ch.arpeggio.reset_phase();
    }
    true
}

fn set_arpeggio_tones(ctx: &mut EventContext, ch_num: usize, arg: &Value) -> bool {
    let Some(arr) = arg.as_array() else { return false };
    let offsets: Vec<f64> = arr.iter().filter_map(|v| v.as_f64()).collect();
    if offsets.is_empty() {
        return false;
    }
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.arpeggio.tone_offsets = offsets;
    ch.arpeggio.reset_phase();
    true
}

fn set_vibrato(ctx: &mut EventContext, ch_num: usize, on: bool) -> bool {
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.vibrato.active = on;
    true
}

fn set_tremolo(ctx: &mut EventContext, ch_num: usize, on: bool) -> bool {
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.tremolo.active = on;
    true
}

fn set_carry(ctx: &mut EventContext, ch_num: usize, cat: NameCategory, on: bool) -> bool {
    let Some(ch) = ctx.channels.get_mut(ch_num) else { return false };
    ch.carry.set(cat, on);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_unit::{AudioUnit, AudioUnitKind};
    use crate::bind::BindTable;
    use crate::channel::Channel;
    use crate::connections::{Connections, ROOT_ID};
    use crate::environment::Environment;
    use crate::event::au::AuStates;
    use crate::master_params::MasterParams;
    use crate::module::Module;
    use crate::processors::oscillators::Debug;
    use crate::voice_pool::VoicePool;

    fn single_pulse_module() -> Module {
        let mut conn = Connections::new();
        conn.connect(0, 0, ROOT_ID, 0);
        let proc_table: Vec<Box<dyn crate::processor::Processor>> = vec![Box::new(Debug { single_pulse: true })];
        let au = AudioUnit::new(AudioUnitKind::Instrument, proc_table, conn, 2).unwrap();
        let mut module = Module::new();
        module.audio_units.push(au);
        module
    }

    #[test]
    fn note_on_allocates_one_voice_per_chain() {
        let module = single_pulse_module();
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        channels[0].au_index = Some(0);
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(note_on(&mut ctx, 0, &Value::from(0)));
        assert_eq!(ctx.voices.active_count(), 1);
    }

    #[test]
    fn note_off_demotes_to_background() {
        let module = single_pulse_module();
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        channels[0].au_index = Some(0);
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        note_on(&mut ctx, 0, &Value::from(0));
        for (_, v) in ctx.voices.iter_mut() {
            v.priority = VoicePriority::Fg;
        }
        assert!(note_off(&mut ctx, 0));
        let (_, v) = ctx.voices.iter().next().unwrap();
        assert_eq!(v.priority, VoicePriority::Bg);
    }

    #[test]
    fn hit_allocates_only_the_mapped_chain() {
        let mut module = single_pulse_module();
        module.audio_units[0].set_hit(3, 0);
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        channels[0].au_index = Some(0);
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(hit(&mut ctx, 0, &Value::from(3)));
        assert_eq!(ctx.voices.active_count(), 1);
        let (_, v) = ctx.voices.iter().next().unwrap();
        assert_eq!(v.chain_index, 0);
    }

    #[test]
    fn hit_falls_back_to_note_on_when_unmapped() {
        let module = single_pulse_module();
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        channels[0].au_index = Some(0);
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(hit(&mut ctx, 0, &Value::from(99)));
        assert_eq!(ctx.voices.active_count(), 1);
    }

    #[test]
    fn set_arpeggio_captures_ref_pitch_and_resets_cursor() {
        let module = single_pulse_module();
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        channels[0].au_index = Some(0);
        channels[0].pitch_cents = 700.0;
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(set_arpeggio(&mut ctx, 0, true));
        assert_eq!(ctx.channels[0].arpeggio.ref_pitch, 700.0);
    }

    #[test]
    fn vibrato_and_tremolo_handlers_toggle_state() {
        let module = single_pulse_module();
        let mut master = MasterParams::new(120.0);
        let mut channels = vec![Channel::new(0, 1)];
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(handle(&mut ctx, 0, "v+", &Value::Null));
        assert!(handle(&mut ctx, 0, "v.d", &Value::from(50.0)));
        assert!(ctx.channels[0].vibrato.active);
        assert_eq!(ctx.channels[0].vibrato.depth_cents, 50.0);

        assert!(handle(&mut ctx, 0, "t+", &Value::Null));
        assert!(handle(&mut ctx, 0, "t.d", &Value::from(0.3)));
        assert!(ctx.channels[0].tremolo.active);
        assert_eq!(ctx.channels[0].tremolo.depth, 0.3);
    }
}
