//! `master`-category event handlers (§4.6): tempo, global volume, jumps,
//! gotos, and scale retuning. Grounded on the teacher's `transport.rs`
//! command handling for transport-wide state changes.

use serde_json::Value;

use crate::tstamp::Tstamp;

use super::EventContext;

fn arg_f64(arg: &Value) -> Option<f64> {
    arg.as_f64()
}

fn arg_tstamp(arg: &Value) -> Option<Tstamp> {
    let arr = arg.as_array()?;
    let beats = arr.first()?.as_i64()?;
    let rem = arr.get(1).and_then(|v| v.as_i64()).unwrap_or(0);
    Some(Tstamp::new(beats, rem))
}

pub fn handle(ctx: &mut EventContext, name: &str, arg: &Value) -> bool {
    match name {
        // `m.t`: set the tempo slide target (BPM). Takes effect once a
        // slide length is supplied by `m/=t`.
        "m.t" => {
            let Some(target) = arg_f64(arg) else { return false };
            ctx.master.tempo_slider.target = target;
            true
        }
        // `m/=t`: slide length as a Tstamp `[beats, rem]`; starts the slide
        // from the current tempo to the previously-set target.
        "m/=t" => {
            let Some(length) = arg_tstamp(arg) else { return false };
            let target = ctx.master.tempo_slider.target;
            let start = ctx.master.tempo;
            ctx.master.tempo_slider.start(start, target, length);
            true
        }
        "m.v" => {
            let Some(v) = arg_f64(arg) else { return false };
            ctx.master.volume_slider = v;
            true
        }
        // `mj`: jump. The counter/target live in a Jump context keyed by
        // `(piref, row)` — authored alongside the pattern rather than
        // encoded in this trigger's own argument (scenario 4, §8, fires
        // `["mj", null]`) — so this handler only flags that a jump
        // occurred here; `Player::apply_pending_jump` resolves it against
        // `master.active_jumps`.
        "mj" => {
            let _ = arg;
            ctx.master.do_jump = true;
            true
        }
        // `mg`: unconditional goto to a Tstamp row in the current pattern.
        "mg" => {
            let Some(row) = arg_tstamp(arg) else { return false };
            ctx.master.cur_pos = row;
            ctx.master.do_goto = true;
            true
        }
        // `m.r`: retune the active tuning table, keeping its fixed degree.
        "m.r" => {
            let Some(new_ref) = arg_f64(arg) else { return false };
            if let Some(state) = ctx.master.tuning_states.first_mut() {
                state.retune(new_ref, 0);
                true
            } else {
                false
            }
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bind::BindTable;
    use crate::channel::Channel;
    use crate::environment::Environment;
    use crate::event::au::AuStates;
    use crate::master_params::MasterParams;
    use crate::module::Module;
    use crate::voice_pool::VoicePool;

    #[test]
    fn tempo_slide_trigger_sequence_matches_scenario() {
        let module = Module::new();
        let mut master = MasterParams::new(60.0);
        let mut channels = vec![Channel::new(0, 1)];
        let mut voices = VoicePool::new(4);
        let mut au_states = AuStates::new(1);
        let binds = BindTable::new();
        let env = Environment::new();
        let mut ctx = super::EventContext {
            module: &module,
            master: &mut master,
            channels: &mut channels,
            voices: &mut voices,
            au_states: &mut au_states,
            binds: &binds,
            environment: &env,
        };
        assert!(handle(&mut ctx, "m.t", &Value::from(120.0)));
        assert!(handle(&mut ctx, "m/=t", &Value::from(vec![4, 0])));
        ctx.master.step_tempo_slide(Tstamp::from_beats(2));
        assert!((ctx.master.tempo - 90.0).abs() < 1e-9);
    }
}
