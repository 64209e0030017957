//! `general`/`control`-category event handlers (§4.6): comments, pauses,
//! and playback control.

use serde_json::Value;

use crate::tstamp::Tstamp;

use super::EventContext;

fn arg_tstamp(arg: &Value) -> Option<Tstamp> {
    let arr = arg.as_array()?;
    let beats = arr.first()?.as_i64()?;
    let rem = arr.get(1).and_then(|v| v.as_i64()).unwrap_or(0);
    Some(Tstamp::new(beats, rem))
}

pub fn handle(ctx: &mut EventContext, name: &str, arg: &Value) -> bool {
    match name {
        "#" => true, // comment: recorded in the event buffer, otherwise inert
        // `w`: pause for a Tstamp `[beats, rem]`, added to `delay_left`;
        // `Player::render_chunk` consults it to hold off the next row's
        // trigger until the delay has elapsed.
        "w" => {
            let Some(delay) = arg_tstamp(arg) else { return false };
            ctx.master.delay_left = ctx.master.delay_left + delay;
            true
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
    fn w_accumulates_into_delay_left() {
        let module = Module::new();
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
        assert!(handle(&mut ctx, "w", &Value::from(vec![1, 0])));
        assert_eq!(ctx.master.delay_left, Tstamp::from_beats(1));
        assert!(handle(&mut ctx, "w", &Value::from(vec![1, 0])));
        assert_eq!(ctx.master.delay_left, Tstamp::from_beats(2));
    }

    #[test]
    fn comment_is_always_a_no_op_success() {
        let module = Module::new();
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
        assert!(handle(&mut ctx, "#", &Value::from("note to self")));
    }
}
