//! Event names table and dispatch (§4.6): string → category lookup plus a
//! `trigger` entry point mutating Master/Channel/Au state in response to a
//! fired event.
//!
//! Grounded on the teacher's `state/command.rs` (a `Command` enum dispatched
//! through a table) and `node_factory.rs`'s name-keyed registry pattern;
//! replaces the original's X-macro event table with the compile-time array
//! design note §9 calls for.

pub mod au;
pub mod channel;
pub mod general;
pub mod master;

use serde_json::Value;

use crate::bind::BindTable;
use crate::environment::Environment;
use crate::event::au::AuStates;
use crate::master_params::MasterParams;
use crate::module::Module;
use crate::trigger::EventType;
use crate::voice_pool::VoicePool;

/// One row of the event names table: an event's category, and — when
/// present — the category of name it implicitly sets as "active" (§4.6
/// step 3), e.g. `.sn` sets the active stream name consulted by `.s`.
#[derive(Debug, Clone, Copy)]
pub struct EventSpec {
    pub name: &'static str,
    pub event_type: EventType,
    pub name_setter: Option<crate::channel::NameCategory>,
}

macro_rules! event_table {
    ($(($name:expr, $ty:ident $(, $setter:expr)?)),+ $(,)?) => {
        &[$(EventSpec { name: $name, event_type: EventType::$ty, name_setter: event_table!(@setter $($setter)?) }),+]
    };
    (@setter) => { None };
    (@setter $setter:expr) => { Some($setter) };
}

use crate::channel::NameCategory;

/// The recognised event names (§4.6, §2 L8). Not every name the original
/// system's ~120-entry table carries is reproduced — only those whose
/// semantics are described in §4.6/§4.7/§4.8/glossary — but the table is
/// extended the same way for any additional name: add a row here and a
/// match arm in the category handler.
pub static EVENT_TABLE: &[EventSpec] = event_table![
    ("n+", Channel),
    ("n-", Channel),
    ("hit", Channel),
    (".an", Channel, NameCategory::Stream), // arpeggio name placeholder (unused directly)
    ("a+", Channel),
    ("a-", Channel),
    ("a.t", Channel),
    ("a.s", Channel),
    ("v+", Channel),
    ("v-", Channel),
    ("v.s", Channel),
    ("v.d", Channel),
    ("t+", Channel),
    ("t-", Channel),
    ("t.s", Channel),
    ("t.d", Channel),
    ("f.f", Channel),
    ("p.f", Channel),
    ("fc.f", Channel),
    (".sn", Channel, NameCategory::Stream),
    (".s", Channel),
    ("->s+", Channel),
    ("->s-", Channel),
    (".cvn", Channel, NameCategory::ControlVar),
    (".cv", Channel),
    (".en", Channel, NameCategory::Expression),
    ("ch.dev", Channel, NameCategory::DeviceEvent),
    ("m.t", Master),
    ("m/=t", Master),
    ("m.v", Master),
    ("mj", Master),
    ("mg", Master),
    ("m.r", Master),
    ("au.byp", Au),
    ("au.sus", Au),
    ("au.dev", Au),
    ("#", General),
    ("w", General),
];

pub fn lookup(name: &str) -> Option<&'static EventSpec> {
    EVENT_TABLE.iter().find(|s| s.name == name)
}

/// Mutable state a fired trigger may touch, threaded through instead of a
/// god object so each category handler only borrows what it needs.
pub struct EventContext<'a> {
    pub module: &'a Module,
    pub master: &'a mut MasterParams,
    pub channels: &'a mut [crate::channel::Channel],
    pub voices: &'a mut VoicePool,
    pub au_states: &'a mut AuStates,
    pub binds: &'a BindTable,
    pub environment: &'a Environment,
}

/// §4.6 `trigger(ch_num, name, arg_value) -> success`. Bind expansion
/// (§4.10 inserted step) runs first: the event and everything it binds to
/// are all dispatched here, in order, before the caller moves on.
pub fn trigger(ctx: &mut EventContext, ch_num: usize, name: &str, arg: Value) -> bool {
    let expansions = ctx.binds.expand(name, arg);
    let mut any_ok = false;
    for (event_name, raw_arg) in expansions {
        let rng = if ch_num < ctx.channels.len() { Some(&mut ctx.channels[ch_num].rng) } else { None };
        let evaluated = match rng {
            Some(rng) => ctx.environment.evaluate(&raw_arg, rng),
            None => raw_arg,
        };
        any_ok |= dispatch_one(ctx, ch_num, &event_name, evaluated);
    }
    any_ok
}

fn dispatch_one(ctx: &mut EventContext, ch_num: usize, name: &str, arg: Value) -> bool {
    let Some(spec) = lookup(name) else { return false };

    if let Some(cat) = spec.name_setter {
        if let Some(ch) = ctx.channels.get_mut(ch_num) {
            if let Value::String(s) = &arg {
                ch.set_active_name(cat, s.clone());
            }
        }
    }

    match spec.event_type {
        EventType::Master => master::handle(ctx, name, &arg),
        EventType::Channel => channel::handle(ctx, ch_num, name, &arg),
        EventType::Au => au::handle(ctx, ch_num, name, &arg),
        EventType::General | EventType::Control => general::handle(ctx, name, &arg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_known_event() {
        assert!(lookup("n+").is_some());
    }

    #[test]
    fn lookup_rejects_unknown_event() {
        assert!(lookup("nonexistent").is_none());
    }
}
