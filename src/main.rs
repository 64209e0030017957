// src/main.rs
//
// Minimal host demo: build a one-instrument module, fire a note, render it.

use kunquat_engine::audio_unit::{AudioUnit, AudioUnitKind};
use kunquat_engine::connections::{Connections, ROOT_ID};
use kunquat_engine::module::Module;
use kunquat_engine::processor::Processor;
use kunquat_engine::processors::oscillators::Waveform;
use kunquat_engine::processors::Oscillator;
use kunquat_engine::Handle;

fn main() {
    let mut conn = Connections::new();
    conn.connect(0, 0, ROOT_ID, 0);
    conn.connect(0, 0, ROOT_ID, 1);

    let proc_table: Vec<Box<dyn Processor>> = vec![Box::new(Oscillator { waveform: Waveform::Sine })];
    let au = AudioUnit::new(AudioUnitKind::Instrument, proc_table, conn, 2).expect("build instrument");

    let mut module = Module::new();
    module.audio_units.push(au);

    let mut handle = Handle::new(module, 1, 2, 44100.0);
    handle.set_channel_audio_unit(0, 0);

    log::info!("firing note-on at channel 0");
    assert!(handle.fire_event(0, r#"["n+", 0]"#));

    let rendered = handle.render(512);
    println!("rendered {rendered} frames");

    let left = handle.get_audio(0).expect("left channel");
    let peak = left.iter().fold(0.0f32, |m, s| m.max(s.abs()));
    println!("peak amplitude on left channel: {peak:.4}");
}
