//! Audio Unit (§3): an instrument (produces voice signals from note-on
//! events) or an effect (processes mixed signals). Contains a processor
//! table, an internal connections graph, and — resolved from that graph at
//! compile time — the chains of voice-signal processors a single voice
//! renders through plus the mixed-signal plan for everything else.
//!
//! Grounded on the teacher's `graph.rs` (DAG evaluation) and `compile.rs`
//! (graph validation pass).

use std::collections::HashMap;

use crate::audio_buffer::AudioBuffer;
use crate::connections::{Connections, MixedSignalPlan, NodeId, ROOT_ID};
use crate::device_state::{DeviceState, RenderContext};
use crate::error::KunquatError;
use crate::processor::{Processor, SignalType};
use crate::work_buffer::WorkBuffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioUnitKind {
    Instrument,
    Effect,
}

/// An ordered run of voice-signal processors a single voice renders
/// through each block, ending where the signal is handed off to a
/// mixed-signal device (or the audio unit's root output directly).
#[derive(Debug, Clone)]
pub struct VoiceChain {
    pub procs: Vec<usize>,
    pub sink: NodeId,
    pub sink_port: usize,
}

pub struct AudioUnit {
    pub kind: AudioUnitKind,
    pub proc_table: Vec<Box<dyn Processor>>,
    pub connections: Connections,
    /// Control-rate signal sources, keyed by stream name (§3 Audio Unit
    /// "optional streams"): maps a name a channel's `.s`/`.sn` writes into
    /// `stream_values` to the `proc_table` index of the `Stream` processor
    /// that should receive it. Populated by `set_stream_source`, consumed
    /// in `render_voice_chain`.
    pub stream_map: HashMap<String, usize>,
    /// Numbered percussion triggers mapped to a voice chain index (§3 "hit
    /// map"). Populated by `set_hit`, consumed by the `hit` event handler.
    pub hit_map: HashMap<i64, usize>,

    plan: MixedSignalPlan,
    voice_chains: Vec<VoiceChain>,
    device_states: HashMap<NodeId, DeviceState>,
    out_channels: usize,
}

impl AudioUnit {
    pub fn new(kind: AudioUnitKind, proc_table: Vec<Box<dyn Processor>>, connections: Connections, out_channels: usize) -> Result<Self, KunquatError> {
        let plan = connections.build_plan()?;
        let voice_chains = Self::build_voice_chains(&proc_table, &connections);
        let mut device_states = HashMap::new();
        for level in &plan.levels {
            for task in level {
                if task.device == ROOT_ID {
                    device_states.insert(ROOT_ID, DeviceState::new(u32::MAX, &[out_channels]));
                    continue;
                }
                if let Some(proc) = proc_table.get(task.device) {
                    if proc.signal_type() == SignalType::Mixed {
                        let ch = proc.num_channels().max(1);
                        device_states.insert(task.device, DeviceState::new(task.device as u32, &[ch, ch]));
                    }
                }
            }
        }
        Ok(AudioUnit {
            kind,
            proc_table,
            connections,
            stream_map: HashMap::new(),
            hit_map: HashMap::new(),
            plan,
            voice_chains,
            device_states,
            out_channels,
        })
    }

    /// Resolves, for every edge ending at a non-Voice sink (a mixed-signal
    /// device or the root), the linear run of preceding Voice-signal
    /// processors feeding it, by walking backward through single-parent
    /// voice edges. Each such run becomes one `VoiceChain`.
    fn build_voice_chains(proc_table: &[Box<dyn Processor>], connections: &Connections) -> Vec<VoiceChain> {
        let is_voice = |n: NodeId| -> bool {
            n != ROOT_ID && proc_table.get(n).map(|p| p.signal_type() == SignalType::Voice).unwrap_or(false)
        };

        let mut chains = Vec::new();
        for edge in connections.edges_snapshot() {
            if is_voice(edge.dst) {
                continue; // not a chain terminator, covered while walking from its own sink
            }
            if !is_voice(edge.src) {
                continue; // mixed-to-mixed or root edge, not a voice chain
            }
            let mut procs = vec![edge.src];
            let mut cur = edge.src;
            while let Some(parent) = connections.single_voice_parent(cur, &is_voice) {
                procs.push(parent);
                cur = parent;
            }
            procs.reverse();
            chains.push(VoiceChain { procs, sink: edge.dst, sink_port: edge.dst_port });
        }
        chains
    }

    pub fn voice_chains(&self) -> &[VoiceChain] {
        &self.voice_chains
    }

    /// Wires a stream name to the `proc_table` slot that should receive it
    /// (normally a `Stream` processor's index), populating `stream_map`.
    pub fn set_stream_source(&mut self, name: impl Into<String>, proc_index: usize) {
        self.stream_map.insert(name.into(), proc_index);
    }

    /// Wires a numbered percussion trigger to the voice chain it should
    /// allocate, populating `hit_map`.
    pub fn set_hit(&mut self, hit_num: i64, chain_index: usize) {
        self.hit_map.insert(hit_num, chain_index);
    }

    pub fn create_chain_states(&self, chain_index: usize) -> Vec<crate::processor::ProcVoiceState> {
        self.voice_chains[chain_index]
            .procs
            .iter()
            .map(|&idx| self.proc_table[idx].create_voice_state())
            .collect()
    }

    /// Renders one voice through its chain, returning the minimum
    /// `new_stop` across the chain's processors (the point from which the
    /// whole chain has gone silent), and mixes the chain's output into its
    /// sink device's input port.
    pub fn render_voice_chain(
        &mut self,
        chain_index: usize,
        states: &mut [crate::processor::ProcVoiceState],
        wbs: &WorkBuffers,
        scratch: &mut AudioBuffer,
        start: usize,
        stop: usize,
        ctx: RenderContext,
        stream_values: &HashMap<String, f64>,
    ) -> usize {
        for (name, &idx) in &self.stream_map {
            if let Some(&value) = stream_values.get(name) {
                if let Some(proc) = self.proc_table.get_mut(idx) {
                    proc.receive_stream(value);
                }
            }
        }

        let chain = &self.voice_chains[chain_index];
        scratch.clear(start, stop);
        let mut cur_stop = stop;
        for (i, &proc_idx) in chain.procs.iter().enumerate() {
            let proc = &self.proc_table[proc_idx];
            cur_stop = proc.render_voice(&mut states[i], wbs, scratch, start, cur_stop, ctx);
            if cur_stop <= start {
                break;
            }
        }
        if let Some(sink_state) = self.device_states.get_mut(&chain.sink) {
            if let Some(port) = sink_state.ports.get_mut(chain.sink_port) {
                port.mix_from(scratch, start, cur_stop.max(start));
            }
        }
        cur_stop
    }

    /// Runs the mixed-signal plan for this block. Voice-signal
    /// contributions must already have been mixed in via
    /// `render_voice_chain` before this is called.
    pub fn render_mixed_plan(&mut self, wbs: &WorkBuffers, start: usize, stop: usize, ctx: RenderContext) {
        for level in &self.plan.levels {
            for task in level {
                if task.device == ROOT_ID {
                    continue;
                }
                let is_mixed = self.proc_table.get(task.device).map(|p| p.signal_type() == SignalType::Mixed).unwrap_or(false);
                if !is_mixed {
                    continue;
                }
                if let Some(dstate) = self.device_states.get_mut(&task.device) {
                    if let Some(proc) = self.proc_table.get_mut(task.device) {
                        proc.render_mixed(dstate, wbs, start, stop, ctx);
                    }
                }
            }
        }
    }

    pub fn clear_block(&mut self, start: usize, stop: usize) {
        for ds in self.device_states.values_mut() {
            ds.clear_all(start, stop);
        }
    }

    pub fn root_output(&self) -> Option<&AudioBuffer> {
        self.device_states.get(&ROOT_ID).and_then(|d| d.ports.first())
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }
}

impl std::fmt::Debug for AudioUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioUnit")
            .field("kind", &self.kind)
            .field("proc_count", &self.proc_table.len())
            .field("voice_chains", &self.voice_chains.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::Stream;

    #[test]
    fn stream_map_routes_channel_value_into_its_processor() {
        let mut conn = Connections::new();
        conn.connect(0, 0, ROOT_ID, 0);
        let proc_table: Vec<Box<dyn Processor>> = vec![Box::new(Stream::new(0.0))];
        let mut au = AudioUnit::new(AudioUnitKind::Instrument, proc_table, conn, 1).unwrap();
        au.set_stream_source("cutoff", 0);

        let mut states = au.create_chain_states(0);
        let wbs = WorkBuffers::new();
        let mut scratch = AudioBuffer::new(1);
        let ctx = RenderContext::new(44100.0, 120.0);
        let mut stream_values = HashMap::new();
        stream_values.insert("cutoff".to_string(), 1000.0);

        au.render_voice_chain(0, &mut states, &wbs, &mut scratch, 0, 4, ctx, &stream_values);

        let out = au.root_output().unwrap();
        assert_eq!(out.channel(0)[0], 1000.0);
    }

    #[test]
    fn stream_map_ignores_names_not_present_this_block() {
        let mut conn = Connections::new();
        conn.connect(0, 0, ROOT_ID, 0);
        let proc_table: Vec<Box<dyn Processor>> = vec![Box::new(Stream::new(7.0))];
        let mut au = AudioUnit::new(AudioUnitKind::Instrument, proc_table, conn, 1).unwrap();
        au.set_stream_source("cutoff", 0);

        let mut states = au.create_chain_states(0);
        let wbs = WorkBuffers::new();
        let mut scratch = AudioBuffer::new(1);
        let ctx = RenderContext::new(44100.0, 120.0);
        let stream_values = HashMap::new();

        au.render_voice_chain(0, &mut states, &wbs, &mut scratch, 0, 4, ctx, &stream_values);

        let out = au.root_output().unwrap();
        assert_eq!(out.channel(0)[0], 7.0);
    }
}
