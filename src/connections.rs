//! Connections graph (§3, §4.5): a DAG over devices (processors within an
//! audio unit, or audio units at module level). Grounded on the teacher's
//! `graph.rs::eval_node` recursive evaluation and `compile.rs`'s graph
//! validation, reshaped into the spec's explicit level-bucketed plan
//! instead of per-call recursion.

use std::collections::HashMap;

use crate::error::KunquatError;

pub type NodeId = usize;

/// Reserved id for the graph's terminal sink: an audio unit's declared
/// output port, or the module-level audio-driver buffer.
pub const ROOT_ID: NodeId = usize::MAX;

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub src: NodeId,
    pub src_port: usize,
    pub dst: NodeId,
    pub dst_port: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Connections {
    nodes: Vec<NodeId>,
    edges: Vec<Edge>,
}

/// One device's work item within a level: which input ports pull from
/// which other device's output ports.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub device: NodeId,
    pub inputs: Vec<(usize, NodeId, usize)>,
}

/// Per-level task lists, ordered from the highest level (pure sources)
/// down to level 0 (the root sink) — the order `render` executes in.
#[derive(Debug, Clone, Default)]
pub struct MixedSignalPlan {
    pub levels: Vec<Vec<TaskInfo>>,
}

impl Connections {
    pub fn new() -> Self {
        Connections { nodes: vec![ROOT_ID], edges: Vec::new() }
    }

    pub fn add_node(&mut self, id: NodeId) {
        if !self.nodes.contains(&id) {
            self.nodes.push(id);
        }
    }

    pub fn connect(&mut self, src: NodeId, src_port: usize, dst: NodeId, dst_port: usize) {
        self.add_node(src);
        self.add_node(dst);
        self.edges.push(Edge { src, src_port, dst, dst_port });
    }

    fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.src == node)
    }

    pub fn incoming(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.dst == node)
    }

    pub fn edges_snapshot(&self) -> &[Edge] {
        &self.edges
    }

    /// If `node` has exactly one incoming edge whose source passes
    /// `is_voice`, returns that source — used to walk a voice-signal chain
    /// backward to its start. Ambiguous (more than one voice-signal
    /// parent) or absent parents return `None`, ending the chain there.
    pub fn single_voice_parent(&self, node: NodeId, is_voice: &dyn Fn(NodeId) -> bool) -> Option<NodeId> {
        let mut found = None;
        for e in self.incoming(node) {
            if is_voice(e.src) {
                if found.is_some() {
                    return None;
                }
                found = Some(e.src);
            }
        }
        found
    }

    /// Assigns each node a level such that every edge goes from a higher
    /// level (source) to a lower level (sink), with the root sink at 0:
    /// `level(source) = level(sink) + 1` along every edge, computed as the
    /// longest path from the node down to the root. Detects cycles.
    fn levelize(&self) -> Result<HashMap<NodeId, u32>, KunquatError> {
        let mut levels = HashMap::new();
        let mut visiting = std::collections::HashSet::new();

        fn visit(
            node: NodeId,
            conn: &Connections,
            levels: &mut HashMap<NodeId, u32>,
            visiting: &mut std::collections::HashSet<NodeId>,
        ) -> Result<u32, KunquatError> {
            if let Some(&l) = levels.get(&node) {
                return Ok(l);
            }
            if !visiting.insert(node) {
                return Err(KunquatError::format("cycle detected in connections graph"));
            }
            let mut max_dst_level = None;
            for e in conn.outgoing(node) {
                let dst_level = visit(e.dst, conn, levels, visiting)?;
                max_dst_level = Some(max_dst_level.map_or(dst_level, |m: u32| m.max(dst_level)));
            }
            visiting.remove(&node);
            let level = match max_dst_level {
                Some(m) => m + 1,
                None => 0,
            };
            levels.insert(node, level);
            Ok(level)
        }

        for &n in &self.nodes {
            visit(n, self, &mut levels, &mut visiting)?;
        }
        Ok(levels)
    }

    pub fn build_plan(&self) -> Result<MixedSignalPlan, KunquatError> {
        let levels = self.levelize()?;
        let max_level = levels.values().copied().max().unwrap_or(0);

        let mut buckets: Vec<Vec<TaskInfo>> = (0..=max_level).map(|_| Vec::new()).collect();
        for &node in &self.nodes {
            let level = levels[&node];
            let inputs = self
                .incoming(node)
                .map(|e| (e.dst_port, e.src, e.src_port))
                .collect::<Vec<_>>();
            buckets[level as usize].push(TaskInfo { device: node, inputs });
        }

        // Execution order is max_level down to 0.
        buckets.reverse();
        Ok(MixedSignalPlan { levels: buckets })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_chain_gets_increasing_levels_toward_source() {
        let mut conn = Connections::new();
        conn.connect(1, 0, 2, 0);
        conn.connect(2, 0, ROOT_ID, 0);
        let plan = conn.build_plan().unwrap();
        // Highest level first: node 1 (pure source) renders before node 2,
        // which renders before the root.
        assert_eq!(plan.levels[0][0].device, 1);
        assert_eq!(plan.levels.last().unwrap()[0].device, ROOT_ID);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut conn = Connections::new();
        conn.connect(1, 0, 2, 0);
        conn.connect(2, 0, 1, 0);
        assert!(conn.build_plan().is_err());
    }

    #[test]
    fn every_node_visited_exactly_once() {
        let mut conn = Connections::new();
        conn.connect(1, 0, ROOT_ID, 0);
        conn.connect(2, 0, ROOT_ID, 1);
        let plan = conn.build_plan().unwrap();
        let total: usize = plan.levels.iter().map(|l| l.len()).sum();
        assert_eq!(total, 3); // 1, 2, ROOT_ID
    }
}
