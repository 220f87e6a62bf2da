//! Scheduled audio graph
//!
//! A small Web-Audio-shaped graph: nodes are created per note, connected
//! into a shared master gain, and driven by a sample clock. Scheduling is
//! done in absolute context time — note onsets, stops and parameter ramps
//! all carry `when` timestamps and the renderer honors them sample-
//! accurately, so the order calls are issued in never affects audible order.
//!
//! The graph core sits behind an `Arc<Mutex<_>>` shared between the
//! scheduling task and the audio callback; `AudioContext` is the cheap
//! clone-handle both sides hold. All per-note nodes are constructed fresh
//! and garbage-collected once their sources finish.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

pub type NodeId = usize;

/// Automatable parameter slots a node can expose to modulation inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    Gain,
    Detune,
    Frequency,
}

/// Timing context for one processed block.
#[derive(Debug, Clone, Copy)]
pub struct RenderWindow {
    /// Absolute context time of the block's first sample, seconds.
    pub start_time: f64,
    pub sample_rate: f32,
}

impl RenderWindow {
    pub fn time_at(&self, sample: usize) -> f64 {
        self.start_time + sample as f64 / self.sample_rate as f64
    }
}

/// A modulation buffer feeding one of the node's parameters this block.
pub struct ModInput<'a> {
    pub param: ParamKind,
    pub buffer: &'a [f32],
}

/// Block-based processing contract for every node in the graph.
pub trait AudioNode: Send {
    /// Process one block. `inputs` are the summable audio feeds, `mods` the
    /// parameter-modulation feeds; both are pre-rendered by dependencies.
    fn process(
        &mut self,
        inputs: &[&[f32]],
        mods: &[ModInput<'_>],
        output: &mut [f32],
        window: &RenderWindow,
    );

    /// Schedule the node to go silent at `at` (absolute context time).
    fn stop(&mut self, _at: f64) {}

    /// True once the node can never produce audio again and may be dropped.
    fn finished(&self, _now: f64) -> bool {
        false
    }

    fn name(&self) -> &str {
        "node"
    }
}

/// How a parameter moves toward an event's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RampKind {
    Set,
    Linear,
    Exponential,
}

#[derive(Debug, Clone, Copy)]
struct ParamEvent {
    time: f64,
    value: f32,
    kind: RampKind,
}

/// Immutable per-block view of a parameter's automation timeline.
#[derive(Debug, Clone)]
pub struct ParamCurve {
    initial: f32,
    events: Vec<ParamEvent>,
}

impl ParamCurve {
    pub fn value_at(&self, t: f64) -> f32 {
        let idx = self.events.partition_point(|e| e.time <= t);
        let (prev_time, prev_value) = match idx.checked_sub(1) {
            Some(i) => (self.events[i].time, self.events[i].value),
            None => (f64::NEG_INFINITY, self.initial),
        };
        let Some(next) = self.events.get(idx) else {
            return prev_value;
        };
        match next.kind {
            RampKind::Set => prev_value,
            RampKind::Linear => {
                if next.time <= prev_time {
                    return next.value;
                }
                let frac = ((t - prev_time) / (next.time - prev_time)).clamp(0.0, 1.0) as f32;
                prev_value + (next.value - prev_value) * frac
            }
            RampKind::Exponential => {
                if next.time <= prev_time || prev_value <= 0.0 || next.value <= 0.0 {
                    // Degenerate ramp falls back to a step at the endpoint.
                    return prev_value;
                }
                let frac = ((t - prev_time) / (next.time - prev_time)).clamp(0.0, 1.0) as f32;
                prev_value * (next.value / prev_value).powf(frac)
            }
        }
    }
}

/// Shared automation handle for one node parameter. Cloning shares the
/// underlying timeline, so effect processors can keep scheduling ramps on a
/// voice after it has been handed to the registry.
#[derive(Debug, Clone)]
pub struct Param {
    state: Arc<Mutex<ParamCurve>>,
}

impl Param {
    pub fn new(initial: f32) -> Self {
        Self {
            state: Arc::new(Mutex::new(ParamCurve {
                initial,
                events: Vec::new(),
            })),
        }
    }

    fn push(&self, event: ParamEvent) {
        let mut state = self.state.lock().unwrap();
        let idx = state.events.partition_point(|e| e.time <= event.time);
        state.events.insert(idx, event);
    }

    pub fn set_value_at(&self, value: f32, at: f64) {
        self.push(ParamEvent {
            time: at,
            value,
            kind: RampKind::Set,
        });
    }

    pub fn linear_ramp_to(&self, value: f32, at: f64) {
        self.push(ParamEvent {
            time: at,
            value,
            kind: RampKind::Linear,
        });
    }

    pub fn exponential_ramp_to(&self, value: f32, at: f64) {
        self.push(ParamEvent {
            time: at,
            value,
            kind: RampKind::Exponential,
        });
    }

    /// Freeze the currently scheduled value as an explicit event at `at`,
    /// anchoring a ramp that should start from "wherever the value is then".
    pub fn anchor(&self, at: f64) {
        let value = self.value_at(at);
        self.set_value_at(value, at);
    }

    pub fn value_at(&self, t: f64) -> f32 {
        self.state.lock().unwrap().value_at(t)
    }

    /// Snapshot for per-block evaluation without re-locking per sample.
    pub fn curve(&self) -> ParamCurve {
        self.state.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeKind {
    Audio,
    Param(ParamKind),
}

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: NodeId,
    to: NodeId,
    kind: EdgeKind,
}

struct NodeSlot {
    node: Box<dyn AudioNode>,
    /// Set once the node has ever had an audio input; a chain node whose
    /// feeds have all been collected is dead and can be dropped.
    ever_connected: bool,
}

struct GraphCore {
    nodes: HashMap<NodeId, NodeSlot>,
    edges: Vec<Edge>,
    next_id: NodeId,
    master: NodeId,
    sample_rate: f32,
    samples_rendered: u64,
}

impl GraphCore {
    fn add(&mut self, node: Box<dyn AudioNode>) -> NodeId {
        let id = self.next_id;
        self.next_id += 1;
        self.nodes.insert(
            id,
            NodeSlot {
                node,
                ever_connected: false,
            },
        );
        id
    }

    fn connect(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) {
        if kind == EdgeKind::Audio {
            if let Some(slot) = self.nodes.get_mut(&to) {
                slot.ever_connected = true;
            }
        }
        self.edges.push(Edge { from, to, kind });
    }

    fn disconnect(&mut self, from: NodeId, to: NodeId) {
        self.edges
            .retain(|e| !(e.from == from && e.to == to && e.kind == EdgeKind::Audio));
    }

    fn current_time(&self) -> f64 {
        self.samples_rendered as f64 / self.sample_rate as f64
    }

    /// Dependency-ordered node list, everything feeding the master output.
    fn order(&self) -> Vec<NodeId> {
        let mut incoming: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
        for edge in &self.edges {
            incoming.entry(edge.to).or_default().push(edge.from);
        }

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut done: HashSet<NodeId> = HashSet::new();
        let mut in_progress: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<(NodeId, usize)> = vec![(self.master, 0)];
        in_progress.insert(self.master);

        while let Some((id, idx)) = stack.last_mut() {
            let deps = incoming.get(id).map(|v| v.as_slice()).unwrap_or(&[]);
            if let Some(&dep) = deps.get(*idx) {
                *idx += 1;
                if self.nodes.contains_key(&dep)
                    && !done.contains(&dep)
                    && !in_progress.contains(&dep)
                {
                    in_progress.insert(dep);
                    stack.push((dep, 0));
                }
            } else {
                done.insert(*id);
                order.push(*id);
                stack.pop();
            }
        }
        order
    }

    fn process(&mut self, out: &mut [f32]) {
        let n = out.len();
        let window = RenderWindow {
            start_time: self.current_time(),
            sample_rate: self.sample_rate,
        };

        let order = self.order();
        let mut buffers: HashMap<NodeId, Vec<f32>> = HashMap::with_capacity(order.len());

        for id in order {
            let incoming: Vec<(NodeId, EdgeKind)> = self
                .edges
                .iter()
                .filter(|e| e.to == id)
                .map(|e| (e.from, e.kind))
                .collect();

            let inputs: Vec<&[f32]> = incoming
                .iter()
                .filter(|(_, kind)| *kind == EdgeKind::Audio)
                .filter_map(|(from, _)| buffers.get(from).map(|b| b.as_slice()))
                .collect();
            let mods: Vec<ModInput<'_>> = incoming
                .iter()
                .filter_map(|(from, kind)| match kind {
                    EdgeKind::Param(param) => buffers.get(from).map(|b| ModInput {
                        param: *param,
                        buffer: b.as_slice(),
                    }),
                    EdgeKind::Audio => None,
                })
                .collect();

            let mut output = vec![0.0f32; n];
            if let Some(slot) = self.nodes.get_mut(&id) {
                slot.node.process(&inputs, &mods, &mut output, &window);
            }
            drop(inputs);
            drop(mods);
            buffers.insert(id, output);
        }

        match buffers.get(&self.master) {
            Some(buf) => out.copy_from_slice(buf),
            None => out.fill(0.0),
        }

        self.samples_rendered += n as u64;
        self.collect_garbage();
    }

    fn collect_garbage(&mut self) {
        let now = self.current_time();
        loop {
            let mut dead: Vec<NodeId> = self
                .nodes
                .iter()
                .filter(|(id, slot)| **id != self.master && slot.node.finished(now))
                .map(|(id, _)| *id)
                .collect();

            let has_audio_in = |edges: &[Edge], id: NodeId| {
                edges
                    .iter()
                    .any(|e| e.to == id && e.kind == EdgeKind::Audio)
            };
            dead.extend(
                self.nodes
                    .iter()
                    .filter(|(id, slot)| {
                        **id != self.master
                            && slot.ever_connected
                            && !has_audio_in(&self.edges, **id)
                    })
                    .map(|(id, _)| *id),
            );

            if dead.is_empty() {
                break;
            }
            for id in dead {
                self.nodes.remove(&id);
                self.edges.retain(|e| e.from != id && e.to != id);
            }
        }
    }
}

/// Clone-handle to the shared graph. One exists per playback session plus
/// one captured by the audio callback.
#[derive(Clone)]
pub struct AudioContext {
    core: Arc<Mutex<GraphCore>>,
    sample_rate: f32,
    master: NodeId,
    master_gain: Param,
}

impl AudioContext {
    pub fn new(sample_rate: f32) -> Self {
        let mut core = GraphCore {
            nodes: HashMap::new(),
            edges: Vec::new(),
            next_id: 0,
            master: 0,
            sample_rate,
            samples_rendered: 0,
        };
        let master_node = crate::nodes::GainNode::new(1.0);
        let master_gain = master_node.param();
        let master = core.add(Box::new(master_node));
        core.master = master;
        Self {
            core: Arc::new(Mutex::new(core)),
            sample_rate,
            master,
            master_gain,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Absolute time of the next sample the renderer will produce.
    pub fn current_time(&self) -> f64 {
        self.core.lock().unwrap().current_time()
    }

    /// Terminal gain node every voice and effect chain feeds into.
    pub fn master(&self) -> NodeId {
        self.master
    }

    pub fn master_gain(&self) -> &Param {
        &self.master_gain
    }

    pub fn add(&self, node: Box<dyn AudioNode>) -> NodeId {
        self.core.lock().unwrap().add(node)
    }

    pub fn connect(&self, from: NodeId, to: NodeId) {
        self.core.lock().unwrap().connect(from, to, EdgeKind::Audio);
    }

    /// Feed `from`'s output into one of `to`'s parameters (additively).
    pub fn connect_to_param(&self, from: NodeId, to: NodeId, param: ParamKind) {
        self.core
            .lock()
            .unwrap()
            .connect(from, to, EdgeKind::Param(param));
    }

    pub fn disconnect(&self, from: NodeId, to: NodeId) {
        self.core.lock().unwrap().disconnect(from, to);
    }

    /// Schedule a node to go silent at `at`. Unknown ids (already
    /// collected) are ignored.
    pub fn stop_node(&self, id: NodeId, at: f64) {
        if let Some(slot) = self.core.lock().unwrap().nodes.get_mut(&id) {
            slot.node.stop(at);
        }
    }

    /// Render one block into `out`, advancing the context clock.
    pub fn process_block(&self, out: &mut [f32]) {
        self.core.lock().unwrap().process(out);
    }

    /// Render `frames` samples in scheduler-friendly chunks.
    pub fn render(&self, frames: usize) -> Vec<f32> {
        let mut out = vec![0.0f32; frames];
        for chunk in out.chunks_mut(512) {
            self.process_block(chunk);
        }
        out
    }
}
