pub mod curve;
mod forces;
pub mod hotspot;
pub mod placement;
mod types;
pub use types::*;

use crate::config::{ForceWeights, LayoutConfig};
use crate::error::{Diagnostic, Diagnostics};
use crate::ir::{Graph, Node, TypeTag};
use curve::EdgeCurve;
use forces::CollisionBodies;
use glam::Vec2;
use hotspot::{HotspotRouter, PairKey};
use std::collections::{BTreeMap, HashMap};

/// Tick-driven force layout over the active graph.
///
/// Each tick runs, for every node that is neither pinned nor dragged: collision,
/// cluster gravity, hotspot straightness, shortness and finally centering.
#[derive(Debug, Clone)]
pub struct Simulation {
    graph: Graph,
    config: LayoutConfig,
    state: RunState,
    router: HotspotRouter,
    dragged: Option<String>,
    ticks: u64,
}

impl Simulation {
    pub fn new(config: LayoutConfig) -> Self {
        let router = HotspotRouter::new(config.hotspot_gap);
        Self {
            graph: Graph::new(),
            config,
            state: RunState::Running,
            router,
            dragged: None,
            ticks: 0,
        }
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Installs a freshly derived active graph and returns the previous one.
    /// Hotspot claims are rebuilt from the slots carried on the label nodes;
    /// a label whose slot is already taken picks a new one on the next tick.
    pub fn replace_graph(&mut self, graph: Graph) -> Graph {
        self.router.reset();
        let previous = std::mem::replace(&mut self.graph, graph);
        for node in self.graph.nodes_mut() {
            let Some(info) = node.edge.as_mut() else {
                continue;
            };
            let Some(slot) = info.hotspot else {
                continue;
            };
            let pair = PairKey::new(&info.source_id, &info.target_id);
            if !self.router.restore(&node.id, &pair, slot) {
                info.hotspot = None;
            }
        }
        if let Some(id) = self.dragged.as_deref()
            && !self.graph.contains(id)
        {
            log::debug!("drag target {id} left the active graph");
            self.dragged = None;
        }
        previous
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn pause(&mut self) {
        self.state = RunState::Paused;
    }

    pub fn resume(&mut self) {
        self.state = RunState::Running;
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn set_forces(&mut self, weights: ForceWeights) {
        self.config.forces = weights.clamped();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            log::warn!("ignoring viewport resize to {width}x{height}");
            return;
        }
        self.config.width = width;
        self.config.height = height;
    }

    /// Home slot of every type that has an entity or cluster in the active graph.
    pub fn home_slots(&self) -> BTreeMap<TypeTag, Vec2> {
        placement::home_slots(&self.graph.rendered_types(), self.config.home_ring_radius())
    }

    pub fn node_state(&self, id: &str) -> Option<NodeState> {
        let node = self.graph.node(id)?;
        Some(NodeState {
            pinned: node.pinned,
            dragged: self.dragged.as_deref() == Some(id),
        })
    }

    pub fn dragged(&self) -> Option<&str> {
        self.dragged.as_deref()
    }

    pub fn start_drag(&mut self, id: &str) -> Result<(), Diagnostic> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| Diagnostic::UnknownNode(id.to_string()))?;
        node.vel = Vec2::ZERO;
        self.dragged = Some(id.to_string());
        Ok(())
    }

    /// Moves the dragged node. Non-finite positions are rejected.
    pub fn update_drag(&mut self, pos: Vec2) -> Result<(), Diagnostic> {
        let Some(id) = self.dragged.as_deref() else {
            log::debug!("drag update without an active drag");
            return Ok(());
        };
        if !pos.is_finite() {
            return Err(Diagnostic::DegenerateGeometry {
                node: id.to_string(),
                detail: "non-finite drag position",
            });
        }
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| Diagnostic::UnknownNode(id.to_string()))?;
        node.pos = pos;
        node.vel = Vec2::ZERO;
        Ok(())
    }

    /// Releases the dragged node. A pinned node stays where it was dropped.
    pub fn end_drag(&mut self) {
        self.dragged = None;
    }

    /// Flips the pin flag and returns the new value.
    pub fn toggle_pin(&mut self, id: &str) -> Result<bool, Diagnostic> {
        let node = self
            .graph
            .node_mut(id)
            .ok_or_else(|| Diagnostic::UnknownNode(id.to_string()))?;
        node.pinned = !node.pinned;
        node.vel = Vec2::ZERO;
        Ok(node.pinned)
    }

    /// Advances one tick. A paused simulation does not move and reports nothing.
    pub fn step(&mut self, diagnostics: &mut Diagnostics) -> TickReport {
        if self.state == RunState::Paused {
            return TickReport::default();
        }
        let fixed = self.fixed_mask();
        let before: Vec<Vec2> = self.graph.nodes().iter().map(|node| node.pos).collect();

        self.apply_collisions(&fixed);
        self.apply_cluster_gravity(&fixed);
        self.apply_edge_forces(&fixed, diagnostics);
        self.apply_centering(&fixed);
        self.ticks += 1;

        self.settle(&before, diagnostics)
    }

    /// Steps until a tick moves nothing or `max_ticks` is reached.
    pub fn run(&mut self, max_ticks: usize, diagnostics: &mut Diagnostics) -> TickReport {
        let mut report = TickReport::default();
        for _ in 0..max_ticks {
            report = self.step(diagnostics);
            if report.is_settled() {
                break;
            }
        }
        report
    }

    pub fn frame(&self) -> RenderFrame {
        let dragged = self.dragged.as_deref();
        let nodes = self
            .graph
            .nodes()
            .iter()
            .map(|node| NodePlacement::from_node(node, dragged == Some(node.id.as_str())))
            .collect();

        let edges = self
            .graph
            .edge_labels()
            .filter_map(|label| {
                let info = label.edge.as_ref()?;
                let source = self.graph.node(&info.source_id)?;
                let target = self.graph.node(&info.target_id)?;
                Some(EdgePlacement {
                    link_id: info.link_id.clone(),
                    source_id: info.source_id.clone(),
                    target_id: info.target_id.clone(),
                    relation_tag: info.relation_tag.clone(),
                    hotspot: info.hotspot,
                    curve: EdgeCurve::through(source.pos, label.pos, target.pos).oriented(),
                })
            })
            .collect();

        RenderFrame {
            tick: self.ticks,
            state: self.state,
            width: self.config.width,
            height: self.config.height,
            nodes,
            edges,
        }
    }

    fn fixed_mask(&self) -> Vec<bool> {
        let dragged = self.dragged.as_deref();
        self.graph
            .nodes()
            .iter()
            .map(|node| node.pinned || dragged == Some(node.id.as_str()))
            .collect()
    }

    fn apply_collisions(&mut self, fixed: &[bool]) {
        let nodes = self.graph.nodes();
        let positions: Vec<Vec2> = nodes.iter().map(|node| node.pos).collect();
        let radii: Vec<f32> = nodes.iter().map(|node| node.outer_radius).collect();
        let masses: Vec<f32> = nodes
            .iter()
            .map(|node| node.radius.max(1.0).powi(2))
            .collect();
        let mut pushes = vec![Vec2::ZERO; positions.len()];
        forces::accumulate_collisions(
            &CollisionBodies {
                positions: &positions,
                radii: &radii,
                masses: &masses,
                fixed,
            },
            self.config.collision_strength,
            &mut pushes,
        );

        let keep = 1.0 - self.config.velocity_decay.clamp(0.0, 1.0);
        for ((node, push), is_fixed) in self.graph.nodes_mut().iter_mut().zip(pushes).zip(fixed) {
            if *is_fixed {
                node.vel = Vec2::ZERO;
                continue;
            }
            node.vel = (node.vel + push) * keep;
            node.pos += node.vel;
        }
    }

    fn apply_cluster_gravity(&mut self, fixed: &[bool]) {
        let alpha = self.config.forces.cluster_gravity;
        if alpha <= 0.0 {
            return;
        }
        let homes = self.home_slots();
        for (node, is_fixed) in self.graph.nodes_mut().iter_mut().zip(fixed) {
            if *is_fixed || node.is_edge_label() {
                continue;
            }
            if let Some(home) = homes.get(&node.type_tag) {
                node.pos += forces::cluster_pull(node.pos, *home, node.outer_radius, alpha);
            }
        }
    }

    fn apply_edge_forces(&mut self, fixed: &[bool], diagnostics: &mut Diagnostics) {
        let mut pair_counts: HashMap<PairKey, usize> = HashMap::new();
        let labels: Vec<(usize, String, PairKey)> = self
            .graph
            .nodes()
            .iter()
            .enumerate()
            .filter_map(|(idx, node)| {
                let info = node.edge.as_ref()?;
                let pair = PairKey::new(&info.source_id, &info.target_id);
                *pair_counts.entry(pair.clone()).or_insert(0) += 1;
                Some((idx, node.id.clone(), pair))
            })
            .collect();

        let mut targets: Vec<(usize, Option<usize>, Option<Vec2>)> =
            Vec::with_capacity(labels.len());
        for (idx, id, pair) in &labels {
            let endpoints = (
                self.graph.node(pair.first()).map(|node| node.pos),
                self.graph.node(pair.second()).map(|node| node.pos),
            );
            let (Some(first), Some(second)) = endpoints else {
                continue;
            };
            let slots = pair_counts.get(pair).copied().unwrap_or(1);
            let current = self.graph.nodes()[*idx].pos;

            let mut slot = self.router.assign(id, pair, first, second, slots, current);
            if slot.is_none() {
                let graph = &self.graph;
                let released = self
                    .router
                    .release_stale(|label| graph.node(label).is_some_and(Node::is_edge_label));
                log::debug!("released {released} stale hotspot claims");
                slot = self.router.assign(id, pair, first, second, slots, current);
            }
            if slot.is_none() {
                diagnostics.push(Diagnostic::SlotExhaustion {
                    label: id.clone(),
                    first: pair.first().to_string(),
                    second: pair.second().to_string(),
                });
            }
            targets.push((*idx, slot, self.router.target(id, first, second, slots)));
        }

        let beta = self.config.forces.edge_straightness;
        for (idx, slot, target) in targets {
            let node = &mut self.graph.nodes_mut()[idx];
            if let Some(info) = node.edge.as_mut() {
                info.hotspot = slot;
            }
            if fixed[idx] {
                continue;
            }
            if let Some(target) = target {
                node.pos += forces::pull_toward(node.pos, target, beta);
            }
        }

        let gamma = self.config.forces.edge_shortness;
        if gamma <= 0.0 {
            return;
        }
        let shifts: Vec<(usize, Vec2)> = self
            .graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(idx, node)| !fixed[*idx] && !node.is_edge_label())
            .filter_map(|(idx, node)| {
                let center = forces::centroid(
                    self.graph
                        .neighbors(&node.id)
                        .into_iter()
                        .filter_map(|id| self.graph.node(id))
                        .filter(|neighbor| neighbor.is_edge_label())
                        .map(|neighbor| neighbor.pos),
                )?;
                Some((idx, forces::pull_toward(node.pos, center, gamma)))
            })
            .collect();
        let nodes = self.graph.nodes_mut();
        for (idx, shift) in shifts {
            nodes[idx].pos += shift;
        }
    }

    fn apply_centering(&mut self, fixed: &[bool]) {
        let strength = self.config.center_strength;
        if strength <= 0.0 {
            return;
        }
        let Some(center) = forces::centroid(self.graph.nodes().iter().map(|node| node.pos)) else {
            return;
        };
        let shift = -center * strength;
        for (node, is_fixed) in self.graph.nodes_mut().iter_mut().zip(fixed) {
            if !*is_fixed {
                node.pos += shift;
            }
        }
    }

    /// Discards non-finite results and measures how far nodes moved.
    fn settle(&mut self, before: &[Vec2], diagnostics: &mut Diagnostics) -> TickReport {
        let epsilon = self.config.settle_epsilon;
        let mut report = TickReport::default();
        for (node, previous) in self.graph.nodes_mut().iter_mut().zip(before) {
            if !node.pos.is_finite() || !node.vel.is_finite() {
                node.pos = *previous;
                node.vel = Vec2::ZERO;
                diagnostics.push(Diagnostic::DegenerateGeometry {
                    node: node.id.clone(),
                    detail: "non-finite position discarded",
                });
                continue;
            }
            let moved = node.pos.distance(*previous);
            if moved > epsilon {
                report.moved += 1;
            }
            report.max_displacement = report.max_displacement.max(moved);
        }
        report
    }
}
