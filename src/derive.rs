use crate::cluster::ClusterTable;
use crate::compress::{CompressionStats, compress};
use crate::config::Config;
use crate::error::{Diagnostic, Diagnostics};
use crate::ir::{Graph, Node, TypeTag};
use crate::layout::placement;
use glam::Vec2;
use std::collections::{HashMap, HashSet};

/// Half-width of the deterministic offset given to freshly placed nodes.
const PLACEMENT_JITTER: f32 = 12.0;

/// Result of one derivation pass.
#[derive(Debug, Clone)]
pub struct Derivation {
    pub graph: Graph,
    pub stats: CompressionStats,
    /// Elements taken by score before closure.
    pub pre_closure_count: usize,
    pub collapsed_types: Vec<TypeTag>,
    /// Ids of nodes that got a fresh start position: new nodes and carried
    /// nodes whose old position was not finite.
    pub placed: Vec<String>,
}

/// Derives the next active graph from the base graph.
///
/// Runs focus restriction, scoring, selection and clustering. Nodes that exist in
/// `previous` (or were hidden in a cluster) keep their position, velocity, radii
/// and pin flag. Everything else is sized and placed near its type's home slot.
pub fn derive(
    base: &Graph,
    focus: Option<&str>,
    config: &Config,
    previous: &Graph,
    clusters: &mut ClusterTable,
    diagnostics: &mut Diagnostics,
) -> Derivation {
    let mut scoped = match focus {
        Some(id) => match base.connected_component(id) {
            Some(component) => base.induced(&component.nodes),
            None => {
                diagnostics.push(Diagnostic::UnknownNode(id.to_string()));
                base.clone()
            }
        },
        None => base.clone(),
    };

    let selection = compress(&mut scoped, &config.compression, diagnostics);
    let mut active = scoped.subgraph(&selection);

    let fresh = carry_over(&mut active, previous, clusters, |id| scoped.degree(id), config);
    place_new_nodes(&mut active, &fresh, config, diagnostics);

    let collapsed_types = clusters.collapse_isolated(&mut active, &config.nodes);
    for node in active.nodes_mut().iter_mut().filter(|node| node.is_cluster()) {
        if let Some(prior) = previous.node(&node.id)
            && prior.pos.is_finite()
        {
            node.pos = prior.pos;
            node.vel = prior.vel;
            node.pinned = prior.pinned;
        }
    }

    if !clusters.is_exclusive(&active) {
        diagnostics.push(Diagnostic::InvariantViolation(
            "cluster node and members active together".to_string(),
        ));
    }
    if let Some(link) = active
        .links()
        .iter()
        .find(|link| !active.contains(&link.source_id) || !active.contains(&link.target_id))
    {
        diagnostics.push(Diagnostic::InvariantViolation(format!(
            "link {} is not closed",
            link.link_id
        )));
    }

    log::info!(
        "derived {} active nodes ({} new, {} clusters)",
        active.len(),
        fresh.len(),
        collapsed_types.len()
    );

    Derivation {
        graph: active,
        stats: selection.stats,
        pre_closure_count: selection.pre_closure_count,
        collapsed_types,
        placed: fresh,
    }
}

/// Copies simulation state onto persisting nodes and sizes the rest.
/// Returns the ids that still need a position, entities first.
fn carry_over(
    active: &mut Graph,
    previous: &Graph,
    clusters: &ClusterTable,
    degree: impl Fn(&str) -> usize,
    config: &Config,
) -> Vec<String> {
    let mut prior: HashMap<&str, &Node> = clusters
        .hidden_members()
        .map(|node| (node.id.as_str(), node))
        .collect();
    prior.extend(previous.nodes().iter().map(|node| (node.id.as_str(), node)));

    let mut fresh_entities = Vec::new();
    let mut fresh_labels = Vec::new();
    for node in active.nodes_mut() {
        if let Some(old) = prior.get(node.id.as_str()) {
            node.pos = old.pos;
            node.vel = old.vel;
            node.radius = old.radius;
            node.outer_radius = old.outer_radius;
            node.pinned = old.pinned;
            if let (Some(info), Some(old_info)) = (node.edge.as_mut(), old.edge.as_ref()) {
                info.hotspot = old_info.hotspot;
            }
            if old.pos.is_finite() {
                continue;
            }
            node.vel = Vec2::ZERO;
            if node.is_edge_label() {
                fresh_labels.push(node.id.clone());
            } else {
                fresh_entities.push(node.id.clone());
            }
            continue;
        }
        if node.is_edge_label() {
            (node.radius, node.outer_radius) = config.nodes.edge_label_radii();
            fresh_labels.push(node.id.clone());
        } else {
            (node.radius, node.outer_radius) =
                config.nodes.entity_radii(&node.type_tag, degree(&node.id));
            fresh_entities.push(node.id.clone());
        }
    }
    fresh_entities.extend(fresh_labels);
    fresh_entities
}

fn place_new_nodes(
    active: &mut Graph,
    fresh: &[String],
    config: &Config,
    diagnostics: &mut Diagnostics,
) {
    let homes = placement::home_slots(&active.rendered_types(), config.layout.home_ring_radius());
    let pending: HashSet<&str> = fresh.iter().map(String::as_str).collect();
    let mut placed_by_type: HashMap<TypeTag, Vec<(Vec2, f32)>> = HashMap::new();
    for node in active.entities().filter(|node| !pending.contains(node.id.as_str())) {
        placed_by_type
            .entry(node.type_tag.clone())
            .or_default()
            .push((node.pos, node.outer_radius));
    }

    for id in fresh {
        let Some(node) = active.node(id) else {
            continue;
        };
        let mut start = match node.edge.as_ref() {
            Some(info) => {
                let source = active.node(&info.source_id).map(|n| n.pos).unwrap_or(Vec2::ZERO);
                let target = active.node(&info.target_id).map(|n| n.pos).unwrap_or(Vec2::ZERO);
                placement::edge_label_start(id, source, target, PLACEMENT_JITTER)
            }
            None => {
                let home = homes.get(&node.type_tag).copied().unwrap_or(Vec2::ZERO);
                let same_type = placed_by_type.entry(node.type_tag.clone()).or_default();
                let start = placement::entity_start(id, home, same_type, PLACEMENT_JITTER);
                same_type.push((start, node.outer_radius));
                start
            }
        };
        if !start.is_finite() {
            diagnostics.push(Diagnostic::DegenerateGeometry {
                node: id.clone(),
                detail: "non-finite start position",
            });
            start = Vec2::ZERO;
        }
        if let Some(node) = active.node_mut(id) {
            node.pos = start;
            node.vel = Vec2::ZERO;
        }
    }
}
