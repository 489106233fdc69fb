use crate::config::NodeSizing;
use crate::ir::{Graph, Node, TypeTag, cluster_id};
use glam::Vec2;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The cluster node was replaced by its members.
    Expanded { members: usize },
    /// Isolated members were folded back into a cluster node.
    Collapsed { members: usize },
    /// Nothing to toggle for that type.
    Unchanged,
}

/// Collapsed members per type, plus the types the user chose to keep expanded.
#[derive(Debug, Clone, Default)]
pub struct ClusterTable {
    collapsed: BTreeMap<TypeTag, Vec<Node>>,
    expanded: BTreeSet<TypeTag>,
    /// Node under the pointer; never folded into a cluster.
    held: Option<String>,
}

impl ClusterTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the node currently being dragged, or clears the mark.
    pub fn hold(&mut self, id: Option<&str>) {
        self.held = id.map(str::to_string);
    }

    /// Replaces every group of two or more isolated same-type entities with a
    /// cluster node placed at their centroid. Types in the expanded set are left alone.
    /// Returns the types that were collapsed.
    pub fn collapse_isolated(&mut self, graph: &mut Graph, sizing: &NodeSizing) -> Vec<TypeTag> {
        self.collapsed.clear();
        let groups = isolated_groups(graph, self.held.as_deref());
        let mut collapsed_types = Vec::new();

        for (type_tag, ids) in groups {
            if self.expanded.contains(&type_tag) {
                log::debug!("{type_tag} has {} isolated nodes but is expanded", ids.len());
                continue;
            }
            let ids: BTreeSet<String> = ids.into_iter().collect();
            let members = graph.retain_nodes(|node| !ids.contains(&node.id));
            insert_cluster(graph, &type_tag, &members, sizing);
            self.collapsed.insert(type_tag.clone(), members);
            collapsed_types.push(type_tag);
        }

        // An expanded type whose nodes all gained relations has nothing left to collapse.
        let groups_left = isolated_groups(graph, None);
        self.expanded.retain(|tag| groups_left.contains_key(tag));
        collapsed_types
    }

    /// Expands a collapsed cluster or collapses an expanded type.
    ///
    /// Expanded members start at the cluster's position. Collapsed members keep
    /// their current positions for the next expansion.
    pub fn toggle(
        &mut self,
        graph: &mut Graph,
        type_tag: &TypeTag,
        sizing: &NodeSizing,
    ) -> ToggleOutcome {
        let id = cluster_id(type_tag);
        if let Some(cluster) = graph.remove_node(&id) {
            let members = self.collapsed.remove(type_tag).unwrap_or_default();
            let count = members.len();
            for mut member in members {
                member.pos = cluster.pos;
                member.vel = Vec2::ZERO;
                graph.insert_node(member);
            }
            self.expanded.insert(type_tag.clone());
            log::info!("expanded cluster {type_tag} into {count} nodes");
            return ToggleOutcome::Expanded { members: count };
        }

        if !self.expanded.contains(type_tag) {
            return ToggleOutcome::Unchanged;
        }
        let Some(ids) = isolated_groups(graph, self.held.as_deref()).remove(type_tag) else {
            if !isolated_groups(graph, None).contains_key(type_tag) {
                self.expanded.remove(type_tag);
            }
            return ToggleOutcome::Unchanged;
        };
        let ids: BTreeSet<String> = ids.into_iter().collect();
        let members = graph.retain_nodes(|node| !ids.contains(&node.id));
        let count = members.len();
        insert_cluster(graph, type_tag, &members, sizing);
        self.collapsed.insert(type_tag.clone(), members);
        self.expanded.remove(type_tag);
        log::info!("collapsed {count} {type_tag} nodes into a cluster");
        ToggleOutcome::Collapsed { members: count }
    }

    /// True when no type has both its cluster node and any member active.
    pub fn is_exclusive(&self, graph: &Graph) -> bool {
        self.collapsed.iter().all(|(type_tag, members)| {
            !graph.contains(&cluster_id(type_tag))
                || members.iter().all(|member| !graph.contains(&member.id))
        })
    }

    pub fn is_expanded(&self, type_tag: &TypeTag) -> bool {
        self.expanded.contains(type_tag)
    }

    pub fn members(&self, type_tag: &TypeTag) -> &[Node] {
        self.collapsed.get(type_tag).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every node currently hidden inside a cluster.
    pub fn hidden_members(&self) -> impl Iterator<Item = &Node> {
        self.collapsed.values().flatten()
    }
}

/// Isolated entities grouped by type; only groups of two or more are returned.
/// Pinned, anchor and `held` nodes never count as isolated.
fn isolated_groups(graph: &Graph, held: Option<&str>) -> BTreeMap<TypeTag, Vec<String>> {
    let mut groups: BTreeMap<TypeTag, Vec<String>> = BTreeMap::new();
    for node in graph.entities() {
        if node.pinned || node.anchor || held == Some(node.id.as_str()) {
            continue;
        }
        if graph.neighbors(&node.id).len() > 1 {
            continue;
        }
        groups
            .entry(node.type_tag.clone())
            .or_default()
            .push(node.id.clone());
    }
    groups.retain(|_, ids| ids.len() >= 2);
    groups
}

fn insert_cluster(graph: &mut Graph, type_tag: &TypeTag, members: &[Node], sizing: &NodeSizing) {
    let mut cluster = Node::cluster(type_tag.clone(), members.len());
    cluster.pos = centroid(members);
    (cluster.radius, cluster.outer_radius) = sizing.cluster_radii(members.len());
    graph.insert_node(cluster);
}

fn centroid(nodes: &[Node]) -> Vec2 {
    if nodes.is_empty() {
        return Vec2::ZERO;
    }
    nodes.iter().map(|node| node.pos).sum::<Vec2>() / nodes.len() as f32
}
