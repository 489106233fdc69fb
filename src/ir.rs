use crate::compress::Selection;
use crate::config::VisibilityConfig;
use crate::error::Diagnostic;
use crate::layout::hotspot::PairKey;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

/// Domain category of a node ("user", "group", ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entity,
    Cluster,
    EdgeLabel,
}

/// Extra data carried by the node that stands in for one relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeLabelInfo {
    pub source_id: String,
    pub target_id: String,
    pub relation_tag: String,
    pub link_id: String,
    /// Index of the claimed hotspot slot between source and target.
    pub hotspot: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub type_tag: TypeTag,
    pub label: String,
    pub pos: Vec2,
    pub vel: Vec2,
    pub radius: f32,
    pub outer_radius: f32,
    pub pinned: bool,
    pub anchor: bool,
    pub score: f32,
    pub edge: Option<EdgeLabelInfo>,
}

impl Node {
    pub fn entity(id: impl Into<String>, type_tag: TypeTag, label: impl Into<String>) -> Self {
        Self::bare(id.into(), NodeKind::Entity, type_tag, label.into())
    }

    pub fn cluster(type_tag: TypeTag, member_count: usize) -> Self {
        let label = format!("{type_tag} ({member_count})");
        Self::bare(cluster_id(&type_tag), NodeKind::Cluster, type_tag, label)
    }

    pub fn edge_label(info: EdgeLabelInfo) -> Self {
        let mut node = Self::bare(
            info.link_id.clone(),
            NodeKind::EdgeLabel,
            TypeTag::new(info.relation_tag.clone()),
            info.relation_tag.clone(),
        );
        node.edge = Some(info);
        node
    }

    fn bare(id: String, kind: NodeKind, type_tag: TypeTag, label: String) -> Self {
        Self {
            id,
            kind,
            type_tag,
            label,
            pos: Vec2::ZERO,
            vel: Vec2::ZERO,
            radius: 0.0,
            outer_radius: 0.0,
            pinned: false,
            anchor: false,
            score: 0.0,
            edge: None,
        }
    }

    pub fn is_entity(&self) -> bool {
        self.kind == NodeKind::Entity
    }

    pub fn is_edge_label(&self) -> bool {
        self.kind == NodeKind::EdgeLabel
    }

    pub fn is_cluster(&self) -> bool {
        self.kind == NodeKind::Cluster
    }
}

pub fn cluster_id(type_tag: &TypeTag) -> String {
    format!("cluster:{type_tag}")
}

/// One segment of a drawn relation: either `source -> label` or `label -> target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
    pub source_id: String,
    pub target_id: String,
    pub relation_tag: String,
    pub link_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphInput {
    #[serde(default)]
    pub nodes: Vec<NodeInput>,
    #[serde(default)]
    pub edges: Vec<EdgeInput>,
}

impl GraphInput {
    pub fn from_json(input: &str) -> serde_json::Result<Self> {
        serde_json::from_str(input)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInput {
    pub id: String,
    #[serde(alias = "type")]
    pub type_tag: TypeTag,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub anchor: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeInput {
    #[serde(alias = "source")]
    pub source_id: String,
    #[serde(alias = "target")]
    pub target_id: String,
    #[serde(alias = "relation")]
    pub relation_tag: String,
}

/// Node set and links reachable from one node.
#[derive(Debug, Clone, Default)]
pub struct Component {
    pub nodes: BTreeSet<String>,
    pub links: Vec<Link>,
}

/// Arena-backed node/link store with an id index and adjacency map.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    links: Vec<Link>,
    /// Link indices per `link_id`.
    relations: HashMap<String, Vec<usize>>,
    adjacency: HashMap<String, BTreeSet<String>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the base graph. Every relation becomes an edge-label node plus two links.
    pub fn from_input(
        input: &GraphInput,
        visibility: &VisibilityConfig,
    ) -> (Self, Vec<Diagnostic>) {
        let mut graph = Self::new();
        let mut diagnostics = Vec::new();
        let mut hidden: HashSet<&str> = HashSet::new();

        for node_input in &input.nodes {
            if !visibility.type_visible(&node_input.type_tag) {
                hidden.insert(node_input.id.as_str());
                continue;
            }
            let label = node_input
                .label
                .clone()
                .unwrap_or_else(|| node_input.id.clone());
            let mut node = Node::entity(node_input.id.clone(), node_input.type_tag.clone(), label);
            node.anchor = node_input.anchor;
            if !graph.insert_node(node) {
                diagnostics.push(Diagnostic::DuplicateNode {
                    id: node_input.id.clone(),
                });
            }
        }

        let mut occurrences: HashMap<(&str, &str, &str), usize> = HashMap::new();
        for edge in &input.edges {
            if !visibility.relation_visible(&edge.relation_tag) {
                continue;
            }
            let endpoints = [edge.source_id.as_str(), edge.target_id.as_str()];
            if endpoints.iter().any(|id| hidden.contains(id)) {
                log::debug!(
                    "skipping relation {} -> {}: endpoint type hidden",
                    edge.source_id,
                    edge.target_id
                );
                continue;
            }
            let count = occurrences
                .entry((
                    edge.source_id.as_str(),
                    edge.relation_tag.as_str(),
                    edge.target_id.as_str(),
                ))
                .or_insert(0);
            *count += 1;
            let link_id = relation_id(&edge.source_id, &edge.relation_tag, &edge.target_id, *count);

            if let Some(missing) = endpoints.iter().find(|id| !graph.contains(id)) {
                diagnostics.push(Diagnostic::DataInconsistency {
                    link_id,
                    missing: missing.to_string(),
                });
                continue;
            }

            let inserted = graph.insert_relation(EdgeLabelInfo {
                source_id: edge.source_id.clone(),
                target_id: edge.target_id.clone(),
                relation_tag: edge.relation_tag.clone(),
                link_id: link_id.clone(),
                hotspot: None,
            });
            if !inserted {
                diagnostics.push(Diagnostic::RelationIdTaken { link_id });
            }
        }

        for diagnostic in &diagnostics {
            diagnostic.log();
        }
        (graph, diagnostics)
    }

    /// Inserts the label node and both link records of one relation.
    /// Endpoints must already be present.
    pub fn insert_relation(&mut self, info: EdgeLabelInfo) -> bool {
        let first = Link {
            source_id: info.source_id.clone(),
            target_id: info.link_id.clone(),
            relation_tag: info.relation_tag.clone(),
            link_id: info.link_id.clone(),
        };
        let second = Link {
            source_id: info.link_id.clone(),
            target_id: info.target_id.clone(),
            relation_tag: info.relation_tag.clone(),
            link_id: info.link_id.clone(),
        };
        if !self.insert_node(Node::edge_label(info)) {
            return false;
        }
        self.insert_link(first) && self.insert_link(second)
    }

    /// Returns false (and leaves the graph untouched) if the id is taken.
    pub fn insert_node(&mut self, node: Node) -> bool {
        if self.index.contains_key(&node.id) {
            return false;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.adjacency.entry(node.id.clone()).or_default();
        self.nodes.push(node);
        true
    }

    /// Returns false if either endpoint is missing.
    pub fn insert_link(&mut self, link: Link) -> bool {
        if !self.contains(&link.source_id) || !self.contains(&link.target_id) {
            return false;
        }
        self.connect(&link.source_id, &link.target_id);
        self.relations
            .entry(link.link_id.clone())
            .or_default()
            .push(self.links.len());
        self.links.push(link);
        true
    }

    fn connect(&mut self, a: &str, b: &str) {
        if a == b {
            return;
        }
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.index.get(id).map(|&idx| &mut self.nodes[idx])
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Mutable access for positional state. Ids must not be changed through it.
    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn entities(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_entity())
    }

    pub fn edge_labels(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|node| node.is_edge_label())
    }

    /// Neighbour ids of `id`, including `id` itself. Empty for unknown ids.
    pub fn neighbors(&self, id: &str) -> BTreeSet<&str> {
        let Some(adjacent) = self.adjacency.get(id) else {
            return BTreeSet::new();
        };
        let mut out: BTreeSet<&str> = adjacent.iter().map(String::as_str).collect();
        if let Some(node) = self.node(id) {
            out.insert(node.id.as_str());
        }
        out
    }

    pub fn degree(&self, id: &str) -> usize {
        self.neighbors(id).len().saturating_sub(1)
    }

    /// Distinct type tags of entity nodes, sorted.
    pub fn entity_types(&self) -> BTreeSet<TypeTag> {
        self.entities().map(|node| node.type_tag.clone()).collect()
    }

    /// Type tags of entities and clusters, sorted. These get home slots.
    pub fn rendered_types(&self) -> BTreeSet<TypeTag> {
        self.nodes
            .iter()
            .filter(|node| !node.is_edge_label())
            .map(|node| node.type_tag.clone())
            .collect()
    }

    pub fn connected_component(&self, id: &str) -> Option<Component> {
        if !self.contains(id) {
            return None;
        }
        let mut seen: BTreeSet<String> = BTreeSet::new();
        let mut stack = vec![id.to_string()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(adjacent) = self.adjacency.get(&current) {
                stack.extend(adjacent.iter().filter(|next| !seen.contains(*next)).cloned());
            }
        }

        let mut pairs: HashSet<PairKey> = HashSet::new();
        let links = self
            .links
            .iter()
            .filter(|link| seen.contains(&link.source_id) && seen.contains(&link.target_id))
            .filter(|link| pairs.insert(PairKey::new(&link.source_id, &link.target_id)))
            .cloned()
            .collect();
        Some(Component { nodes: seen, links })
    }

    /// Keeps the nodes matching `keep` and drops links that lose an endpoint.
    /// Returns the removed nodes in their original order.
    pub fn retain_nodes(&mut self, mut keep: impl FnMut(&Node) -> bool) -> Vec<Node> {
        let (kept, removed): (Vec<Node>, Vec<Node>) =
            std::mem::take(&mut self.nodes).into_iter().partition(|node| keep(node));
        if removed.is_empty() {
            self.nodes = kept;
            return removed;
        }
        let links = std::mem::take(&mut self.links);
        self.index.clear();
        self.relations.clear();
        self.adjacency.clear();
        for node in kept {
            self.insert_node(node);
        }
        for link in links {
            self.insert_link(link);
        }
        removed
    }

    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        if !self.contains(id) {
            return None;
        }
        self.retain_nodes(|node| node.id != id).into_iter().next()
    }

    /// Graph restricted to `ids`, keeping only links with both endpoints inside.
    pub fn induced(&self, ids: &BTreeSet<String>) -> Self {
        let mut graph = Self::new();
        for node in self.nodes.iter().filter(|node| ids.contains(&node.id)) {
            graph.insert_node(node.clone());
        }
        for link in &self.links {
            graph.insert_link(link.clone());
        }
        graph
    }

    /// Builds the active graph from a closed selection over `self`.
    pub fn subgraph(&self, selection: &Selection) -> Self {
        let mut graph = Self::new();
        for id in &selection.nodes {
            if let Some(node) = self.node(id) {
                graph.insert_node(node.clone());
            }
        }
        for link in &selection.links {
            graph.insert_link(link.clone());
        }
        graph
    }

    /// Links whose `link_id` matches, i.e. both segments of one relation.
    pub fn relation_links(&self, link_id: &str) -> impl Iterator<Item = &Link> {
        self.relations
            .get(link_id)
            .into_iter()
            .flatten()
            .map(|&idx| &self.links[idx])
    }

    /// Entity count per type.
    pub fn type_histogram(&self) -> BTreeMap<TypeTag, usize> {
        let mut counts = BTreeMap::new();
        for node in self.entities() {
            *counts.entry(node.type_tag.clone()).or_insert(0) += 1;
        }
        counts
    }
}

fn relation_id(source: &str, relation: &str, target: &str, occurrence: usize) -> String {
    if occurrence <= 1 {
        format!("{source}-[{relation}]->{target}")
    } else {
        format!("{source}-[{relation}]->{target}#{occurrence}")
    }
}
