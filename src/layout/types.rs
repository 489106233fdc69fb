use super::curve::EdgeCurve;
use crate::ir::{Node, NodeKind, TypeTag};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Paused,
}

/// Whether the simulation may move a node this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NodeState {
    pub pinned: bool,
    pub dragged: bool,
}

impl NodeState {
    pub fn is_fixed(&self) -> bool {
        self.pinned || self.dragged
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TickReport {
    /// Nodes that moved more than the settle threshold.
    pub moved: usize,
    pub max_displacement: f32,
}

impl TickReport {
    pub fn is_settled(&self) -> bool {
        self.moved == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NodePlacement {
    pub id: String,
    pub kind: NodeKind,
    pub type_tag: TypeTag,
    pub label: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub outer_radius: f32,
    pub pinned: bool,
    pub dragged: bool,
    pub anchor: bool,
}

impl NodePlacement {
    pub(super) fn from_node(node: &Node, dragged: bool) -> Self {
        Self {
            id: node.id.clone(),
            kind: node.kind,
            type_tag: node.type_tag.clone(),
            label: node.label.clone(),
            x: node.pos.x,
            y: node.pos.y,
            radius: node.radius,
            outer_radius: node.outer_radius,
            pinned: node.pinned,
            dragged,
            anchor: node.anchor,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EdgePlacement {
    pub link_id: String,
    pub source_id: String,
    pub target_id: String,
    pub relation_tag: String,
    pub hotspot: Option<usize>,
    /// Curve through the label node, oriented for upright text.
    pub curve: EdgeCurve,
}

/// Snapshot handed to a renderer after a tick.
#[derive(Debug, Clone, Serialize)]
pub struct RenderFrame {
    pub tick: u64,
    pub state: RunState,
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<NodePlacement>,
    pub edges: Vec<EdgePlacement>,
}

impl RenderFrame {
    pub fn node(&self, id: &str) -> Option<&NodePlacement> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn is_finite(&self) -> bool {
        self.nodes.iter().all(|node| node.x.is_finite() && node.y.is_finite())
            && self.edges.iter().all(|edge| {
                edge.curve.control.is_finite()
                    && edge.curve.start.is_finite()
                    && edge.curve.end.is_finite()
            })
    }
}
