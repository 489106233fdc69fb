use crate::compress::CompressionStats;
use crate::layout::{RenderFrame, RunState};
use crate::network::Network;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub tick: u64,
    pub state: RunState,
    pub width: f32,
    pub height: f32,
    pub stats: CompressionStats,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub clusters: Vec<ClusterDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub type_tag: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    pub outer_radius: f32,
    pub pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub link_id: String,
    pub source: String,
    pub target: String,
    pub relation: String,
    pub hotspot: Option<usize>,
    pub start: [f32; 2],
    pub control: [f32; 2],
    pub end: [f32; 2],
    pub t: f32,
    /// Arc length of the whole curve.
    pub length: f32,
    /// Arc length from `start` to the label, for text laid along the path.
    pub label_offset: f32,
}

#[derive(Debug, Serialize)]
pub struct ClusterDump {
    pub type_tag: String,
    pub members: Vec<String>,
}

impl LayoutDump {
    pub fn from_frame(frame: &RenderFrame, stats: CompressionStats) -> Self {
        let nodes = frame
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: format!("{:?}", node.kind),
                type_tag: node.type_tag.to_string(),
                x: node.x,
                y: node.y,
                radius: node.radius,
                outer_radius: node.outer_radius,
                pinned: node.pinned,
            })
            .collect();

        let edges = frame
            .edges
            .iter()
            .map(|edge| EdgeDump {
                link_id: edge.link_id.clone(),
                source: edge.source_id.clone(),
                target: edge.target_id.clone(),
                relation: edge.relation_tag.clone(),
                hotspot: edge.hotspot,
                start: edge.curve.start.to_array(),
                control: edge.curve.control.to_array(),
                end: edge.curve.end.to_array(),
                t: edge.curve.t,
                length: edge.curve.length_until(1.0),
                label_offset: edge.curve.length_until(edge.curve.t),
            })
            .collect();

        LayoutDump {
            tick: frame.tick,
            state: frame.state,
            width: frame.width,
            height: frame.height,
            stats,
            nodes,
            edges,
            clusters: Vec::new(),
        }
    }

    pub fn from_network(network: &Network) -> Self {
        let mut dump = Self::from_frame(&network.frame(), network.stats());
        dump.clusters = network
            .graph()
            .nodes()
            .iter()
            .filter(|node| node.is_cluster())
            .map(|node| ClusterDump {
                type_tag: node.type_tag.to_string(),
                members: network
                    .clusters()
                    .members(&node.type_tag)
                    .iter()
                    .map(|member| member.id.clone())
                    .collect(),
            })
            .collect();
        dump
    }
}

pub fn write_layout_dump(path: &Path, network: &Network) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_network(network);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}
