use super::{BudgetBounds, CompressionStats};
use crate::error::{Diagnostic, Diagnostics};
use crate::ir::{Graph, Link, NodeKind};
use std::cmp::Ordering;
use std::collections::HashSet;

/// Closed node/link subset chosen for rendering.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Node ids in insertion order.
    pub nodes: Vec<String>,
    pub links: Vec<Link>,
    pub total_candidate_count: usize,
    /// Elements taken by score before closure added endpoints.
    pub pre_closure_count: usize,
    pub stats: CompressionStats,
}

impl Selection {
    pub fn contains(&self, id: &str) -> bool {
        self.nodes.iter().any(|node| node == id)
    }
}

/// Picks the `budget` best-scored entities and relations, then closes the set
/// so every relation brings its label node, both link records and both endpoints.
/// Reads scores written by [`super::score_graph`].
pub fn select(
    graph: &Graph,
    budget: usize,
    bounds: BudgetBounds,
    diagnostics: &mut Diagnostics,
) -> Selection {
    let mut candidates: Vec<usize> = Vec::with_capacity(bounds.c_max);
    candidates.extend(
        graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_entity())
            .map(|(idx, _)| idx),
    );
    candidates.extend(
        graph
            .nodes()
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_edge_label())
            .map(|(idx, _)| idx),
    );
    let total_candidate_count = candidates.len();

    // Vec::sort_by is stable, so equal scores keep entity-then-label input order.
    candidates.sort_by(|a, b| {
        let a = graph.nodes()[*a].score;
        let b = graph.nodes()[*b].score;
        b.partial_cmp(&a).unwrap_or(Ordering::Equal)
    });
    candidates.truncate(budget.min(total_candidate_count));
    let pre_closure_count = candidates.len();

    let mut seen: HashSet<&str> = HashSet::new();
    let mut nodes: Vec<String> = Vec::new();
    let mut links: Vec<Link> = Vec::new();
    for idx in candidates {
        let node = &graph.nodes()[idx];
        match (node.kind, node.edge.as_ref()) {
            (NodeKind::EdgeLabel, Some(info)) => {
                push_node(graph, &info.source_id, &mut seen, &mut nodes);
                push_node(graph, &node.id, &mut seen, &mut nodes);
                push_node(graph, &info.target_id, &mut seen, &mut nodes);
                links.extend(graph.relation_links(&node.id).cloned());
            }
            _ => push_node(graph, &node.id, &mut seen, &mut nodes),
        }
    }

    links.retain(|link| {
        let closed =
            seen.contains(link.source_id.as_str()) && seen.contains(link.target_id.as_str());
        if !closed {
            diagnostics.push(Diagnostic::InvariantViolation(format!(
                "selected link {} -> {} is not closed",
                link.source_id, link.target_id
            )));
        }
        closed
    });

    let rendered_vertices = nodes
        .iter()
        .filter(|id| graph.node(id).is_some_and(|node| node.is_entity()))
        .count();
    let rendered_edges = nodes.len() - rendered_vertices;
    let stats = CompressionStats {
        rendered_vertices,
        rendered_edges,
        hidden_elements: bounds.c_max.saturating_sub(nodes.len()),
        c_min: bounds.c_min,
        c_max: bounds.c_max,
        budget,
    };

    Selection {
        nodes,
        links,
        total_candidate_count,
        pre_closure_count,
        stats,
    }
}

fn push_node<'g>(
    graph: &'g Graph,
    id: &str,
    seen: &mut HashSet<&'g str>,
    nodes: &mut Vec<String>,
) {
    if let Some(node) = graph.node(id)
        && seen.insert(node.id.as_str())
    {
        nodes.push(node.id.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::score_graph;
    use crate::config::VisibilityConfig;
    use crate::ir::{EdgeInput, GraphInput, NodeInput, TypeTag};

    fn star(leaves: usize) -> Graph {
        let mut nodes = vec![NodeInput {
            id: "center".into(),
            type_tag: TypeTag::new("hub"),
            label: None,
            anchor: false,
        }];
        let mut edges = Vec::new();
        for i in 0..leaves {
            let id = format!("leaf{i}");
            nodes.push(NodeInput {
                id: id.clone(),
                type_tag: TypeTag::new("leaf"),
                label: None,
                anchor: false,
            });
            edges.push(EdgeInput {
                source_id: "center".into(),
                target_id: id,
                relation_tag: "links".into(),
            });
        }
        let input = GraphInput { nodes, edges };
        let (graph, _) = Graph::from_input(&input, &VisibilityConfig::default());
        graph
    }

    #[test]
    fn budget_one_on_star_selects_closed_edge() {
        let mut graph = star(3);
        score_graph(&mut graph, &[TypeTag::new("leaf"), TypeTag::new("hub")]);
        let bounds = BudgetBounds::of(&graph);
        let mut diagnostics = Diagnostics::new();
        let selection = select(&graph, 1, bounds, &mut diagnostics);

        assert!(diagnostics.is_empty());
        assert_eq!(selection.pre_closure_count, 1);
        assert_eq!(selection.nodes.len(), 3);
        assert_eq!(selection.links.len(), 2);
        assert!(selection.contains("center"));
        assert!(selection.contains("center-[links]->leaf0"));
        assert!(selection.contains("leaf0"));
        assert_eq!(selection.stats.rendered_vertices, 2);
        assert_eq!(selection.stats.rendered_edges, 1);
        assert_eq!(selection.stats.hidden_elements, 4);
    }

    #[test]
    fn full_budget_selects_everything() {
        let mut graph = star(4);
        score_graph(&mut graph, &[]);
        let bounds = BudgetBounds::of(&graph);
        let selection = select(&graph, bounds.c_max, bounds, &mut Diagnostics::new());
        assert_eq!(selection.nodes.len(), graph.len());
        assert_eq!(selection.links.len(), graph.links().len());
        assert_eq!(selection.total_candidate_count, bounds.c_max);
        assert_eq!(selection.stats.hidden_elements, 0);
    }

    #[test]
    fn zero_budget_selects_nothing() {
        let mut graph = star(2);
        score_graph(&mut graph, &[]);
        let bounds = BudgetBounds::of(&graph);
        let selection = select(&graph, 0, bounds, &mut Diagnostics::new());
        assert!(selection.nodes.is_empty());
        assert!(selection.links.is_empty());
    }
}
