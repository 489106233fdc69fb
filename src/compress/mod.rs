mod score;
mod select;

pub use score::{class_score, score_graph};
pub use select::{Selection, select};

use crate::config::CompressionConfig;
use crate::error::{Diagnostic, Diagnostics};
use crate::ir::Graph;
use serde::Serialize;

/// Valid budget range of a filtered base graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BudgetBounds {
    /// Number of distinct entity type tags.
    pub c_min: usize,
    /// Entities plus relations.
    pub c_max: usize,
}

impl BudgetBounds {
    pub fn of(graph: &Graph) -> Self {
        Self {
            c_min: graph.entity_types().len(),
            c_max: graph.entities().count() + graph.edge_labels().count(),
        }
    }

    /// `None` renders everything. Values above `c_max` are clamped, values
    /// below `c_min` are honored; both raise `BudgetOutOfRange`.
    pub fn resolve(&self, requested: Option<usize>, diagnostics: &mut Diagnostics) -> usize {
        let Some(requested) = requested else {
            return self.c_max;
        };
        let resolved = requested.min(self.c_max);
        if requested > self.c_max || requested < self.c_min {
            diagnostics.push(Diagnostic::BudgetOutOfRange {
                requested,
                c_min: self.c_min,
                c_max: self.c_max,
                resolved,
            });
        }
        resolved
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompressionStats {
    pub rendered_vertices: usize,
    pub rendered_edges: usize,
    pub hidden_elements: usize,
    pub c_min: usize,
    pub c_max: usize,
    pub budget: usize,
}

/// Scores `graph` in place and selects the closed subset that fits the configured budget.
pub fn compress(
    graph: &mut Graph,
    config: &CompressionConfig,
    diagnostics: &mut Diagnostics,
) -> Selection {
    score_graph(graph, &config.class_priority);
    let bounds = BudgetBounds::of(graph);
    let budget = bounds.resolve(config.budget, diagnostics);
    let selection = select(graph, budget, bounds, diagnostics);
    log::debug!(
        "compressed {} candidates to {} vertices and {} edges (budget {budget})",
        selection.total_candidate_count,
        selection.stats.rendered_vertices,
        selection.stats.rendered_edges
    );
    selection
}
