use crate::ir::{Graph, TypeTag};

/// Priority score of a type: `1 - rank / (len - 1)`, or `None` when the type is unranked.
pub fn class_score(priority: &[TypeTag], type_tag: &TypeTag) -> Option<f32> {
    let rank = priority.iter().position(|tag| tag == type_tag)?;
    if priority.len() <= 1 {
        return Some(1.0);
    }
    Some(1.0 - rank as f32 / (priority.len() - 1) as f32)
}

/// Writes a score in `[0, 1]` to every entity and edge-label node.
///
/// Entities average their normalized degree with their class score (when the
/// type is ranked). Edge labels use the summed degree of their endpoints,
/// normalized over all relations.
pub fn score_graph(graph: &mut Graph, priority: &[TypeTag]) {
    let max_degree = graph
        .entities()
        .map(|node| graph.degree(&node.id))
        .max()
        .unwrap_or(0);

    let edge_degrees: Vec<(String, usize)> = graph
        .edge_labels()
        .filter_map(|node| {
            let info = node.edge.as_ref()?;
            let sum = graph.degree(&info.source_id) + graph.degree(&info.target_id);
            Some((node.id.clone(), sum))
        })
        .collect();
    let max_edge_degree = edge_degrees.iter().map(|(_, sum)| *sum).max().unwrap_or(0);

    let entity_scores: Vec<(String, f32)> = graph
        .entities()
        .map(|node| {
            let degree_score = ratio(graph.degree(&node.id), max_degree);
            let score = match class_score(priority, &node.type_tag) {
                Some(class) => (degree_score + class) / 2.0,
                None => degree_score,
            };
            (node.id.clone(), score)
        })
        .collect();

    for (id, score) in entity_scores {
        if let Some(node) = graph.node_mut(&id) {
            node.score = score;
        }
    }
    for (id, sum) in edge_degrees {
        if let Some(node) = graph.node_mut(&id) {
            node.score = ratio(sum, max_edge_degree);
        }
    }
}

fn ratio(value: usize, max: usize) -> f32 {
    if max == 0 {
        0.0
    } else {
        value as f32 / max as f32
    }
}
