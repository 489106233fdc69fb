use crate::ir::TypeTag;
use glam::Vec2;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet};
use std::f32::consts::TAU;
use std::hash::{Hash, Hasher};

/// Cap on how far a point inside a bounding box is pushed out, as a multiple
/// of its distance from the box center.
const MAX_PUSH_RATIO: f32 = 7.0;

/// Home slot per type: evenly spaced on a ring around the origin, in sorted type order.
pub fn home_slots(types: &BTreeSet<TypeTag>, ring_radius: f32) -> BTreeMap<TypeTag, Vec2> {
    let count = types.len();
    types
        .iter()
        .enumerate()
        .map(|(index, tag)| (tag.clone(), home_slot(index, count, ring_radius)))
        .collect()
}

pub fn home_slot(index: usize, count: usize, ring_radius: f32) -> Vec2 {
    if count == 0 {
        return Vec2::ZERO;
    }
    let angle = index as f32 / count as f32 * TAU;
    Vec2::new(angle.cos(), angle.sin()) * ring_radius
}

/// Deterministic offset in `[-amplitude, amplitude]²` derived from an id.
pub fn stable_jitter(id: &str, amplitude: f32) -> Vec2 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();

    let x = ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    let y = (((hash >> 32) & 0xffff_ffff) as f64 / u32::MAX as f64) as f32;
    Vec2::new(x * 2.0 - 1.0, y * 2.0 - 1.0) * amplitude
}

/// Pushes `point` away from the center of the box spanned by `placed`
/// (positions grown by their radii) when it falls inside that box.
pub fn push_outside_bbox(point: Vec2, placed: &[(Vec2, f32)]) -> Vec2 {
    if placed.is_empty() {
        return point;
    }
    let mut min = Vec2::splat(f32::INFINITY);
    let mut max = Vec2::splat(f32::NEG_INFINITY);
    for &(pos, radius) in placed {
        min = min.min(pos - Vec2::splat(radius));
        max = max.max(pos + Vec2::splat(radius));
    }
    let inside = point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y;
    if !inside {
        return point;
    }

    let center = (min + max) * 0.5;
    let circumradius = ((max - min) * 0.5).length();
    let delta = point - center;
    let distance = delta.length();
    if distance < 1e-3 {
        return center + Vec2::X * circumradius;
    }
    let ratio = (circumradius / distance).min(MAX_PUSH_RATIO);
    point + delta * ratio
}

/// Start position of a new entity or cluster: its home slot plus jitter,
/// pushed clear of already placed nodes of the same type.
pub fn entity_start(id: &str, home: Vec2, same_type: &[(Vec2, f32)], jitter: f32) -> Vec2 {
    push_outside_bbox(home + stable_jitter(id, jitter), same_type)
}

/// Start position of a new edge-label node: between its endpoints.
pub fn edge_label_start(id: &str, source: Vec2, target: Vec2, jitter: f32) -> Vec2 {
    (source + target) * 0.5 + stable_jitter(id, jitter)
}
