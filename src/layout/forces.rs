use glam::Vec2;
use std::f32::consts::TAU;

const MIN_DISTANCE: f32 = 1e-4;

/// Per-node inputs of the collision pass.
pub(super) struct CollisionBodies<'a> {
    pub(super) positions: &'a [Vec2],
    /// Collision radius (outer radius).
    pub(super) radii: &'a [f32],
    /// Mass used to split a push between two bodies.
    pub(super) masses: &'a [f32],
    pub(super) fixed: &'a [bool],
}

/// Direction used when two bodies sit on the same point. Differs per pair so
/// stacked nodes fan out instead of moving together.
pub(super) fn fallback_direction(from: usize, to: usize) -> Vec2 {
    let angle = ((from as f32) * 0.618_034 + (to as f32) * 0.414_214) * TAU;
    Vec2::new(angle.cos(), angle.sin())
}

/// Adds overlap-resolving pushes to `pushes`. Lighter bodies take the larger
/// share; a fixed body pushes but never moves.
pub(super) fn accumulate_collisions(
    bodies: &CollisionBodies<'_>,
    strength: f32,
    pushes: &mut [Vec2],
) {
    let count = bodies.positions.len();
    for from in 0..count {
        for to in (from + 1)..count {
            if bodies.fixed[from] && bodies.fixed[to] {
                continue;
            }
            let delta = bodies.positions[from] - bodies.positions[to];
            let distance = delta.length();
            let min_distance = bodies.radii[from] + bodies.radii[to];
            if distance >= min_distance {
                continue;
            }
            let direction = if distance > MIN_DISTANCE {
                delta / distance
            } else {
                fallback_direction(from, to)
            };

            let overlap = (min_distance - distance) * strength;
            let (share_from, share_to) = match (bodies.fixed[from], bodies.fixed[to]) {
                (true, _) => (0.0, 1.0),
                (_, true) => (1.0, 0.0),
                _ => {
                    let (mass_from, mass_to) = (bodies.masses[from], bodies.masses[to]);
                    let total = mass_from + mass_to;
                    if total > 0.0 {
                        (mass_to / total, mass_from / total)
                    } else {
                        (0.5, 0.5)
                    }
                }
            };
            pushes[from] += direction * overlap * share_from;
            pushes[to] -= direction * overlap * share_to;
        }
    }
}

/// Displacement toward `home` that stops once the node is within `radius` of it.
pub(super) fn cluster_pull(pos: Vec2, home: Vec2, radius: f32, alpha: f32) -> Vec2 {
    let delta = home - pos;
    let distance = delta.length();
    if distance <= radius || distance < MIN_DISTANCE {
        return Vec2::ZERO;
    }
    delta * ((distance - radius) / distance) * alpha
}

/// Displacement covering `weight` of the way to `target`.
pub(super) fn pull_toward(pos: Vec2, target: Vec2, weight: f32) -> Vec2 {
    (target - pos) * weight
}

pub(super) fn centroid(points: impl IntoIterator<Item = Vec2>) -> Option<Vec2> {
    let (sum, count) = points
        .into_iter()
        .fold((Vec2::ZERO, 0usize), |(sum, count), point| (sum + point, count + 1));
    (count > 0).then(|| sum / count as f32)
}
