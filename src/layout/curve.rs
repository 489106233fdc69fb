use glam::Vec2;
use serde::Serialize;

const FALLBACK_SEGMENTS: usize = 32;

/// Quadratic Bezier drawn through an edge-label node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EdgeCurve {
    pub start: Vec2,
    pub control: Vec2,
    pub end: Vec2,
    /// Point the curve passes through at parameter `t`.
    pub label: Vec2,
    pub t: f32,
    /// True when `start`/`end` were swapped to keep label text upright.
    pub reversed: bool,
}

impl EdgeCurve {
    /// Solves for the control point so that `B(t) = label`, with `t` taken from
    /// the ratio of the two chord lengths.
    pub fn through(start: Vec2, label: Vec2, end: Vec2) -> Self {
        let d1 = start.distance(label);
        let d2 = label.distance(end);
        let total = d1 + d2;
        let t = if total > f32::EPSILON && total.is_finite() {
            d1 / total
        } else {
            0.5
        };

        let weight = 2.0 * t * (1.0 - t);
        let solved = (label - (1.0 - t) * (1.0 - t) * start - t * t * end) / weight;
        // Only a label sitting exactly on an endpoint leaves the control free.
        let control = if weight <= 0.0 || !solved.is_finite() {
            (start + end) * 0.5
        } else {
            solved
        };

        Self {
            start,
            control,
            end,
            label,
            t,
            reversed: false,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec2 {
        let u = 1.0 - t;
        u * u * self.start + 2.0 * u * t * self.control + t * t * self.end
    }

    /// Same curve drawn from the other endpoint when text laid along it would
    /// otherwise read upside down.
    pub fn oriented(&self) -> Self {
        let clockwise = is_clockwise(self.start, self.label, self.end);
        let above = is_above_chord(self.start, self.label, self.end);
        if clockwise == above {
            let mut flipped = Self::through(self.end, self.label, self.start);
            flipped.reversed = !self.reversed;
            flipped
        } else {
            *self
        }
    }

    /// Arc length from `start` to `B(t)`.
    pub fn length_until(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        let a = self.start - 2.0 * self.control + self.end;
        let b = 2.0 * (self.control - self.start);
        let big_a = 4.0 * a.length_squared();
        if big_a < 1e-6 {
            return b.length() * t;
        }
        let big_b = 4.0 * a.dot(b);
        let big_c = b.length_squared();
        let half_b = big_b / (2.0 * big_a);
        let c = big_c / big_a;
        let u = t + half_b;
        let k = c - half_b * half_b;
        // Nearly collinear control points make the closed form cancel out.
        if k <= 1e-4 * (half_b * half_b).max(1.0) {
            return self.polyline_length(t);
        }
        let root_u = (u * u + k).sqrt();
        let root_b = (half_b * half_b + k).sqrt();
        let length = (big_a.sqrt() / 2.0)
            * (u * root_u - half_b * root_b + k * ((u + root_u) / (half_b + root_b)).abs().ln());
        if length.is_finite() {
            length
        } else {
            self.polyline_length(t)
        }
    }

    fn polyline_length(&self, t: f32) -> f32 {
        let mut length = 0.0;
        let mut previous = self.start;
        for step in 1..=FALLBACK_SEGMENTS {
            let point = self.point_at(t * step as f32 / FALLBACK_SEGMENTS as f32);
            length += previous.distance(point);
            previous = point;
        }
        length
    }
}

fn is_clockwise(p0: Vec2, p1: Vec2, p2: Vec2) -> bool {
    (p1.y - p0.y) * (p2.x - p1.x) - (p2.y - p1.y) * (p1.x - p0.x) >= 0.0
}

/// Screen coordinates: "above" means smaller y. Vertical chords test "left of".
fn is_above_chord(p0: Vec2, mid: Vec2, p2: Vec2) -> bool {
    let dx = p2.x - p0.x;
    if dx == 0.0 {
        return mid.x < p0.x;
    }
    let slope = (p2.y - p0.y) / dx;
    let y_on_chord = slope * (mid.x - p0.x) + p0.y;
    mid.y <= y_on_chord
}
