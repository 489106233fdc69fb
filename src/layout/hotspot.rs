use glam::Vec2;
use std::collections::{BTreeMap, HashMap};

const COINCIDENT_EPSILON: f32 = 1e-4;

/// Unordered node pair, stored with the lexicographically smaller id first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        Self {
            first: first.to_string(),
            second: second.to_string(),
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }
}

/// Slot positions for `n` parallel relations between two nodes.
///
/// Slots lie on the perpendicular bisector of `first`-`second`, `gap` apart and
/// centered on the midpoint. Callers pass the endpoints in [`PairKey`] order.
pub fn hotspot_positions(first: Vec2, second: Vec2, n: usize, gap: f32) -> Vec<Vec2> {
    (0..n)
        .map(|slot| slot_position(first, second, n, gap, slot))
        .collect()
}

fn slot_position(first: Vec2, second: Vec2, n: usize, gap: f32, slot: usize) -> Vec2 {
    let mid = (first + second) * 0.5;
    if n <= 1 {
        return mid;
    }
    let offset = gap * (n - 1) as f32 / 2.0;
    mid + bisector_direction(first, second) * (slot as f32 * gap - offset)
}

fn bisector_direction(first: Vec2, second: Vec2) -> Vec2 {
    let delta = second - first;
    let length = delta.length();
    if length < COINCIDENT_EPSILON || !length.is_finite() {
        return Vec2::Y;
    }
    Vec2::new(-delta.y, delta.x) / length
}

#[derive(Debug, Clone)]
struct Claim {
    pair: PairKey,
    slot: usize,
}

/// Tracks which label node holds which slot between each node pair.
#[derive(Debug, Clone)]
pub struct HotspotRouter {
    gap: f32,
    claims: HashMap<String, Claim>,
    occupied: HashMap<PairKey, BTreeMap<usize, String>>,
}

impl HotspotRouter {
    pub fn new(gap: f32) -> Self {
        Self {
            gap,
            claims: HashMap::new(),
            occupied: HashMap::new(),
        }
    }

    /// Returns the slot held by `label`, claiming one if needed.
    ///
    /// A valid existing claim is kept. Otherwise the free slot farthest from
    /// `current` is claimed, lowest index on ties. `None` when all `n` slots are
    /// held by other labels.
    pub fn assign(
        &mut self,
        label: &str,
        pair: &PairKey,
        first: Vec2,
        second: Vec2,
        n: usize,
        current: Vec2,
    ) -> Option<usize> {
        if let Some(claim) = self.claims.get(label) {
            if &claim.pair == pair && claim.slot < n {
                return Some(claim.slot);
            }
            self.release(label);
        }

        let taken = self.occupied.get(pair);
        let mut best: Option<(usize, f32)> = None;
        for slot in 0..n {
            if taken.is_some_and(|slots| slots.contains_key(&slot)) {
                continue;
            }
            let distance =
                slot_position(first, second, n, self.gap, slot).distance_squared(current);
            let better = match best {
                None => true,
                Some((_, best_distance)) => distance > best_distance,
            };
            if better {
                best = Some((slot, distance));
            }
        }

        let (slot, _) = best?;
        self.claims.insert(
            label.to_string(),
            Claim {
                pair: pair.clone(),
                slot,
            },
        );
        self.occupied
            .entry(pair.clone())
            .or_default()
            .insert(slot, label.to_string());
        Some(slot)
    }

    /// Re-claims `slot` for `label` after a graph swap. Fails when another
    /// label already holds that slot between the same pair.
    pub fn restore(&mut self, label: &str, pair: &PairKey, slot: usize) -> bool {
        let slots = self.occupied.entry(pair.clone()).or_default();
        if slots.get(&slot).is_some_and(|holder| holder != label) {
            return false;
        }
        slots.insert(slot, label.to_string());
        if let Some(old) = self.claims.insert(
            label.to_string(),
            Claim {
                pair: pair.clone(),
                slot,
            },
        ) && (old.pair != *pair || old.slot != slot)
            && let Some(slots) = self.occupied.get_mut(&old.pair)
        {
            slots.remove(&old.slot);
            if slots.is_empty() {
                self.occupied.remove(&old.pair);
            }
        }
        true
    }

    /// Position of the slot held by `label`, if any.
    pub fn target(&self, label: &str, first: Vec2, second: Vec2, n: usize) -> Option<Vec2> {
        let claim = self.claims.get(label)?;
        (claim.slot < n).then(|| slot_position(first, second, n, self.gap, claim.slot))
    }

    pub fn slot_of(&self, label: &str) -> Option<usize> {
        self.claims.get(label).map(|claim| claim.slot)
    }

    pub fn release(&mut self, label: &str) {
        let Some(claim) = self.claims.remove(label) else {
            return;
        };
        if let Some(slots) = self.occupied.get_mut(&claim.pair) {
            slots.remove(&claim.slot);
            if slots.is_empty() {
                self.occupied.remove(&claim.pair);
            }
        }
    }

    /// Drops claims held by labels for which `is_active` is false.
    pub fn release_stale(&mut self, is_active: impl Fn(&str) -> bool) -> usize {
        let stale: Vec<String> = self
            .claims
            .keys()
            .filter(|label| !is_active(label))
            .cloned()
            .collect();
        for label in &stale {
            self.release(label);
        }
        stale.len()
    }

    pub fn reset(&mut self) {
        self.claims.clear();
        self.occupied.clear();
    }

    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_key_is_unordered() {
        assert_eq!(PairKey::new("a", "b"), PairKey::new("b", "a"));
        assert_eq!(PairKey::new("b", "a").first(), "a");
    }

    #[test]
    fn slots_are_spaced_along_bisector() {
        let slots = hotspot_positions(Vec2::new(-50.0, 0.0), Vec2::new(50.0, 0.0), 3, 50.0);
        assert_eq!(slots, vec![Vec2::new(0.0, -50.0), Vec2::ZERO, Vec2::new(0.0, 50.0)]);
        let single = hotspot_positions(Vec2::new(0.0, 0.0), Vec2::new(10.0, 10.0), 1, 50.0);
        assert_eq!(single, vec![Vec2::new(5.0, 5.0)]);
    }

    #[test]
    fn coincident_endpoints_use_fallback_axis() {
        let slots = hotspot_positions(Vec2::ONE, Vec2::ONE, 2, 10.0);
        assert_eq!(slots, vec![Vec2::new(1.0, -4.0), Vec2::new(1.0, 6.0)]);
    }

    #[test]
    fn parallel_labels_get_distinct_slots_regardless_of_direction() {
        let mut router = HotspotRouter::new(50.0);
        let pair = PairKey::new("b", "a");
        let (a, b) = (Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0));
        let first = router.assign("a->b", &pair, a, b, 2, Vec2::ZERO);
        let second = router.assign("b->a", &pair, a, b, 2, Vec2::ZERO);
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
        assert_eq!(router.assign("a->b", &pair, a, b, 2, Vec2::ZERO), first);
        assert_eq!(router.assign("third", &pair, a, b, 2, Vec2::ZERO), None);
    }

    #[test]
    fn claims_farthest_free_slot() {
        let mut router = HotspotRouter::new(50.0);
        let pair = PairKey::new("a", "b");
        let (a, b) = (Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0));
        let slot = router.assign("l", &pair, a, b, 3, Vec2::new(0.0, 60.0));
        assert_eq!(slot, Some(0));
    }

    #[test]
    fn stale_claims_are_released() {
        let mut router = HotspotRouter::new(50.0);
        let pair = PairKey::new("a", "b");
        router.assign("gone", &pair, Vec2::ZERO, Vec2::X, 1, Vec2::ZERO);
        assert_eq!(router.assign("new", &pair, Vec2::ZERO, Vec2::X, 1, Vec2::ZERO), None);
        assert_eq!(router.slot_of("gone"), Some(0));
        assert_eq!(router.release_stale(|label| label != "gone"), 1);
        assert_eq!(router.claim_count(), 0);
        assert_eq!(
            router.assign("new", &pair, Vec2::ZERO, Vec2::X, 1, Vec2::ZERO),
            Some(0)
        );
        assert_eq!(router.slot_of("gone"), None);
    }

    #[test]
    fn restored_claims_survive_reassignment() {
        let mut router = HotspotRouter::new(50.0);
        let pair = PairKey::new("a", "b");
        let (a, b) = (Vec2::new(-100.0, 0.0), Vec2::new(100.0, 0.0));
        assert!(router.restore("first", &pair, 2));
        assert!(!router.restore("second", &pair, 2));
        assert!(router.restore("second", &pair, 0));
        assert_eq!(router.assign("first", &pair, a, b, 3, Vec2::new(0.0, 50.0)), Some(2));
        assert_eq!(router.assign("second", &pair, a, b, 3, Vec2::new(0.0, -50.0)), Some(0));
        assert_eq!(router.assign("third", &pair, a, b, 3, Vec2::ZERO), Some(1));
        assert_eq!(router.claim_count(), 3);
    }
}
