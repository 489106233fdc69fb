use crate::ir::TypeTag;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Upper bound for every user-tunable force weight.
pub const MAX_FORCE_WEIGHT: f32 = 0.9;

/// Weights of the three custom layout forces, each in `[0, MAX_FORCE_WEIGHT]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForceWeights {
    /// Pull of entities toward their type's home slot (alpha).
    pub cluster_gravity: f32,
    /// Pull of edge-label nodes toward their hotspot (beta).
    pub edge_straightness: f32,
    /// Pull of entities toward the centroid of their edge-label nodes.
    pub edge_shortness: f32,
}

impl ForceWeights {
    pub fn clamped(self) -> Self {
        Self {
            cluster_gravity: clamp_weight(self.cluster_gravity),
            edge_straightness: clamp_weight(self.edge_straightness),
            edge_shortness: clamp_weight(self.edge_shortness),
        }
    }
}

impl Default for ForceWeights {
    fn default() -> Self {
        Self {
            cluster_gravity: 0.3,
            edge_straightness: 0.6,
            edge_shortness: 0.1,
        }
    }
}

fn clamp_weight(value: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, MAX_FORCE_WEIGHT)
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Viewport size; the origin is the viewport center.
    pub width: f32,
    pub height: f32,
    pub forces: ForceWeights,
    pub collision_strength: f32,
    /// Fraction of velocity removed every tick.
    pub velocity_decay: f32,
    /// 1.0 recenters fully every tick, 0.0 disables the center force.
    pub center_strength: f32,
    /// Distance between neighbouring hotspots of parallel edges.
    pub hotspot_gap: f32,
    /// Home ring radius is `min(width, height) / home_ring_divisor`.
    pub home_ring_divisor: f32,
    /// Below this per-tick displacement a node counts as settled.
    pub settle_epsilon: f32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            forces: ForceWeights::default(),
            collision_strength: 1.0,
            velocity_decay: 0.4,
            center_strength: 1.0,
            hotspot_gap: 50.0,
            home_ring_divisor: 3.5,
            settle_epsilon: 0.01,
        }
    }
}

impl LayoutConfig {
    pub fn home_ring_radius(&self) -> f32 {
        let radius = self.width.min(self.height).max(0.0) / self.home_ring_divisor.max(1.0);
        if radius.is_finite() { radius } else { 0.0 }
    }
}

/// Radius policy for rendered nodes.
///
/// Entity radius is `(type_scale + min_node_weight + degree / degree_per_weight) * min_radius`,
/// capped at `max_radius`. The outer radius adds `controls_margin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSizing {
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_node_weight: f32,
    pub degree_per_weight: f32,
    pub controls_margin: f32,
    pub edge_label_radius: f32,
    /// Per-type size factor; types not listed use `1.0`.
    pub type_scale: BTreeMap<TypeTag, f32>,
}

impl Default for NodeSizing {
    fn default() -> Self {
        Self {
            min_radius: 25.0,
            max_radius: 100.0,
            min_node_weight: 0.5,
            degree_per_weight: 3.0,
            controls_margin: 6.0,
            edge_label_radius: 14.0,
            type_scale: BTreeMap::new(),
        }
    }
}

impl NodeSizing {
    /// Returns `(radius, outer_radius)` for an entity.
    pub fn entity_radii(&self, type_tag: &TypeTag, degree: usize) -> (f32, f32) {
        let scale = self.type_scale.get(type_tag).copied().unwrap_or(1.0);
        let weight = self.min_node_weight + degree as f32 / self.degree_per_weight.max(1.0);
        self.finish((scale + weight) * self.min_radius)
    }

    /// Returns `(radius, outer_radius)` for a cluster holding `members` nodes.
    pub fn cluster_radii(&self, members: usize) -> (f32, f32) {
        let weight = 3.0 * self.min_node_weight
            + (members as f32).sqrt() / self.degree_per_weight.max(1.0);
        self.finish(weight * self.min_radius)
    }

    pub fn edge_label_radii(&self) -> (f32, f32) {
        let radius = self.edge_label_radius.max(0.0);
        (radius, radius)
    }

    fn finish(&self, radius: f32) -> (f32, f32) {
        let radius = radius.clamp(0.0, self.max_radius.max(0.0));
        (radius, radius + self.controls_margin.max(0.0))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompressionConfig {
    /// Number of elements to render; `None` renders everything (`C_max`).
    pub budget: Option<usize>,
    /// Type tags from most to least important. Empty disables class scoring.
    pub class_priority: Vec<TypeTag>,
}

/// Pre-filter applied to the base graph before scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityConfig {
    pub hidden_types: BTreeSet<TypeTag>,
    pub hidden_relations: BTreeSet<String>,
}

impl VisibilityConfig {
    pub fn type_visible(&self, type_tag: &TypeTag) -> bool {
        !self.hidden_types.contains(type_tag)
    }

    pub fn relation_visible(&self, relation_tag: &str) -> bool {
        !self.hidden_relations.contains(relation_tag)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub width: f32,
    pub height: f32,
    pub background: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1200.0,
            height: 800.0,
            background: "#FFFFFF".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub theme: Theme,
    pub layout: LayoutConfig,
    pub nodes: NodeSizing,
    pub compression: CompressionConfig,
    pub visibility: VisibilityConfig,
    pub render: RenderConfig,
}

impl Default for Config {
    fn default() -> Self {
        let theme = Theme::modern();
        let render = RenderConfig {
            background: theme.background.clone(),
            ..Default::default()
        };
        Self {
            theme,
            layout: LayoutConfig::default(),
            nodes: NodeSizing::default(),
            compression: CompressionConfig::default(),
            visibility: VisibilityConfig::default(),
            render,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    theme: Option<String>,
    font_family: Option<String>,
    font_size: Option<f32>,
    width: Option<f32>,
    height: Option<f32>,
    forces: Option<ForcesFile>,
    layout: Option<LayoutFile>,
    nodes: Option<NodesFile>,
    compression: Option<CompressionFile>,
    visibility: Option<VisibilityFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ForcesFile {
    cluster_gravity: Option<f32>,
    edge_straightness: Option<f32>,
    edge_shortness: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LayoutFile {
    collision_strength: Option<f32>,
    velocity_decay: Option<f32>,
    center_strength: Option<f32>,
    hotspot_gap: Option<f32>,
    home_ring_divisor: Option<f32>,
    settle_epsilon: Option<f32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodesFile {
    min_radius: Option<f32>,
    max_radius: Option<f32>,
    min_node_weight: Option<f32>,
    degree_per_weight: Option<f32>,
    controls_margin: Option<f32>,
    edge_label_radius: Option<f32>,
    type_scale: Option<BTreeMap<String, f32>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompressionFile {
    budget: Option<usize>,
    class_priority: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisibilityFile {
    hidden_types: Option<Vec<String>>,
    hidden_relations: Option<Vec<String>>,
}

/// Loads a configuration file (JSON or JSON5, camelCase keys) over the defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// `value` when it is finite and accepted by `valid`, otherwise a warning and
/// `None` so the default stays in place.
fn checked(key: &str, value: f32, valid: impl Fn(f32) -> bool) -> Option<f32> {
    if value.is_finite() && valid(value) {
        Some(value)
    } else {
        log::warn!("ignoring {key} = {value}, keeping the default");
        None
    }
}

fn positive(value: f32) -> bool {
    value > 0.0
}

fn any(_: f32) -> bool {
    true
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let parsed: ConfigFile = json5::from_str(contents)?;
    let mut config = Config::default();

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        } else {
            log::warn!("unknown theme {theme_name}, keeping the default");
        }
    }
    if let Some(v) = parsed.font_family {
        config.theme.font_family = v;
    }
    if let Some(v) = parsed.font_size.and_then(|v| checked("fontSize", v, positive)) {
        config.theme.font_size = v;
    }
    if let Some(v) = parsed.width.and_then(|v| checked("width", v, positive)) {
        config.layout.width = v;
        config.render.width = v;
    }
    if let Some(v) = parsed.height.and_then(|v| checked("height", v, positive)) {
        config.layout.height = v;
        config.render.height = v;
    }

    if let Some(forces) = parsed.forces {
        if let Some(v) = forces.cluster_gravity {
            config.layout.forces.cluster_gravity = v;
        }
        if let Some(v) = forces.edge_straightness {
            config.layout.forces.edge_straightness = v;
        }
        if let Some(v) = forces.edge_shortness {
            config.layout.forces.edge_shortness = v;
        }
    }
    config.layout.forces = config.layout.forces.clamped();

    if let Some(layout) = parsed.layout {
        if let Some(v) = layout
            .collision_strength
            .and_then(|v| checked("collisionStrength", v, any))
        {
            config.layout.collision_strength = v.max(0.0);
        }
        if let Some(v) = layout.velocity_decay.and_then(|v| checked("velocityDecay", v, any)) {
            config.layout.velocity_decay = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.center_strength.and_then(|v| checked("centerStrength", v, any)) {
            config.layout.center_strength = v.clamp(0.0, 1.0);
        }
        if let Some(v) = layout.hotspot_gap.and_then(|v| checked("hotspotGap", v, any)) {
            config.layout.hotspot_gap = v.max(0.0);
        }
        if let Some(v) = layout
            .home_ring_divisor
            .and_then(|v| checked("homeRingDivisor", v, positive))
        {
            config.layout.home_ring_divisor = v;
        }
        if let Some(v) = layout
            .settle_epsilon
            .and_then(|v| checked("settleEpsilon", v, |v| v >= 0.0))
        {
            config.layout.settle_epsilon = v;
        }
    }

    if let Some(nodes) = parsed.nodes {
        if let Some(v) = nodes.min_radius.and_then(|v| checked("minRadius", v, positive)) {
            config.nodes.min_radius = v;
        }
        if let Some(v) = nodes.max_radius.and_then(|v| checked("maxRadius", v, positive)) {
            config.nodes.max_radius = v;
        }
        if let Some(v) = nodes.min_node_weight.and_then(|v| checked("minNodeWeight", v, any)) {
            config.nodes.min_node_weight = v;
        }
        if let Some(v) = nodes
            .degree_per_weight
            .and_then(|v| checked("degreePerWeight", v, positive))
        {
            config.nodes.degree_per_weight = v;
        }
        if let Some(v) = nodes
            .controls_margin
            .and_then(|v| checked("controlsMargin", v, |v| v >= 0.0))
        {
            config.nodes.controls_margin = v;
        }
        if let Some(v) = nodes
            .edge_label_radius
            .and_then(|v| checked("edgeLabelRadius", v, positive))
        {
            config.nodes.edge_label_radius = v;
        }
        if let Some(scales) = nodes.type_scale {
            config.nodes.type_scale = scales
                .into_iter()
                .filter_map(|(tag, scale)| {
                    let scale = checked(&format!("typeScale.{tag}"), scale, any)?;
                    Some((TypeTag::new(tag), scale))
                })
                .collect();
        }
    }

    if let Some(compression) = parsed.compression {
        if compression.budget.is_some() {
            config.compression.budget = compression.budget;
        }
        if let Some(order) = compression.class_priority {
            config.compression.class_priority = order.into_iter().map(TypeTag::new).collect();
        }
    }

    if let Some(visibility) = parsed.visibility {
        if let Some(types) = visibility.hidden_types {
            config.visibility.hidden_types = types.into_iter().map(TypeTag::new).collect();
        }
        if let Some(relations) = visibility.hidden_relations {
            config.visibility.hidden_relations = relations.into_iter().collect();
        }
    }

    config.render.background = config.theme.background.clone();

    Ok(config)
}
