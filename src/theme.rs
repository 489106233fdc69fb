use serde::{Deserialize, Serialize};

/// Colors and fonts used by the SVG preview. The layout core never reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub entity_fill: String,
    pub entity_stroke: String,
    pub anchor_stroke: String,
    pub pinned_stroke: String,
    pub text_color: String,
    pub line_color: String,
    pub edge_label_fill: String,
    pub edge_label_text: String,
    pub cluster_fill: String,
    pub cluster_stroke: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            entity_fill: "#ECECFF".to_string(),
            entity_stroke: "#9370DB".to_string(),
            anchor_stroke: "#D9480F".to_string(),
            pinned_stroke: "#333333".to_string(),
            text_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            edge_label_fill: "#E8E8E8".to_string(),
            edge_label_text: "#333333".to_string(),
            cluster_fill: "#FFFFDE".to_string(),
            cluster_stroke: "#AAAA33".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 12.0,
            entity_fill: "#F8FAFF".to_string(),
            entity_stroke: "#C7D2E5".to_string(),
            anchor_stroke: "#F08C00".to_string(),
            pinned_stroke: "#1C2430".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            edge_label_fill: "#FFFFFF".to_string(),
            edge_label_text: "#4A5568".to_string(),
            cluster_fill: "#F7FAFF".to_string(),
            cluster_stroke: "#D7E0F0".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }
}
