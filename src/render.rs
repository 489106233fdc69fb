use crate::config::RenderConfig;
use crate::ir::NodeKind;
use crate::layout::{EdgePlacement, NodePlacement, RenderFrame};
use crate::theme::Theme;
use anyhow::Result;
use glam::Vec2;
use std::path::Path;

/// Renders a frame as a standalone SVG preview. The viewport is centered on the origin.
pub fn render_svg(frame: &RenderFrame, theme: &Theme, config: &RenderConfig) -> String {
    let mut svg = String::new();
    let width = config.width.max(200.0);
    let height = config.height.max(200.0);
    let (min_x, min_y) = (-width / 2.0, -height / 2.0);

    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{min_x} {min_y} {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect x=\"{min_x}\" y=\"{min_y}\" width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    svg.push_str("<defs>");
    svg.push_str(&format!(
        "<marker id=\"arrow\" viewBox=\"0 0 10 10\" refX=\"10\" refY=\"5\" markerWidth=\"6\" markerHeight=\"6\" orient=\"auto-start-reverse\"><path d=\"M 0 0 L 10 5 L 0 10 z\" fill=\"{}\"/></marker>",
        theme.line_color
    ));
    svg.push_str("</defs>");

    for edge in &frame.edges {
        svg.push_str(&edge_svg(edge, frame, theme));
    }

    for node in &frame.nodes {
        svg.push_str(&node_svg(node, theme));
    }

    svg.push_str("</svg>");
    svg
}

fn edge_svg(edge: &EdgePlacement, frame: &RenderFrame, theme: &Theme) -> String {
    let curve = &edge.curve;
    // Curves are drawn from whichever end keeps the text upright; the arrow
    // still has to point at the target.
    let marker = if curve.reversed {
        "marker-start=\"url(#arrow)\""
    } else {
        "marker-end=\"url(#arrow)\""
    };
    let start = trim_endpoint(curve.start, curve.control, frame, edge, curve.reversed, true);
    let end = trim_endpoint(curve.end, curve.control, frame, edge, curve.reversed, false);
    format!(
        "<path d=\"M {:.2} {:.2} Q {:.2} {:.2} {:.2} {:.2}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.4\" {marker}/>",
        start.x, start.y, curve.control.x, curve.control.y, end.x, end.y, theme.line_color
    )
}

/// Moves a curve endpoint from the node center to the node's rim so arrowheads stay visible.
fn trim_endpoint(
    point: Vec2,
    toward: Vec2,
    frame: &RenderFrame,
    edge: &EdgePlacement,
    reversed: bool,
    is_start: bool,
) -> Vec2 {
    let id = if is_start != reversed {
        &edge.source_id
    } else {
        &edge.target_id
    };
    let Some(node) = frame.node(id) else {
        return point;
    };
    let direction = toward - point;
    let length = direction.length();
    if length <= node.radius || length < 1e-3 {
        return point;
    }
    point + direction / length * node.radius
}

fn node_svg(node: &NodePlacement, theme: &Theme) -> String {
    let mut out = String::new();
    match node.kind {
        NodeKind::EdgeLabel => {
            out.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" fill-opacity=\"0.85\"/>",
                node.x, node.y, node.radius, theme.edge_label_fill
            ));
            out.push_str(&text_svg(node.x, node.y, &node.label, theme, &theme.edge_label_text, 0.85));
        }
        NodeKind::Cluster => {
            out.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{}\" stroke-dasharray=\"6 4\" stroke-width=\"1.2\"/>",
                node.x, node.y, node.radius, theme.cluster_fill, theme.cluster_stroke
            ));
            out.push_str(&text_svg(node.x, node.y, &node.label, theme, &theme.text_color, 1.0));
        }
        NodeKind::Entity => {
            let (stroke, stroke_width) = if node.pinned {
                (theme.pinned_stroke.as_str(), 2.4)
            } else if node.anchor {
                (theme.anchor_stroke.as_str(), 2.0)
            } else {
                (theme.entity_stroke.as_str(), 1.4)
            };
            out.push_str(&format!(
                "<circle cx=\"{:.2}\" cy=\"{:.2}\" r=\"{:.2}\" fill=\"{}\" stroke=\"{stroke}\" stroke-width=\"{stroke_width}\"/>",
                node.x, node.y, node.radius, theme.entity_fill
            ));
            out.push_str(&text_svg(node.x, node.y, &node.label, theme, &theme.text_color, 1.0));
        }
    }
    out
}

fn text_svg(x: f32, y: f32, text: &str, theme: &Theme, fill: &str, scale: f32) -> String {
    let font_size = theme.font_size * scale;
    let baseline = y + font_size * 0.35;
    format!(
        "<text x=\"{x:.2}\" y=\"{baseline:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{font_size}\" fill=\"{fill}\">{}</text>",
        escape_xml(&theme.font_family),
        escape_xml(text)
    )
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, render_cfg: &RenderConfig) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = "Inter".to_string();
    if let Some(size) = usvg::Size::from_wh(render_cfg.width, render_cfg.height) {
        opt.default_size = size;
    }

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
