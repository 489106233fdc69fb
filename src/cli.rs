use crate::config::{Config, load_config};
use crate::ir::{GraphInput, TypeTag};
use crate::layout_dump::write_layout_dump;
use crate::network::{Command, Network};
use crate::render::{render_svg, write_output_svg};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(
    name = "glens",
    version,
    about = "Budgeted simplification and force layout for entity/relation graphs"
)]
pub struct Args {
    /// Input graph (.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file (svg/png). Defaults to stdout for SVG if omitted.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short = 'e', long = "outputFormat", value_enum, default_value = "svg")]
    pub output_format: OutputFormat,

    /// Config file (JSON or JSON5)
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Write the final layout as JSON to this path
    #[arg(long = "dump")]
    pub dump: Option<PathBuf>,

    /// Number of elements to render (defaults to everything)
    #[arg(short = 'b', long = "budget")]
    pub budget: Option<usize>,

    /// Maximum simulation ticks to run before writing output
    #[arg(short = 't', long = "ticks", default_value_t = 300)]
    pub ticks: usize,

    /// Only show the connected component of this node
    #[arg(long = "focus")]
    pub focus: Option<String>,

    /// Expand the cluster of this type (repeatable)
    #[arg(long = "expand")]
    pub expand: Vec<String>,

    /// Width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Svg,
    Png,
}

pub fn run() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", args.config))?;
    apply_args(&mut config, &args);

    let raw = read_input(args.input.as_deref())?;
    let input = GraphInput::from_json(&raw).context("failed to parse graph input")?;
    log::info!(
        "loaded {} nodes and {} relations",
        input.nodes.len(),
        input.edges.len()
    );

    let mut network = Network::with_input(config.clone(), input);
    for (type_tag, count) in network.base().type_histogram() {
        log::debug!("{count} {type_tag} nodes");
    }
    if args.focus.is_some() {
        network.push(Command::Focus(args.focus.clone()));
    }
    // Clusters only exist once the first derivation ran, so expansions go after focus.
    network.tick();
    for tag in &args.expand {
        network.push(Command::ToggleCluster(TypeTag::new(tag.as_str())));
    }
    let report = network.run(args.ticks);
    log::info!(
        "stopped after {} ticks, {} nodes still moving (max displacement {:.3})",
        network.simulation().ticks(),
        report.moved,
        report.max_displacement
    );

    for diagnostic in network.take_diagnostics() {
        eprintln!("warning: {diagnostic}");
    }

    if let Some(path) = args.dump.as_deref() {
        write_layout_dump(path, &network)?;
    }

    let svg = render_svg(&network.frame(), &config.theme, &config.render);
    match args.output_format {
        OutputFormat::Svg => write_output_svg(&svg, args.output.as_deref())?,
        OutputFormat::Png => {
            let output = ensure_output(&args.output, "png")?;
            write_png(&svg, &output, &config)?;
        }
    }
    Ok(())
}

fn apply_args(config: &mut Config, args: &Args) {
    if args.budget.is_some() {
        config.compression.budget = args.budget;
    }
    if let Some(width) = args.width {
        config.layout.width = width;
        config.render.width = width;
    }
    if let Some(height) = args.height {
        config.layout.height = height;
        config.render.height = height;
    }
}

#[cfg(feature = "png")]
fn write_png(svg: &str, output: &Path, config: &Config) -> Result<()> {
    crate::render::write_output_png(svg, output, &config.render)
}

#[cfg(not(feature = "png"))]
fn write_png(_svg: &str, _output: &Path, _config: &Config) -> Result<()> {
    Err(anyhow::anyhow!("PNG output requires the `png` feature"))
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path
        && path != Path::new("-")
    {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn ensure_output(output: &Option<PathBuf>, ext: &str) -> Result<PathBuf> {
    if let Some(path) = output {
        return Ok(path.clone());
    }
    Err(anyhow::anyhow!("Output path required for {} output", ext))
}
