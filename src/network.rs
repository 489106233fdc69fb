use crate::cluster::{ClusterTable, ToggleOutcome};
use crate::compress::CompressionStats;
use crate::config::{Config, ForceWeights, VisibilityConfig};
use crate::derive::derive;
use crate::error::{Diagnostic, Diagnostics};
use crate::ir::{Graph, GraphInput, TypeTag};
use crate::layout::{RenderFrame, Simulation, TickReport};
use glam::Vec2;
use std::collections::VecDeque;

/// Inputs that change what is shown or how it moves. Queued and applied at the
/// start of the next [`Network::tick`].
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the data source contents.
    Reload(GraphInput),
    /// `None` renders everything.
    SetBudget(Option<usize>),
    SetVisibility(VisibilityConfig),
    SetClassPriority(Vec<TypeTag>),
    /// Restrict the graph to the connected component of a node.
    Focus(Option<String>),
    Resize { width: f32, height: f32 },
    SetForces(ForceWeights),
    ToggleCluster(TypeTag),
    StartDrag(String),
    UpdateDrag { x: f32, y: f32 },
    EndDrag,
    TogglePin(String),
    Pause,
    Resume,
}

/// One visualization session: the base graph, the derived active graph and the
/// simulation running over it.
#[derive(Debug, Clone)]
pub struct Network {
    config: Config,
    input: GraphInput,
    base: Graph,
    focus: Option<String>,
    clusters: ClusterTable,
    simulation: Simulation,
    queue: VecDeque<Command>,
    diagnostics: Diagnostics,
    stats: CompressionStats,
}

impl Network {
    pub fn new(config: Config) -> Self {
        let simulation = Simulation::new(config.layout.clone());
        Self {
            config,
            input: GraphInput::default(),
            base: Graph::new(),
            focus: None,
            clusters: ClusterTable::new(),
            simulation,
            queue: VecDeque::new(),
            diagnostics: Diagnostics::new(),
            stats: CompressionStats::default(),
        }
    }

    /// Builds a session and derives the first active graph right away.
    pub fn with_input(config: Config, input: GraphInput) -> Self {
        let mut network = Self::new(config);
        network.apply(Command::Reload(input));
        network
    }

    pub fn push(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Applies every queued command, then advances the simulation one step.
    pub fn tick(&mut self) -> TickReport {
        while let Some(command) = self.queue.pop_front() {
            self.apply(command);
        }
        self.simulation.step(&mut self.diagnostics)
    }

    /// Ticks up to `max_ticks` times, stopping early once nothing moves.
    pub fn run(&mut self, max_ticks: usize) -> TickReport {
        let mut report = TickReport::default();
        for _ in 0..max_ticks {
            report = self.tick();
            if report.is_settled() {
                break;
            }
        }
        report
    }

    pub fn frame(&self) -> RenderFrame {
        self.simulation.frame()
    }

    pub fn stats(&self) -> CompressionStats {
        self.stats
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn base(&self) -> &Graph {
        &self.base
    }

    pub fn graph(&self) -> &Graph {
        self.simulation.graph()
    }

    pub fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    pub fn clusters(&self) -> &ClusterTable {
        &self.clusters
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diagnostics.take()
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Reload(input) => {
                self.input = input;
                self.rebuild_base();
                self.rederive();
            }
            Command::SetBudget(budget) => {
                self.config.compression.budget = budget;
                self.rederive();
            }
            Command::SetVisibility(visibility) => {
                self.config.visibility = visibility;
                self.rebuild_base();
                self.rederive();
            }
            Command::SetClassPriority(priority) => {
                self.config.compression.class_priority = priority;
                self.rederive();
            }
            Command::Focus(focus) => {
                self.focus = focus;
                self.rederive();
            }
            Command::Resize { width, height } => {
                self.simulation.resize(width, height);
                self.config.layout = self.simulation.config().clone();
            }
            Command::SetForces(weights) => {
                self.simulation.set_forces(weights);
                self.config.layout.forces = self.simulation.config().forces;
            }
            Command::ToggleCluster(type_tag) => {
                self.clusters.hold(self.simulation.dragged());
                let outcome =
                    self.clusters
                        .toggle(self.simulation.graph_mut(), &type_tag, &self.config.nodes);
                if outcome == ToggleOutcome::Unchanged {
                    log::info!("no cluster to toggle for {type_tag}");
                }
                if !self.clusters.is_exclusive(self.simulation.graph()) {
                    self.diagnostics.push(Diagnostic::InvariantViolation(format!(
                        "cluster {type_tag} and its members active together"
                    )));
                }
            }
            Command::StartDrag(id) => {
                if let Err(diagnostic) = self.simulation.start_drag(&id) {
                    self.diagnostics.push(diagnostic);
                }
            }
            Command::UpdateDrag { x, y } => {
                if let Err(diagnostic) = self.simulation.update_drag(Vec2::new(x, y)) {
                    self.diagnostics.push(diagnostic);
                }
            }
            Command::EndDrag => self.simulation.end_drag(),
            Command::TogglePin(id) => match self.simulation.toggle_pin(&id) {
                Ok(pinned) => log::debug!("{id} pinned: {pinned}"),
                Err(diagnostic) => self.diagnostics.push(diagnostic),
            },
            Command::Pause => self.simulation.pause(),
            Command::Resume => self.simulation.resume(),
        }
    }

    fn rebuild_base(&mut self) {
        let (base, diagnostics) = Graph::from_input(&self.input, &self.config.visibility);
        self.diagnostics.extend(diagnostics);
        self.base = base;
        if let Some(focus) = self.focus.as_deref()
            && !self.base.contains(focus)
        {
            log::info!("focus {focus} is no longer in the graph, clearing it");
            self.focus = None;
        }
    }

    fn rederive(&mut self) {
        self.clusters.hold(self.simulation.dragged());
        let derivation = derive(
            &self.base,
            self.focus.as_deref(),
            &self.config,
            self.simulation.graph(),
            &mut self.clusters,
            &mut self.diagnostics,
        );
        self.stats = derivation.stats;
        self.simulation.replace_graph(derivation.graph);
    }
}
