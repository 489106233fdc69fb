use thiserror::Error;

/// Locally recovered conditions raised while deriving or simulating a network.
///
/// None of these abort a derivation pass or a tick. They are logged where they
/// occur and collected on the [`crate::network::Network`] so callers can surface
/// them.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    /// A link references a node that is not part of the (filtered) graph.
    #[error("link {link_id} references missing node {missing}")]
    DataInconsistency { link_id: String, missing: String },

    /// A node id appeared more than once in the input.
    #[error("duplicate node id {id}, keeping the first occurrence")]
    DuplicateNode { id: String },

    /// A relation's label id was already taken by another node, so the
    /// relation was dropped.
    #[error("relation {link_id} dropped, its label id is already a node id")]
    RelationIdTaken { link_id: String },

    /// Zero-length vector or coincident points fed into force or curve math.
    #[error("degenerate geometry at node {node}: {detail}")]
    DegenerateGeometry { node: String, detail: &'static str },

    /// The hotspot router had no unclaimed slot left for a label.
    #[error("no free hotspot slot for {label} between {first} and {second}")]
    SlotExhaustion {
        label: String,
        first: String,
        second: String,
    },

    /// The requested budget fell outside `[c_min, c_max]`.
    #[error("budget {requested} outside [{c_min}, {c_max}], using {resolved}")]
    BudgetOutOfRange {
        requested: usize,
        c_min: usize,
        c_max: usize,
        resolved: usize,
    },

    /// An internal invariant did not hold; the offending element was dropped.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A command addressed a node that is not active.
    #[error("unknown node {0}")]
    UnknownNode(String),
}

impl Diagnostic {
    /// Emits the diagnostic through the `log` facade at the level its kind warrants.
    pub fn log(&self) {
        match self {
            Diagnostic::InvariantViolation(_) => log::error!("{self}"),
            Diagnostic::DegenerateGeometry { .. } => log::debug!("{self}"),
            Diagnostic::BudgetOutOfRange { .. } | Diagnostic::UnknownNode(_) => {
                log::info!("{self}")
            }
            _ => log::warn!("{self}"),
        }
    }
}

/// Convenience for collecting and logging diagnostics in one place.
#[derive(Debug, Default, Clone)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.log();
        self.items.push(diagnostic);
    }

    /// Collects diagnostics that were already logged where they were raised.
    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.items.extend(diagnostics);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.items)
    }
}
