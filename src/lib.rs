pub mod cluster;
#[cfg(feature = "cli")]
pub mod cli;
pub mod compress;
pub mod config;
pub mod derive;
pub mod error;
pub mod ir;
pub mod layout;
pub mod layout_dump;
pub mod network;
pub mod render;
pub mod theme;

#[cfg(feature = "cli")]
pub use cli::run;
pub use config::Config;
pub use error::Diagnostic;
pub use ir::{Graph, GraphInput, TypeTag};
pub use network::{Command, Network};
