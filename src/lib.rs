//! Design-storm runoff hydrographs for small basins by the SC Synthetic Unit
//! Hydrograph method, with optional modified-Puls routing through a
//! detention pond.

pub mod cli;
pub mod config;
pub mod distribution;
pub mod error;
pub mod io;
pub mod pond;
pub mod routing;
pub mod state;
pub mod storm;
pub mod synthesis;
pub mod tc;
pub mod unit_hydrograph;
pub mod weighting;

pub use config::{RunConfig, Scenario};
pub use error::{Advisory, HydroError, Result};
pub use pond::PondStageTable;
pub use routing::{RoutingResult, process_routing_parallel};
pub use storm::StormDuration;
pub use synthesis::{SynthesisResult, process_synthesis_parallel};
