//! Core of a 2-D artificial-life world of token-driven cell clusters.
//!
//! Main components:
//! - [`space_metric`]: toroidal position and distance arithmetic.
//! - [`cell`], [`cluster`], [`token`]: the cell/cluster model.
//! - [`functions`]: cell functions and their dispatch.
//! - [`delta_buffer`]: accumulated kinematic requests per cluster.
//! - [`physics`]: rigid-body integration of clusters.
//! - [`phases`]: the phases of one simulation step.
//! - [`energy`]: energy totals and the per-step balance check.
//! - [`simulation`]: the world facade and step pipeline.
//! - [`description`]: data descriptions exchanged with callers.
//! - [`config`]: simulation parameters.

pub mod cell;
pub mod cluster;
pub mod config;
pub mod delta_buffer;
pub mod description;
pub mod energy;
pub mod error;
pub mod functions;
pub mod generator;
pub mod particle;
pub mod phases;
pub mod physics;
pub mod report;
pub mod simulation;
pub mod space_metric;
pub mod token;
pub mod types;
pub mod world_view;

pub use config::{ConfigError, SimulationParameters};
pub use description::{
    CellDescription, CellFeatureDescription, ClusterDescription, DataDescription,
    ParticleDescription, TokenDescription,
};
pub use error::DescriptionError;
pub use report::{StepDiagnostic, StepOutcome, StepReport};
pub use simulation::Simulation;
