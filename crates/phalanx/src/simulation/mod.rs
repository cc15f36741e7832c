//! # Synthetic Simulation
//!
//! Stand-ins for the host simulation, used for soak testing the spatial core.
//!
//! ## Modules
//!
//! - `world`: seeded wandering population, enumerated by the writer
//! - `geometry`: analytic terrain, pillars blocking sight, detouring paths
//! - `swarm`: one writer thread and many reader threads against one region

pub mod geometry;
pub mod swarm;
pub mod world;

pub use geometry::{Pillar, SyntheticGeometry};
pub use swarm::{run_swarm, ReaderReport, SwarmConfig, SwarmReport};
pub use world::{SyntheticObject, SyntheticWorld, SyntheticWorldConfig};
