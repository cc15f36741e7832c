//! # PHALANX Shared
//!
//! Common types used by the spatial core and by everything that talks to it.
//!
//! ## CRITICAL RULE
//!
//! This crate holds plain data only. If a type needs a lock, an atomic or a
//! thread, it belongs in `phalanx_core`.

#![deny(unsafe_code)]

pub mod constants;
pub mod guid;
pub mod math;

pub use constants::{
    DEFAULT_CELL_SIZE, DEFAULT_REBUILD_BUDGET_MS, DEFAULT_REBUILD_INTERVAL_MS,
};
pub use guid::{HighGuid, ObjectGuid, RegionId};
pub use math::{Position, Vec2, Vec3};
