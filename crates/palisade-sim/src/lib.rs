//! Simulation engine for Palisade.
//!
//! Owns the hecs ECS world, advances it by a fixed timestep through a
//! mandated phase order, and produces a [`palisade_core::state::TickSnapshot`]
//! per tick. Fully headless and deterministic: two runs of the same scenario
//! produce byte-identical snapshots.

pub mod allocator;
pub mod engine;
pub mod guidance;
pub mod scenario;
pub mod systems;

pub use palisade_core as core;

pub use engine::SimulationEngine;
pub use scenario::{Scenario, ScenarioError};

#[cfg(test)]
mod tests;
