//! Phase systems, run by the engine in a mandated order each tick:
//! spawn → targets → missiles → hit application → sensors → fire control,
//! then snapshot and cleanup.

pub mod cleanup;
pub mod fire_control;
pub mod missiles;
pub mod sensors;
pub mod snapshot;
pub mod spawn;
pub mod targets;
