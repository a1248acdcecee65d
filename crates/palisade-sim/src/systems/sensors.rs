//! Sensor phase — spherical-range detection of living targets.
//!
//! Sensors are stateless: no noise, no latency, no occlusion. The command
//! post receives the union of all detections, so duplicates collapse and the
//! result is independent of sensor order.

use std::collections::BTreeSet;

use hecs::World;

use palisade_core::components::{Position, SensorSite, Threat, ThreatState};

/// Every living target within 3-D range of at least one sensor.
pub fn run(world: &World) -> BTreeSet<u32> {
    let mut sensors: Vec<(palisade_core::geometry::Vec3, f64)> = Vec::new();
    {
        let mut query = world.query::<(&SensorSite, &Position)>();
        for (_entity, (sensor, pos)) in query.iter() {
            sensors.push((pos.0, sensor.range_m));
        }
    }

    let mut detected = BTreeSet::new();
    let mut query = world.query::<(&Threat, &ThreatState, &Position)>();
    for (_entity, (_threat, state, pos)) in query.iter() {
        if !state.disposition.is_alive() {
            continue;
        }
        if sensors
            .iter()
            .any(|&(sensor_pos, range)| sensor_pos.distance_to(pos.0) <= range)
        {
            detected.insert(state.id);
        }
    }

    detected
}
