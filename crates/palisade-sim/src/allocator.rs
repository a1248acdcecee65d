//! Command post — threat prioritization and the assignment ledger.
//!
//! The ledger is the only shared mutable core state: it maps each target to
//! the missiles currently in flight against it, and is touched exclusively in
//! the command-post phase. Ordered maps keep every traversal id-ordered.

use std::collections::{BTreeMap, BTreeSet};

use palisade_core::geometry::Vec3;

/// The defended command post and its missile-assignment ledger.
#[derive(Debug, Clone)]
pub struct CommandPost {
    /// Ground position (z = 0).
    pub position: Vec3,
    /// XY breakthrough radius.
    pub arrival_radius_m: f64,
    /// Optional policy cap on in-flight missiles per target.
    max_assigned_per_target: Option<u32>,
    /// target id -> ids of missiles currently in flight against it.
    ledger: BTreeMap<u32, BTreeSet<u32>>,
}

impl CommandPost {
    pub fn new(position: Vec3, arrival_radius_m: f64, max_assigned_per_target: Option<u32>) -> Self {
        Self {
            position,
            arrival_radius_m,
            max_assigned_per_target,
            ledger: BTreeMap::new(),
        }
    }

    /// Projected time until the target enters the arrival radius along its
    /// straight course, clamped at zero. Infinite for a stationary target.
    pub fn time_to_go(&self, target_pos: Vec3, target_speed: f64) -> f64 {
        if target_speed <= 0.0 {
            return f64::INFINITY;
        }
        let remaining = (target_pos.distance_xy_to(self.position) - self.arrival_radius_m).max(0.0);
        remaining / target_speed
    }

    /// Missiles currently committed against a target.
    pub fn assigned(&self, target_id: u32) -> u32 {
        self.ledger.get(&target_id).map_or(0, |set| set.len() as u32)
    }

    /// The effective assignment cap for a target: its endurance, tightened by
    /// the policy cap when one is configured.
    pub fn max_assignable(&self, endurance: u32) -> u32 {
        match self.max_assigned_per_target {
            Some(cap) => endurance.min(cap),
            None => endurance,
        }
    }

    /// Record a newly launched missile against a target.
    pub fn commit(&mut self, target_id: u32, missile_id: u32) {
        self.ledger.entry(target_id).or_default().insert(missile_id);
    }

    /// Ledger maintenance: drop entries for consumed targets and missiles no
    /// longer in flight.
    pub fn retain_live(&mut self, live_targets: &BTreeSet<u32>, live_missiles: &BTreeSet<u32>) {
        self.ledger.retain(|target_id, missiles| {
            if !live_targets.contains(target_id) {
                return false;
            }
            missiles.retain(|missile_id| live_missiles.contains(missile_id));
            !missiles.is_empty()
        });
    }

    /// The ledger as sorted (target id, missile ids) pairs, for snapshots.
    pub fn entries(&self) -> Vec<(u32, Vec<u32>)> {
        self.ledger
            .iter()
            .map(|(&target_id, missiles)| (target_id, missiles.iter().copied().collect()))
            .collect()
    }
}

/// One detected target with the keys the priority ordering sorts on.
#[derive(Debug, Clone)]
pub struct TargetDemand {
    pub target_id: u32,
    pub tgo_s: f64,
    pub distance_xy_m: f64,
    pub endurance: u32,
    pub position: Vec3,
}

/// Order targets by urgency: time-to-go ascending, then XY distance
/// ascending, then id ascending.
pub fn rank_targets(demands: &mut [TargetDemand]) {
    demands.sort_by(|a, b| {
        a.tgo_s
            .total_cmp(&b.tgo_s)
            .then(a.distance_xy_m.total_cmp(&b.distance_xy_m))
            .then(a.target_id.cmp(&b.target_id))
    });
}
