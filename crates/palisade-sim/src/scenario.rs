//! Scenario model — the immutable input bundle the engine is built from.
//!
//! Scenarios are YAML documents partitioned into `sim`, `world`,
//! `command_post`, `policy`, `friendly_forces`, `enemy_forces`, and
//! `missile_defaults`. Every document is validated eagerly; a scenario that
//! fails validation never reaches the engine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use palisade_core::components::MissilePerformance;
use palisade_core::constants::*;
use palisade_core::geometry::{deg_to_rad, Vec3};
use palisade_core::types::WorldBounds;

/// Scenario construction failure. Surfaced to the caller before the
/// simulation starts; the engine itself never aborts on runtime conditions.
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid scenario: {0}")]
    Invalid(String),
}

/// Optional free-form identification block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
}

/// Time discretization and bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSection {
    /// Tick period in seconds.
    #[serde(default = "default_dt")]
    pub dt_s: f64,
    /// Hard time bound in seconds.
    pub t_max_s: f64,
    /// Reserved for future stochastic extensions. Output never depends on it.
    #[serde(default)]
    pub seed: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RegionRect {
    pub xmin_m: f64,
    pub xmax_m: f64,
    pub ymin_m: f64,
    pub ymax_m: f64,
}

impl Default for RegionRect {
    fn default() -> Self {
        Self {
            xmin_m: -REGION_HALF_EXTENT_M,
            xmax_m: REGION_HALF_EXTENT_M,
            ymin_m: -REGION_HALF_EXTENT_M,
            ymax_m: REGION_HALF_EXTENT_M,
        }
    }
}

/// Simulation domain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSection {
    #[serde(default)]
    pub region_rect: RegionRect,
    #[serde(default = "default_z_limits")]
    pub z_limits_m: [f64; 2],
}

impl Default for WorldSection {
    fn default() -> Self {
        Self {
            region_rect: RegionRect::default(),
            z_limits_m: default_z_limits(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position2 {
    pub x_m: f64,
    pub y_m: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position3 {
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub z_m: f64,
}

impl Position3 {
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x_m, self.y_m, self.z_m)
    }
}

/// The defended point and its breakthrough geometry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandPostSection {
    pub position: Position2,
    /// XY radius around the command post; entry counts as breakthrough.
    pub arrival_radius_m: f64,
}

/// Guidance defaults applied to every launched missile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuidanceSection {
    #[serde(rename = "type", default = "default_guidance_type")]
    pub law: String,
    /// Proportional-navigation gain.
    #[serde(rename = "N", default = "default_pn_gain")]
    pub n: f64,
    #[serde(default = "default_endgame_factor")]
    pub endgame_factor: f64,
    #[serde(default = "default_miss_increase_ticks")]
    pub endgame_miss_increase_ticks: u32,
}

impl Default for GuidanceSection {
    fn default() -> Self {
        Self {
            law: default_guidance_type(),
            n: default_pn_gain(),
            endgame_factor: default_endgame_factor(),
            endgame_miss_increase_ticks: default_miss_increase_ticks(),
        }
    }
}

/// Tactical policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySection {
    #[serde(default = "default_true")]
    pub launcher_initially_cooled: bool,
    /// Optional cap on in-flight missiles per target. The effective cap is
    /// the tighter of this and the target's endurance.
    #[serde(default)]
    pub max_assigned_per_target: Option<u32>,
    #[serde(default)]
    pub missile_guidance: GuidanceSection,
}

impl Default for PolicySection {
    fn default() -> Self {
        Self {
            launcher_initially_cooled: true,
            max_assigned_per_target: None,
            missile_guidance: GuidanceSection::default(),
        }
    }
}

/// Kinematic envelope of the interceptor stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KinematicsSection {
    pub initial_speed_mps: f64,
    pub max_speed_mps: f64,
    pub max_accel_mps2: f64,
    pub max_turn_rate_deg_s: f64,
    pub intercept_radius_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissileDefaultsSection {
    pub kinematics: KinematicsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorSpec {
    pub id: String,
    pub pos: Position3,
    pub range_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LauncherSpec {
    pub id: String,
    pub pos: Position3,
    #[serde(default = "default_missiles_loaded")]
    pub missiles_loaded: u32,
    #[serde(default = "default_cooldown")]
    pub cooldown_s: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendlyForcesSection {
    #[serde(default)]
    pub sensors: Vec<SensorSpec>,
    #[serde(default)]
    pub launchers: Vec<LauncherSpec>,
}

/// One enemy formation: a ring-filled group spawned at a scheduled time,
/// flying straight at the command post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    #[serde(default)]
    pub spawn_time_s: f64,
    pub center_xy: Position2,
    #[serde(default)]
    pub z_m: f64,
    pub count: u32,
    pub ring_spacing_m: f64,
    #[serde(default)]
    pub start_angle_deg: f64,
    #[serde(default)]
    pub ring_half_offset: bool,
    pub endurance_pt: u32,
    pub speed_mps: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnemyForcesSection {
    #[serde(default)]
    pub groups: Vec<GroupSpec>,
}

/// The complete, immutable scenario bundle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub meta: ScenarioMeta,
    pub sim: SimSection,
    #[serde(default)]
    pub world: WorldSection,
    pub command_post: CommandPostSection,
    #[serde(default)]
    pub policy: PolicySection,
    #[serde(default)]
    pub friendly_forces: FriendlyForcesSection,
    #[serde(default)]
    pub enemy_forces: EnemyForcesSection,
    pub missile_defaults: MissileDefaultsSection,
}

impl Scenario {
    /// Load and validate a scenario from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Parse and validate a scenario from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = serde_yaml::from_str(yaml)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check every field constraint. Called by the loaders and again by the
    /// engine constructor.
    pub fn validate(&self) -> Result<(), ScenarioError> {
        fn fail(msg: impl Into<String>) -> Result<(), ScenarioError> {
            Err(ScenarioError::Invalid(msg.into()))
        }

        if self.sim.dt_s <= 0.0 {
            return fail("sim.dt_s must be positive");
        }
        if self.sim.t_max_s <= 0.0 {
            return fail("sim.t_max_s must be positive");
        }

        let rect = &self.world.region_rect;
        if rect.xmin_m >= rect.xmax_m || rect.ymin_m >= rect.ymax_m {
            return fail("world.region_rect is degenerate");
        }
        let [z_min, z_max] = self.world.z_limits_m;
        if z_min < 0.0 || z_min >= z_max {
            return fail("world.z_limits_m must satisfy 0 <= z_min < z_max");
        }

        let cp = &self.command_post;
        if cp.arrival_radius_m <= 0.0 {
            return fail("command_post.arrival_radius_m must be positive");
        }
        if cp.position.x_m < rect.xmin_m
            || cp.position.x_m > rect.xmax_m
            || cp.position.y_m < rect.ymin_m
            || cp.position.y_m > rect.ymax_m
        {
            return fail("command_post.position lies outside the region");
        }

        let guidance = &self.policy.missile_guidance;
        if guidance.law != "true_3d_pn" {
            return fail(format!(
                "unsupported guidance law '{}' (expected 'true_3d_pn')",
                guidance.law
            ));
        }
        if guidance.n <= 0.0 {
            return fail("missile_guidance.N must be positive");
        }
        if guidance.endgame_factor < 1.0 {
            return fail("missile_guidance.endgame_factor must be >= 1");
        }
        if guidance.endgame_miss_increase_ticks == 0 {
            return fail("missile_guidance.endgame_miss_increase_ticks must be >= 1");
        }
        if let Some(0) = self.policy.max_assigned_per_target {
            return fail("policy.max_assigned_per_target must be >= 1 when present");
        }

        let kin = &self.missile_defaults.kinematics;
        if kin.initial_speed_mps <= 0.0 {
            return fail("kinematics.initial_speed_mps must be positive");
        }
        if kin.max_speed_mps < kin.initial_speed_mps {
            return fail("kinematics.max_speed_mps must be >= initial_speed_mps");
        }
        if kin.max_accel_mps2 <= 0.0 {
            return fail("kinematics.max_accel_mps2 must be positive");
        }
        if kin.max_turn_rate_deg_s <= 0.0 {
            return fail("kinematics.max_turn_rate_deg_s must be positive");
        }
        if kin.intercept_radius_m <= 0.0 {
            return fail("kinematics.intercept_radius_m must be positive");
        }

        let mut sensor_ids = std::collections::BTreeSet::new();
        for sensor in &self.friendly_forces.sensors {
            if sensor.range_m <= 0.0 {
                return fail(format!("sensor {}: range_m must be positive", sensor.id));
            }
            if !sensor_ids.insert(sensor.id.as_str()) {
                return fail(format!("duplicate sensor id {}", sensor.id));
            }
        }

        let mut launcher_ids = std::collections::BTreeSet::new();
        for launcher in &self.friendly_forces.launchers {
            if launcher.missiles_loaded == 0 {
                return fail(format!(
                    "launcher {}: missiles_loaded must be >= 1",
                    launcher.id
                ));
            }
            if launcher.cooldown_s < 0.0 {
                return fail(format!("launcher {}: cooldown_s must be >= 0", launcher.id));
            }
            if !launcher_ids.insert(launcher.id.as_str()) {
                return fail(format!("duplicate launcher id {}", launcher.id));
            }
        }

        let mut group_ids = std::collections::BTreeSet::new();
        for group in &self.enemy_forces.groups {
            if group.count == 0 {
                return fail(format!("group {}: count must be >= 1", group.id));
            }
            if group.endurance_pt == 0 {
                return fail(format!("group {}: endurance_pt must be >= 1", group.id));
            }
            if group.speed_mps <= 0.0 {
                return fail(format!("group {}: speed_mps must be positive", group.id));
            }
            if group.ring_spacing_m <= 0.0 {
                return fail(format!("group {}: ring_spacing_m must be positive", group.id));
            }
            if group.spawn_time_s < 0.0 || group.spawn_time_s >= self.sim.t_max_s {
                return fail(format!(
                    "group {}: spawn_time_s must be in [0, t_max_s)",
                    group.id
                ));
            }
            if group.z_m < z_min || group.z_m > z_max {
                return fail(format!("group {}: z_m outside z_limits_m", group.id));
            }
            if !group_ids.insert(group.id.as_str()) {
                return fail(format!("duplicate group id {}", group.id));
            }
        }

        Ok(())
    }

    /// The simulation domain as world bounds.
    pub fn bounds(&self) -> WorldBounds {
        let rect = &self.world.region_rect;
        WorldBounds {
            x_min: rect.xmin_m,
            x_max: rect.xmax_m,
            y_min: rect.ymin_m,
            y_max: rect.ymax_m,
            z_min: self.world.z_limits_m[0],
            z_max: self.world.z_limits_m[1],
        }
    }

    /// Per-missile performance defaults, with rates converted to radians.
    pub fn missile_performance(&self) -> MissilePerformance {
        let kin = &self.missile_defaults.kinematics;
        let guidance = &self.policy.missile_guidance;
        MissilePerformance {
            initial_speed: kin.initial_speed_mps,
            max_speed: kin.max_speed_mps,
            max_accel: kin.max_accel_mps2,
            max_turn_rate: deg_to_rad(kin.max_turn_rate_deg_s),
            intercept_radius: kin.intercept_radius_m,
            pn_gain: guidance.n,
            endgame_factor: guidance.endgame_factor,
            endgame_miss_increase_ticks: guidance.endgame_miss_increase_ticks,
        }
    }
}

fn default_dt() -> f64 {
    DEFAULT_DT_S
}

fn default_z_limits() -> [f64; 2] {
    [Z_MIN_M, Z_MAX_M]
}

fn default_guidance_type() -> String {
    "true_3d_pn".to_string()
}

fn default_pn_gain() -> f64 {
    DEFAULT_PN_GAIN
}

fn default_endgame_factor() -> f64 {
    DEFAULT_ENDGAME_FACTOR
}

fn default_miss_increase_ticks() -> u32 {
    DEFAULT_ENDGAME_MISS_INCREASE_TICKS
}

fn default_true() -> bool {
    true
}

fn default_missiles_loaded() -> u32 {
    DEFAULT_MISSILES_LOADED
}

fn default_cooldown() -> f64 {
    DEFAULT_COOLDOWN_S
}
