//! Tests for the scenario model, the spawner, the allocator, and the full
//! engagement pipeline.

use std::collections::BTreeMap;

use palisade_core::enums::{Disposition, MissileEndReason, MissilePhase};
use palisade_core::events::SimEvent;
use palisade_core::geometry::{deg_to_rad, Vec3};
use palisade_core::state::TickSnapshot;

use crate::engine::SimulationEngine;
use crate::scenario::*;
use crate::systems::spawn::ring_positions;

// ---- Builders ----

fn kinematics() -> KinematicsSection {
    KinematicsSection {
        initial_speed_mps: 300.0,
        max_speed_mps: 1200.0,
        max_accel_mps2: 80.0,
        max_turn_rate_deg_s: 40.0,
        intercept_radius_m: 50.0,
    }
}

fn sensor(x_m: f64, y_m: f64, range_m: f64) -> SensorSpec {
    SensorSpec {
        id: format!("S{x_m:.0}-{y_m:.0}"),
        pos: Position3 { x_m, y_m, z_m: 0.0 },
        range_m,
    }
}

fn launcher(x_m: f64, y_m: f64, missiles_loaded: u32, cooldown_s: f64) -> LauncherSpec {
    LauncherSpec {
        id: format!("L{x_m:.0}-{y_m:.0}"),
        pos: Position3 { x_m, y_m, z_m: 0.0 },
        missiles_loaded,
        cooldown_s,
    }
}

#[allow(clippy::too_many_arguments)]
fn group(
    id: &str,
    spawn_time_s: f64,
    center_x: f64,
    center_y: f64,
    z_m: f64,
    count: u32,
    endurance_pt: u32,
    speed_mps: f64,
) -> GroupSpec {
    GroupSpec {
        id: id.to_string(),
        spawn_time_s,
        center_xy: Position2 {
            x_m: center_x,
            y_m: center_y,
        },
        z_m,
        count,
        ring_spacing_m: 1000.0,
        start_angle_deg: 0.0,
        ring_half_offset: false,
        endurance_pt,
        speed_mps,
    }
}

fn scenario(
    groups: Vec<GroupSpec>,
    sensors: Vec<SensorSpec>,
    launchers: Vec<LauncherSpec>,
) -> Scenario {
    Scenario {
        meta: ScenarioMeta::default(),
        sim: SimSection {
            dt_s: 0.1,
            t_max_s: 120.0,
            seed: 0,
        },
        world: WorldSection::default(),
        command_post: CommandPostSection {
            position: Position2 { x_m: 0.0, y_m: 0.0 },
            arrival_radius_m: 100.0,
        },
        policy: PolicySection::default(),
        friendly_forces: FriendlyForcesSection { sensors, launchers },
        enemy_forces: EnemyForcesSection { groups },
        missile_defaults: MissileDefaultsSection {
            kinematics: kinematics(),
        },
    }
}

/// A saturated multi-group raid, used by the determinism and invariant tests.
fn raid_scenario() -> Scenario {
    let mut raid = scenario(
        vec![
            group("alpha", 0.0, -60_000.0, 10_000.0, 3_000.0, 5, 2, 250.0),
            {
                let mut g = group("bravo", 5.0, 50_000.0, -20_000.0, 1_000.0, 4, 1, 300.0);
                g.ring_spacing_m = 2_000.0;
                g.start_angle_deg = 45.0;
                g.ring_half_offset = true;
                g
            },
        ],
        vec![sensor(0.0, 0.0, 200_000.0)],
        vec![
            launcher(0.0, 0.0, 6, 3.0),
            launcher(2_000.0, 1_000.0, 6, 3.0),
            launcher(-1_500.0, 500.0, 6, 3.0),
        ],
    );
    raid.sim.t_max_s = 600.0;
    raid.command_post.arrival_radius_m = 500.0;
    raid
}

fn angle_between(a: Vec3, b: Vec3) -> f64 {
    let (Some(ua), Some(ub)) = (a.try_unit(), b.try_unit()) else {
        return 0.0;
    };
    ua.dot(ub).clamp(-1.0, 1.0).acos()
}

// ---- Ring-filling spawner ----

#[test]
fn test_ring_single_member_sits_on_first_ring() {
    let center = Vec3::new(100.0, 200.0, 3_000.0);
    let positions = ring_positions(center, 1, 1_500.0, 0.0, false);
    assert_eq!(positions.len(), 1);
    let p = positions[0];
    assert!((p.x - 1_600.0).abs() < 1e-9);
    assert!((p.y - 200.0).abs() < 1e-9);
    assert!((p.z - 3_000.0).abs() < 1e-9, "altitude preserved");
}

#[test]
fn test_ring_overflow_moves_outward() {
    // Ring 1 holds floor(2π) = 6 members at spacing-sized slots; the 7th
    // lands on ring 2.
    let positions = ring_positions(Vec3::ZERO, 7, 1_000.0, 0.0, false);
    assert_eq!(positions.len(), 7);

    for p in &positions[..6] {
        assert!((p.norm_xy() - 1_000.0).abs() < 1e-6, "inner ring radius");
    }
    assert!((positions[6].norm_xy() - 2_000.0).abs() < 1e-6, "outer ring radius");

    // Inner ring spreads the six members at 60° steps from the start angle.
    let step = std::f64::consts::TAU / 6.0;
    for (slot, p) in positions[..6].iter().enumerate() {
        let angle = slot as f64 * step;
        assert!((p.x - 1_000.0 * angle.cos()).abs() < 1e-6);
        assert!((p.y - 1_000.0 * angle.sin()).abs() < 1e-6);
    }
}

#[test]
fn test_ring_half_offset_rotates_outer_rings() {
    let plain = ring_positions(Vec3::ZERO, 7, 1_000.0, 0.0, false);
    let offset = ring_positions(Vec3::ZERO, 7, 1_000.0, 0.0, true);

    // Ring 1 is identical; the lone ring-2 member rotates by half its slot
    // (π for a single slot).
    for (a, b) in plain[..6].iter().zip(&offset[..6]) {
        assert!((*a - *b).norm() < 1e-9);
    }
    let expected = Vec3::new(2_000.0 * std::f64::consts::PI.cos(), 2_000.0 * std::f64::consts::PI.sin(), 0.0);
    assert!((offset[6] - expected).norm() < 1e-6);
}

#[test]
fn test_spawned_targets_head_for_the_command_post() {
    let mut scn = scenario(
        vec![group("solo", 0.0, -2_000.0, 0.0, 0.0, 1, 1, 100.0)],
        vec![],
        vec![],
    );
    scn.sim.t_max_s = 1.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();
    let snap = engine.tick();

    assert_eq!(snap.targets.len(), 1);
    let target = &snap.targets[0];
    // Placed at center + ring 1 radius along +X = (-1000, 0), then advanced
    // one tick toward the post at 100 m/s.
    assert!((target.velocity - Vec3::new(100.0, 0.0, 0.0)).norm() < 1e-9);
    assert!((target.position.x - -990.0).abs() < 1e-9);
}

// ---- S1: single missile, single target, head-on ----

#[test]
fn test_head_on_engagement_kills_within_twenty_seconds() {
    let scn = scenario(
        vec![group("solo", 0.0, -2_000.0, 0.0, 0.0, 1, 1, 100.0)],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![launcher(0.0, 0.0, 1, 5.0)],
    );
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let first = engine.tick();
    // Detection reflects the post-movement position, so the launch happens on
    // the very first tick; the newborn missile has not yet integrated.
    assert_eq!(first.missiles.len(), 1);
    let missile = &first.missiles[0];
    assert!((missile.velocity - Vec3::new(-300.0, 0.0, 0.0)).norm() < 1e-9);
    assert_eq!(missile.position, Vec3::ZERO, "newborn missile still at the rail");
    assert_eq!(first.assignments, vec![(0, vec![0])]);

    let tally = engine.run();
    assert!(engine.finished());
    assert!(
        engine.time().seconds() <= 20.0,
        "head-on kill should resolve quickly, took {:.1}s",
        engine.time().seconds()
    );
    assert_eq!(tally.targets_killed, 1);
    assert_eq!(tally.targets_broken_through, 0);
    assert_eq!(tally.missiles_fired, 1);
    assert_eq!(tally.missiles_hit, 1);
    assert!(engine.assignments().is_empty(), "ledger empty at end");
}

// ---- S2: over-assignment guard ----

#[test]
fn test_demand_capped_at_endurance() {
    let mut scn = scenario(
        vec![group("far", 0.0, -101_000.0, 0.0, 0.0, 1, 2, 100.0)],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![launcher(0.0, 0.0, 4, 5.0), launcher(100.0, 0.0, 4, 5.0)],
    );
    scn.sim.t_max_s = 10.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let first = engine.tick();
    assert_eq!(first.missiles.len(), 2, "endurance 2 => exactly 2 missiles");
    assert_eq!(first.assignments.len(), 1);
    assert_eq!(first.assignments[0].1.len(), 2);
    // One launch per launcher per tick.
    let mut launchers: Vec<u32> = first.missiles.iter().map(|m| m.launcher_id).collect();
    launchers.sort_unstable();
    assert_eq!(launchers, vec![0, 1]);

    // No third launch while both are airborne.
    for _ in 0..50 {
        let snap = engine.tick();
        assert_eq!(snap.tally.missiles_fired, 2);
        assert!(snap.assignments[0].1.len() <= 2);
    }
}

#[test]
fn test_policy_cap_tightens_demand() {
    let mut scn = scenario(
        vec![group("far", 0.0, -101_000.0, 0.0, 0.0, 1, 3, 100.0)],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![
            launcher(0.0, 0.0, 4, 5.0),
            launcher(100.0, 0.0, 4, 5.0),
            launcher(200.0, 0.0, 4, 5.0),
        ],
    );
    scn.policy.max_assigned_per_target = Some(1);
    scn.sim.t_max_s = 10.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let first = engine.tick();
    assert_eq!(
        first.missiles.len(),
        1,
        "the tighter of endurance and the policy cap governs"
    );
}

// ---- S3: breakthrough ----

#[test]
fn test_unopposed_target_breaks_through_on_schedule() {
    // 6 km out, 100 m/s, 1 km arrival radius: crosses at exactly t = 50 s.
    let mut scn = scenario(
        vec![group("runner", 0.0, -7_000.0, 0.0, 0.0, 1, 1, 100.0)],
        vec![],
        vec![],
    );
    scn.command_post.arrival_radius_m = 1_000.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let mut last = TickSnapshot::default();
    while !engine.finished() {
        last = engine.tick();
    }

    assert_eq!(last.tick, 500, "breakthrough tick");
    assert!((last.time_s - 50.0).abs() < 1e-9);
    assert_eq!(last.targets[0].disposition, Disposition::BrokenThrough);
    assert!(last
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::Breakthrough { target_id: 0 })));
    assert_eq!(engine.tally().targets_broken_through, 1);
    assert!(
        engine.finished(),
        "termination fires once the last target is resolved"
    );
}

// ---- S4: endgame self-destruct ----

#[test]
fn test_receding_missile_self_destructs_in_endgame() {
    // Feeble missile stock: barely any acceleration or turn authority, so a
    // missile flying away from its target cannot recover.
    let mut scn = scenario(vec![], vec![], vec![]);
    scn.missile_defaults.kinematics = KinematicsSection {
        initial_speed_mps: 30.0,
        max_speed_mps: 40.0,
        max_accel_mps2: 1e-4,
        max_turn_rate_deg_s: 1.0,
        intercept_radius_m: 50.0,
    };
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let target_id = engine.spawn_test_target(Vec3::new(500.0, 0.0, 0.0), Vec3::ZERO, 5);
    engine.spawn_test_missile(Vec3::new(560.0, 0.0, 0.0), Vec3::new(30.0, 0.0, 0.0), target_id);

    // Opening at 3 m per tick from 60 m: inside the 100 m endgame band with
    // the miss distance growing every tick. Streak reaches 3 on tick 4.
    let mut snaps = Vec::new();
    for _ in 0..4 {
        snaps.push(engine.tick());
    }

    let missile = &snaps[3].missiles[0];
    assert_eq!(missile.phase, MissilePhase::Terminated);
    assert_eq!(missile.end_reason, Some(MissileEndReason::Overshoot));
    assert_eq!(snaps[3].tally.missiles_lost, 1);
    assert_eq!(snaps[3].tally.missiles_hit, 0);
    assert!(
        snaps[3].assignments.is_empty(),
        "ledger entry removed the same tick the missile died"
    );
    assert_eq!(snaps[2].missiles[0].phase, MissilePhase::Endgame);

    // The target is untouched and a fresh assignment is possible.
    assert_eq!(snaps[3].targets[0].endurance, 5);
}

// ---- S5: simultaneous hits ----

#[test]
fn test_simultaneous_hits_all_apply() {
    let mut scn = scenario(vec![], vec![], vec![]);
    scn.sim.t_max_s = 5.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let target_id = engine.spawn_test_target(Vec3::new(1_000.0, 0.0, 0.0), Vec3::ZERO, 2);
    engine.spawn_test_missile(
        Vec3::new(850.0, 0.0, 0.0),
        Vec3::new(1_000.0, 0.0, 0.0),
        target_id,
    );
    engine.spawn_test_missile(
        Vec3::new(1_150.0, 0.0, 0.0),
        Vec3::new(-1_000.0, 0.0, 0.0),
        target_id,
    );

    let snap = engine.tick();

    assert_eq!(snap.targets[0].disposition, Disposition::Killed);
    assert_eq!(snap.targets[0].endurance, 0);
    assert_eq!(snap.tally.targets_killed, 1);
    assert_eq!(snap.tally.missiles_hit, 2, "both hits count");
    for missile in &snap.missiles {
        assert_eq!(missile.end_reason, Some(MissileEndReason::Intercept));
    }
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::TargetHit { target_id: 0, hits: 2 })));
    assert!(snap.assignments.is_empty());
}

// ---- S6: cooldown and magazine ----

#[test]
fn test_magazine_exhaustion_blocks_further_launches() {
    let scn = scenario(
        vec![
            group("near", 0.0, -41_000.0, 0.0, 0.0, 1, 1, 100.0),
            group("far", 0.0, -51_000.0, 0.0, 0.0, 1, 1, 100.0),
        ],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![launcher(0.0, 0.0, 1, 5.0)],
    );
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let first = engine.tick();
    assert_eq!(first.missiles.len(), 1, "exactly one launch");
    assert_eq!(
        first.missiles[0].target_id, 0,
        "the more urgent (smaller Tgo) target is served first"
    );
    assert_eq!(first.launchers[0].magazine, 0);
    assert!(
        first.launchers[0].cooldown_remaining_s > 0.0,
        "cooldown armed after firing"
    );

    for _ in 0..40 {
        let snap = engine.tick();
        assert_eq!(
            snap.tally.missiles_fired, 1,
            "an empty magazine never fires regardless of demand"
        );
    }
}

#[test]
fn test_cooldown_blocks_within_window_then_releases() {
    let mut scn = scenario(
        vec![
            group("near", 0.0, -41_000.0, 0.0, 0.0, 1, 1, 100.0),
            group("far", 0.0, -51_000.0, 0.0, 0.0, 1, 1, 100.0),
        ],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![launcher(0.0, 0.0, 4, 5.0)],
    );
    scn.sim.t_max_s = 30.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    engine.tick();
    // 5 s cooldown at dt 0.1: ticks 2..=50 stay at one launch, tick 51 fires
    // the second round (cooldown_until = 0.0 + 5.0, first eligible now is 5.0).
    for _ in 0..49 {
        let snap = engine.tick();
        assert_eq!(snap.tally.missiles_fired, 1, "tick {}", snap.tick);
    }
    let snap = engine.tick();
    assert_eq!(snap.tally.missiles_fired, 2);
    assert_eq!(snap.missiles.iter().filter(|m| m.target_id == 1).count(), 1);
}

// ---- Determinism (and seed independence) ----

#[test]
fn test_identical_scenarios_produce_identical_snapshots() {
    let mut engine_a = SimulationEngine::new(&raid_scenario()).unwrap();
    let mut engine_b = SimulationEngine::new(&raid_scenario()).unwrap();

    for _ in 0..300 {
        let snap_a = engine_a.tick();
        let snap_b = engine_b.tick();
        let json_a = serde_json::to_string(&snap_a).unwrap();
        let json_b = serde_json::to_string(&snap_b).unwrap();
        assert_eq!(json_a, json_b, "snapshots diverged");
    }
}

#[test]
fn test_output_independent_of_seed() {
    let mut seeded = raid_scenario();
    seeded.sim.seed = 0xDEAD_BEEF;

    let mut engine_a = SimulationEngine::new(&raid_scenario()).unwrap();
    let mut engine_b = SimulationEngine::new(&seeded).unwrap();

    for _ in 0..300 {
        let json_a = serde_json::to_string(&engine_a.tick()).unwrap();
        let json_b = serde_json::to_string(&engine_b.tick()).unwrap();
        assert_eq!(json_a, json_b, "the seed must not influence the run");
    }
}

// ---- Invariants over a saturated raid ----

#[test]
fn test_ledger_never_exceeds_endurance() {
    let mut engine = SimulationEngine::new(&raid_scenario()).unwrap();

    for _ in 0..400 {
        let snap = engine.tick();
        let endurance: BTreeMap<u32, u32> =
            snap.targets.iter().map(|t| (t.id, t.endurance)).collect();
        for (target_id, missiles) in &snap.assignments {
            let endurance = endurance
                .get(target_id)
                .copied()
                .expect("ledger entry for a vanished target");
            assert!(
                missiles.len() as u32 <= endurance,
                "tick {}: target {target_id} has {} committed vs endurance {endurance}",
                snap.tick,
                missiles.len()
            );
        }
        if engine.finished() {
            break;
        }
    }
}

#[test]
fn test_consumed_targets_never_reappear() {
    let mut engine = SimulationEngine::new(&raid_scenario()).unwrap();
    let mut consumed: BTreeMap<u32, u64> = BTreeMap::new();

    // 600 s bound at dt 0.1 = 6000 ticks; the loop limit sits past it so the
    // run always terminates, by resolution or by the time bound.
    for _ in 0..6_500 {
        let snap = engine.tick();
        for target in &snap.targets {
            if let Some(&gone_tick) = consumed.get(&target.id) {
                panic!(
                    "target {} consumed at tick {gone_tick} reappeared at tick {}",
                    target.id, snap.tick
                );
            }
            if target.disposition != Disposition::Inbound {
                consumed.insert(target.id, snap.tick);
            }
        }
        for (target_id, _) in &snap.assignments {
            assert!(
                !consumed.contains_key(target_id),
                "ledger entry for consumed target {target_id} at tick {}",
                snap.tick
            );
        }
        if engine.finished() {
            break;
        }
    }
    assert!(engine.finished(), "raid should terminate within the time bound");
    assert!(!consumed.is_empty());
}

#[test]
fn test_missile_speed_and_turn_rate_limits_hold() {
    let mut scn = scenario(
        vec![group("crosser", 0.0, -20_000.0, 5_000.0, 0.0, 1, 1, 200.0)],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![launcher(0.0, 0.0, 1, 5.0)],
    );
    scn.missile_defaults.kinematics.max_turn_rate_deg_s = 5.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let max_speed = scn.missile_defaults.kinematics.max_speed_mps;
    let max_step = deg_to_rad(5.0) * scn.sim.dt_s;

    let mut previous: Option<TickSnapshot> = None;
    for _ in 0..200 {
        let snap = engine.tick();
        for missile in &snap.missiles {
            assert!(
                missile.velocity.norm() <= max_speed + 1e-6,
                "tick {}: speed {} exceeds the clip",
                snap.tick,
                missile.velocity.norm()
            );
            if let Some(prev) = previous
                .as_ref()
                .and_then(|s| s.missiles.iter().find(|m| m.id == missile.id))
            {
                if prev.phase != MissilePhase::Terminated {
                    let turned = angle_between(prev.velocity, missile.velocity);
                    assert!(
                        turned <= max_step + 1e-9,
                        "tick {}: heading changed by {turned} rad, limit {max_step}",
                        snap.tick
                    );
                }
            }
        }
        previous = Some(snap);
        if engine.finished() {
            break;
        }
    }
}

#[test]
fn test_altitudes_stay_clamped() {
    let mut scn = raid_scenario();
    scn.enemy_forces.groups[0].z_m = 4_500.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    for _ in 0..300 {
        let snap = engine.tick();
        for target in &snap.targets {
            assert!(
                (0.0..=5_000.0).contains(&target.position.z),
                "target altitude out of band"
            );
        }
        for missile in &snap.missiles {
            assert!(
                (0.0..=5_000.0).contains(&missile.position.z),
                "missile altitude out of band"
            );
        }
    }
}

// ---- Laws ----

#[test]
fn test_killing_a_dead_target_is_a_no_op() {
    let scn = scenario(vec![], vec![], vec![]);
    let mut engine = SimulationEngine::new(&scn).unwrap();
    let target_id = engine.spawn_test_target(Vec3::new(500.0, 0.0, 0.0), Vec3::ZERO, 1);

    let hits: BTreeMap<u32, u32> = [(target_id, 1)].into();
    engine.apply_hits(&hits);
    assert_eq!(engine.tally().targets_killed, 1);

    engine.apply_hits(&hits);
    assert_eq!(engine.tally().targets_killed, 1, "second kill is a no-op");

    let mut query = engine.world().query::<&palisade_core::components::ThreatState>();
    let (_, state) = query.iter().next().unwrap();
    assert_eq!(state.endurance, 0);
    assert_eq!(state.disposition, Disposition::Killed);
}

#[test]
fn test_hits_conserve_endurance() {
    let mut scn = scenario(
        vec![group("pair", 0.0, -31_000.0, 0.0, 0.0, 2, 2, 150.0)],
        vec![sensor(0.0, 0.0, 1_000_000.0)],
        vec![
            launcher(0.0, 0.0, 6, 3.0),
            launcher(500.0, 0.0, 6, 3.0),
            launcher(-500.0, 0.0, 6, 3.0),
        ],
    );
    scn.sim.t_max_s = 300.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let mut hit_totals: BTreeMap<u32, u32> = BTreeMap::new();
    let mut killed: Vec<u32> = Vec::new();
    while !engine.finished() {
        let snap = engine.tick();
        for event in &snap.events {
            match event {
                SimEvent::TargetHit { target_id, hits } => {
                    *hit_totals.entry(*target_id).or_insert(0) += hits;
                }
                SimEvent::TargetKilled { target_id } => killed.push(*target_id),
                _ => {}
            }
        }
    }

    for (target_id, &total) in &hit_totals {
        assert!(total <= 2, "target {target_id} absorbed {total} > endurance");
        assert_eq!(
            killed.contains(target_id),
            total == 2,
            "killed iff the hit total equals the initial endurance"
        );
    }
}

#[test]
fn test_sensors_observe_post_movement_positions() {
    // Pre-movement range 1005 m (outside), post-movement 995 m (inside):
    // detection and launch must land on the very first tick.
    let mut scn = scenario(
        vec![{
            let mut g = group("inbound", 0.0, 2_005.0, 0.0, 0.0, 1, 1, 100.0);
            g.start_angle_deg = 180.0;
            g
        }],
        vec![sensor(0.0, 0.0, 1_000.0)],
        vec![launcher(0.0, 0.0, 1, 5.0)],
    );
    scn.sim.t_max_s = 30.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let first = engine.tick();
    assert!((first.targets[0].position.x - 995.0).abs() < 1e-9);
    assert_eq!(
        first.missiles.len(),
        1,
        "post-movement detection feeds the same tick's assignment"
    );
}

// ---- Same-tick breakthrough vs. hit ----

#[test]
fn test_hit_wins_over_same_tick_breakthrough() {
    let scn = scenario(vec![], vec![], vec![]);
    let mut engine = SimulationEngine::new(&scn).unwrap();

    // The target crosses the 100 m arrival radius on the same tick the
    // chasing missile closes within its 50 m intercept radius.
    let target_id = engine.spawn_test_target(
        Vec3::new(150.0, 0.0, 0.0),
        Vec3::new(-100.0, 0.0, 0.0),
        1,
    );
    engine.spawn_test_missile(
        Vec3::new(250.0, 0.0, 0.0),
        Vec3::new(-200.0, 0.0, 0.0),
        target_id,
    );

    let mut snap = TickSnapshot::default();
    for _ in 0..5 {
        snap = engine.tick();
    }

    assert_eq!(snap.tick, 5);
    assert_eq!(snap.targets[0].disposition, Disposition::Killed, "the hit wins");
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::Breakthrough { .. })));
    assert!(snap
        .events
        .iter()
        .any(|e| matches!(e, SimEvent::TargetKilled { .. })));
    assert_eq!(engine.tally().targets_killed, 1);
    assert_eq!(engine.tally().targets_broken_through, 0);
    assert_eq!(engine.tally().missiles_hit, 1);
}

#[test]
fn test_missiles_fold_when_target_departs() {
    let mut scn = scenario(vec![], vec![], vec![]);
    scn.sim.t_max_s = 10.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    // Target one tick from the region edge, missile far behind it.
    let target_id = engine.spawn_test_target(
        Vec3::new(999_990.0, 0.0, 0.0),
        Vec3::new(200.0, 0.0, 0.0),
        1,
    );
    engine.spawn_test_missile(
        Vec3::new(990_000.0, 0.0, 0.0),
        Vec3::new(300.0, 0.0, 0.0),
        target_id,
    );

    let snap = engine.tick();
    assert_eq!(snap.targets[0].disposition, Disposition::Departed);
    assert_eq!(snap.missiles[0].phase, MissilePhase::Terminated);
    assert_eq!(
        snap.missiles[0].end_reason,
        Some(MissileEndReason::TargetLost),
        "no hit credit for a departed target"
    );
    assert!(snap.assignments.is_empty());
}

// ---- Termination ----

#[test]
fn test_time_bound_terminates_unresolved_runs() {
    let mut scn = scenario(
        vec![group("creeper", 0.0, -900_000.0, 0.0, 0.0, 1, 1, 10.0)],
        vec![],
        vec![],
    );
    scn.sim.t_max_s = 5.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    let tally = engine.run();
    assert!(engine.finished());
    assert_eq!(engine.time().tick, 50);
    assert_eq!(tally.targets_killed + tally.targets_broken_through, 0);
}

#[test]
fn test_empty_scenario_finishes_immediately() {
    let scn = scenario(vec![], vec![], vec![]);
    let mut engine = SimulationEngine::new(&scn).unwrap();
    engine.run();
    assert!(engine.finished());
    assert_eq!(engine.time().tick, 1);
}

#[test]
fn test_pending_spawns_defer_termination() {
    let mut scn = scenario(
        vec![group("late", 2.0, -5_000.0, 0.0, 0.0, 1, 1, 100.0)],
        vec![],
        vec![],
    );
    scn.sim.t_max_s = 60.0;
    let mut engine = SimulationEngine::new(&scn).unwrap();

    for _ in 0..10 {
        engine.tick();
        assert!(
            !engine.finished(),
            "a scheduled group keeps the run alive before it spawns"
        );
    }
}

// ---- Scenario validation ----

#[test]
fn test_validation_rejects_bad_fields() {
    let base = || {
        scenario(
            vec![group("g", 0.0, -10_000.0, 0.0, 0.0, 1, 1, 100.0)],
            vec![sensor(0.0, 0.0, 1_000.0)],
            vec![launcher(0.0, 0.0, 4, 5.0)],
        )
    };

    let mut bad = base();
    bad.sim.dt_s = 0.0;
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.enemy_forces.groups[0].endurance_pt = 0;
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.enemy_forces.groups[0].count = 0;
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.missile_defaults.kinematics.max_speed_mps = 100.0; // below initial speed
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.command_post.position.x_m = 2_000_000.0;
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.enemy_forces.groups[0].z_m = 6_000.0;
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.enemy_forces.groups[0].spawn_time_s = 200.0; // past t_max
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.policy.missile_guidance.law = "pure_pursuit".into();
    assert!(matches!(bad.validate(), Err(ScenarioError::Invalid(_))));

    let mut bad = base();
    bad.friendly_forces.launchers.push(launcher(0.0, 0.0, 4, 5.0));
    assert!(
        matches!(bad.validate(), Err(ScenarioError::Invalid(_))),
        "duplicate launcher ids rejected"
    );
}

#[test]
fn test_engine_refuses_invalid_scenario() {
    let mut bad = scenario(vec![], vec![], vec![]);
    bad.sim.t_max_s = -1.0;
    assert!(SimulationEngine::new(&bad).is_err());
}

// ---- YAML loading ----

#[test]
fn test_yaml_document_round_trip() {
    let yaml = r#"
meta:
  name: Perimeter check
sim:
  t_max_s: 300.0
command_post:
  position: { x_m: 0.0, y_m: 0.0 }
  arrival_radius_m: 2000.0
policy:
  missile_guidance:
    N: 4.0
friendly_forces:
  sensors:
    - { id: S1, pos: { x_m: 0.0, y_m: 0.0, z_m: 30.0 }, range_m: 150000.0 }
  launchers:
    - { id: L1, pos: { x_m: 500.0, y_m: 0.0 } }
enemy_forces:
  groups:
    - id: G1
      spawn_time_s: 10.0
      center_xy: { x_m: -80000.0, y_m: 0.0 }
      z_m: 2000.0
      count: 4
      ring_spacing_m: 1500.0
      endurance_pt: 2
      speed_mps: 250.0
missile_defaults:
  kinematics:
    initial_speed_mps: 300.0
    max_speed_mps: 1200.0
    max_accel_mps2: 80.0
    max_turn_rate_deg_s: 40.0
    intercept_radius_m: 50.0
"#;

    let scn = Scenario::from_yaml_str(yaml).unwrap();
    assert_eq!(scn.meta.name, "Perimeter check");
    assert_eq!(scn.sim.dt_s, 0.1, "dt defaults");
    assert_eq!(scn.friendly_forces.launchers[0].missiles_loaded, 4);
    assert_eq!(scn.friendly_forces.launchers[0].cooldown_s, 5.0);
    assert_eq!(scn.policy.missile_guidance.n, 4.0);
    assert_eq!(scn.policy.missile_guidance.law, "true_3d_pn");
    assert!(scn.policy.launcher_initially_cooled);

    let mut engine = SimulationEngine::new(&scn).unwrap();
    let snap = engine.tick();
    assert!(snap.targets.is_empty(), "group spawns at t = 10 s, not yet");
}

#[test]
fn test_yaml_rejects_garbage() {
    assert!(matches!(
        Scenario::from_yaml_str("sim: [not, a, mapping]"),
        Err(ScenarioError::Parse(_))
    ));
}
