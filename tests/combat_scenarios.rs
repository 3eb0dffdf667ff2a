use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use approx::assert_relative_eq;
use arena::{
    actor::{Actor, ActorId, CombatState, DamageOutcome, Damageable, Roster},
    animation::ClipClock,
    attack::{AttackCoordinator, Budget, DamageSource, HitOutcome, HostileTargets},
    config::SimConfig,
    hit_volume::HitShape,
    world::{CombatEvent, World},
};
use glam::Vec3;
use rand::{rngs::StdRng, SeedableRng};
use rstest::rstest;

fn quarter_sector(half_angle: f32) -> HitShape {
    HitShape::Sector { origin: Vec3::ZERO, direction: Vec3::NEG_Z, radius: 2.0, half_angle }
}

fn roster_of(actors: impl IntoIterator<Item = Actor>) -> Roster {
    actors.into_iter().map(|actor| (actor.id().clone(), actor)).collect()
}

fn offline_world() -> World {
    World::offline(SimConfig::default(), Box::new(ClipClock::new())).with_seed(42)
}

#[rstest]
#[case(Vec3::new(0.0, 0.0, -1.0), true)]
#[case(Vec3::new(1.5, 0.0, -1.5), false)]
fn sector_reach(#[case] target: Vec3, #[case] hit: bool) {
    assert_eq!(quarter_sector(FRAC_PI_4).contains(target, 0.7), hit);
}

#[test]
fn sector_angle_boundary_counts_as_a_hit() {
    let side = Vec3::new(-1.0, 0.0, 0.0);
    assert!(quarter_sector(FRAC_PI_2).contains(side, 0.7));
    assert!(!quarter_sector(FRAC_PI_4).contains(side, 0.7));
}

#[test]
fn wounding_then_no_second_hit_from_the_same_instance() {
    let attacker = ActorId::new("a");
    let target = ActorId::new("t");
    let mut roster = roster_of([
        Actor::player("a", "ann", Vec3::ZERO),
        Actor::player("t", "bob", Vec3::new(0.0, 0.0, -1.0)).with_max_health(20).with_health(15),
    ]);
    let mut coordinator = AttackCoordinator::new();
    let source = DamageSource { amount: 10, hits_many: true };
    coordinator
        .spawn_attack(&attacker, quarter_sector(FRAC_PI_4), Budget::window(1.0), source)
        .unwrap();

    let reports = coordinator.tick(0.1, &mut roster, &HostileTargets);
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].outcome, HitOutcome::Applied(DamageOutcome::Wounded { health: 5 }));
    assert_eq!(roster[&target].health(), 5);
    assert!(!roster[&target].is_dead());

    // Let the hit reaction run out while the volume is still live.
    let mut rng = StdRng::seed_from_u64(1);
    let region = SimConfig::default().spawn_region;
    for _ in 0..7 {
        roster.get_mut(&target).unwrap().tick_timers(0.1, &mut rng, &region);
        assert!(coordinator.tick(0.1, &mut roster, &HostileTargets).is_empty());
    }
    assert_eq!(roster[&target].state(), CombatState::Idle);
    assert_eq!(coordinator.len(), 1);
    assert_eq!(roster[&target].health(), 5);
    assert!(roster[&attacker].hit_memory().contains(&target));
}

#[test]
fn lethal_damage_then_respawn_after_the_delay() {
    let mut world = offline_world();
    let id = ActorId::new("t");
    world.spawn(Actor::player("t", "bob", Vec3::ZERO).with_max_health(20).with_health(5));

    assert_eq!(world.actor_mut(&id).unwrap().take_damage(10), DamageOutcome::Killed);
    let actor = world.actor(&id).unwrap();
    assert_eq!(actor.health(), 0);
    assert!(actor.is_dead());

    for _ in 0..9 {
        world.tick(0.5);
        assert!(world.actor(&id).unwrap().is_dead());
    }
    let events = world.tick(0.5);
    assert!(matches!(&events[..], [CombatEvent::Respawned { actor, .. }] if *actor == id));
    let actor = world.actor(&id).unwrap();
    assert!(!actor.is_dead());
    assert_eq!(actor.health(), actor.max_health());
    assert_eq!(actor.max_health(), 20);
    assert!(world.config().spawn_region.contains(actor.position));
}

#[test]
fn attack_requests_are_gated_by_cooldown() {
    let mut world = offline_world();
    let id = ActorId::new("p");
    world.spawn(Actor::player("p", "ann", Vec3::ZERO));

    assert!(world.request_attack(&id));
    assert_relative_eq!(world.actor(&id).unwrap().cooldown_remaining(), 0.5);
    for _ in 0..3 {
        world.tick(0.1);
    }
    assert!(!world.request_attack(&id));
    for _ in 0..3 {
        world.tick(0.1);
    }
    assert!(world.request_attack(&id));
}

#[test]
fn each_instance_damages_a_target_at_most_once() {
    let attacker = ActorId::new("a");
    let mut roster = roster_of([
        Actor::player("a", "ann", Vec3::ZERO),
        Actor::npc("n1", "grunt", Vec3::new(0.5, 0.0, -1.0)),
        Actor::npc("n2", "grunt", Vec3::new(-0.5, 0.0, -1.0)),
    ]);
    let mut coordinator = AttackCoordinator::new();
    let mut rng = StdRng::seed_from_u64(5);
    let region = SimConfig::default().spawn_region;
    let source = DamageSource { amount: 7, hits_many: true };
    coordinator
        .spawn_attack(&attacker, quarter_sector(FRAC_PI_4), Budget::window(2.0), source)
        .unwrap();

    let mut reports = Vec::new();
    for _ in 0..30 {
        for actor in roster.values_mut() {
            actor.tick_timers(0.05, &mut rng, &region);
        }
        reports.extend(coordinator.tick(0.05, &mut roster, &HostileTargets));
    }
    assert_eq!(reports.len(), 2);
    assert_eq!(roster[&ActorId::new("n1")].health(), 143);
    assert_eq!(roster[&ActorId::new("n2")].health(), 143);
}

#[rstest]
#[case(0)]
#[case(1)]
#[case(99)]
#[case(100)]
#[case(5000)]
fn health_stays_within_bounds(#[case] amount: u32) {
    let mut actor = Actor::player("p", "ann", Vec3::ZERO);
    actor.take_damage(amount);
    assert!(actor.health() <= actor.max_health());
    assert_eq!(actor.is_dead(), amount >= 100);
    actor.heal(1000);
    assert!(actor.health() <= actor.max_health());
}

#[test]
fn death_happens_exactly_at_zero() {
    let mut actor = Actor::player("p", "ann", Vec3::ZERO).with_health(30);
    assert_eq!(actor.take_damage(29), DamageOutcome::Wounded { health: 1 });
    let mut actor = Actor::player("p", "ann", Vec3::ZERO).with_health(30);
    assert_eq!(actor.take_damage(30), DamageOutcome::Killed);
    assert_eq!(actor.take_damage(30), DamageOutcome::Ignored);
    assert_eq!(actor.state(), CombatState::Dead);
}

#[rstest]
#[case(0.2)]
#[case(FRAC_PI_4)]
#[case(1.2)]
fn sectors_are_symmetric_about_the_facing(#[case] offset_angle: f32) {
    let shape = quarter_sector(FRAC_PI_4 + 0.01);
    let left = Vec3::new(-offset_angle.sin(), 0.0, -offset_angle.cos());
    let right = Vec3::new(offset_angle.sin(), 0.0, -offset_angle.cos());
    assert_eq!(shape.contains(left, 0.0), shape.contains(right, 0.0));
}

#[rstest]
#[case(FRAC_PI_2, false)]
#[case(PI, true)]
fn targets_behind_need_a_full_circle(#[case] half_angle: f32, #[case] hit: bool) {
    assert_eq!(quarter_sector(half_angle).contains(Vec3::new(0.0, 0.0, 1.0), 0.0), hit);
}

#[test]
fn respawn_restores_a_clean_actor() {
    let mut world = offline_world();
    let attacker = ActorId::new("a");
    let id = ActorId::new("n");
    world.spawn(Actor::player("a", "ann", Vec3::ZERO));
    world.spawn(Actor::npc("n", "grunt", Vec3::new(0.0, 0.0, -1.0)).with_health(5));

    world.request_attack(&attacker);
    let mut died = false;
    for _ in 0..40 {
        died |= world.tick(1.0 / 60.0).contains(&CombatEvent::Died { actor: id.clone() });
    }
    assert!(died);
    assert!(world.actor(&attacker).unwrap().hit_memory().contains(&id));
    world.remove(&attacker);

    for _ in 0..12 {
        world.tick(0.5);
    }
    let npc = world.actor(&id).unwrap();
    assert_eq!(npc.state(), CombatState::Idle);
    assert_eq!(npc.health(), npc.max_health());
    assert!(npc.can_take_damage());
    assert!(npc.hit_memory().is_empty());
}
