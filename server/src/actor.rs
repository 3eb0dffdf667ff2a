use std::collections::{BTreeMap, HashSet};
use std::fmt;

use glam::Vec3;
use log::{debug, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, SpawnRegion};
use crate::hit_volume::flatten;
use crate::tick::Countdown;
use crate::weapon::{Stat, StatEffect, WeaponProfile};

pub const DEFAULT_HIT_RADIUS: f32 = 0.7;
pub const PLAYER_BASE_HEALTH: f32 = 100.0;
pub const NPC_BASE_HEALTH: f32 = 150.0;
pub const BASE_MOVE_SPEED: f32 = 5.0;
pub const MIN_ATTACK_COOLDOWN: f32 = 0.05;
const RUN_MULTIPLIER: f32 = 2.0;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(String);

impl ActorId {
    pub fn new(id: impl Into<String>) -> ActorId {
        ActorId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ActorId {
    fn from(id: &str) -> ActorId {
        ActorId::new(id)
    }
}

/// Every actor known to one simulation, in stable id order.
pub type Roster = BTreeMap<ActorId, Actor>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    Player,
    Npc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombatState {
    Idle,
    Attacking,
    Recovering,
    Hit,
    Dead,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    pub strength: i32,
    pub agility: i32,
    pub stamina: i32,
}

impl Attributes {
    pub fn apply(&mut self, effect: StatEffect) {
        let stat = match effect.stat {
            Stat::Strength => &mut self.strength,
            Stat::Agility => &mut self.agility,
            Stat::Stamina => &mut self.stamina,
        };
        *stat += effect.amount;
    }
}

/// What the controller (keyboard or brain) wants to do this tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MoveIntent {
    pub direction: Vec3,
    pub run: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    Ignored,
    Wounded { health: u32 },
    Killed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    Recovered,
    Respawned,
}

/// Anything attacks can land on.
pub trait Damageable {
    fn id(&self) -> &ActorId;
    fn position(&self) -> Vec3;
    fn hit_radius(&self) -> f32;
    fn can_take_damage(&self) -> bool;
    fn take_damage(&mut self, amount: u32) -> DamageOutcome;
}

/// Flags mirrored from a remote `playerState`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RemoteFlags {
    pub dead: bool,
    pub attacking: bool,
    pub rolling: bool,
    pub jumping: bool,
    pub hit: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Timings {
    hit_duration: f32,
    respawn_delay: f32,
}

impl From<&SimConfig> for Timings {
    fn from(config: &SimConfig) -> Timings {
        Timings { hit_duration: config.hit_duration, respawn_delay: config.respawn_delay }
    }
}

#[derive(Clone, Debug)]
pub struct Actor {
    id: ActorId,
    pub name: String,
    kind: ActorKind,
    is_remote: bool,
    health: u32,
    max_health: u32,
    base_health: f32,
    respawn_timer: Countdown,
    pub position: Vec3,
    facing: Vec3,
    pub hit_radius: f32,
    vertical_velocity: f32,
    attributes: Attributes,
    weapon: WeaponProfile,
    attack_damage: u32,
    attack_cooldown: f32,
    move_speed: f32,
    attack_cooldown_timer: Countdown,
    state: CombatState,
    attack_timer: Countdown,
    recovery_timer: Countdown,
    hit_timer: Countdown,
    attack_direction: Vec3,
    aerial: bool,
    volume_spawned: bool,
    hit_memory: HashSet<ActorId>,
    jumping: bool,
    rolling: bool,
    roll_timer: Countdown,
    roll_cooldown_timer: Countdown,
    roll_direction: Vec3,
    pub intent: MoveIntent,
    timings: Timings,
}

impl Actor {
    pub fn new(id: ActorId, name: &str, kind: ActorKind, position: Vec3) -> Actor {
        let mut actor = Actor {
            id,
            name: name.to_string(),
            kind,
            is_remote: false,
            health: 1,
            max_health: 1,
            base_health: match kind {
                ActorKind::Player => PLAYER_BASE_HEALTH,
                ActorKind::Npc => NPC_BASE_HEALTH,
            },
            respawn_timer: Countdown::default(),
            position,
            facing: Vec3::NEG_Z,
            hit_radius: DEFAULT_HIT_RADIUS,
            vertical_velocity: 0.0,
            attributes: Attributes::default(),
            weapon: match kind {
                ActorKind::Player => WeaponProfile::bare_hands(),
                ActorKind::Npc => WeaponProfile::npc_strike(),
            },
            attack_damage: 0,
            attack_cooldown: 0.0,
            move_speed: BASE_MOVE_SPEED,
            attack_cooldown_timer: Countdown::default(),
            state: CombatState::Idle,
            attack_timer: Countdown::default(),
            recovery_timer: Countdown::default(),
            hit_timer: Countdown::default(),
            attack_direction: Vec3::NEG_Z,
            aerial: false,
            volume_spawned: false,
            hit_memory: HashSet::new(),
            jumping: false,
            rolling: false,
            roll_timer: Countdown::default(),
            roll_cooldown_timer: Countdown::default(),
            roll_direction: Vec3::ZERO,
            intent: MoveIntent::default(),
            timings: Timings::from(&SimConfig::default()),
        };
        actor.recompute_stats();
        actor.health = actor.max_health;
        actor
    }

    pub fn player(id: impl Into<ActorId>, name: &str, position: Vec3) -> Actor {
        Actor::new(id.into(), name, ActorKind::Player, position)
    }

    pub fn npc(id: impl Into<ActorId>, name: &str, position: Vec3) -> Actor {
        Actor::new(id.into(), name, ActorKind::Npc, position)
    }

    pub fn remote(mut self) -> Actor {
        self.is_remote = true;
        self
    }

    pub fn with_timings(mut self, config: &SimConfig) -> Actor {
        self.timings = Timings::from(config);
        self
    }

    /// Overrides the base maximum health; current health is clamped, never raised.
    pub fn with_max_health(mut self, max_health: u32) -> Actor {
        self.base_health = max_health.max(1) as f32;
        self.recompute_stats();
        self
    }

    pub fn with_health(mut self, health: u32) -> Actor {
        self.set_health(health);
        self
    }

    pub fn with_weapon(mut self, weapon: WeaponProfile) -> Actor {
        self.equip(weapon);
        self
    }

    pub fn facing_towards(mut self, direction: Vec3) -> Actor {
        self.set_facing(direction);
        self
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn is_remote(&self) -> bool {
        self.is_remote
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.state == CombatState::Dead
    }

    pub fn state(&self) -> CombatState {
        self.state
    }

    pub fn facing(&self) -> Vec3 {
        self.facing
    }

    /// Yaw around +Y, with zero facing +Z.
    pub fn yaw(&self) -> f32 {
        self.facing.x.atan2(self.facing.z)
    }

    pub fn set_facing(&mut self, direction: Vec3) {
        let direction = flatten(direction).normalize_or_zero();
        if direction != Vec3::ZERO {
            self.facing = direction;
        }
    }

    pub fn attributes(&self) -> Attributes {
        self.attributes
    }

    pub fn weapon(&self) -> &WeaponProfile {
        &self.weapon
    }

    pub fn attack_damage(&self) -> u32 {
        self.attack_damage
    }

    pub fn attack_radius(&self) -> f32 {
        self.weapon.radius
    }

    pub fn attack_angle(&self) -> f32 {
        self.weapon.angle
    }

    pub fn attack_cooldown(&self) -> f32 {
        self.attack_cooldown
    }

    pub fn cooldown_remaining(&self) -> f32 {
        self.attack_cooldown_timer.remaining()
    }

    pub fn respawn_remaining(&self) -> f32 {
        self.respawn_timer.remaining()
    }

    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    pub fn is_jumping(&self) -> bool {
        self.jumping
    }

    pub fn is_rolling(&self) -> bool {
        self.rolling
    }

    pub fn is_attacking(&self) -> bool {
        self.state == CombatState::Attacking
    }

    pub fn is_hit(&self) -> bool {
        self.state == CombatState::Hit
    }

    pub fn is_aerial_attack(&self) -> bool {
        self.aerial
    }

    pub fn attack_direction(&self) -> Vec3 {
        self.attack_direction
    }

    pub fn hit_memory(&self) -> &HashSet<ActorId> {
        &self.hit_memory
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    /// Equips a weapon profile. Consumables are refused.
    pub fn equip(&mut self, weapon: WeaponProfile) -> bool {
        if !weapon.is_weapon() {
            warn!("{} cannot equip {:?}, it is not a weapon", self.id, weapon.name);
            return false;
        }
        self.weapon = weapon;
        self.recompute_stats();
        true
    }

    pub fn unequip(&mut self) {
        self.weapon = match self.kind {
            ActorKind::Player => WeaponProfile::bare_hands(),
            ActorKind::Npc => WeaponProfile::npc_strike(),
        };
        self.recompute_stats();
    }

    /// Drinks a consumable, applying its stat effect.
    pub fn consume(&mut self, item: &WeaponProfile) -> bool {
        if self.is_dead() {
            return false;
        }
        match item.stat_effect {
            Some(effect) => {
                self.attributes.apply(effect);
                self.recompute_stats();
                debug!("{} consumed {}: {:?}", self.id, item.name, self.attributes);
                true
            }
            None => false,
        }
    }

    fn recompute_stats(&mut self) {
        let max_health = (self.base_health * (1.0 + 0.1 * self.attributes.stamina as f32)).round();
        self.max_health = max_health.max(1.0) as u32;
        self.health = self.health.min(self.max_health);

        let bonus = 5 * self.attributes.strength;
        self.attack_damage = (self.weapon.damage as i64 + bonus as i64).max(0) as u32;

        let agility = 1.0 - 0.1 * self.attributes.agility as f32;
        self.attack_cooldown = (self.weapon.cooldown() * agility).max(MIN_ATTACK_COOLDOWN);
        self.move_speed = (BASE_MOVE_SPEED * (1.0 + 0.1 * self.attributes.agility as f32)).max(0.0);
    }

    fn set_health(&mut self, health: u32) {
        self.health = health.min(self.max_health);
        if self.health == 0 {
            self.enter_dead();
        } else if self.state == CombatState::Dead {
            self.state = CombatState::Idle;
            self.respawn_timer.clear();
        }
    }

    pub fn heal(&mut self, amount: u32) {
        if self.is_dead() {
            return;
        }
        self.health = self.health.saturating_add(amount).min(self.max_health);
    }

    fn enter_dead(&mut self) {
        self.health = 0;
        self.state = CombatState::Dead;
        self.respawn_timer.start(self.timings.respawn_delay);
        self.attack_timer.clear();
        self.recovery_timer.clear();
        self.hit_timer.clear();
        self.aerial = false;
        self.rolling = false;
        self.roll_timer.clear();
        self.intent = MoveIntent::default();
    }

    pub fn respawn(&mut self, position: Vec3) {
        self.health = self.max_health;
        self.state = CombatState::Idle;
        self.respawn_timer.clear();
        self.attack_cooldown_timer.clear();
        self.hit_memory.clear();
        self.position = position;
        self.vertical_velocity = 0.0;
        self.jumping = false;
        self.rolling = false;
        self.roll_timer.clear();
        self.roll_cooldown_timer.clear();
        debug!("{} respawned at {}", self.id, position);
    }

    /// Counts down cooldowns and the hit/respawn timers.
    pub fn tick_timers(
        &mut self,
        dt: f32,
        rng: &mut impl Rng,
        region: &SpawnRegion,
    ) -> Option<LifecycleEvent> {
        self.attack_cooldown_timer.advance(dt);
        self.roll_cooldown_timer.advance(dt);
        if self.is_remote {
            return None;
        }
        match self.state {
            CombatState::Dead if self.respawn_timer.advance(dt) => {
                self.respawn(region.pick(rng));
                Some(LifecycleEvent::Respawned)
            }
            CombatState::Hit if self.hit_timer.advance(dt) => {
                self.state = CombatState::Idle;
                Some(LifecycleEvent::Recovered)
            }
            _ => None,
        }
    }

    pub(crate) fn can_start_attack(&self) -> bool {
        self.state == CombatState::Idle
            && !self.rolling
            && !self.attack_cooldown_timer.is_running()
            && !(self.jumping && self.aerial)
    }

    pub(crate) fn begin_attack(&mut self, duration: f32) {
        self.state = CombatState::Attacking;
        self.attack_cooldown_timer.start(self.attack_cooldown);
        self.attack_timer.start(duration);
        self.hit_memory.clear();
        self.attack_direction = self.facing;
        self.aerial = self.jumping;
        self.volume_spawned = false;
    }

    /// Marks the hit-volume of the current activation as spawned.
    /// Returns false if it already was.
    pub(crate) fn claim_volume(&mut self) -> bool {
        !std::mem::replace(&mut self.volume_spawned, true)
    }

    /// Advances the swing and recovery timers, returning the new state on a transition.
    pub(crate) fn advance_attack(&mut self, dt: f32) -> Option<CombatState> {
        match self.state {
            CombatState::Attacking if self.attack_timer.advance(dt) => {
                self.aerial = false;
                if self.weapon.recovery > 0.0 {
                    self.recovery_timer.start(self.weapon.recovery);
                    self.state = CombatState::Recovering;
                } else {
                    self.state = CombatState::Idle;
                }
                Some(self.state)
            }
            CombatState::Recovering if self.recovery_timer.advance(dt) => {
                self.state = CombatState::Idle;
                Some(self.state)
            }
            _ => None,
        }
    }

    pub(crate) fn remember_hit(&mut self, target: &ActorId) {
        self.hit_memory.insert(target.clone());
    }

    pub fn request_jump(&mut self, power: f32) -> bool {
        if self.is_remote || self.jumping || self.rolling {
            return false;
        }
        if !matches!(self.state, CombatState::Idle | CombatState::Recovering) {
            return false;
        }
        self.jumping = true;
        self.vertical_velocity = power;
        true
    }

    pub fn request_roll(&mut self, config: &SimConfig) -> bool {
        if self.is_remote || self.jumping || self.rolling || self.roll_cooldown_timer.is_running() {
            return false;
        }
        if !matches!(self.state, CombatState::Idle | CombatState::Recovering) {
            return false;
        }
        let direction = flatten(self.intent.direction).normalize_or_zero();
        self.roll_direction = if direction == Vec3::ZERO { self.facing } else { direction };
        self.facing = self.roll_direction;
        self.rolling = true;
        self.roll_timer.start(config.roll_duration);
        self.roll_cooldown_timer.start(config.roll_cooldown);
        true
    }

    /// Moves a local actor by its intent, roll and jump arc.
    pub fn apply_movement(&mut self, dt: f32, config: &SimConfig) {
        if self.is_remote || self.is_dead() {
            return;
        }
        if self.rolling {
            self.position += self.roll_direction * config.roll_speed * dt;
            if self.roll_timer.advance(dt) {
                self.rolling = false;
            }
        } else {
            let direction = flatten(self.intent.direction).normalize_or_zero();
            if direction != Vec3::ZERO {
                let speed = if self.intent.run {
                    self.move_speed * RUN_MULTIPLIER
                } else {
                    self.move_speed
                };
                self.position += direction * speed * dt;
                if self.state != CombatState::Attacking {
                    self.facing = direction;
                }
            }
        }

        if self.jumping {
            self.vertical_velocity += config.gravity * dt;
            self.position.y += self.vertical_velocity * dt;
            let floor = config.spawn_region.y;
            if self.position.y <= floor {
                self.position.y = floor;
                self.vertical_velocity = 0.0;
                self.jumping = false;
            }
        }
    }

    pub fn is_moving(&self) -> bool {
        flatten(self.intent.direction) != Vec3::ZERO
    }

    /// Mirrors a remote actor's reported state.
    pub fn apply_remote_state(
        &mut self,
        position: Vec3,
        yaw: f32,
        health: u32,
        flags: RemoteFlags,
    ) {
        self.position = position;
        self.facing = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        self.max_health = self.max_health.max(health);
        self.jumping = flags.jumping;
        self.rolling = flags.rolling;
        if flags.dead || health == 0 {
            self.health = 0;
            self.state = CombatState::Dead;
            return;
        }
        self.health = health;
        self.state = if flags.hit {
            CombatState::Hit
        } else if flags.attacking {
            CombatState::Attacking
        } else {
            CombatState::Idle
        };
    }

    pub fn flags(&self) -> RemoteFlags {
        RemoteFlags {
            dead: self.is_dead(),
            attacking: self.is_attacking(),
            rolling: self.rolling,
            jumping: self.jumping,
            hit: self.is_hit(),
        }
    }
}

impl Damageable for Actor {
    fn id(&self) -> &ActorId {
        &self.id
    }

    fn position(&self) -> Vec3 {
        self.position
    }

    fn hit_radius(&self) -> f32 {
        self.hit_radius
    }

    /// Dead actors and actors still reeling from a hit are immune.
    fn can_take_damage(&self) -> bool {
        !matches!(self.state, CombatState::Dead | CombatState::Hit)
    }

    fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        if amount == 0 || !self.can_take_damage() {
            return DamageOutcome::Ignored;
        }
        self.health = self.health.saturating_sub(amount);
        if self.health == 0 {
            self.enter_dead();
            debug!("{} died", self.id);
            return DamageOutcome::Killed;
        }
        // Volumes already spawned by an interrupted swing stay live.
        self.attack_timer.clear();
        self.recovery_timer.clear();
        self.aerial = false;
        self.state = CombatState::Hit;
        self.hit_timer.start(self.timings.hit_duration);
        DamageOutcome::Wounded { health: self.health }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;
    use crate::weapon::{WeaponCategory, WeaponTable};

    fn region() -> SpawnRegion {
        SimConfig::default().spawn_region
    }

    #[test]
    fn players_spawn_at_full_health() {
        let actor = Actor::player("p1", "ann", Vec3::ZERO);
        assert_eq!(actor.health(), 100);
        assert_eq!(actor.max_health(), 100);
        assert_eq!(actor.state(), CombatState::Idle);
        assert!(!actor.is_dead());
        assert_eq!(Actor::npc("n1", "grunt", Vec3::ZERO).max_health(), 150);
    }

    #[test]
    fn damage_wounds_then_kills() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO).with_max_health(20).with_health(15);
        assert_eq!(actor.take_damage(10), DamageOutcome::Wounded { health: 5 });
        assert_eq!(actor.state(), CombatState::Hit);
        assert!(!actor.is_dead());

        let mut rng = StdRng::seed_from_u64(1);
        actor.tick_timers(0.5, &mut rng, &region());
        assert_eq!(actor.state(), CombatState::Idle);

        assert_eq!(actor.take_damage(10), DamageOutcome::Killed);
        assert_eq!(actor.health(), 0);
        assert!(actor.is_dead());
    }

    #[test]
    fn hit_state_grants_immunity() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        actor.take_damage(10);
        assert_eq!(actor.take_damage(10), DamageOutcome::Ignored);
        assert_eq!(actor.health(), 90);
    }

    #[test]
    fn dead_actors_ignore_damage_and_input() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO).with_health(1);
        actor.take_damage(5);
        assert_eq!(actor.take_damage(5), DamageOutcome::Ignored);
        assert!(!actor.request_jump(12.0));
        actor.intent.direction = Vec3::X;
        actor.apply_movement(1.0, &SimConfig::default());
        assert_eq!(actor.position, Vec3::ZERO);
    }

    #[test]
    fn respawn_restores_invariants() {
        let config = SimConfig { respawn_delay: 2.0, ..SimConfig::default() };
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO).with_timings(&config).with_health(3);
        actor.take_damage(50);
        let mut rng = StdRng::seed_from_u64(4);
        assert_eq!(actor.tick_timers(1.0, &mut rng, &config.spawn_region), None);
        assert_relative_eq!(actor.respawn_remaining(), 1.0);
        assert_eq!(
            actor.tick_timers(1.0, &mut rng, &config.spawn_region),
            Some(LifecycleEvent::Respawned)
        );
        assert_eq!(actor.health(), actor.max_health());
        assert_eq!(actor.state(), CombatState::Idle);
        assert!(config.spawn_region.contains(actor.position));
    }

    #[test]
    fn attributes_drive_derived_stats() {
        let table = WeaponTable::builtin();
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO)
            .with_weapon(table.get("Sword.fbx").cloned().unwrap());
        assert_eq!(actor.attack_damage(), 20);

        let potion = table.get("Potion1_Filled.fbx").unwrap();
        assert!(actor.consume(potion));
        assert_eq!(actor.attack_damage(), 25);

        actor.consume(&WeaponProfile {
            stat_effect: Some(StatEffect { stat: Stat::Agility, amount: 2 }),
            ..potion.clone()
        });
        assert_relative_eq!(actor.attack_cooldown(), 0.4, epsilon = 1e-6);
        assert_relative_eq!(actor.move_speed(), 6.0, epsilon = 1e-5);

        actor.consume(&WeaponProfile {
            stat_effect: Some(StatEffect { stat: Stat::Stamina, amount: 3 }),
            ..potion.clone()
        });
        assert_eq!(actor.max_health(), 130);
        assert_eq!(actor.health(), 100);
    }

    #[test]
    fn cooldown_never_drops_below_floor() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        actor.attributes.agility = 20;
        actor.recompute_stats();
        assert_relative_eq!(actor.attack_cooldown(), MIN_ATTACK_COOLDOWN);
    }

    #[test]
    fn potions_cannot_be_equipped() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        let potion = WeaponTable::builtin().get("Potion1_Filled.fbx").cloned().unwrap();
        assert!(!actor.equip(potion));
        assert_eq!(actor.weapon().category, WeaponCategory::Melee);
    }

    #[test]
    fn heal_is_capped() {
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO).with_health(90);
        actor.heal(500);
        assert_eq!(actor.health(), 100);
    }

    #[test]
    fn jump_lands_back_on_the_floor() {
        let config = SimConfig::default();
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        assert!(actor.request_jump(config.jump_power));
        assert!(!actor.request_jump(config.jump_power));
        assert_eq!(actor.vertical_velocity(), config.jump_power);
        actor.apply_movement(0.1, &config);
        assert!(actor.position.y > 0.0);
        for _ in 0..20 {
            actor.apply_movement(0.1, &config);
        }
        assert!(!actor.is_jumping());
        assert_eq!(actor.position.y, 0.0);
        assert_eq!(actor.vertical_velocity(), 0.0);
    }

    #[test]
    fn roll_moves_along_intent_and_cools_down() {
        let config = SimConfig::default();
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        actor.intent.direction = Vec3::X;
        assert!(actor.request_roll(&config));
        actor.apply_movement(0.5, &config);
        assert!(!actor.is_rolling());
        assert_relative_eq!(actor.position.x, config.roll_speed * 0.5, epsilon = 1e-5);
        assert!(!actor.request_roll(&config));
    }

    #[test]
    fn walking_turns_the_actor() {
        let config = SimConfig::default();
        let mut actor = Actor::player("p1", "ann", Vec3::ZERO);
        actor.intent = MoveIntent { direction: Vec3::new(3.0, 0.0, 0.0), run: true };
        actor.apply_movement(1.0, &config);
        assert_relative_eq!(actor.position.x, 10.0);
        assert_eq!(actor.facing(), Vec3::X);
    }

    #[test]
    fn remote_state_is_mirrored() {
        let mut actor = Actor::player("p2", "bob", Vec3::ZERO).remote();
        let flags = RemoteFlags { attacking: true, jumping: true, ..RemoteFlags::default() };
        actor.apply_remote_state(Vec3::new(1.0, 2.0, 3.0), std::f32::consts::FRAC_PI_2, 40, flags);
        assert_eq!(actor.position, Vec3::new(1.0, 2.0, 3.0));
        assert_relative_eq!(actor.facing().x, 1.0, epsilon = 1e-6);
        assert_eq!(actor.health(), 40);
        assert_eq!(actor.state(), CombatState::Attacking);
        assert_eq!(actor.flags(), flags);

        actor.apply_remote_state(Vec3::ZERO, 0.0, 0, RemoteFlags::default());
        assert!(actor.is_dead());
        assert!(!actor.can_take_damage());
    }
}
