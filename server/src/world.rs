//! One client's simulation: the roster, its ports and the ordered tick.

use glam::Vec3;
use log::{debug, warn};
use rand::{rngs::StdRng, SeedableRng};

use crate::actor::{
    Actor, ActorId, ActorKind, CombatState, DamageOutcome, Damageable, LifecycleEvent, MoveIntent,
    RemoteFlags, Roster,
};
use crate::animation::{self, play_or_idle, Animator};
use crate::attack::{
    AttackCoordinator, Budget, DamageSource, HitOutcome, HitReport, HostileTargets, TargetSource,
};
use crate::combat::{AttackStarted, CombatDirector, VolumeSpawned};
use crate::config::SimConfig;
use crate::hit_volume::HitShape;
use crate::item::ItemLedger;
use crate::protocol::{
    DamageData, EffectData, ItemAction, ItemPickupData, PlayerStateData, ProjectileData,
    ProjectileWeaponData, UpdateBody, WeaponAttackData,
};
use crate::sync::{player_state_of, Inbound, NetworkSync, Outbox, Transport};
use crate::weapon::{
    WeaponCategory, WeaponTable, DEFAULT_PROJECTILE_SPEED, MELEE_ANIMATION, PROJECTILE_RADIUS,
    RANGED_ANIMATION,
};

/// What happened during a tick, for the presentation layer.
#[derive(Clone, Debug, PartialEq)]
pub enum CombatEvent {
    AttackStarted(AttackStarted),
    AttackEnded { actor: ActorId },
    Damaged { attacker: ActorId, target: ActorId, amount: u32, health: u32 },
    DamageForwarded { attacker: ActorId, target: ActorId, amount: u32 },
    Died { actor: ActorId },
    Recovered { actor: ActorId },
    Respawned { actor: ActorId, position: Vec3 },
    RemoteAttack { actor: ActorId, animation: &'static str },
    ItemPickedUp { item_id: String, actor: ActorId },
    Effect(EffectData),
}

pub struct World<T: Transport = Outbox> {
    config: SimConfig,
    roster: Roster,
    director: CombatDirector,
    coordinator: AttackCoordinator,
    animator: Box<dyn Animator>,
    targets: Box<dyn TargetSource>,
    sync: Option<NetworkSync<T>>,
    weapons: WeaponTable,
    items: ItemLedger,
    rng: StdRng,
    events: Vec<CombatEvent>,
}

impl World<Outbox> {
    pub fn offline(config: SimConfig, animator: Box<dyn Animator>) -> World<Outbox> {
        World::new(config, animator, None)
    }
}

impl<T: Transport> World<T> {
    pub fn new(
        config: SimConfig,
        animator: Box<dyn Animator>,
        sync: Option<NetworkSync<T>>,
    ) -> World<T> {
        World {
            director: CombatDirector::new(&config),
            config,
            roster: Roster::new(),
            coordinator: AttackCoordinator::new(),
            animator,
            targets: Box::new(HostileTargets),
            sync,
            weapons: WeaponTable::builtin(),
            items: ItemLedger::new(),
            rng: StdRng::from_entropy(),
            events: Vec::new(),
        }
    }

    pub fn with_targets(mut self, targets: Box<dyn TargetSource>) -> World<T> {
        self.targets = targets;
        self
    }

    pub fn with_weapons(mut self, weapons: WeaponTable) -> World<T> {
        self.weapons = weapons;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> World<T> {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn actor(&self, id: &ActorId) -> Option<&Actor> {
        self.roster.get(id)
    }

    pub fn actor_mut(&mut self, id: &ActorId) -> Option<&mut Actor> {
        self.roster.get_mut(id)
    }

    pub fn coordinator(&self) -> &AttackCoordinator {
        &self.coordinator
    }

    pub fn animator(&self) -> &dyn Animator {
        self.animator.as_ref()
    }

    pub fn items(&self) -> &ItemLedger {
        &self.items
    }

    pub fn sync(&self) -> Option<&NetworkSync<T>> {
        self.sync.as_ref()
    }

    pub fn sync_mut(&mut self) -> Option<&mut NetworkSync<T>> {
        self.sync.as_mut()
    }

    fn local_player(&self) -> Option<ActorId> {
        self.sync.as_ref().map(|sync| sync.local_id().clone())
    }

    pub fn spawn(&mut self, actor: Actor) {
        let actor = actor.with_timings(&self.config);
        self.animator.play(actor.id(), animation::IDLE_CLIP);
        debug!("Spawned {} ({:?})", actor.id(), actor.kind());
        self.roster.insert(actor.id().clone(), actor);
    }

    pub fn remove(&mut self, id: &ActorId) -> Option<Actor> {
        self.animator.forget(id);
        self.roster.remove(id)
    }

    pub fn set_intent(&mut self, id: &ActorId, intent: MoveIntent) {
        if let Some(actor) = self.roster.get_mut(id) {
            if !actor.is_remote() && !actor.is_dead() {
                actor.intent = intent;
            }
        }
    }

    pub fn jump(&mut self, id: &ActorId) -> bool {
        let power = self.config.jump_power;
        self.roster.get_mut(id).map_or(false, |actor| actor.request_jump(power))
    }

    pub fn roll(&mut self, id: &ActorId) -> bool {
        let config = &self.config;
        self.roster.get_mut(id).map_or(false, |actor| actor.request_roll(config))
    }

    /// Input path for a local attack. Rejections are silent.
    pub fn request_attack(&mut self, id: &ActorId) -> bool {
        let Some(actor) = self.roster.get_mut(id) else { return false };
        let Some(started) = self.director.request_attack(actor, self.animator.as_mut()) else {
            return false;
        };
        self.announce_attack(&started);
        self.events.push(CombatEvent::AttackStarted(started));
        true
    }

    fn announce_attack(&mut self, started: &AttackStarted) {
        if self.local_player().as_ref() != Some(&started.attacker) {
            return;
        }
        let weapon_type =
            self.roster.get(&started.attacker).map(|actor| actor.weapon().name.clone());
        self.send(UpdateBody::WeaponAttack(WeaponAttackData {
            player_id: started.attacker.to_string(),
            weapon_type,
            position: started.position.to_array(),
            direction: started.direction.to_array(),
            attack_type: started.category,
        }));
    }

    /// Equips or drinks a ground item and tells the room.
    pub fn pick_up(&mut self, id: &ActorId, item_id: &str) -> bool {
        let event = ItemPickupData {
            action: ItemAction::Pickup,
            item_id: item_id.to_string(),
            item_name: None,
            position: None,
            player_id: Some(id.to_string()),
        };
        let Some(name) = self.items.get(item_id).and_then(|item| item.name.clone()) else {
            return false;
        };
        match self.roster.get(id) {
            Some(actor) if !actor.is_remote() && !actor.is_dead() => {}
            _ => return false,
        }
        if !self.items.record(&event) {
            return false;
        }
        self.use_item(id, &name);
        self.events.push(CombatEvent::ItemPickedUp {
            item_id: item_id.to_string(),
            actor: id.clone(),
        });
        if self.local_player().as_ref() == Some(id) {
            self.send(UpdateBody::ItemPickup(event));
        }
        true
    }

    pub fn spawn_item(&mut self, item_id: &str, name: &str, position: Vec3) {
        let event = ItemPickupData {
            action: ItemAction::Spawn,
            item_id: item_id.to_string(),
            item_name: Some(name.to_string()),
            position: Some(position.to_array()),
            player_id: None,
        };
        self.items.record(&event);
        self.send(UpdateBody::ItemPickup(event));
    }

    /// Shares a cosmetic effect with the room.
    pub fn emit_effect(&mut self, effect: EffectData) {
        self.send(UpdateBody::Effect(effect));
    }

    /// Drops a random weapon, never a consumable. Returns its name.
    pub fn spawn_random_weapon(&mut self, item_id: &str, position: Vec3) -> Option<String> {
        let name = self.weapons.random_weapon_name(&mut self.rng)?.to_string();
        self.spawn_item(item_id, &name, position);
        Some(name)
    }

    fn use_item(&mut self, id: &ActorId, name: &str) {
        let Some(profile) = self.weapons.get(name).cloned() else {
            warn!("Unknown item {:?}, ignoring pickup effect", name);
            return;
        };
        if let Some(actor) = self.roster.get_mut(id) {
            if profile.is_weapon() {
                actor.equip(profile);
            } else {
                actor.consume(&profile);
            }
        }
    }

    fn send(&mut self, body: UpdateBody) {
        if let Some(sync) = self.sync.as_mut() {
            if let Err(err) = sync.send_event(body) {
                warn!("Failed to send update: {}", err);
            }
        }
    }

    /// Advances the simulation by `dt` seconds and returns what happened.
    pub fn tick(&mut self, dt: f32) -> Vec<CombatEvent> {
        self.apply_inbound();
        self.advance_timers(dt);
        self.advance_attacks(dt);
        self.resolve_hits(dt);
        self.apply_movement(dt);
        self.emit_outbound(dt);
        std::mem::take(&mut self.events)
    }

    fn apply_inbound(&mut self) {
        let Some(sync) = self.sync.as_mut() else { return };
        for inbound in sync.drain() {
            self.apply_update(inbound);
        }
    }

    fn apply_update(&mut self, inbound: Inbound) {
        match inbound.body {
            UpdateBody::PlayerState(state) => self.apply_player_state(state),
            UpdateBody::WeaponAttack(attack) => {
                let id = ActorId::new(attack.player_id);
                match self.roster.get(&id) {
                    Some(actor) if actor.is_remote() => {}
                    _ => {
                        warn!("weaponAttack for unknown remote actor {}", id);
                        return;
                    }
                }
                let clip = match attack.attack_type {
                    WeaponCategory::Ranged => RANGED_ANIMATION,
                    _ => MELEE_ANIMATION,
                };
                play_or_idle(self.animator.as_mut(), &id, clip);
                self.events.push(CombatEvent::RemoteAttack { actor: id, animation: clip });
            }
            UpdateBody::Projectile(projectile) => self.mirror_projectile(projectile),
            UpdateBody::Damage(damage) => self.apply_remote_damage(damage),
            UpdateBody::ItemPickup(event) => {
                if !self.items.record(&event) || event.action != ItemAction::Pickup {
                    return;
                }
                let Some(player) = event.player_id.map(ActorId::new) else { return };
                if self.roster.get(&player).map_or(false, Actor::is_remote) {
                    let name = self.items.get(&event.item_id).and_then(|item| item.name.clone());
                    if let Some(name) = name {
                        self.use_item(&player, &name);
                    }
                }
                self.events
                    .push(CombatEvent::ItemPickedUp { item_id: event.item_id, actor: player });
            }
            UpdateBody::Effect(effect) => self.events.push(CombatEvent::Effect(effect)),
        }
    }

    fn apply_player_state(&mut self, state: PlayerStateData) {
        let id = ActorId::new(state.id.as_str());
        let Some(actor) = self.roster.get_mut(&id) else {
            warn!("playerState for unknown actor {}", id);
            return;
        };
        if !actor.is_remote() {
            warn!("Ignoring playerState for local actor {}", id);
            return;
        }
        let flags = RemoteFlags {
            dead: state.is_dead,
            attacking: state.is_attacking,
            rolling: state.is_rolling,
            jumping: state.is_jumping,
            hit: state.is_hit,
        };
        let position = Vec3::from_array(state.position);
        actor.apply_remote_state(position, state.rotation[1], state.hp, flags);

        match state.weapon {
            Some(weapon) if weapon.name != actor.weapon().name => {
                actor.equip(self.weapons.resolve(Some(weapon.name.as_str())));
            }
            None => actor.unequip(),
            _ => {}
        }

        let playing = self.animator.current(&id).map(|sample| sample.clip);
        if playing.as_deref() != Some(state.animation.as_str()) {
            play_or_idle(self.animator.as_mut(), &id, &state.animation);
        }
    }

    fn mirror_projectile(&mut self, projectile: ProjectileData) {
        let owner = ActorId::new(projectile.player_id);
        if !self.roster.get(&owner).map_or(false, Actor::is_remote) {
            warn!("projectile from unknown remote actor {}", owner);
            return;
        }
        let weapon = projectile.weapon_data;
        let speed = weapon.projectile_speed.unwrap_or(DEFAULT_PROJECTILE_SPEED);
        let direction = Vec3::from_array(projectile.direction);
        let Some(budget) = Budget::travel(direction, speed, weapon.attack_radius) else {
            warn!(
                "Dropping projectile {} from {}: direction {:?}, speed {}, range {} never expire",
                projectile.projectile_id, owner, projectile.direction, speed, weapon.attack_radius
            );
            return;
        };
        let origin = Vec3::from_array(projectile.position);
        let shape = HitShape::Circle { origin, radius: PROJECTILE_RADIUS };
        let source = DamageSource { amount: weapon.damage, hits_many: weapon.hits_many };
        self.coordinator.spawn_mirrored(&owner, shape, budget, source);
    }

    fn apply_remote_damage(&mut self, damage: DamageData) {
        let target = ActorId::new(damage.target_id);
        let attacker = ActorId::new(damage.attacker_id);
        let Some(actor) = self.roster.get_mut(&target) else {
            debug!("damage for unknown actor {}", target);
            return;
        };
        if actor.is_remote() {
            return;
        }
        let outcome = actor.take_damage(damage.amount);
        self.record_outcome(attacker, target, damage.amount, outcome);
    }

    fn record_outcome(
        &mut self,
        attacker: ActorId,
        target: ActorId,
        amount: u32,
        outcome: DamageOutcome,
    ) {
        match outcome {
            DamageOutcome::Ignored => {}
            DamageOutcome::Wounded { health } => {
                self.events.push(CombatEvent::Damaged { attacker, target, amount, health });
            }
            DamageOutcome::Killed => {
                self.events.push(CombatEvent::Damaged {
                    attacker,
                    target: target.clone(),
                    amount,
                    health: 0,
                });
                self.events.push(CombatEvent::Died { actor: target });
            }
        }
    }

    fn advance_timers(&mut self, dt: f32) {
        self.animator.advance(dt);
        let region = self.config.spawn_region;
        for (id, actor) in self.roster.iter_mut() {
            match actor.tick_timers(dt, &mut self.rng, &region) {
                Some(LifecycleEvent::Respawned) => {
                    self.animator.play(id, animation::IDLE_CLIP);
                    self.events.push(CombatEvent::Respawned {
                        actor: id.clone(),
                        position: actor.position,
                    });
                }
                Some(LifecycleEvent::Recovered) => {
                    self.events.push(CombatEvent::Recovered { actor: id.clone() })
                }
                None => {}
            }
        }
    }

    fn advance_attacks(&mut self, dt: f32) {
        let ids: Vec<ActorId> = self.roster.keys().cloned().collect();
        for id in ids {
            let npc = self.roster.get(&id).map_or(false, |actor| actor.kind() == ActorKind::Npc);
            if npc {
                let animator = self.animator.as_mut();
                if let Some(started) = self.director.npc_think(&id, &mut self.roster, animator) {
                    self.events.push(CombatEvent::AttackStarted(started));
                }
            }

            let Some(actor) = self.roster.get_mut(&id) else { continue };
            let progress = self.director.advance_attack(
                actor,
                dt,
                self.animator.as_ref(),
                &mut self.coordinator,
            );
            if let Some(volume) = progress.spawned {
                self.announce_projectile(&volume);
            }
            if matches!(progress.ended, Some(CombatState::Idle | CombatState::Recovering)) {
                self.events.push(CombatEvent::AttackEnded { actor: id });
            }
        }
    }

    fn announce_projectile(&mut self, volume: &VolumeSpawned) {
        let Budget::Travel { velocity, remaining } = volume.budget else { return };
        if self.local_player().as_ref() != Some(&volume.attacker) {
            return;
        }
        self.send(UpdateBody::Projectile(ProjectileData {
            player_id: volume.attacker.to_string(),
            projectile_id: volume.instance.to_string(),
            position: volume.shape.origin().to_array(),
            direction: velocity.normalize_or_zero().to_array(),
            weapon_data: ProjectileWeaponData {
                damage: volume.source.amount,
                attack_radius: remaining,
                projectile_speed: Some(velocity.length()),
                hits_many: volume.source.hits_many,
            },
        }));
    }

    fn resolve_hits(&mut self, dt: f32) {
        let reports = self.coordinator.tick(dt, &mut self.roster, self.targets.as_ref());
        for HitReport { attacker, target, amount, outcome, .. } in reports {
            match outcome {
                HitOutcome::Applied(outcome) => {
                    self.record_outcome(attacker, target, amount, outcome)
                }
                HitOutcome::Forwarded => {
                    if self.local_player().as_ref() == Some(&attacker) {
                        self.send(UpdateBody::Damage(DamageData {
                            target_id: target.to_string(),
                            amount,
                            attacker_id: attacker.to_string(),
                        }));
                    }
                    self.events.push(CombatEvent::DamageForwarded { attacker, target, amount });
                }
            }
        }
    }

    fn apply_movement(&mut self, dt: f32) {
        for (id, actor) in self.roster.iter_mut() {
            if actor.is_remote() {
                continue;
            }
            actor.apply_movement(dt, &self.config);
            let Some(clip) = movement_clip(actor) else { continue };
            let playing = self.animator.current(id).map(|sample| sample.clip);
            if playing.as_deref() != Some(clip) {
                play_or_idle(self.animator.as_mut(), id, clip);
            }
        }
    }

    fn emit_outbound(&mut self, dt: f32) {
        let Some(sync) = self.sync.as_mut() else { return };
        let local = sync.local_id().clone();
        let roster = &self.roster;
        let animator = &self.animator;
        let state = || {
            let clip = animator
                .current(&local)
                .map_or_else(|| animation::IDLE_CLIP.to_string(), |sample| sample.clip);
            roster.get(&local).map(|actor| player_state_of(actor, &clip))
        };
        if let Err(err) = sync.tick_outbound(dt, state) {
            warn!("Failed to send playerState: {}", err);
        }
    }
}

/// Clip a local actor should show after moving; `None` leaves an attack clip alone.
fn movement_clip(actor: &Actor) -> Option<&'static str> {
    Some(match actor.state() {
        CombatState::Dead => animation::DEATH_CLIP,
        CombatState::Hit => animation::HIT_CLIP,
        CombatState::Attacking => return None,
        CombatState::Idle | CombatState::Recovering => {
            if actor.is_rolling() {
                animation::ROLL_CLIP
            } else if actor.is_jumping() {
                animation::JUMP_CLIP
            } else if actor.is_moving() {
                if actor.intent.run {
                    animation::RUN_CLIP
                } else {
                    animation::WALK_CLIP
                }
            } else {
                animation::IDLE_CLIP
            }
        }
    })
}
