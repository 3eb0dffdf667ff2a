//! Live attack instances and their once-per-target resolution.

use std::collections::HashSet;

use glam::Vec3;
use log::debug;

use crate::actor::{Actor, ActorId, ActorKind, DamageOutcome, Damageable, Roster};
use crate::hit_volume::{flatten, HitShape};
use crate::id::{Id, IdSource};
use crate::tick::Countdown;
use crate::weapon::{WeaponCategory, WeaponProfile, PROJECTILE_RADIUS};

pub type InstanceId = Id<AttackInstance>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageSource {
    pub amount: u32,
    pub hits_many: bool,
}

impl DamageSource {
    /// The damage an actor's equipped weapon deals, if it can deal any.
    pub fn of(actor: &Actor) -> Option<DamageSource> {
        let weapon = actor.weapon();
        if !weapon.is_weapon() {
            return None;
        }
        Some(DamageSource { amount: actor.attack_damage(), hits_many: weapon.hits_many() })
    }
}

/// How long a volume stays live.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Budget {
    /// Stationary volume, live for the rest of the damage window.
    Window(Countdown),
    /// Projectile flying along `velocity` until `remaining` distance is spent.
    Travel { velocity: Vec3, remaining: f32 },
}

impl Budget {
    pub fn window(secs: f32) -> Budget {
        Budget::Window(Countdown::from_secs(secs))
    }

    /// A projectile budget, or `None` when it could never run out: no
    /// horizontal direction, or a speed or range that is not a positive number.
    pub fn travel(direction: Vec3, speed: f32, range: f32) -> Option<Budget> {
        let heading = flatten(direction).normalize_or_zero();
        if heading == Vec3::ZERO || !is_positive(speed) || !is_positive(range) {
            return None;
        }
        Some(Budget::Travel { velocity: heading * speed, remaining: range })
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// Shape and budget of the volume an attacker's weapon produces.
pub fn volume_for(actor: &Actor, window_secs: f32) -> Option<(HitShape, Budget)> {
    let weapon: &WeaponProfile = actor.weapon();
    let origin = actor.position;
    let direction = actor.attack_direction();
    if weapon.category == WeaponCategory::Ranged {
        let shape = HitShape::Circle { origin, radius: PROJECTILE_RADIUS };
        let budget = Budget::travel(direction, weapon.projectile_speed(), weapon.radius)?;
        Some((shape, budget))
    } else {
        let shape = HitShape::Sector {
            origin,
            direction,
            radius: weapon.radius,
            half_angle: weapon.half_angle(),
        };
        Some((shape, Budget::window(window_secs)))
    }
}

#[derive(Clone, Debug)]
pub struct AttackInstance {
    pub id: InstanceId,
    pub owner: ActorId,
    pub shape: HitShape,
    pub source: DamageSource,
    budget: Budget,
    consumed: HashSet<ActorId>,
    resolved: bool,
    expired: bool,
    mirrored: bool,
}

impl AttackInstance {
    pub fn consumed_targets(&self) -> &HashSet<ActorId> {
        &self.consumed
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved
    }

    pub fn is_mirrored(&self) -> bool {
        self.mirrored
    }

    pub fn budget(&self) -> Budget {
        self.budget
    }

    /// Spends `dt` of the budget. Projectiles move by at most what is left of
    /// their range, and expire once a test has been made at the end of it.
    fn advance(&mut self, dt: f32) {
        match &mut self.budget {
            Budget::Window(timer) => {
                timer.advance(dt);
                self.expired = !timer.is_running();
            }
            Budget::Travel { velocity, remaining } => {
                let speed = velocity.length();
                if !is_positive(speed) || !is_positive(*remaining) {
                    self.expired = true;
                    return;
                }
                let step = (speed * dt).min(*remaining);
                self.shape.translate(*velocity / speed * step);
                *remaining -= step;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    /// Damage went through the target's `Damageable` impl.
    Applied(DamageOutcome),
    /// Target is remote; its owner has to apply the damage.
    Forwarded,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HitReport {
    pub instance: InstanceId,
    pub attacker: ActorId,
    pub target: ActorId,
    pub amount: u32,
    pub outcome: HitOutcome,
}

/// Lists who a volume may hit.
pub trait TargetSource {
    fn candidates(&self, owner: &ActorId, mirrored: bool, roster: &Roster) -> Vec<ActorId>;
}

/// Players hit everyone else, NPCs hit local players, and volumes mirrored
/// from another client only hit local NPCs.
#[derive(Clone, Copy, Debug, Default)]
pub struct HostileTargets;

impl TargetSource for HostileTargets {
    fn candidates(&self, owner: &ActorId, mirrored: bool, roster: &Roster) -> Vec<ActorId> {
        let owner_kind = roster.get(owner).map(Actor::kind);
        roster
            .values()
            .filter(|actor| actor.id() != owner)
            .filter(|actor| match (mirrored, owner_kind) {
                (true, _) => actor.kind() == ActorKind::Npc && !actor.is_remote(),
                (false, Some(ActorKind::Player)) => true,
                (false, Some(ActorKind::Npc)) => {
                    actor.kind() == ActorKind::Player && !actor.is_remote()
                }
                (false, None) => false,
            })
            .map(|actor| actor.id().clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct AttackCoordinator {
    live: Vec<AttackInstance>,
    ids: IdSource<AttackInstance>,
}

impl Default for AttackCoordinator {
    fn default() -> Self {
        AttackCoordinator::new()
    }
}

impl AttackCoordinator {
    pub fn new() -> AttackCoordinator {
        AttackCoordinator { live: Vec::new(), ids: IdSource::new(1) }
    }

    pub fn spawn_attack(
        &mut self,
        owner: &ActorId,
        shape: HitShape,
        budget: Budget,
        source: DamageSource,
    ) -> Option<InstanceId> {
        self.spawn(owner, shape, budget, source, false)
    }

    /// Spawns a volume fired by a remote actor.
    pub fn spawn_mirrored(
        &mut self,
        owner: &ActorId,
        shape: HitShape,
        budget: Budget,
        source: DamageSource,
    ) -> Option<InstanceId> {
        self.spawn(owner, shape, budget, source, true)
    }

    fn spawn(
        &mut self,
        owner: &ActorId,
        shape: HitShape,
        budget: Budget,
        source: DamageSource,
        mirrored: bool,
    ) -> Option<InstanceId> {
        if source.amount == 0 {
            debug!("{} has no damage source, attack dropped", owner);
            return None;
        }
        let id = self.ids.next();
        self.live.push(AttackInstance {
            id,
            owner: owner.clone(),
            shape,
            source,
            budget,
            consumed: HashSet::new(),
            resolved: false,
            expired: false,
            mirrored,
        });
        debug!("{} spawned attack {}", owner, id);
        Some(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&AttackInstance> {
        self.live.iter().find(|instance| instance.id == id)
    }

    pub fn live(&self) -> impl Iterator<Item = &AttackInstance> {
        self.live.iter()
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn clear(&mut self) {
        self.live.clear();
    }

    /// Resolves every live volume where it stands, then moves projectiles and
    /// retires the spent ones.
    pub fn tick(
        &mut self,
        dt: f32,
        roster: &mut Roster,
        targets: &dyn TargetSource,
    ) -> Vec<HitReport> {
        let mut reports = Vec::new();
        for instance in self.live.iter_mut() {
            for target_id in targets.candidates(&instance.owner, instance.mirrored, roster) {
                if instance.resolved {
                    break;
                }
                if instance.consumed.contains(&target_id) {
                    continue;
                }
                let Some(target) = roster.get_mut(&target_id) else { continue };
                if !target.can_take_damage()
                    || !instance.shape.contains(target.position(), target.hit_radius())
                {
                    continue;
                }

                instance.consumed.insert(target_id.clone());
                let amount = instance.source.amount;
                let outcome = if target.is_remote() {
                    HitOutcome::Forwarded
                } else {
                    HitOutcome::Applied(target.take_damage(amount))
                };
                debug!(
                    "Attack {} by {} hit {} for {}",
                    instance.id, instance.owner, target_id, amount
                );
                reports.push(HitReport {
                    instance: instance.id,
                    attacker: instance.owner.clone(),
                    target: target_id,
                    amount,
                    outcome,
                });
                if !instance.source.hits_many {
                    instance.resolved = true;
                }
            }

            instance.advance(dt);
        }

        for report in &reports {
            if let Some(attacker) = roster.get_mut(&report.attacker) {
                attacker.remember_hit(&report.target);
            }
        }
        self.live.retain(|instance| !instance.resolved && !instance.expired);
        reports
    }
}
