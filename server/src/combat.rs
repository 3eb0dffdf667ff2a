//! Attack initiation and the attacker's side of a swing.

use glam::Vec3;
use log::{debug, warn};

use crate::actor::{Actor, ActorId, ActorKind, CombatState, Damageable, Roster};
use crate::animation::{Animator, IDLE_CLIP};
use crate::attack::{volume_for, AttackCoordinator, Budget, DamageSource, InstanceId};
use crate::config::SimConfig;
use crate::hit_volume::{flatten, HitShape};
use crate::weapon::{damage_window, WeaponCategory};

#[derive(Clone, Debug, PartialEq)]
pub struct AttackStarted {
    pub attacker: ActorId,
    pub animation: &'static str,
    pub category: WeaponCategory,
    pub aerial: bool,
    pub position: Vec3,
    pub direction: Vec3,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VolumeSpawned {
    pub attacker: ActorId,
    pub instance: InstanceId,
    pub shape: HitShape,
    pub budget: Budget,
    pub source: DamageSource,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttackProgress {
    pub spawned: Option<VolumeSpawned>,
    /// State the attacker left `Attacking`/`Recovering` for, if it did.
    pub ended: Option<CombatState>,
}

#[derive(Clone, Debug)]
pub struct CombatDirector {
    attack_duration: f32,
}

impl CombatDirector {
    pub fn new(config: &SimConfig) -> CombatDirector {
        CombatDirector { attack_duration: config.attack_duration }
    }

    /// Starts an attack if the actor may attack right now. Rejections are silent.
    pub fn request_attack(
        &self,
        actor: &mut Actor,
        animator: &mut dyn Animator,
    ) -> Option<AttackStarted> {
        if actor.is_remote() || !actor.can_start_attack() {
            return None;
        }
        let Some(animation) = actor.weapon().attack_animation() else {
            debug!("{} has nothing to attack with", actor.id());
            return None;
        };
        if damage_window(animation, actor.is_jumping()).is_none()
            || !animator.play(actor.id(), animation)
        {
            warn!("No attack animation {:?} for {}", animation, actor.id());
            animator.play(actor.id(), IDLE_CLIP);
            return None;
        }

        actor.begin_attack(self.attack_duration);
        debug!("{} attacks with {}", actor.id(), actor.weapon().name);
        Some(AttackStarted {
            attacker: actor.id().clone(),
            animation,
            category: actor.weapon().category,
            aerial: actor.is_aerial_attack(),
            position: actor.position,
            direction: actor.attack_direction(),
        })
    }

    /// Spawns this activation's hit-volume once the clip is inside its damage
    /// window, then runs the swing and recovery timers.
    pub fn advance_attack(
        &self,
        actor: &mut Actor,
        dt: f32,
        animator: &dyn Animator,
        coordinator: &mut AttackCoordinator,
    ) -> AttackProgress {
        let mut progress = AttackProgress::default();
        if actor.is_remote() {
            return progress;
        }

        if actor.state() == CombatState::Attacking {
            progress.spawned = self.sample_window(actor, animator, coordinator);
        }
        progress.ended = actor.advance_attack(dt);
        progress
    }

    fn sample_window(
        &self,
        actor: &mut Actor,
        animator: &dyn Animator,
        coordinator: &mut AttackCoordinator,
    ) -> Option<VolumeSpawned> {
        let sample = animator.current(actor.id())?;
        if actor.weapon().attack_animation() != Some(sample.clip.as_str()) {
            return None;
        }
        let window = damage_window(&sample.clip, actor.is_aerial_attack())?;
        if !window.contains_time(sample.time) || !actor.claim_volume() {
            return None;
        }

        let source = DamageSource::of(actor)?;
        let (shape, budget) = volume_for(actor, window.closes_at() - sample.time)?;
        let instance = coordinator.spawn_attack(actor.id(), shape, budget, source)?;
        Some(VolumeSpawned { attacker: actor.id().clone(), instance, shape, budget, source })
    }

    /// Turns an idle NPC towards the nearest living local player in reach and swings.
    pub fn npc_think(
        &self,
        npc_id: &ActorId,
        roster: &mut Roster,
        animator: &mut dyn Animator,
    ) -> Option<AttackStarted> {
        let npc = roster.get(npc_id)?;
        if npc.kind() != ActorKind::Npc || npc.is_remote() || npc.is_dead() {
            return None;
        }
        let origin = npc.position;
        let reach = npc.attack_radius();
        let target = roster
            .values()
            .filter(|actor| {
                actor.kind() == ActorKind::Player && !actor.is_remote() && !actor.is_dead()
            })
            .map(|actor| (flatten(actor.position() - origin), actor))
            .filter(|(offset, _)| offset.length() < reach)
            .min_by(|(a, _), (b, _)| a.length().total_cmp(&b.length()))
            .map(|(offset, _)| offset)?;

        let npc = roster.get_mut(npc_id)?;
        if !npc.can_start_attack() {
            return None;
        }
        npc.set_facing(target);
        self.request_attack(npc, animator)
    }
}
