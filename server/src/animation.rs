//! The renderer-facing animation port.

use std::collections::{HashMap, HashSet};

use log::warn;

use crate::actor::ActorId;

pub const IDLE_CLIP: &str = "Idle";
pub const WALK_CLIP: &str = "Walk";
pub const RUN_CLIP: &str = "Run";
pub const JUMP_CLIP: &str = "Jump";
pub const ROLL_CLIP: &str = "Roll";
pub const HIT_CLIP: &str = "ReceiveHit";
pub const DEATH_CLIP: &str = "Death";

#[derive(Clone, Debug, PartialEq)]
pub struct ClipSample {
    pub clip: String,
    pub time: f32,
}

pub trait Animator {
    /// Starts `clip` from its beginning. Returns false if the clip is unknown.
    fn play(&mut self, actor: &ActorId, clip: &str) -> bool;
    fn current(&self, actor: &ActorId) -> Option<ClipSample>;
    fn advance(&mut self, dt: f32);
    fn forget(&mut self, actor: &ActorId);
}

/// Plays `clip`, falling back to idle when the renderer does not know it.
pub fn play_or_idle(animator: &mut dyn Animator, actor: &ActorId, clip: &str) -> bool {
    if animator.play(actor, clip) {
        return true;
    }
    warn!("No animation {:?} for {}, falling back to {}", clip, actor, IDLE_CLIP);
    animator.play(actor, IDLE_CLIP);
    false
}

/// Headless animator: tracks which clip each actor plays and for how long.
#[derive(Debug, Default)]
pub struct ClipClock {
    playing: HashMap<ActorId, ClipSample>,
    known: Option<HashSet<String>>,
}

impl ClipClock {
    pub fn new() -> ClipClock {
        ClipClock::default()
    }

    /// Only the named clips (and idle) can be played.
    pub fn with_clips<'a>(clips: impl IntoIterator<Item = &'a str>) -> ClipClock {
        let mut known: HashSet<String> = clips.into_iter().map(str::to_string).collect();
        known.insert(IDLE_CLIP.to_string());
        ClipClock { playing: HashMap::new(), known: Some(known) }
    }
}

impl Animator for ClipClock {
    fn play(&mut self, actor: &ActorId, clip: &str) -> bool {
        if let Some(known) = &self.known {
            if !known.contains(clip) {
                return false;
            }
        }
        self.playing.insert(actor.clone(), ClipSample { clip: clip.to_string(), time: 0.0 });
        true
    }

    fn current(&self, actor: &ActorId) -> Option<ClipSample> {
        self.playing.get(actor).cloned()
    }

    fn advance(&mut self, dt: f32) {
        for sample in self.playing.values_mut() {
            sample.time += dt;
        }
    }

    fn forget(&mut self, actor: &ActorId) {
        self.playing.remove(actor);
    }
}
