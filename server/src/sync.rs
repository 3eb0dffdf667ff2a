//! Client side of the relay protocol: outbound cadence, sequence numbers and
//! the inbound queue drained at the start of every tick.

use std::collections::{BTreeSet, HashMap, VecDeque};

use log::{debug, warn};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::actor::{Actor, ActorId, Damageable};
use crate::protocol::{
    ClientMessage, GameUpdate, PlayerStateData, UpdateBody, UpdateKind, WeaponDescriptor,
};
use crate::tick::{Interval, SYNC_INTERVAL};

/// How many event sequence numbers are remembered per sender.
const SEEN_WINDOW: usize = 1024;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("malformed {kind:?} payload: {source}")]
    Malformed {
        kind: UpdateKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot encode {kind:?}: {source}")]
    Encode {
        kind: UpdateKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("transport closed")]
    Closed,
    #[error("transport is full, update dropped")]
    Full,
}

pub trait Transport {
    fn send(&mut self, update: GameUpdate) -> Result<(), SyncError>;
}

/// Keeps every sent update; used headless and in tests.
#[derive(Debug, Default)]
pub struct Outbox {
    pub sent: Vec<GameUpdate>,
}

impl Transport for Outbox {
    fn send(&mut self, update: GameUpdate) -> Result<(), SyncError> {
        self.sent.push(update);
        Ok(())
    }
}

/// Feeds a websocket writer task.
impl Transport for mpsc::Sender<ClientMessage> {
    fn send(&mut self, update: GameUpdate) -> Result<(), SyncError> {
        self.try_send(ClientMessage::GameUpdate(update)).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => SyncError::Full,
            mpsc::error::TrySendError::Closed(_) => SyncError::Closed,
        })
    }
}

/// A decoded inbound update that survived ordering checks.
#[derive(Clone, Debug, PartialEq)]
pub struct Inbound {
    pub sender: ActorId,
    pub seq: Option<u64>,
    pub body: UpdateBody,
}

/// Snapshot of a local actor as sent in `playerState`.
pub fn player_state_of(actor: &Actor, animation: &str) -> PlayerStateData {
    let flags = actor.flags();
    PlayerStateData {
        id: actor.id().to_string(),
        position: actor.position.to_array(),
        rotation: [0.0, actor.yaw(), 0.0],
        animation: animation.to_string(),
        hp: actor.health(),
        is_dead: flags.dead,
        is_attacking: flags.attacking,
        is_rolling: flags.rolling,
        is_jumping: flags.jumping,
        is_hit: flags.hit,
        weapon: Some(WeaponDescriptor {
            category: actor.weapon().category,
            name: actor.weapon().name.clone(),
        }),
    }
}

pub struct NetworkSync<T: Transport> {
    local_id: ActorId,
    transport: T,
    next_seq: u64,
    interval: Interval,
    inbound: VecDeque<GameUpdate>,
    last_state_seq: HashMap<ActorId, u64>,
    seen_events: HashMap<ActorId, BTreeSet<u64>>,
    enabled: bool,
}

impl<T: Transport> NetworkSync<T> {
    pub fn new(local_id: ActorId, transport: T) -> NetworkSync<T> {
        NetworkSync {
            local_id,
            transport,
            next_seq: 0,
            interval: Interval::new(SYNC_INTERVAL),
            inbound: VecDeque::new(),
            last_state_seq: HashMap::new(),
            seen_events: HashMap::new(),
            enabled: true,
        }
    }

    pub fn local_id(&self) -> &ActorId {
        &self.local_id
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Queues an update; nothing is applied until the next `drain`.
    pub fn receive(&mut self, update: GameUpdate) {
        self.inbound.push_back(update);
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    /// Decodes queued updates in arrival order, dropping malformed, stale and
    /// duplicate ones.
    pub fn drain(&mut self) -> Vec<Inbound> {
        let mut accepted = Vec::with_capacity(self.inbound.len());
        while let Some(update) = self.inbound.pop_front() {
            match self.accept(update) {
                Ok(Some(inbound)) => accepted.push(inbound),
                Ok(None) => {}
                Err(err) => warn!("Dropping inbound update: {}", err),
            }
        }
        accepted
    }

    fn accept(&mut self, update: GameUpdate) -> Result<Option<Inbound>, SyncError> {
        let body = update
            .decode()
            .map_err(|source| SyncError::Malformed { kind: update.kind, source })?;
        let sender = update
            .sender_id
            .as_deref()
            .or_else(|| update.claimed_sender())
            .map(ActorId::new)
            .unwrap_or_else(|| ActorId::new(""));

        if let Some(seq) = update.seq {
            if update.kind == UpdateKind::PlayerState {
                if let Some(&last) = self.last_state_seq.get(&sender) {
                    if seq <= last {
                        debug!("Stale playerState {} from {} (last {})", seq, sender, last);
                        return Ok(None);
                    }
                }
                self.last_state_seq.insert(sender.clone(), seq);
            } else {
                let seen = self.seen_events.entry(sender.clone()).or_default();
                let below_window = seen.len() >= SEEN_WINDOW
                    && seen.first().map_or(false, |&oldest| seq < oldest);
                if below_window || !seen.insert(seq) {
                    debug!("Duplicate {:?} {} from {}", update.kind, seq, sender);
                    return Ok(None);
                }
                if seen.len() > SEEN_WINDOW {
                    seen.pop_first();
                }
            }
        }
        Ok(Some(Inbound { sender, seq: update.seq, body }))
    }

    fn stamp(&mut self, body: &UpdateBody) -> Result<GameUpdate, SyncError> {
        self.next_seq += 1;
        GameUpdate::encode(body, Some(self.next_seq))
            .map_err(|source| SyncError::Encode { kind: body.kind(), source })
    }

    /// Sends an event message right away.
    pub fn send_event(&mut self, body: UpdateBody) -> Result<(), SyncError> {
        if !self.enabled {
            return Ok(());
        }
        let update = self.stamp(&body)?;
        self.transport.send(update)
    }

    /// Sends `playerState` when the sync interval has elapsed. Returns whether it did.
    pub fn tick_outbound(
        &mut self,
        dt: f32,
        state: impl FnOnce() -> Option<PlayerStateData>,
    ) -> Result<bool, SyncError> {
        if !self.interval.advance(dt) || !self.enabled {
            return Ok(false);
        }
        let Some(state) = state() else { return Ok(false) };
        let update = self.stamp(&UpdateBody::PlayerState(state))?;
        self.transport.send(update)?;
        Ok(true)
    }
}
