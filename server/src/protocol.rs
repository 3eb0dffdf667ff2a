//! JSON wire format shared by the relay and simulation clients.
//!
//! Every websocket text frame is one `{"event": ..., "payload": ...}` object.
//! Game traffic travels inside `gameUpdate` as `{"type", "data", "seq"?,
//! "senderId"?}`; the relay forwards `data` untouched.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::id::Id;
use crate::weapon::WeaponCategory;

/// Marker for relay connection ids.
#[derive(Debug)]
pub enum Connection {}

pub type ConnectionId = Id<Connection>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    GetPublicRooms,
    CreateRoom(RoomSettings),
    JoinRoom(JoinRequest),
    Ready,
    StartGameRequest,
    IncreaseMaxPlayers,
    ClosePlayerSlot(SlotRequest),
    GameUpdate(GameUpdate),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    #[default]
    Waiting,
    Playing,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomSettings {
    pub room_name: Option<String>,
    pub map: Option<String>,
    pub max_players: Option<usize>,
    pub visibility: Visibility,
    pub round_time: Option<u32>,
    pub nickname: Option<String>,
    pub character: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    pub room_id: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRequest {
    pub slot_index: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerEvent {
    Connected { id: ConnectionId },
    PublicRoomsList(Vec<RoomSummary>),
    RoomCreated(RoomInfo),
    RoomJoined(RoomInfo),
    #[serde(rename_all = "camelCase")]
    UpdatePlayers { players: Vec<MemberInfo>, max_players: usize },
    AllPlayersReady,
    StartGame { players: Vec<MemberInfo>, map: Option<String> },
    RoomError { message: String },
    GameUpdate(GameUpdate),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: Option<String>,
    pub players: usize,
    pub max_players: usize,
    pub map: Option<String>,
    pub status: RoomStatus,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: String,
    pub name: Option<String>,
    pub map: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: ConnectionId,
    pub nickname: Option<String>,
    pub ready: bool,
    pub character: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UpdateKind {
    PlayerState,
    WeaponAttack,
    Projectile,
    Damage,
    ItemPickup,
    Effect,
}

/// One game message. `data` is kept raw so the relay can forward fields it
/// does not know about.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(rename = "type")]
    pub kind: UpdateKind,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<String>,
}

impl GameUpdate {
    pub fn encode(body: &UpdateBody, seq: Option<u64>) -> Result<GameUpdate, serde_json::Error> {
        let data = match body {
            UpdateBody::PlayerState(data) => serde_json::to_value(data)?,
            UpdateBody::WeaponAttack(data) => serde_json::to_value(data)?,
            UpdateBody::Projectile(data) => serde_json::to_value(data)?,
            UpdateBody::Damage(data) => serde_json::to_value(data)?,
            UpdateBody::ItemPickup(data) => serde_json::to_value(data)?,
            UpdateBody::Effect(data) => serde_json::to_value(data)?,
        };
        Ok(GameUpdate { kind: body.kind(), data, seq, sender_id: None })
    }

    pub fn decode(&self) -> Result<UpdateBody, serde_json::Error> {
        let data = self.data.clone();
        Ok(match self.kind {
            UpdateKind::PlayerState => UpdateBody::PlayerState(serde_json::from_value(data)?),
            UpdateKind::WeaponAttack => UpdateBody::WeaponAttack(serde_json::from_value(data)?),
            UpdateKind::Projectile => UpdateBody::Projectile(serde_json::from_value(data)?),
            UpdateKind::Damage => UpdateBody::Damage(serde_json::from_value(data)?),
            UpdateKind::ItemPickup => UpdateBody::ItemPickup(serde_json::from_value(data)?),
            UpdateKind::Effect => UpdateBody::Effect(serde_json::from_value(data)?),
        })
    }

    fn data_str(&self, field: &str) -> Option<&str> {
        self.data.get(field).and_then(Value::as_str)
    }

    /// The actor id the payload claims to originate from, per message type.
    pub fn claimed_sender(&self) -> Option<&str> {
        match self.kind {
            UpdateKind::PlayerState => self.data_str("id"),
            UpdateKind::WeaponAttack | UpdateKind::Projectile | UpdateKind::ItemPickup => {
                self.data_str("playerId")
            }
            UpdateKind::Damage => self.data_str("attackerId"),
            UpdateKind::Effect => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum UpdateBody {
    PlayerState(PlayerStateData),
    WeaponAttack(WeaponAttackData),
    Projectile(ProjectileData),
    Damage(DamageData),
    ItemPickup(ItemPickupData),
    Effect(EffectData),
}

impl UpdateBody {
    pub fn kind(&self) -> UpdateKind {
        match self {
            UpdateBody::PlayerState(_) => UpdateKind::PlayerState,
            UpdateBody::WeaponAttack(_) => UpdateKind::WeaponAttack,
            UpdateBody::Projectile(_) => UpdateKind::Projectile,
            UpdateBody::Damage(_) => UpdateKind::Damage,
            UpdateBody::ItemPickup(_) => UpdateKind::ItemPickup,
            UpdateBody::Effect(_) => UpdateKind::Effect,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponDescriptor {
    #[serde(rename = "type")]
    pub category: WeaponCategory,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStateData {
    pub id: String,
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub animation: String,
    pub hp: u32,
    #[serde(default)]
    pub is_dead: bool,
    #[serde(default)]
    pub is_attacking: bool,
    #[serde(default)]
    pub is_rolling: bool,
    #[serde(default)]
    pub is_jumping: bool,
    #[serde(default)]
    pub is_hit: bool,
    #[serde(default)]
    pub weapon: Option<WeaponDescriptor>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponAttackData {
    pub player_id: String,
    #[serde(default)]
    pub weapon_type: Option<String>,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub attack_type: WeaponCategory,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileWeaponData {
    pub damage: u32,
    pub attack_radius: f32,
    #[serde(default)]
    pub projectile_speed: Option<f32>,
    #[serde(default)]
    pub hits_many: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileData {
    pub player_id: String,
    pub projectile_id: String,
    pub position: [f32; 3],
    pub direction: [f32; 3],
    pub weapon_data: ProjectileWeaponData,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageData {
    pub target_id: String,
    pub amount: u32,
    pub attacker_id: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemAction {
    Spawn,
    Pickup,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPickupData {
    #[serde(rename = "type")]
    pub action: ItemAction,
    pub item_id: String,
    #[serde(default)]
    pub item_name: Option<String>,
    #[serde(default)]
    pub position: Option<[f32; 3]>,
    #[serde(default)]
    pub player_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EffectData {
    #[serde(rename = "type")]
    pub kind: String,
    pub position: [f32; 3],
    #[serde(default)]
    pub data: Value,
}
