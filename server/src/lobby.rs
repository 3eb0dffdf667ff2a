//! Rooms, their members and the lobby rules around them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, info};
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};
use regex::Regex;
use thiserror::Error;

use crate::event_writer::EventWriter;
use crate::item::ItemLedger;
use crate::protocol::{
    ConnectionId, JoinRequest, MemberInfo, RoomInfo, RoomSettings, RoomStatus, RoomSummary,
    ServerEvent, Visibility,
};

pub const DEFAULT_MAX_PLAYERS: usize = 4;
pub const MAX_PLAYERS_LIMIT: usize = 8;

const CODE_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const CODE_LEN: usize = 6;

static ROOM_CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9a-z]{6}$").unwrap());

/// Lobby failures; the message is what the client sees in `roomError`.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    NotFound,
    #[error("Invalid private room code")]
    InvalidCode,
    #[error("Already in this room")]
    AlreadyJoined,
    #[error("Room is full")]
    Full,
    #[error("Game is already in progress")]
    InProgress,
    #[error("Not all players are ready.")]
    NotAllReady,
    #[error("Only the room creator can start the game.")]
    CreatorOnlyStart,
    #[error("Max players can be at most {}.", MAX_PLAYERS_LIMIT)]
    TooManyPlayers,
    #[error("Only the room creator can change the player count.")]
    CreatorOnlyResize,
    #[error("Kicked by the room creator.")]
    Kicked,
    #[error("Invalid slot.")]
    InvalidSlot,
    #[error("Only the room creator can close slots.")]
    CreatorOnlyClose,
}

impl RoomError {
    pub fn event(&self) -> ServerEvent {
        ServerEvent::RoomError { message: self.to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn generate(rng: &mut impl Rng) -> RoomCode {
        let code = (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect();
        RoomCode(code)
    }

    pub fn parse(code: &str) -> Result<RoomCode, RoomError> {
        if ROOM_CODE.is_match(code) {
            Ok(RoomCode(code.to_string()))
        } else {
            Err(RoomError::InvalidCode)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub id: ConnectionId,
    pub nickname: Option<String>,
    pub character: Option<String>,
    pub ready: bool,
}

impl Member {
    fn info(&self) -> MemberInfo {
        MemberInfo {
            id: self.id,
            nickname: self.nickname.clone(),
            ready: self.ready,
            character: self.character.clone(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Room {
    pub code: RoomCode,
    pub name: Option<String>,
    pub map: Option<String>,
    pub max_players: usize,
    pub visibility: Visibility,
    pub round_time: Option<u32>,
    pub status: RoomStatus,
    /// The first member is the room creator.
    pub players: Vec<Member>,
    pub items: ItemLedger,
}

impl Room {
    pub fn creator(&self) -> Option<ConnectionId> {
        self.players.first().map(|member| member.id)
    }

    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.players.iter().any(|member| member.id == connection_id)
    }

    pub fn all_ready(&self) -> bool {
        !self.players.is_empty() && self.players.iter().all(|member| member.ready)
    }

    pub fn member_ids(&self) -> impl Iterator<Item = ConnectionId> + '_ {
        self.players.iter().map(|member| member.id)
    }

    pub fn players_info(&self) -> Vec<MemberInfo> {
        self.players.iter().map(Member::info).collect()
    }

    pub fn info(&self) -> RoomInfo {
        RoomInfo { id: self.code.to_string(), name: self.name.clone(), map: self.map.clone() }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.code.to_string(),
            name: self.name.clone(),
            players: self.players.len(),
            max_players: self.max_players,
            map: self.map.clone(),
            status: self.status,
        }
    }

    fn require_creator(
        &self,
        connection_id: ConnectionId,
        err: RoomError,
    ) -> Result<(), RoomError> {
        if self.creator() == Some(connection_id) {
            Ok(())
        } else {
            Err(err)
        }
    }
}

fn update_players(room: &Room, writer: &mut EventWriter) {
    let event = ServerEvent::UpdatePlayers {
        players: room.players_info(),
        max_players: room.max_players,
    };
    writer.tell_many(room.member_ids(), &event);
}

pub struct Lobby {
    rooms: BTreeMap<RoomCode, Room>,
    membership: HashMap<ConnectionId, RoomCode>,
    names: HashMap<ConnectionId, String>,
    rng: StdRng,
}

impl Default for Lobby {
    fn default() -> Self {
        Lobby::new()
    }
}

impl Lobby {
    pub fn new() -> Lobby {
        Lobby::with_rng(StdRng::from_entropy())
    }

    pub fn with_rng(rng: StdRng) -> Lobby {
        Lobby { rooms: BTreeMap::new(), membership: HashMap::new(), names: HashMap::new(), rng }
    }

    pub fn with_seed(seed: u64) -> Lobby {
        Lobby::with_rng(StdRng::seed_from_u64(seed))
    }

    pub fn room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    pub fn room_of(&self, connection_id: ConnectionId) -> Option<&Room> {
        self.membership.get(&connection_id).and_then(|code| self.rooms.get(code))
    }

    pub fn room_of_mut(&mut self, connection_id: ConnectionId) -> Option<&mut Room> {
        let code = self.membership.get(&connection_id)?;
        self.rooms.get_mut(code)
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Everyone else in the connection's room.
    pub fn peers(&self, connection_id: ConnectionId) -> Vec<ConnectionId> {
        self.room_of(connection_id)
            .map(|room| room.member_ids().filter(|id| *id != connection_id).collect())
            .unwrap_or_default()
    }

    pub fn connect(&mut self, connection_id: ConnectionId, name: String, writer: &mut EventWriter) {
        self.names.insert(connection_id, name);
        writer.tell(connection_id, ServerEvent::Connected { id: connection_id });
    }

    pub fn disconnect(&mut self, connection_id: ConnectionId, writer: &mut EventWriter) {
        self.names.remove(&connection_id);
        self.leave(connection_id, writer);
    }

    /// Removes the connection from its room; an emptied room is deleted.
    pub fn leave(&mut self, connection_id: ConnectionId, writer: &mut EventWriter) {
        let Some(code) = self.membership.remove(&connection_id) else { return };
        let Some(room) = self.rooms.get_mut(&code) else { return };
        room.players.retain(|member| member.id != connection_id);
        if room.players.is_empty() {
            self.rooms.remove(&code);
            info!("Room {} deleted", code);
        } else {
            update_players(room, writer);
        }
    }

    pub fn public_rooms(&self) -> Vec<RoomSummary> {
        self.rooms
            .values()
            .filter(|room| room.visibility == Visibility::Public)
            .map(Room::summary)
            .collect()
    }

    pub fn create_room(
        &mut self,
        connection_id: ConnectionId,
        settings: RoomSettings,
        writer: &mut EventWriter,
    ) -> RoomCode {
        self.leave(connection_id, writer);

        let code = loop {
            let code = RoomCode::generate(&mut self.rng);
            if !self.rooms.contains_key(&code) {
                break code;
            }
        };
        let nickname = settings.nickname.or_else(|| self.names.get(&connection_id).cloned());
        let room = Room {
            code: code.clone(),
            name: settings.room_name,
            map: settings.map,
            max_players: settings
                .max_players
                .unwrap_or(DEFAULT_MAX_PLAYERS)
                .clamp(1, MAX_PLAYERS_LIMIT),
            visibility: settings.visibility,
            round_time: settings.round_time,
            status: RoomStatus::Waiting,
            players: vec![Member {
                id: connection_id,
                nickname,
                character: settings.character,
                ready: false,
            }],
            items: ItemLedger::new(),
        };
        info!("Room {} created by {}", code, connection_id);

        writer.tell(connection_id, ServerEvent::RoomCreated(room.info()));
        update_players(&room, writer);
        self.membership.insert(connection_id, code.clone());
        self.rooms.insert(code.clone(), room);
        code
    }

    pub fn join_room(
        &mut self,
        connection_id: ConnectionId,
        request: JoinRequest,
        writer: &mut EventWriter,
    ) -> Result<(), RoomError> {
        let code = RoomCode::parse(&request.room_id)?;
        let room = self.rooms.get(&code).ok_or(RoomError::NotFound)?;
        if room.contains(connection_id) {
            return Err(RoomError::AlreadyJoined);
        }
        if room.players.len() >= room.max_players {
            return Err(RoomError::Full);
        }
        if room.status == RoomStatus::Playing {
            return Err(RoomError::InProgress);
        }

        self.leave(connection_id, writer);
        let nickname = request.nickname.or_else(|| self.names.get(&connection_id).cloned());
        let room = self.rooms.get_mut(&code).ok_or(RoomError::NotFound)?;
        room.players.push(Member {
            id: connection_id,
            nickname,
            character: request.character,
            ready: false,
        });
        self.membership.insert(connection_id, code.clone());
        info!("{} joined room {}", connection_id, code);

        writer.tell(connection_id, ServerEvent::RoomJoined(room.info()));
        update_players(room, writer);
        Ok(())
    }

    /// Flips the member's ready flag. The creator hears when everyone is ready.
    pub fn toggle_ready(&mut self, connection_id: ConnectionId, writer: &mut EventWriter) {
        let Some(room) = self.room_of_mut(connection_id) else {
            debug!("{} is not in a room, ignoring ready", connection_id);
            return;
        };
        let Some(member) = room.players.iter_mut().find(|member| member.id == connection_id) else {
            return;
        };
        member.ready = !member.ready;
        update_players(room, writer);

        if room.all_ready() && room.creator() == Some(connection_id) {
            writer.tell(connection_id, ServerEvent::AllPlayersReady);
        }
    }

    pub fn start_game(
        &mut self,
        connection_id: ConnectionId,
        writer: &mut EventWriter,
    ) -> Result<(), RoomError> {
        let Some(room) = self.room_of_mut(connection_id) else { return Ok(()) };
        room.require_creator(connection_id, RoomError::CreatorOnlyStart)?;
        if !room.all_ready() {
            return Err(RoomError::NotAllReady);
        }
        room.status = RoomStatus::Playing;
        info!("Room {} started", room.code);
        let event = ServerEvent::StartGame { players: room.players_info(), map: room.map.clone() };
        writer.tell_many(room.member_ids(), &event);
        Ok(())
    }

    pub fn increase_max_players(
        &mut self,
        connection_id: ConnectionId,
        writer: &mut EventWriter,
    ) -> Result<(), RoomError> {
        let Some(room) = self.room_of_mut(connection_id) else { return Ok(()) };
        room.require_creator(connection_id, RoomError::CreatorOnlyResize)?;
        if room.max_players >= MAX_PLAYERS_LIMIT {
            return Err(RoomError::TooManyPlayers);
        }
        room.max_players += 1;
        update_players(room, writer);
        Ok(())
    }

    /// Closes a slot, kicking whoever occupies it. Capacity never drops
    /// below the member count.
    pub fn close_player_slot(
        &mut self,
        connection_id: ConnectionId,
        slot_index: usize,
        writer: &mut EventWriter,
    ) -> Result<(), RoomError> {
        let Some(code) = self.membership.get(&connection_id).cloned() else { return Ok(()) };
        let Some(room) = self.rooms.get_mut(&code) else { return Ok(()) };
        room.require_creator(connection_id, RoomError::CreatorOnlyClose)?;
        if slot_index >= room.max_players {
            return Err(RoomError::InvalidSlot);
        }

        if slot_index < room.players.len() {
            let kicked = room.players.remove(slot_index);
            self.membership.remove(&kicked.id);
            writer.tell(kicked.id, RoomError::Kicked.event());
            info!("{} kicked from room {}", kicked.id, code);
        }
        room.max_players = room.players.len().max(room.max_players - 1).max(1);

        if room.players.is_empty() {
            self.rooms.remove(&code);
            info!("Room {} deleted", code);
        } else {
            update_players(room, writer);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::id::Id;

    fn id(value: u64) -> ConnectionId {
        Id::new(value)
    }

    fn settings(max_players: usize) -> RoomSettings {
        RoomSettings {
            room_name: Some("den".into()),
            map: Some("arena".into()),
            max_players: Some(max_players),
            nickname: Some("host".into()),
            ..RoomSettings::default()
        }
    }

    fn join(code: &RoomCode) -> JoinRequest {
        JoinRequest { room_id: code.to_string(), nickname: Some("guest".into()), character: None }
    }

    fn lobby_with_room(max_players: usize) -> (Lobby, RoomCode, EventWriter) {
        let mut lobby = Lobby::with_seed(3);
        let mut writer = EventWriter::default();
        let code = lobby.create_room(id(1), settings(max_players), &mut writer);
        (lobby, code, writer)
    }

    #[test]
    fn room_codes_are_six_base36_chars() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(RoomCode::parse(code.as_str()), Ok(code));
        }
    }

    #[rstest]
    #[case("abc12")]
    #[case("ABC123")]
    #[case("abc-12")]
    #[case("abc1234")]
    fn malformed_codes_are_rejected(#[case] code: &str) {
        assert_eq!(RoomCode::parse(code), Err(RoomError::InvalidCode));
    }

    #[test]
    fn creating_a_room_tells_the_creator() {
        let (lobby, code, mut writer) = lobby_with_room(4);
        let events = writer.take(id(1));
        assert!(matches!(&events[0], ServerEvent::RoomCreated(info) if info.id == code.as_str()));
        assert!(matches!(
            &events[1],
            ServerEvent::UpdatePlayers { players, max_players: 4 } if players.len() == 1
        ));
        assert_eq!(lobby.room_of(id(1)).unwrap().creator(), Some(id(1)));
        assert_eq!(lobby.public_rooms().len(), 1);
    }

    #[test]
    fn private_rooms_are_not_listed() {
        let mut lobby = Lobby::with_seed(1);
        let mut writer = EventWriter::default();
        let private = RoomSettings { visibility: Visibility::Private, ..settings(2) };
        lobby.create_room(id(1), private, &mut writer);
        assert!(lobby.public_rooms().is_empty());
    }

    #[test]
    fn joining_validates_the_room() {
        let (mut lobby, code, mut writer) = lobby_with_room(2);
        assert_eq!(lobby.join_room(id(1), join(&code), &mut writer), Err(RoomError::AlreadyJoined));
        let missing = JoinRequest { room_id: "zzzzzz".into(), nickname: None, character: None };
        assert_eq!(lobby.join_room(id(2), missing, &mut writer), Err(RoomError::NotFound));
        assert_eq!(lobby.join_room(id(2), join(&code), &mut writer), Ok(()));
        assert_eq!(lobby.join_room(id(3), join(&code), &mut writer), Err(RoomError::Full));
        assert_eq!(lobby.peers(id(1)), vec![id(2)]);
    }

    #[test]
    fn rooms_in_progress_cannot_be_joined() {
        let (mut lobby, code, mut writer) = lobby_with_room(4);
        lobby.toggle_ready(id(1), &mut writer);
        lobby.start_game(id(1), &mut writer).unwrap();
        assert_eq!(lobby.join_room(id(2), join(&code), &mut writer), Err(RoomError::InProgress));
    }

    #[test]
    fn creator_hears_when_everyone_is_ready() {
        let (mut lobby, code, mut writer) = lobby_with_room(4);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        writer.events.clear();

        lobby.toggle_ready(id(1), &mut writer);
        assert!(!writer.take(id(1)).contains(&ServerEvent::AllPlayersReady));
        lobby.toggle_ready(id(2), &mut writer);
        assert!(!writer.take(id(2)).contains(&ServerEvent::AllPlayersReady));
        assert_eq!(lobby.start_game(id(2), &mut writer), Err(RoomError::CreatorOnlyStart));

        lobby.toggle_ready(id(1), &mut writer);
        lobby.toggle_ready(id(1), &mut writer);
        assert!(writer.take(id(1)).contains(&ServerEvent::AllPlayersReady));
    }

    #[test]
    fn start_needs_everyone_ready() {
        let (mut lobby, code, mut writer) = lobby_with_room(4);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        lobby.toggle_ready(id(1), &mut writer);
        assert_eq!(lobby.start_game(id(1), &mut writer), Err(RoomError::NotAllReady));

        lobby.toggle_ready(id(2), &mut writer);
        writer.events.clear();
        lobby.start_game(id(1), &mut writer).unwrap();
        assert_eq!(lobby.room(&code).unwrap().status, RoomStatus::Playing);
        for member in [id(1), id(2)] {
            assert!(matches!(
                &writer.take(member)[..],
                [ServerEvent::StartGame { players, .. }] if players.len() == 2
            ));
        }
    }

    #[test]
    fn max_players_grows_up_to_the_limit() {
        let (mut lobby, code, mut writer) = lobby_with_room(7);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        assert_eq!(
            lobby.increase_max_players(id(2), &mut writer),
            Err(RoomError::CreatorOnlyResize)
        );
        lobby.increase_max_players(id(1), &mut writer).unwrap();
        assert_eq!(lobby.room(&code).unwrap().max_players, 8);
        let err = lobby.increase_max_players(id(1), &mut writer).unwrap_err();
        assert_eq!(err.to_string(), "Max players can be at most 8.");
    }

    #[test]
    fn closing_a_slot_kicks_its_player() {
        let (mut lobby, code, mut writer) = lobby_with_room(3);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        writer.events.clear();

        assert_eq!(
            lobby.close_player_slot(id(2), 1, &mut writer),
            Err(RoomError::CreatorOnlyClose)
        );
        assert_eq!(lobby.close_player_slot(id(1), 3, &mut writer), Err(RoomError::InvalidSlot));
        lobby.close_player_slot(id(1), 1, &mut writer).unwrap();

        assert_eq!(writer.take(id(2)), vec![RoomError::Kicked.event()]);
        assert!(lobby.room_of(id(2)).is_none());
        let room = lobby.room(&code).unwrap();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.max_players, 2);
    }

    #[test]
    fn closing_an_empty_slot_never_drops_below_the_member_count() {
        let (mut lobby, code, mut writer) = lobby_with_room(2);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        lobby.close_player_slot(id(1), 1, &mut writer).unwrap();
        lobby.join_room(id(3), join(&code), &mut writer).unwrap_err();
        assert_eq!(lobby.room(&code).unwrap().max_players, 1);

        let (mut lobby, code, mut writer) = lobby_with_room(3);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        lobby.close_player_slot(id(1), 2, &mut writer).unwrap();
        lobby.close_player_slot(id(1), 1, &mut writer).unwrap();
        let room = lobby.room(&code).unwrap();
        assert_eq!(room.players.len(), 1);
        assert_eq!(room.max_players, 1);
    }

    #[test]
    fn last_member_leaving_deletes_the_room() {
        let (mut lobby, code, mut writer) = lobby_with_room(4);
        lobby.join_room(id(2), join(&code), &mut writer).unwrap();
        writer.events.clear();

        lobby.disconnect(id(1), &mut writer);
        assert!(matches!(
            &writer.take(id(2))[..],
            [ServerEvent::UpdatePlayers { players, .. }] if players.len() == 1
        ));
        assert_eq!(lobby.room(&code).unwrap().creator(), Some(id(2)));

        lobby.disconnect(id(2), &mut writer);
        assert!(lobby.is_empty());
    }

    #[test]
    fn joining_another_room_leaves_the_first() {
        let (mut lobby, first, mut writer) = lobby_with_room(4);
        lobby.join_room(id(2), join(&first), &mut writer).unwrap();
        let second = lobby.create_room(id(3), settings(4), &mut writer);
        lobby.join_room(id(2), join(&second), &mut writer).unwrap();
        assert_eq!(lobby.room(&first).unwrap().players.len(), 1);
        assert_eq!(lobby.room(&second).unwrap().players.len(), 2);
    }

    #[test]
    fn nickname_falls_back_to_the_connect_name() {
        let mut lobby = Lobby::with_seed(5);
        let mut writer = EventWriter::default();
        lobby.connect(id(1), "ann".into(), &mut writer);
        assert_eq!(writer.take(id(1)), vec![ServerEvent::Connected { id: id(1) }]);
        let code = lobby.create_room(id(1), RoomSettings::default(), &mut writer);
        let room = lobby.room(&code).unwrap();
        assert_eq!(room.players[0].nickname.as_deref(), Some("ann"));
        assert_eq!(room.max_players, DEFAULT_MAX_PLAYERS);
    }
}
