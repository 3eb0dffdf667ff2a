//! What the relay task does with each client message.
//!
//! Game traffic is not simulated here: the relay checks who a message claims
//! to come from, stamps the sender and forwards it to the rest of the room.

use log::{debug, info};

use crate::event_writer::EventWriter;
use crate::lobby::Lobby;
use crate::protocol::{
    ClientMessage, ConnectionId, GameUpdate, ItemAction, ItemPickupData, ServerEvent, SlotRequest,
    UpdateKind,
};

pub fn on_connect(
    connection_id: ConnectionId,
    name: String,
    writer: &mut EventWriter,
    lobby: &mut Lobby,
) {
    info!("{} connected as {:?}", connection_id, name);
    lobby.connect(connection_id, name, writer);
}

pub fn on_disconnect(connection_id: ConnectionId, writer: &mut EventWriter, lobby: &mut Lobby) {
    info!("{} disconnected", connection_id);
    lobby.disconnect(connection_id, writer);
}

pub fn on_message(
    connection_id: ConnectionId,
    message: ClientMessage,
    writer: &mut EventWriter,
    lobby: &mut Lobby,
) {
    use ClientMessage::*;

    let result = match message {
        GetPublicRooms => {
            writer.tell(connection_id, ServerEvent::PublicRoomsList(lobby.public_rooms()));
            Ok(())
        }
        CreateRoom(settings) => {
            lobby.create_room(connection_id, settings, writer);
            Ok(())
        }
        JoinRoom(request) => lobby.join_room(connection_id, request, writer),
        Ready => {
            lobby.toggle_ready(connection_id, writer);
            Ok(())
        }
        StartGameRequest => lobby.start_game(connection_id, writer),
        IncreaseMaxPlayers => lobby.increase_max_players(connection_id, writer),
        ClosePlayerSlot(SlotRequest { slot_index }) => {
            lobby.close_player_slot(connection_id, slot_index, writer)
        }
        ClientMessage::GameUpdate(update) => {
            relay_update(connection_id, update, writer, lobby);
            Ok(())
        }
    };

    if let Err(err) = result {
        debug!("Room error for {}: {}", connection_id, err);
        writer.tell(connection_id, err.event());
    }
}

/// Whether `sender` may originate this update.
pub fn authorize(update: &GameUpdate, sender: &str) -> bool {
    match update.kind {
        UpdateKind::Effect => true,
        UpdateKind::ItemPickup => {
            update.claimed_sender() == Some(sender)
                || update.data.get("type").and_then(|kind| kind.as_str()) == Some("spawn")
        }
        _ => update.claimed_sender() == Some(sender),
    }
}

fn relay_update(
    connection_id: ConnectionId,
    mut update: GameUpdate,
    writer: &mut EventWriter,
    lobby: &mut Lobby,
) {
    let sender = connection_id.to_string();
    if !authorize(&update, &sender) {
        debug!("Dropping {:?} from {}: sender mismatch", update.kind, connection_id);
        return;
    }
    let Some(room) = lobby.room_of_mut(connection_id) else {
        debug!("Dropping {:?} from {}: not in a room", update.kind, connection_id);
        return;
    };

    if update.kind == UpdateKind::ItemPickup {
        match serde_json::from_value::<ItemPickupData>(update.data.clone()) {
            Ok(event) => {
                if room.items.record(&event) && event.action == ItemAction::Spawn {
                    debug!("Room {} spawned item {}", room.code, event.item_id);
                }
            }
            Err(err) => debug!("Unreadable itemPickup from {}: {}", connection_id, err),
        }
    }

    update.sender_id = Some(sender);
    let peers: Vec<ConnectionId> = room.member_ids().filter(|id| *id != connection_id).collect();
    writer.tell_many(peers, &ServerEvent::GameUpdate(update));
}
