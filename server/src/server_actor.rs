use std::collections::HashMap;

use log::{debug, warn};
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::{
    event_writer::EventWriter,
    lobby::Lobby,
    protocol::{ClientMessage, ConnectionId, ServerEvent},
    relay,
};

#[derive(Debug)]
pub enum Message {
    Connected {
        connection_id: ConnectionId,
        name: String,
        connection: mpsc::Sender<ServerEvent>,
    },
    Disconnected {
        connection_id: ConnectionId,
    },
    Client {
        connection_id: ConnectionId,
        message: ClientMessage,
    },
}

/// The relay task. Owns all lobby state; every connection talks to it over `messages`.
pub async fn run(mut messages: mpsc::Receiver<Message>, mut lobby: Lobby) {
    use Message::*;

    let mut connections: HashMap<ConnectionId, mpsc::Sender<ServerEvent>> = HashMap::new();
    let mut event_writer = EventWriter::default();

    debug!("Relay loop starting");
    while let Some(message) = messages.recv().await {
        match message {
            Connected { connection_id, name, connection } => {
                connections.insert(connection_id, connection);
                relay::on_connect(connection_id, name, &mut event_writer, &mut lobby);
            }
            Disconnected { connection_id } => {
                connections.remove(&connection_id);
                relay::on_disconnect(connection_id, &mut event_writer, &mut lobby);
            }
            Client { connection_id, message } => {
                relay::on_message(connection_id, message, &mut event_writer, &mut lobby);
            }
        }
        send_events(&connections, &mut event_writer);
    }
    debug!("Relay loop stopped");
}

/// Hands queued events to each connection's writer without waiting on it. A
/// connection whose queue is full loses the events that do not fit.
fn send_events(
    connections: &HashMap<ConnectionId, mpsc::Sender<ServerEvent>>,
    event_writer: &mut EventWriter,
) {
    for (connection_id, events) in event_writer.events.drain() {
        let Some(connection) = connections.get(&connection_id) else { continue };
        for event in events {
            match connection.try_send(event) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!("Connection {} is not keeping up, dropping its events", connection_id);
                    break;
                }
                Err(TrySendError::Closed(_)) => {
                    warn!("Connection {} is gone, dropping its events", connection_id);
                    break;
                }
            }
        }
    }
}
