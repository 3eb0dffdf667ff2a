use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use log::{debug, warn};
use serde::Deserialize;
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::{
    id::Id,
    protocol::{ClientMessage, ServerEvent},
    server_actor,
};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Deserialize, Debug, Default)]
pub struct ConnectQuery {
    #[serde(default)]
    name: String,
}

pub async fn handle_connection(
    ws: WebSocket,
    connect_query: ConnectQuery,
    actor_sender: mpsc::Sender<server_actor::Message>,
) {
    let connection_id = Id::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::SeqCst));
    debug!("New connection {}", connection_id);
    let (mut sink, mut stream) = ws.split();

    let (event_sender, mut event_receiver) = mpsc::channel::<ServerEvent>(64);
    tokio::spawn(async move {
        while let Some(event) = event_receiver.recv().await {
            let json = match serde_json::to_string(&event) {
                Ok(json) => json,
                Err(err) => {
                    warn!("Cannot encode event for {}: {}", connection_id, err);
                    continue;
                }
            };
            if let Err(err) = sink.send(Message::text(json)).await {
                debug!("Send to {} failed: {}", connection_id, err);
                break;
            }
        }
        if let Err(err) = sink.close().await {
            debug!("Closing {} failed: {}", connection_id, err);
        }
        debug!("Sender {} closed", connection_id);
    });

    let connected = server_actor::Message::Connected {
        connection_id,
        name: connect_query.name,
        connection: event_sender,
    };
    if actor_sender.send(connected).await.is_err() {
        warn!("Relay loop is gone, dropping connection {}", connection_id);
        return;
    }

    while let Some(Ok(message)) = stream.next().await {
        if message.is_close() {
            break;
        }
        let Ok(text) = message.to_str() else { continue };
        let message = match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => message,
            Err(err) => {
                warn!("Malformed message from {}: {}", connection_id, err);
                continue;
            }
        };
        let message = server_actor::Message::Client { connection_id, message };
        if actor_sender.send(message).await.is_err() {
            break;
        }
    }
    if actor_sender.send(server_actor::Message::Disconnected { connection_id }).await.is_err() {
        debug!("Relay loop is gone");
    }
    debug!("Receiver {} closed", connection_id);
}
