use std::collections::HashMap;

use crate::protocol::{ConnectionId, ServerEvent};

/// Server events queued per connection while one client message is handled.
#[derive(Debug, Default)]
pub struct EventWriter {
    pub events: HashMap<ConnectionId, Vec<ServerEvent>>,
}

impl EventWriter {
    pub fn tell(&mut self, connection_id: ConnectionId, event: ServerEvent) {
        if let Some(existing) = self.events.get_mut(&connection_id) {
            existing.push(event);
        } else {
            self.events.insert(connection_id, vec![event]);
        }
    }

    pub fn tell_many(
        &mut self,
        connection_ids: impl IntoIterator<Item = ConnectionId>,
        event: &ServerEvent,
    ) {
        for connection_id in connection_ids {
            self.tell(connection_id, event.clone());
        }
    }

    pub fn take(&mut self, connection_id: ConnectionId) -> Vec<ServerEvent> {
        self.events.remove(&connection_id).unwrap_or_default()
    }
}
