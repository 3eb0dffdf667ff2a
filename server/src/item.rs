use std::collections::BTreeMap;

use log::debug;

use crate::protocol::{ItemAction, ItemPickupData};

#[derive(Clone, Debug, PartialEq)]
pub struct GroundItem {
    pub name: Option<String>,
    pub position: Option<[f32; 3]>,
    pub available: bool,
    pub owner: Option<String>,
}

/// Items spawned into a match and who picked them up.
#[derive(Clone, Debug, Default)]
pub struct ItemLedger {
    items: BTreeMap<String, GroundItem>,
}

impl ItemLedger {
    pub fn new() -> ItemLedger {
        ItemLedger::default()
    }

    /// Records a spawn or pickup. Returns false for a pickup of an item that
    /// is unknown or already taken.
    pub fn record(&mut self, event: &ItemPickupData) -> bool {
        match event.action {
            ItemAction::Spawn => {
                self.items.insert(
                    event.item_id.clone(),
                    GroundItem {
                        name: event.item_name.clone(),
                        position: event.position,
                        available: true,
                        owner: None,
                    },
                );
                true
            }
            ItemAction::Pickup => match self.items.get_mut(&event.item_id) {
                Some(item) if item.available => {
                    item.available = false;
                    item.owner = event.player_id.clone();
                    true
                }
                _ => {
                    debug!("Pickup of unavailable item {}", event.item_id);
                    false
                }
            },
        }
    }

    pub fn get(&self, item_id: &str) -> Option<&GroundItem> {
        self.items.get(item_id)
    }

    pub fn available(&self) -> impl Iterator<Item = (&String, &GroundItem)> {
        self.items.iter().filter(|(_, item)| item.available)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
