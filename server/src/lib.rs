pub mod actor;
pub mod animation;
pub mod attack;
pub mod combat;
pub mod config;
pub mod event_writer;
pub mod hit_volume;
pub mod id;
pub mod item;
pub mod lobby;
pub mod protocol;
pub mod relay;
pub mod server_actor;
pub mod server_websocket;
pub mod sync;
pub mod tick;
pub mod weapon;
pub mod world;
