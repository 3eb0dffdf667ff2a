//! Start-up configuration for the relay and the simulation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use glam::Vec3;
use rand::Rng;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    InvalidVar { var: &'static str, value: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed weapon table: {0}")]
    Weapons(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, PartialEq)]
pub struct RelayConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig { host: IpAddr::V4(Ipv4Addr::LOCALHOST), port: 3000 }
    }
}

impl RelayConfig {
    pub fn from_env() -> Result<RelayConfig, ConfigError> {
        RelayConfig::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<RelayConfig, ConfigError> {
        let defaults = RelayConfig::default();
        let host = match lookup("ARENA_HOST") {
            Some(value) => value
                .parse::<IpAddr>()
                .map_err(|_| ConfigError::InvalidVar { var: "ARENA_HOST", value })?,
            None => defaults.host,
        };
        let port = match lookup("ARENA_PORT") {
            Some(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidVar { var: "ARENA_PORT", value })?,
            None => defaults.port,
        };
        Ok(RelayConfig { host, port })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Horizontal rectangle actors respawn in, at height `y`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRegion {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    pub y: f32,
}

impl SpawnRegion {
    pub fn pick(&self, rng: &mut impl Rng) -> Vec3 {
        Vec3::new(
            pick_between(rng, self.min_x, self.max_x),
            self.y,
            pick_between(rng, self.min_z, self.max_z),
        )
    }

    pub fn contains(&self, point: Vec3) -> bool {
        (self.min_x..=self.max_x).contains(&point.x) && (self.min_z..=self.max_z).contains(&point.z)
    }
}

fn pick_between(rng: &mut impl Rng, a: f32, b: f32) -> f32 {
    let (low, high) = if a <= b { (a, b) } else { (b, a) };
    if low == high {
        low
    } else {
        rng.gen_range(low..=high)
    }
}

/// Timings shared by every actor in a simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct SimConfig {
    pub attack_duration: f32,
    pub hit_duration: f32,
    pub respawn_delay: f32,
    pub roll_duration: f32,
    pub roll_cooldown: f32,
    pub roll_speed: f32,
    pub jump_power: f32,
    pub gravity: f32,
    pub spawn_region: SpawnRegion,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            attack_duration: 0.5,
            hit_duration: 0.5,
            respawn_delay: 5.0,
            roll_duration: 0.5,
            roll_cooldown: 1.0,
            roll_speed: 18.0,
            jump_power: 12.0,
            gravity: -30.0,
            spawn_region: SpawnRegion {
                min_x: -20.0,
                max_x: 20.0,
                min_z: -20.0,
                max_z: 20.0,
                y: 0.0,
            },
        }
    }
}
