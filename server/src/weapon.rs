//! Weapon profiles and the per-animation damage-window table.
//!
//! Profiles are read-only inputs to actor stats. The table is keyed by the
//! item name of its model (`Sword.fbx`, ...), loaded
//! from YAML or taken from the built-in list.

use std::collections::HashMap;
use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use log::{info, warn};
use once_cell::sync::Lazy;
use rand::{seq::IteratorRandom, Rng};
use serde::{Deserialize, Serialize};

use crate::{config::ConfigError, tick::ASSUMED_FRAMERATE};

pub const BARE_HANDS: &str = "Bare hands";
pub const NPC_STRIKE: &str = "Claws";
/// Seconds between NPC attacks.
pub const NPC_COOLDOWN: f32 = 2.0;
/// Base seconds between attacks before the speed multiplier applies.
pub const COOLDOWN_BASE: f32 = 0.5;
pub const DEFAULT_PROJECTILE_SPEED: f32 = 20.0;
pub const PROJECTILE_RADIUS: f32 = 0.5;

pub const MELEE_ANIMATION: &str = "SwordSlash";
pub const RANGED_ANIMATION: &str = "Shoot_OneHanded";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeaponCategory {
    Melee,
    Ranged,
    Buff,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackType {
    Single,
    Aoe,
    SmallAoe,
    Ranged,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stat {
    Strength,
    Agility,
    Stamina,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatEffect {
    pub stat: Stat,
    pub amount: i32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponProfile {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub category: WeaponCategory,
    pub radius: f32,
    pub angle: f32,
    pub damage: u32,
    pub attack_speed_multiplier: f32,
    pub attack_type: AttackType,
    #[serde(default)]
    pub special_effect: Option<String>,
    #[serde(default)]
    pub projectile_speed: Option<f32>,
    /// Seconds spent in `Recovering` after the swing ends.
    #[serde(default)]
    pub recovery: f32,
    #[serde(default)]
    pub stat_effect: Option<StatEffect>,
}

impl WeaponProfile {
    pub fn bare_hands() -> WeaponProfile {
        WeaponProfile {
            name: BARE_HANDS.to_string(),
            category: WeaponCategory::Melee,
            radius: 1.5,
            angle: PI / 2.0,
            damage: 10,
            attack_speed_multiplier: 1.0,
            attack_type: AttackType::Single,
            special_effect: None,
            projectile_speed: None,
            recovery: 0.0,
            stat_effect: None,
        }
    }

    /// The unarmed strike every NPC swings with.
    pub fn npc_strike() -> WeaponProfile {
        WeaponProfile {
            name: NPC_STRIKE.to_string(),
            angle: 2.0 * PI / 3.0,
            radius: 2.0,
            damage: 15,
            attack_speed_multiplier: COOLDOWN_BASE / NPC_COOLDOWN,
            ..WeaponProfile::bare_hands()
        }
    }

    /// Whether this profile can be the damage source of an attack.
    pub fn is_weapon(&self) -> bool {
        self.category != WeaponCategory::Buff
            && self.attack_type != AttackType::None
            && self.damage > 0
    }

    pub fn hits_many(&self) -> bool {
        matches!(self.attack_type, AttackType::Aoe | AttackType::SmallAoe)
    }

    pub fn half_angle(&self) -> f32 {
        self.angle / 2.0
    }

    pub fn cooldown(&self) -> f32 {
        if self.attack_speed_multiplier > 0.0 {
            COOLDOWN_BASE / self.attack_speed_multiplier
        } else {
            COOLDOWN_BASE
        }
    }

    pub fn projectile_speed(&self) -> f32 {
        self.projectile_speed.unwrap_or(DEFAULT_PROJECTILE_SPEED)
    }

    pub fn attack_animation(&self) -> Option<&'static str> {
        match self.category {
            WeaponCategory::Melee => Some(MELEE_ANIMATION),
            WeaponCategory::Ranged => Some(RANGED_ANIMATION),
            WeaponCategory::Buff => None,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct WeaponTable {
    profiles: HashMap<String, WeaponProfile>,
}

impl WeaponTable {
    pub fn from_yaml_str(yaml: &str) -> Result<WeaponTable, ConfigError> {
        let raw: HashMap<String, WeaponProfile> = serde_yaml::from_str(yaml)?;
        Ok(WeaponTable::from_profiles(raw))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<WeaponTable, ConfigError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let table = WeaponTable::from_yaml_str(&yaml)?;
        info!("Loaded {} weapon profiles from {}", table.profiles.len(), path.display());
        Ok(table)
    }

    /// Falls back to the built-in table when the file is missing or broken.
    pub fn load_or_builtin(path: impl AsRef<Path>) -> WeaponTable {
        WeaponTable::load(path).unwrap_or_else(|err| {
            warn!("Weapon table unavailable ({}), using built-in profiles", err);
            BUILTIN_WEAPONS.clone()
        })
    }

    pub fn builtin() -> WeaponTable {
        BUILTIN_WEAPONS.clone()
    }

    fn from_profiles(profiles: HashMap<String, WeaponProfile>) -> WeaponTable {
        let profiles = profiles
            .into_iter()
            .map(|(name, mut profile)| {
                profile.name = name.clone();
                (name, profile)
            })
            .collect();
        WeaponTable { profiles }
    }

    pub fn get(&self, name: &str) -> Option<&WeaponProfile> {
        self.profiles.get(name)
    }

    pub fn resolve(&self, name: Option<&str>) -> WeaponProfile {
        match name {
            None => WeaponProfile::bare_hands(),
            Some(name) => self.get(name).cloned().unwrap_or_else(|| {
                warn!("Unknown weapon {:?}, falling back to bare hands", name);
                WeaponProfile::bare_hands()
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// A random equippable weapon name; consumables are never picked.
    pub fn random_weapon_name(&self, rng: &mut impl Rng) -> Option<&str> {
        self.profiles
            .values()
            .filter(|profile| profile.category != WeaponCategory::Buff)
            .map(|profile| profile.name.as_str())
            .choose(rng)
    }
}

fn builtin_entry(
    category: WeaponCategory,
    radius: f32,
    angle: f32,
    damage: u32,
    attack_speed_multiplier: f32,
    attack_type: AttackType,
    special_effect: Option<&str>,
) -> WeaponProfile {
    WeaponProfile {
        name: String::new(),
        category,
        radius,
        angle,
        damage,
        attack_speed_multiplier,
        attack_type,
        special_effect: special_effect.map(str::to_string),
        projectile_speed: None,
        recovery: 0.0,
        stat_effect: None,
    }
}

static BUILTIN_WEAPONS: Lazy<WeaponTable> = Lazy::new(|| {
    use AttackType::{Aoe, Single, SmallAoe};
    use WeaponCategory::{Buff, Melee};

    let ranged = |radius: f32, angle: f32, damage: u32| {
        builtin_entry(WeaponCategory::Ranged, radius, angle, damage, 1.0, AttackType::Ranged, None)
    };

    let profiles = HashMap::from([
        ("Sword.fbx", builtin_entry(Melee, 2.0, PI / 3.0, 20, 1.0, Single, None)),
        ("Axe_Double.fbx", builtin_entry(Melee, 2.2, PI / 2.5, 30, 0.8, Aoe, Some("knockback"))),
        ("Bow_Wooden.fbx", ranged(15.0, PI / 18.0, 10)),
        (
            "Dagger.fbx",
            builtin_entry(Melee, 1.5, PI / 2.0, 15, 1.5, Single, Some("critical_bleed")),
        ),
        ("Hammer_Double.fbx", builtin_entry(Melee, 2.5, PI / 2.2, 40, 0.5, SmallAoe, Some("stun"))),
        ("AssaultRifle_1.fbx", ranged(20.0, PI / 36.0, 10)),
        ("Pistol_1.fbx", ranged(10.0, PI / 12.0, 10)),
        ("Shotgun_1.fbx", ranged(8.0, PI / 6.0, 10)),
        ("SniperRifle_1.fbx", ranged(30.0, PI / 90.0, 10)),
        ("SubmachineGun_1.fbx", ranged(12.0, PI / 18.0, 10)),
        ("Axe_Double_Golden.fbx", builtin_entry(Melee, 2.4, PI / 2.4, 25, 1.0, Single, None)),
        ("Axe_small_Golden.fbx", builtin_entry(Melee, 1.8, PI / 2.1, 25, 1.0, Single, None)),
        ("Bow_Golden.fbx", ranged(18.0, PI / 20.0, 25)),
        ("Dagger_Golden.fbx", builtin_entry(Melee, 1.7, PI / 1.9, 25, 1.0, Single, None)),
        ("Hammer_Double_Golden.fbx", builtin_entry(Melee, 2.7, PI / 2.1, 25, 1.0, Single, None)),
        ("Sword_big_Golden.fbx", builtin_entry(Melee, 2.8, PI / 3.2, 25, 1.0, Single, None)),
        ("Sword_big.fbx", builtin_entry(Melee, 2.6, PI / 3.1, 20, 0.9, Single, None)),
        ("Sword_Golden.fbx", builtin_entry(Melee, 2.1, PI / 2.9, 25, 1.0, Single, None)),
        ("Potion1_Filled.fbx", WeaponProfile {
            stat_effect: Some(StatEffect { stat: Stat::Strength, amount: 1 }),
            ..builtin_entry(Buff, 0.5, 0.0, 0, 0.0, AttackType::None, None)
        }),
    ]);

    WeaponTable::from_profiles(
        profiles.into_iter().map(|(name, profile)| (name.to_string(), profile)).collect(),
    )
});

/// Inclusive frame range during which an attack clip may register a hit.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageWindow {
    pub start_frame: u32,
    pub end_frame: u32,
}

impl DamageWindow {
    pub fn frame_at(animation_time: f32) -> u32 {
        (animation_time.max(0.0) * ASSUMED_FRAMERATE).floor() as u32
    }

    pub fn contains_time(&self, animation_time: f32) -> bool {
        let frame = DamageWindow::frame_at(animation_time);
        (self.start_frame..=self.end_frame).contains(&frame)
    }

    /// Clip time at which the last window frame ends.
    pub fn closes_at(&self) -> f32 {
        (self.end_frame + 1) as f32 / ASSUMED_FRAMERATE
    }
}

static GROUND_WINDOWS: Lazy<HashMap<&'static str, DamageWindow>> = Lazy::new(|| {
    HashMap::from([
        (MELEE_ANIMATION, DamageWindow { start_frame: 11, end_frame: 12 }),
        (RANGED_ANIMATION, DamageWindow { start_frame: 5, end_frame: 6 }),
    ])
});

static AERIAL_WINDOW: DamageWindow = DamageWindow { start_frame: 10, end_frame: 12 };

pub fn damage_window(animation: &str, aerial: bool) -> Option<DamageWindow> {
    if aerial {
        GROUND_WINDOWS.get(animation).map(|_| AERIAL_WINDOW)
    } else {
        GROUND_WINDOWS.get(animation).copied()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use rstest::rstest;

    use super::*;

    #[test]
    fn builtin_table_names_its_profiles() {
        let table = WeaponTable::builtin();
        let sword = table.get("Sword.fbx").unwrap();
        assert_eq!(sword.name, "Sword.fbx");
        assert_eq!(sword.damage, 20);
        assert_relative_eq!(sword.half_angle(), PI / 6.0);
        assert!(!table.get("Potion1_Filled.fbx").unwrap().is_weapon());
    }

    #[test]
    fn cooldown_scales_with_attack_speed() {
        let table = WeaponTable::builtin();
        assert_relative_eq!(table.get("Dagger.fbx").unwrap().cooldown(), 0.5 / 1.5);
        assert_relative_eq!(table.get("Hammer_Double.fbx").unwrap().cooldown(), 1.0);
        assert_relative_eq!(WeaponProfile::bare_hands().cooldown(), 0.5);
    }

    #[test]
    fn npc_strike_is_slow_and_wide() {
        let strike = WeaponProfile::npc_strike();
        assert_relative_eq!(strike.cooldown(), NPC_COOLDOWN);
        assert_relative_eq!(strike.half_angle(), PI / 3.0);
        assert!(strike.is_weapon());
    }

    #[test]
    fn unknown_weapon_resolves_to_bare_hands() {
        let table = WeaponTable::builtin();
        assert_eq!(table.resolve(Some("Laser.fbx")), WeaponProfile::bare_hands());
        assert_eq!(table.resolve(None).name, BARE_HANDS);
    }

    #[test]
    fn yaml_table_parses() {
        let yaml = r#"
Club.fbx:
  type: melee
  radius: 1.2
  angle: 1.5
  damage: 12
  attackSpeedMultiplier: 1.25
  attackType: small_aoe
  specialEffect: stun
Elixir.fbx:
  type: buff
  radius: 0.5
  angle: 0.0
  damage: 0
  attackSpeedMultiplier: 0.0
  attackType: none
  statEffect:
    stat: agility
    amount: 2
"#;
        let table = WeaponTable::from_yaml_str(yaml).unwrap();
        assert_eq!(table.len(), 2);
        let club = table.get("Club.fbx").unwrap();
        assert!(club.hits_many());
        assert_eq!(club.special_effect.as_deref(), Some("stun"));
        let elixir = table.get("Elixir.fbx").unwrap();
        assert_eq!(elixir.stat_effect, Some(StatEffect { stat: Stat::Agility, amount: 2 }));
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = WeaponTable::from_yaml_str("Sword.fbx: [1, 2]").unwrap_err();
        assert!(matches!(err, ConfigError::Weapons(_)));
    }

    #[test]
    fn missing_file_falls_back_to_builtin() {
        let table = WeaponTable::load_or_builtin("does/not/exist.yaml");
        assert_eq!(table.len(), WeaponTable::builtin().len());
    }

    #[test]
    fn bundled_table_matches_builtin() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("data/weapons.yaml");
        let table = WeaponTable::load(path).unwrap();
        assert_eq!(table.len(), WeaponTable::builtin().len());
        assert_eq!(table.get("Sword.fbx").unwrap().damage, 20);
        assert!(table.get("Potion1_Filled.fbx").unwrap().stat_effect.is_some());
    }

    #[test]
    fn random_weapon_skips_consumables() {
        let table = WeaponTable::builtin();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let name = table.random_weapon_name(&mut rng).unwrap();
            assert_ne!(name, "Potion1_Filled.fbx");
        }
    }

    #[rstest]
    #[case(MELEE_ANIMATION, false, 10.5 / 24.0, false)]
    #[case(MELEE_ANIMATION, false, 11.5 / 24.0, true)]
    #[case(MELEE_ANIMATION, false, 12.5 / 24.0, true)]
    #[case(MELEE_ANIMATION, false, 13.5 / 24.0, false)]
    #[case(RANGED_ANIMATION, false, 5.5 / 24.0, true)]
    #[case(RANGED_ANIMATION, false, 7.5 / 24.0, false)]
    #[case(MELEE_ANIMATION, true, 10.5 / 24.0, true)]
    fn damage_window_is_inclusive(
        #[case] animation: &str,
        #[case] aerial: bool,
        #[case] time: f32,
        #[case] expected: bool,
    ) {
        let window = damage_window(animation, aerial).unwrap();
        assert_eq!(window.contains_time(time), expected);
    }

    #[test]
    fn non_attack_clips_have_no_window() {
        assert!(damage_window("Idle", false).is_none());
        assert!(damage_window("Walk", true).is_none());
    }
}
