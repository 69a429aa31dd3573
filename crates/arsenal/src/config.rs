//! # Session Settings
//!
//! Loaded once at startup from `data/arsenal.toml`. Every field has a
//! default, so an empty file is a valid configuration. Delays are given
//! in seconds; negative values are read as their absolute value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use arsenal_loadout::GameVariant;
use serde::Deserialize;

use crate::error::{ArenaError, ArenaResult};

/// When players receive a high-explosive grenade.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrenadeMode {
    /// Never.
    #[default]
    Off,
    /// On every spawn.
    Spawn,
    /// On spawn and after each grenade kill.
    SpawnAndKill,
    /// On spawn and whenever their grenade detonates.
    SpawnAndDetonate,
}

impl GrenadeMode {
    /// Whether a grenade is handed out on spawn.
    #[inline]
    #[must_use]
    pub const fn on_spawn(self) -> bool {
        !matches!(self, Self::Off)
    }
}

/// Deathmatch session settings.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Host game flavour; selects weapon tables.
    pub game: GameVariant,
    /// Seconds between death and respawn.
    pub respawn_delay: f32,
    /// Seconds of damage protection after spawning.
    pub spawn_protection_delay: f32,
    /// Refill reserve ammo on reload and the clip on its last round.
    pub infinite_ammo: bool,
    /// Refill the attacker's clip and reserve on a headshot kill.
    pub refill_clip_on_headshot: bool,
    /// Grenade hand-out policy.
    pub grenade_mode: GrenadeMode,
    /// Restore the attacker's health on a knife kill.
    pub restore_health_on_knife_kill: bool,
    /// Disable player collisions.
    pub noblock: bool,
    /// Team switches allowed per round after the first join.
    pub team_changes_per_round: u32,
    /// Seconds a dropped weapon stays on the ground.
    pub drop_cleanup_delay: f32,
    /// Seconds between firing the last round and the clip refill.
    pub refill_clip_delay: f32,
    /// Seconds after a silencer toggle before the loadout is re-checked.
    pub silencer_verify_delay: f32,
    /// Keep a disconnecting player's loadouts for their next visit.
    pub keep_loadouts_on_disconnect: bool,
    /// Entity classes deleted as soon as they spawn.
    pub forbidden_entities: Vec<String>,
    /// Map brush classes disabled as soon as they spawn.
    pub disabled_map_functions: Vec<String>,
    /// Seed for random loadouts; derived from the clock when absent.
    pub rng_seed: Option<u64>,
    /// Directory holding `hosts/` and `weapons/` tables.
    pub data_dir: PathBuf,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            game: GameVariant::Csgo,
            respawn_delay: 2.0,
            spawn_protection_delay: 2.0,
            infinite_ammo: true,
            refill_clip_on_headshot: false,
            grenade_mode: GrenadeMode::Off,
            restore_health_on_knife_kill: false,
            noblock: false,
            team_changes_per_round: 1,
            drop_cleanup_delay: 1.0,
            refill_clip_delay: 0.0,
            silencer_verify_delay: 0.1,
            keep_loadouts_on_disconnect: true,
            forbidden_entities: ["weapon_c4", "hostage_entity", "item_defuser"]
                .map(String::from)
                .to_vec(),
            disabled_map_functions: ["func_bomb_target", "func_buyzone", "func_hostage_rescue"]
                .map(String::from)
                .to_vec(),
            rng_seed: None,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl ArenaConfig {
    /// Parses settings from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Config`] on invalid TOML or unknown enum values.
    pub fn from_toml_str(source: &str) -> ArenaResult<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads settings from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ArenaError::Io`] if the file cannot be read, otherwise as
    /// [`ArenaConfig::from_toml_str`].
    pub fn load(path: impl AsRef<Path>) -> ArenaResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ArenaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Session settings loaded from {}", path.display());
        Ok(config)
    }

    /// Whether entities of `classname` are deleted on spawn.
    #[must_use]
    pub fn is_forbidden(&self, classname: &str) -> bool {
        self.forbidden_entities.iter().any(|name| name == classname)
    }

    /// Whether map brushes of `classname` are disabled on spawn.
    #[must_use]
    pub fn is_disabled_map_function(&self, classname: &str) -> bool {
        self.disabled_map_functions.iter().any(|name| name == classname)
    }

    /// Host registry table for the configured game.
    #[must_use]
    pub fn host_table(&self) -> PathBuf {
        self.data_dir
            .join("hosts")
            .join(format!("{}.toml", self.game.name()))
    }

    /// Weapon catalog table for the configured game.
    #[must_use]
    pub fn weapon_table(&self) -> PathBuf {
        self.data_dir
            .join("weapons")
            .join(format!("{}.toml", self.game.name()))
    }

    /// Respawn delay as a duration.
    #[must_use]
    pub fn respawn(&self) -> Duration {
        seconds(self.respawn_delay)
    }

    /// Spawn protection length as a duration.
    #[must_use]
    pub fn spawn_protection(&self) -> Duration {
        seconds(self.spawn_protection_delay)
    }

    /// Dropped weapon lifetime as a duration.
    #[must_use]
    pub fn drop_cleanup(&self) -> Duration {
        seconds(self.drop_cleanup_delay)
    }

    /// Clip refill delay as a duration.
    #[must_use]
    pub fn refill_clip(&self) -> Duration {
        seconds(self.refill_clip_delay)
    }

    /// Silencer re-check delay as a duration.
    #[must_use]
    pub fn silencer_verify(&self) -> Duration {
        seconds(self.silencer_verify_delay)
    }
}

fn seconds(value: f32) -> Duration {
    let value = value.abs();
    if value.is_finite() {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ArenaConfig::from_toml_str("").expect("empty is valid");
        assert_eq!(config, ArenaConfig::default());
        assert_eq!(config.respawn(), Duration::from_secs(2));
    }

    #[test]
    fn test_shipped_settings_parse() {
        let config = ArenaConfig::from_toml_str(include_str!("../../../data/arsenal.toml"))
            .expect("shipped settings");
        assert_eq!(config.game, GameVariant::Csgo);
        assert_eq!(config.grenade_mode, GrenadeMode::SpawnAndKill);
        assert!(config.refill_clip_on_headshot);
        assert_eq!(config.spawn_protection(), Duration::from_secs(3));
    }

    #[test]
    fn test_negative_delay_is_absolute() {
        let config = ArenaConfig::from_toml_str("respawn_delay = -1.5").expect("valid");
        assert_eq!(config.respawn(), Duration::from_millis(1500));
    }

    #[test]
    fn test_oversized_delay_saturates() {
        let config = ArenaConfig::from_toml_str("respawn_delay = 1e30").expect("valid");
        assert_eq!(config.respawn(), Duration::MAX);
    }

    #[test]
    fn test_unknown_grenade_mode_rejected() {
        assert!(matches!(
            ArenaConfig::from_toml_str("grenade_mode = \"always\""),
            Err(ArenaError::Config(_))
        ));
    }

    #[test]
    fn test_data_paths_follow_game() {
        let config = ArenaConfig::from_toml_str("game = \"cstrike\"").expect("valid");
        assert_eq!(config.weapon_table(), Path::new("data/weapons/cstrike.toml"));
        assert_eq!(config.host_table(), Path::new("data/hosts/cstrike.toml"));
        assert!(config.is_forbidden("hostage_entity"));
        assert!(config.is_disabled_map_function("func_buyzone"));
        assert!(!config.is_forbidden("weapon_ak47"));
        assert!(!GrenadeMode::Off.on_spawn());
        assert!(GrenadeMode::SpawnAndDetonate.on_spawn());
    }
}
