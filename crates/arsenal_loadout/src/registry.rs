//! # Host Weapon Registry
//!
//! What the host game knows about its own weapon classes: the class
//! prefix, clip sizes, reserve ammo and silencer capability. The catalog
//! is validated against a [`WeaponRegistry`] at load time.
//!
//! [`StaticRegistry`] is a TOML-backed registry used by the simulated host:
//!
//! ```toml
//! game = "csgo"
//! prefix = "weapon_"
//!
//! [weapons.usp_silencer]
//! classname = "hkp2000"
//! tag = "secondary"
//! clip = 12
//! max_ammo = 24
//! silencer = true
//!
//! [resolve.ct]
//! hkp2000 = "usp_silencer"
//! ```
//!
//! `resolve` tables describe team-dependent spawn resolution: a
//! counter-terrorist asking for `hkp2000` receives `usp_silencer`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use arsenal_core::Team;
use serde::Deserialize;

use crate::error::{ConfigError, ConfigResult};

/// Host game flavour. Selects the catalog file and host conventions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameVariant {
    /// Counter-Strike: Source.
    Cstrike,
    /// Counter-Strike: Global Offensive.
    #[default]
    Csgo,
}

impl GameVariant {
    /// Host game name, also the stem of its data files.
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Cstrike => "cstrike",
            Self::Csgo => "csgo",
        }
    }

    /// Whether silenceable weapons spawn with the silencer attached.
    #[inline]
    #[must_use]
    pub const fn silencer_default(self) -> bool {
        matches!(self, Self::Csgo)
    }
}

/// Host metadata for one weapon class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeaponClass {
    /// Unprefixed name the class is requested by.
    pub basename: String,
    /// Prefixed item name, e.g. `weapon_usp_silencer`.
    pub name: String,
    /// Prefixed concrete entity class, e.g. `weapon_hkp2000`.
    pub classname: String,
    /// Host equipment category.
    pub tag: String,
    /// Rounds per clip.
    pub clip: u32,
    /// Maximum reserve ammunition.
    pub max_ammo: u32,
    /// Whether the class takes a silencer.
    pub silenceable: bool,
}

/// Read access to the host's weapon classes.
pub trait WeaponRegistry {
    /// Host game name used in diagnostics.
    fn game(&self) -> &str;

    /// Prefix the host puts in front of every weapon class name.
    fn prefix(&self) -> &str;

    /// Returns the class registered under `basename`.
    fn weapon_class(&self, basename: &str) -> Option<WeaponClass>;
}

#[derive(Deserialize)]
struct RegistryFile {
    game: String,
    #[serde(default = "default_prefix")]
    prefix: String,
    weapons: BTreeMap<String, ClassEntry>,
    #[serde(default)]
    resolve: BTreeMap<String, BTreeMap<String, String>>,
}

#[derive(Deserialize)]
struct ClassEntry {
    tag: String,
    #[serde(default)]
    clip: u32,
    #[serde(default)]
    max_ammo: u32,
    classname: Option<String>,
    #[serde(default)]
    silencer: bool,
}

fn default_prefix() -> String {
    "weapon_".to_string()
}

/// In-memory registry, usually loaded from TOML.
#[derive(Clone, Debug, Default)]
pub struct StaticRegistry {
    game: String,
    prefix: String,
    classes: HashMap<String, WeaponClass>,
    resolve: HashMap<Team, HashMap<String, String>>,
}

impl StaticRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(game: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            game: game.into(),
            prefix: prefix.into(),
            classes: HashMap::new(),
            resolve: HashMap::new(),
        }
    }

    /// Parses a registry from TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML and
    /// [`ConfigError::MalformedEntry`] for a `resolve` table that does not
    /// name a playing team (`t` or `ct`).
    pub fn from_toml_str(source: &str) -> ConfigResult<Self> {
        let file: RegistryFile = toml::from_str(source)?;
        let mut registry = Self::new(file.game, file.prefix);

        for (basename, entry) in file.weapons {
            let classname = entry.classname.as_deref().unwrap_or(&basename);
            let class = WeaponClass {
                name: format!("{}{}", registry.prefix, basename),
                classname: format!("{}{}", registry.prefix, classname),
                basename,
                tag: entry.tag,
                clip: entry.clip,
                max_ammo: entry.max_ammo,
                silenceable: entry.silencer,
            };
            registry.insert(class);
        }

        for (team_key, table) in file.resolve {
            let team = match team_key.as_str() {
                "t" => Team::Terrorist,
                "ct" => Team::CounterTerrorist,
                _ => {
                    return Err(ConfigError::MalformedEntry {
                        tag: "resolve".to_string(),
                        basename: team_key,
                    })
                }
            };
            for (requested, resolved) in table {
                registry.add_resolution(team, requested, resolved);
            }
        }

        Ok(registry)
    }

    /// Reads and parses a registry file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`StaticRegistry::from_toml_str`].
    pub fn load_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// Registers or replaces a class.
    pub fn insert(&mut self, class: WeaponClass) {
        self.classes.insert(class.basename.clone(), class);
    }

    /// Declares that `team` asking for `requested` receives `resolved`.
    pub fn add_resolution(
        &mut self,
        team: Team,
        requested: impl Into<String>,
        resolved: impl Into<String>,
    ) {
        self.resolve
            .entry(team)
            .or_default()
            .insert(requested.into(), resolved.into());
    }

    /// Basename that `team` actually receives when asking for `requested`.
    #[must_use]
    pub fn resolve<'a>(&'a self, team: Team, requested: &'a str) -> &'a str {
        self.resolve
            .get(&team)
            .and_then(|table| table.get(requested))
            .map_or(requested, String::as_str)
    }

    /// Iterates over every registered class.
    pub fn classes(&self) -> impl Iterator<Item = &WeaponClass> {
        self.classes.values()
    }
}

impl WeaponRegistry for StaticRegistry {
    fn game(&self) -> &str {
        &self.game
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn weapon_class(&self, basename: &str) -> Option<WeaponClass> {
        self.classes.get(basename).cloned()
    }
}
