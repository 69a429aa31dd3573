//! # Weapon Catalog
//!
//! The set of weapons players may choose from, grouped by tag.
//!
//! ## Source Format
//!
//! One TOML table per tag, each mapping a basename to its display name:
//!
//! ```toml
//! [secondary]
//! glock = "Glock-18"
//! usp_silencer = "USP-S"
//!
//! [primary]
//! ak47 = "AK-47"
//! ```
//!
//! Declaration order is preserved and defines [`WeaponCatalog::tags`] and
//! [`WeaponCatalog::lookup_by_tag`] ordering. Every basename is checked
//! against the host [`WeaponRegistry`]; an unknown one fails the whole load.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ConfigError, ConfigResult};
use crate::registry::WeaponRegistry;

/// Tags that reconciliation never strips or converges.
pub const EXEMPT_TAGS: [&str; 2] = ["melee", "grenade"];

/// Host decoration appended to some silenced spawn variants.
const SILENCED_SUFFIX: &str = "_silenced";

/// Returns true for melee/grenade categories.
#[inline]
#[must_use]
pub fn is_exempt_tag(tag: &str) -> bool {
    EXEMPT_TAGS.contains(&tag)
}

/// Immutable description of one selectable weapon.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WeaponDescriptor {
    basename: String,
    name: String,
    display_name: String,
    tag: String,
    clip_size: u32,
    max_ammo: u32,
    can_silence: bool,
}

impl WeaponDescriptor {
    /// Unique catalog key, without the host prefix.
    #[inline]
    #[must_use]
    pub fn basename(&self) -> &str {
        &self.basename
    }

    /// Prefixed host item name used for give requests.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Human readable name.
    #[inline]
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Equipment category this weapon occupies.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Rounds per clip.
    #[inline]
    #[must_use]
    pub const fn clip_size(&self) -> u32 {
        self.clip_size
    }

    /// Maximum reserve ammunition.
    #[inline]
    #[must_use]
    pub const fn max_ammo(&self) -> u32 {
        self.max_ammo
    }

    /// Whether the weapon takes a silencer.
    #[inline]
    #[must_use]
    pub const fn can_silence(&self) -> bool {
        self.can_silence
    }
}

/// Validated weapon table for one host game.
#[derive(Clone, Debug)]
pub struct WeaponCatalog {
    game: String,
    prefix: String,
    descriptors: HashMap<String, WeaponDescriptor>,
    /// Tags in declaration order.
    tags: Vec<String>,
    /// Basenames per tag in declaration order.
    by_tag: HashMap<String, Vec<String>>,
    /// Tags sorted descending; computed once at load.
    converge_order: Vec<String>,
}

impl WeaponCatalog {
    /// Builds a catalog from TOML source, validating against `registry`.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Parse`] for invalid TOML
    /// - [`ConfigError::MalformedEntry`] for non-table tags or non-string names
    /// - [`ConfigError::UnknownWeapon`] for basenames the host does not know
    /// - [`ConfigError::DuplicateBasename`] when a basename appears twice
    /// - [`ConfigError::EmptyCatalog`] when no weapon is declared
    pub fn load<R: WeaponRegistry + ?Sized>(source: &str, registry: &R) -> ConfigResult<Self> {
        let table: toml::Table = toml::from_str(source)?;

        let mut descriptors: HashMap<String, WeaponDescriptor> = HashMap::new();
        let mut tags = Vec::with_capacity(table.len());
        let mut by_tag: HashMap<String, Vec<String>> = HashMap::new();

        for (tag, entries) in &table {
            let entries = entries.as_table().ok_or_else(|| ConfigError::MalformedEntry {
                tag: tag.clone(),
                basename: tag.clone(),
            })?;
            tags.push(tag.clone());
            let members = by_tag.entry(tag.clone()).or_default();

            for (basename, display_name) in entries {
                let display_name =
                    display_name
                        .as_str()
                        .ok_or_else(|| ConfigError::MalformedEntry {
                            tag: tag.clone(),
                            basename: basename.clone(),
                        })?;

                if let Some(existing) = descriptors.get(basename) {
                    return Err(ConfigError::DuplicateBasename {
                        basename: basename.clone(),
                        first_tag: existing.tag.clone(),
                        second_tag: tag.clone(),
                    });
                }

                let class = registry.weapon_class(basename).ok_or_else(|| {
                    ConfigError::UnknownWeapon {
                        basename: basename.clone(),
                        display_name: display_name.to_string(),
                        game: registry.game().to_string(),
                    }
                })?;

                members.push(basename.clone());
                descriptors.insert(
                    basename.clone(),
                    WeaponDescriptor {
                        basename: basename.clone(),
                        name: class.name,
                        display_name: display_name.to_string(),
                        tag: tag.clone(),
                        clip_size: class.clip,
                        max_ammo: class.max_ammo,
                        can_silence: class.silenceable,
                    },
                );
            }
        }

        if descriptors.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }

        let mut converge_order = tags.clone();
        converge_order.sort_unstable_by(|a, b| b.cmp(a));

        tracing::info!(
            "Weapon catalog loaded for {}: {} weapons in {} tags",
            registry.game(),
            descriptors.len(),
            tags.len()
        );

        Ok(Self {
            game: registry.game().to_string(),
            prefix: registry.prefix().to_string(),
            descriptors,
            tags,
            by_tag,
            converge_order,
        })
    }

    /// Reads and builds a catalog from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`WeaponCatalog::load`].
    pub fn load_file<R: WeaponRegistry + ?Sized>(
        path: impl AsRef<Path>,
        registry: &R,
    ) -> ConfigResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::load(&source, registry)
    }

    /// Returns the descriptor for `basename`.
    #[must_use]
    pub fn lookup_by_basename(&self, basename: &str) -> Option<&WeaponDescriptor> {
        self.descriptors.get(basename)
    }

    /// Returns the descriptor for a host item or class name, any decoration.
    #[must_use]
    pub fn lookup_by_name(&self, name: &str) -> Option<&WeaponDescriptor> {
        self.descriptors.get(self.canonicalize(name))
    }

    /// Returns every descriptor under `tag`, in declaration order.
    pub fn lookup_by_tag<'a>(&'a self, tag: &str) -> impl Iterator<Item = &'a WeaponDescriptor> {
        self.by_tag
            .get(tag)
            .into_iter()
            .flatten()
            .filter_map(|basename| self.descriptors.get(basename))
    }

    /// Maps a held item name to its catalog basename.
    ///
    /// Strips the host prefix, then drops a silenced-variant suffix when the
    /// decorated name itself is not a catalog entry.
    #[must_use]
    pub fn canonicalize<'a>(&self, held: &'a str) -> &'a str {
        let name = held.strip_prefix(self.prefix.as_str()).unwrap_or(held);
        if self.descriptors.contains_key(name) {
            return name;
        }
        name.strip_suffix(SILENCED_SUFFIX).unwrap_or(name)
    }

    /// Tags in declaration order.
    #[inline]
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Tags sorted descending, the order reconciliation walks slots in.
    #[inline]
    #[must_use]
    pub fn converge_order(&self) -> &[String] {
        &self.converge_order
    }

    /// Host prefix of weapon class names.
    #[inline]
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Host game this catalog was validated against.
    #[inline]
    #[must_use]
    pub fn game(&self) -> &str {
        &self.game
    }

    /// Iterates over every descriptor (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &WeaponDescriptor> {
        self.descriptors.values()
    }

    /// Number of weapons.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns true if the catalog holds no weapons.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{StaticRegistry, WeaponClass};

    fn registry() -> StaticRegistry {
        let mut registry = StaticRegistry::new("cstrike", "weapon_");
        for (basename, tag, clip, max_ammo, silenceable) in [
            ("usp", "secondary", 12, 100, true),
            ("glock", "secondary", 20, 120, false),
            ("m4a1", "primary", 30, 90, true),
            ("ak47", "primary", 30, 90, false),
            ("knife", "melee", 0, 0, false),
        ] {
            registry.insert(WeaponClass {
                basename: basename.to_string(),
                name: format!("weapon_{basename}"),
                classname: format!("weapon_{basename}"),
                tag: tag.to_string(),
                clip,
                max_ammo,
                silenceable,
            });
        }
        registry
    }

    const SOURCE: &str = r#"
        [secondary]
        usp = "USP Tactical"
        glock = "Glock 18"

        [primary]
        m4a1 = "Maverick M4A1 Carbine"
        ak47 = "CV-47"
    "#;

    #[test]
    fn test_load_preserves_declaration_order() {
        let catalog = WeaponCatalog::load(SOURCE, &registry()).expect("catalog");

        assert_eq!(catalog.tags(), ["secondary", "primary"]);
        let primaries: Vec<_> = catalog.lookup_by_tag("primary").map(WeaponDescriptor::basename).collect();
        assert_eq!(primaries, vec!["m4a1", "ak47"]);
        assert_eq!(catalog.len(), 4);
    }

    #[test]
    fn test_descriptor_metadata_from_registry() {
        let catalog = WeaponCatalog::load(SOURCE, &registry()).expect("catalog");
        let usp = catalog.lookup_by_basename("usp").expect("usp");

        assert_eq!(usp.name(), "weapon_usp");
        assert_eq!(usp.display_name(), "USP Tactical");
        assert_eq!(usp.tag(), "secondary");
        assert_eq!(usp.clip_size(), 12);
        assert_eq!(usp.max_ammo(), 100);
        assert!(usp.can_silence());
        assert!(!catalog.lookup_by_basename("glock").expect("glock").can_silence());
    }

    #[test]
    fn test_unknown_weapon_aborts_load() {
        let source = "[primary]\nak47 = \"CV-47\"\nfamas = \"Clarion\"\n";
        let err = WeaponCatalog::load(source, &registry()).expect_err("famas is unknown");
        match err {
            ConfigError::UnknownWeapon { basename, game, .. } => {
                assert_eq!(basename, "famas");
                assert_eq!(game, "cstrike");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_basename_rejected() {
        let source = "[primary]\nak47 = \"CV-47\"\n[rifles]\nak47 = \"AK\"\n";
        assert!(matches!(
            WeaponCatalog::load(source, &registry()),
            Err(ConfigError::DuplicateBasename { .. })
        ));
    }

    #[test]
    fn test_malformed_entries_rejected() {
        assert!(matches!(
            WeaponCatalog::load("primary = 3\n", &registry()),
            Err(ConfigError::MalformedEntry { .. })
        ));
        assert!(matches!(
            WeaponCatalog::load("[primary]\nak47 = 3\n", &registry()),
            Err(ConfigError::MalformedEntry { .. })
        ));
        assert!(matches!(
            WeaponCatalog::load("", &registry()),
            Err(ConfigError::EmptyCatalog)
        ));
    }

    #[test]
    fn test_canonicalize_strips_decorations() {
        let catalog = WeaponCatalog::load(SOURCE, &registry()).expect("catalog");

        assert_eq!(catalog.canonicalize("weapon_ak47"), "ak47");
        assert_eq!(catalog.canonicalize("ak47"), "ak47");
        assert_eq!(catalog.canonicalize("weapon_usp_silenced"), "usp");
        assert_eq!(catalog.lookup_by_name("weapon_m4a1_silenced").map(WeaponDescriptor::basename), Some("m4a1"));
        assert!(catalog.lookup_by_name("weapon_famas").is_none());
    }

    #[test]
    fn test_converge_order_descending() {
        let catalog = WeaponCatalog::load(SOURCE, &registry()).expect("catalog");
        assert_eq!(catalog.converge_order(), ["secondary", "primary"]);
        assert!(is_exempt_tag("melee"));
        assert!(is_exempt_tag("grenade"));
        assert!(!is_exempt_tag("primary"));
    }
}
