//! # Loadout Store
//!
//! Desired equipment per player identity.
//!
//! ## Layout
//!
//! ```text
//! LoadoutStore
//!   └── PlayerId ──> PlayerLoadoutSet
//!                      ├── active_selection: u32
//!                      ├── random_mode: bool
//!                      └── loadouts: selection ──> Loadout
//!                                                   └── tag ──> LoadoutSlot
//! ```
//!
//! Entries are created on first access and torn down explicitly through
//! [`LoadoutStore::forget`] and [`LoadoutStore::reset_session`]. The
//! active loadout is never absent: reading an unused selection yields an
//! empty loadout.

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arsenal_core::PlayerId;

use crate::catalog::WeaponCatalog;
use crate::error::{LoadoutError, LoadoutResult};

/// Desired silencer state of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SilencerOption {
    /// No preference; reconciliation fills in the host default.
    #[default]
    Unset,
    /// Silencer attached.
    On,
    /// Silencer detached.
    Off,
}

impl SilencerOption {
    /// Converts a concrete attachment state.
    #[inline]
    #[must_use]
    pub const fn from_bool(on: bool) -> Self {
        if on {
            Self::On
        } else {
            Self::Off
        }
    }

    /// Returns the desired state, or `None` when unset.
    #[inline]
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::On => Some(true),
            Self::Off => Some(false),
        }
    }
}

/// One chosen weapon within a loadout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoadoutSlot {
    tag: String,
    chosen: String,
    silencer: SilencerOption,
}

impl LoadoutSlot {
    /// Category this slot fills.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Basename the player asked for.
    #[inline]
    #[must_use]
    pub fn chosen_basename(&self) -> &str {
        &self.chosen
    }

    /// Desired silencer state.
    #[inline]
    #[must_use]
    pub const fn silencer(&self) -> SilencerOption {
        self.silencer
    }

    /// Only reachable through paths that checked `can_silence`.
    pub(crate) fn set_silencer(&mut self, option: SilencerOption) {
        self.silencer = option;
    }
}

/// What a player currently carries, keyed by tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeldState {
    items: BTreeMap<String, String>,
    silencers: BTreeMap<String, bool>,
}

impl HeldState {
    /// Creates an empty held state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the basename is held at `tag`.
    pub fn insert_item(&mut self, tag: impl Into<String>, basename: impl Into<String>) {
        self.items.insert(tag.into(), basename.into());
    }

    /// Records the attachment state of the item held at `tag`.
    pub fn insert_silencer(&mut self, tag: impl Into<String>, on: bool) {
        self.silencers.insert(tag.into(), on);
    }

    /// Basename held at `tag`.
    #[must_use]
    pub fn basename(&self, tag: &str) -> Option<&str> {
        self.items.get(tag).map(String::as_str)
    }

    /// Silencer state of the item held at `tag`.
    #[must_use]
    pub fn silencer(&self, tag: &str) -> Option<bool> {
        self.silencers.get(tag).copied()
    }
}

/// A player's desired equipment, at most one slot per tag.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Loadout {
    slots: BTreeMap<String, LoadoutSlot>,
}

impl Loadout {
    /// Creates an empty loadout.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites or creates the slot at `tag`, resetting its silencer option.
    pub fn set_slot(&mut self, tag: impl Into<String>, basename: impl Into<String>) -> &LoadoutSlot {
        let tag = tag.into();
        let slot = LoadoutSlot {
            tag: tag.clone(),
            chosen: basename.into(),
            silencer: SilencerOption::Unset,
        };
        match self.slots.entry(tag) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(slot);
                occupied.into_mut()
            }
            Entry::Vacant(vacant) => vacant.insert(slot),
        }
    }

    /// Removes the slot at `tag`.
    pub fn clear_slot(&mut self, tag: &str) -> Option<LoadoutSlot> {
        self.slots.remove(tag)
    }

    /// Returns the slot at `tag`.
    #[must_use]
    pub fn slot(&self, tag: &str) -> Option<&LoadoutSlot> {
        self.slots.get(tag)
    }

    pub(crate) fn slot_mut(&mut self, tag: &str) -> Option<&mut LoadoutSlot> {
        self.slots.get_mut(tag)
    }

    /// Returns the slot whose chosen weapon is `basename`.
    #[must_use]
    pub fn slot_for_basename(&self, basename: &str) -> Option<&LoadoutSlot> {
        self.slots.values().find(|slot| slot.chosen == basename)
    }

    /// Iterates over slots in tag order.
    pub fn slots(&self) -> impl Iterator<Item = &LoadoutSlot> {
        self.slots.values()
    }

    /// Returns true if a slot exists for `tag`.
    #[inline]
    #[must_use]
    pub fn contains_tag(&self, tag: &str) -> bool {
        self.slots.contains_key(tag)
    }

    /// Number of slots.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no slot is declared.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Checks the held state against every declared slot.
    ///
    /// Each slot's tag must hold exactly the chosen basename, and a set
    /// silencer option must equal the held attachment state. Tags the
    /// loadout does not declare are not checked.
    #[must_use]
    pub fn matches_held_state(&self, held: &HeldState) -> bool {
        self.slots.values().all(|slot| {
            if held.basename(&slot.tag) != Some(slot.chosen.as_str()) {
                return false;
            }
            match slot.silencer.as_bool() {
                Some(wanted) => held.silencer(&slot.tag) == Some(wanted),
                None => true,
            }
        })
    }
}

/// All loadouts of one player identity plus their selection state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerLoadoutSet {
    loadouts: BTreeMap<u32, Loadout>,
    active_selection: u32,
    random_mode: bool,
}

impl Default for PlayerLoadoutSet {
    fn default() -> Self {
        Self {
            loadouts: BTreeMap::new(),
            active_selection: 0,
            random_mode: true,
        }
    }
}

impl PlayerLoadoutSet {
    /// Selection index currently in use.
    #[inline]
    #[must_use]
    pub const fn active_selection(&self) -> u32 {
        self.active_selection
    }

    /// Whether the player receives random weapons.
    #[inline]
    #[must_use]
    pub const fn random_mode(&self) -> bool {
        self.random_mode
    }

    /// Returns the stored loadout at `selection`.
    #[must_use]
    pub fn loadout(&self, selection: u32) -> Option<&Loadout> {
        self.loadouts.get(&selection)
    }

    /// Number of stored loadouts.
    #[must_use]
    pub fn loadout_count(&self) -> usize {
        self.loadouts.len()
    }

    fn active_mut(&mut self) -> &mut Loadout {
        self.loadouts.entry(self.active_selection).or_default()
    }

    fn reset_session(&mut self) {
        self.active_selection = 0;
        self.random_mode = true;
    }
}

/// Per-identity loadout storage.
#[derive(Debug)]
pub struct LoadoutStore {
    catalog: Arc<WeaponCatalog>,
    players: HashMap<PlayerId, PlayerLoadoutSet>,
}

impl LoadoutStore {
    /// Creates an empty store validating choices against `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<WeaponCatalog>) -> Self {
        Self {
            catalog,
            players: HashMap::new(),
        }
    }

    /// Catalog used for validation.
    #[must_use]
    pub fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    /// Returns the player's set without creating it.
    #[must_use]
    pub fn player(&self, player: &PlayerId) -> Option<&PlayerLoadoutSet> {
        self.players.get(player)
    }

    fn entry(&mut self, player: &PlayerId) -> &mut PlayerLoadoutSet {
        self.players.entry(player.clone()).or_default()
    }

    /// Returns the active loadout, creating an empty one if absent.
    pub fn active_loadout(&mut self, player: &PlayerId) -> &Loadout {
        self.entry(player).active_mut()
    }

    /// Mutable access to the active loadout, creating it if absent.
    pub fn active_loadout_mut(&mut self, player: &PlayerId) -> &mut Loadout {
        self.entry(player).active_mut()
    }

    /// Selection index in use (0 for unknown players).
    #[must_use]
    pub fn active_selection(&self, player: &PlayerId) -> u32 {
        self.players
            .get(player)
            .map_or(0, PlayerLoadoutSet::active_selection)
    }

    /// Switches to loadout `index` and leaves random mode.
    ///
    /// An index with no stored loadout simply reads as empty.
    pub fn set_selection(&mut self, player: &PlayerId, index: u32) {
        let set = self.entry(player);
        set.active_selection = index;
        set.random_mode = false;
        tracing::debug!("{} selected loadout {}", player, index);
    }

    /// Applies a 1-based selection typed by the player.
    ///
    /// Non-numeric or non-positive input is ignored and returns `None`
    /// without touching any state. Returns the stored 0-based index.
    pub fn select_from_input(&mut self, player: &PlayerId, input: &str) -> Option<u32> {
        let number = input.trim().parse::<u32>().ok().filter(|n| *n > 0)?;
        let index = number - 1;
        self.set_selection(player, index);
        Some(index)
    }

    /// Turns random mode on or off.
    pub fn set_random_mode(&mut self, player: &PlayerId, enabled: bool) {
        self.entry(player).random_mode = enabled;
    }

    /// Whether the player is in random mode (true for unknown players).
    #[must_use]
    pub fn random_mode(&self, player: &PlayerId) -> bool {
        self.players
            .get(player)
            .map_or(true, PlayerLoadoutSet::random_mode)
    }

    /// Puts a catalog weapon into the active loadout at its own tag.
    ///
    /// Leaves random mode, since the player made an explicit choice.
    ///
    /// # Errors
    ///
    /// Returns [`LoadoutError::UnknownWeapon`] if `basename` is not in the catalog.
    pub fn choose_weapon(&mut self, player: &PlayerId, basename: &str) -> LoadoutResult<&LoadoutSlot> {
        let tag = self
            .catalog
            .lookup_by_basename(basename)
            .map(|weapon| weapon.tag().to_string())
            .ok_or_else(|| LoadoutError::UnknownWeapon(basename.to_string()))?;

        let set = self.entry(player);
        set.random_mode = false;
        Ok(set.active_mut().set_slot(tag, basename))
    }

    /// Removes the slot at `tag` from the active loadout.
    pub fn clear_slot(&mut self, player: &PlayerId, tag: &str) -> Option<LoadoutSlot> {
        self.entry(player).active_mut().clear_slot(tag)
    }

    /// Stores a silencer preference for the slot at `tag`.
    ///
    /// Returns false (and writes nothing) if the slot is absent or its
    /// weapon cannot take a silencer.
    pub fn set_silencer_option(&mut self, player: &PlayerId, tag: &str, on: bool) -> bool {
        let catalog = Arc::clone(&self.catalog);
        let Some(slot) = self.entry(player).active_mut().slot_mut(tag) else {
            return false;
        };
        let silenceable = catalog
            .lookup_by_basename(&slot.chosen)
            .is_some_and(|weapon| weapon.can_silence());
        if silenceable {
            slot.set_silencer(SilencerOption::from_bool(on));
        }
        silenceable
    }

    /// Drops a disconnecting player's session state.
    ///
    /// With `retain_loadouts` the stored loadouts survive and only the
    /// selection and random mode go back to defaults.
    pub fn forget(&mut self, player: &PlayerId, retain_loadouts: bool) {
        if retain_loadouts {
            if let Some(set) = self.players.get_mut(player) {
                set.reset_session();
            }
        } else {
            self.players.remove(player);
        }
    }

    /// Level transition: every player keeps loadouts, loses session state.
    pub fn reset_session(&mut self) {
        for set in self.players.values_mut() {
            set.reset_session();
        }
    }

    /// Number of known identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if no identity is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}
