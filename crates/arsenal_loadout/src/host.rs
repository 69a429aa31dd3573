//! # Host Interface
//!
//! The game server seen from the loadout unit. Everything the reconciler
//! produces (gives, removals, flag writes, weapon selects, transient team
//! writes) goes through [`LoadoutHost`]; the host's entity model is an
//! opaque mutation target.
//!
//! ```text
//! arsenal_loadout defines:      the server adapter implements:
//! ┌──────────────────┐          ┌──────────────────────┐
//! │ trait LoadoutHost│ ←─────── │ impl LoadoutHost for │
//! └──────────────────┘          └──────────────────────┘
//! ```

use arsenal_core::{ItemHandle, Team, UserId};

use crate::catalog::WeaponDescriptor;

/// An item currently carried by a player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeldItem {
    /// Host handle of the item entity.
    pub handle: ItemHandle,
    /// Concrete entity class (used for select commands).
    pub classname: String,
    /// Item name the host spawned it as (used for catalog lookups).
    pub item_name: String,
    /// Host equipment category.
    pub tag: String,
}

/// Boolean properties of a weapon entity written during silencer changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemFlag {
    /// Silencer attachment state.
    SilencerOn,
    /// Mirrored firing mode; must follow the attachment flag.
    WeaponMode,
}

/// Outcome of a removal request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RemoveStatus {
    /// The item existed and was removed.
    Removed,
    /// The item was already destroyed by the host.
    AlreadyGone,
}

/// Mutation and query surface of the host's player/item model.
pub trait LoadoutHost {
    /// Items the player carries, in a stable order.
    fn held_items(&self, user: UserId) -> Vec<HeldItem>;

    /// Asks the host to give `item_name` to the player.
    ///
    /// Returns what was actually spawned, which may differ from the request.
    fn give_item(&mut self, user: UserId, item_name: &str) -> Option<HeldItem>;

    /// Removes an item entity.
    fn remove_item(&mut self, item: ItemHandle) -> RemoveStatus;

    /// Reads a weapon flag; `None` if the item does not exist.
    fn item_flag(&self, item: ItemHandle, flag: ItemFlag) -> Option<bool>;

    /// Writes a weapon flag.
    fn set_item_flag(&mut self, item: ItemHandle, flag: ItemFlag, value: bool);

    /// Issues a weapon-select command for `classname`.
    fn select_item(&mut self, user: UserId, classname: &str);

    /// Current team of the player.
    fn team(&self, user: UserId) -> Team;

    /// Writes the player's team without respawning or killing them.
    fn set_team(&mut self, user: UserId, team: Team);

    /// Whether a freshly spawned `weapon` has its silencer attached.
    fn silencer_default(&self, weapon: &WeaponDescriptor) -> bool;
}
