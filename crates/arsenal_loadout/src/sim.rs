//! # Simulated Host
//!
//! [`SimWorld`] is an in-memory [`LoadoutHost`] backed by a
//! [`StaticRegistry`]. It mimics the parts of the real server that matter
//! to reconciliation:
//!
//! - give requests resolve through per-team tables, so a request can hand
//!   out a different weapon than asked for
//! - silenceable weapons spawn with the game variant's default attachment
//! - removing an already-destroyed item reports [`RemoveStatus::AlreadyGone`]
//!
//! Every mutation requested through the trait is appended to an effect log
//! so tests can assert on exactly what a reconciliation produced.

use std::collections::BTreeMap;

use arsenal_core::{ItemHandle, Team, UserId};

use crate::catalog::WeaponDescriptor;
use crate::host::{HeldItem, ItemFlag, LoadoutHost, RemoveStatus};
use crate::registry::{GameVariant, StaticRegistry, WeaponRegistry};

/// A mutation requested through [`LoadoutHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEffect {
    /// `give_item` call.
    Give {
        /// Receiving player.
        user: UserId,
        /// Requested item name.
        requested: String,
        /// Item name actually spawned, `None` if refused.
        spawned: Option<String>,
    },
    /// `remove_item` call.
    Remove {
        /// Target item.
        item: ItemHandle,
        /// What the host reported.
        status: RemoveStatus,
    },
    /// `set_item_flag` call.
    SetFlag {
        /// Target item.
        item: ItemHandle,
        /// Flag written.
        flag: ItemFlag,
        /// Value written.
        value: bool,
    },
    /// `select_item` call.
    Select {
        /// Selecting player.
        user: UserId,
        /// Selected class.
        classname: String,
    },
    /// `set_team` call.
    SetTeam {
        /// Moved player.
        user: UserId,
        /// New team.
        team: Team,
    },
}

/// One item entity in the simulated world.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimItem {
    /// Entity handle.
    pub handle: ItemHandle,
    /// Carrying player, `None` when lying on the ground.
    pub owner: Option<UserId>,
    /// Concrete entity class.
    pub classname: String,
    /// Item name it was spawned as.
    pub item_name: String,
    /// Host category.
    pub tag: String,
    /// Silencer attachment flag.
    pub silencer_on: bool,
    /// Mirrored weapon-mode flag.
    pub weapon_mode: bool,
    /// Rounds in the clip.
    pub clip: u32,
    /// Reserve ammunition.
    pub reserve_ammo: u32,
}

#[derive(Clone, Debug, Default)]
struct SimPlayer {
    team: Team,
    selected: Option<String>,
}

/// In-memory host for tests and the simulator binary.
#[derive(Clone, Debug)]
pub struct SimWorld {
    registry: StaticRegistry,
    variant: GameVariant,
    players: BTreeMap<UserId, SimPlayer>,
    items: BTreeMap<ItemHandle, SimItem>,
    next_handle: u32,
    effects: Vec<HostEffect>,
}

impl SimWorld {
    /// Creates an empty world.
    #[must_use]
    pub fn new(registry: StaticRegistry, variant: GameVariant) -> Self {
        Self {
            registry,
            variant,
            players: BTreeMap::new(),
            items: BTreeMap::new(),
            next_handle: 1,
            effects: Vec::new(),
        }
    }

    /// Registry the world spawns from.
    #[must_use]
    pub fn registry(&self) -> &StaticRegistry {
        &self.registry
    }

    /// Game variant whose conventions the world follows.
    #[must_use]
    pub const fn variant(&self) -> GameVariant {
        self.variant
    }

    /// Adds a player on `team` with empty hands.
    pub fn add_player(&mut self, user: UserId, team: Team) {
        self.players.insert(
            user,
            SimPlayer {
                team,
                selected: None,
            },
        );
    }

    /// Removes a player and destroys everything they carried.
    pub fn remove_player(&mut self, user: UserId) {
        self.players.remove(&user);
        self.destroy_items_of(user);
    }

    /// Returns true if the player exists.
    #[must_use]
    pub fn has_player(&self, user: UserId) -> bool {
        self.players.contains_key(&user)
    }

    /// Users in the world, ascending.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.players.keys().copied()
    }

    /// Creates an item directly, bypassing team resolution and the effect log.
    pub fn spawn_item(&mut self, owner: Option<UserId>, basename: &str) -> Option<ItemHandle> {
        let class = self.registry.weapon_class(basename)?;
        let handle = ItemHandle(self.next_handle);
        self.next_handle += 1;

        let silencer_on = class.silenceable && self.variant.silencer_default();
        self.items.insert(
            handle,
            SimItem {
                handle,
                owner,
                classname: class.classname,
                item_name: class.name,
                tag: class.tag,
                silencer_on,
                weapon_mode: silencer_on,
                clip: class.clip,
                reserve_ammo: class.max_ammo,
            },
        );
        Some(handle)
    }

    /// Returns an item.
    #[must_use]
    pub fn item(&self, handle: ItemHandle) -> Option<&SimItem> {
        self.items.get(&handle)
    }

    /// Mutable access to an item.
    pub fn item_mut(&mut self, handle: ItemHandle) -> Option<&mut SimItem> {
        self.items.get_mut(&handle)
    }

    /// Iterates over every item entity.
    pub fn items(&self) -> impl Iterator<Item = &SimItem> {
        self.items.values()
    }

    /// Puts an item on the ground.
    pub fn drop_item(&mut self, handle: ItemHandle) -> bool {
        match self.items.get_mut(&handle) {
            Some(item) => {
                item.owner = None;
                true
            }
            None => false,
        }
    }

    /// Destroys an item outside of any trait call (host-side cleanup).
    pub fn destroy_item(&mut self, handle: ItemHandle) -> bool {
        self.items.remove(&handle).is_some()
    }

    /// Last class the player selected.
    #[must_use]
    pub fn selected(&self, user: UserId) -> Option<&str> {
        self.players.get(&user)?.selected.as_deref()
    }

    /// Item matching the player's last selection, else their first item.
    #[must_use]
    pub fn active_item(&self, user: UserId) -> Option<&SimItem> {
        let owned = || self.items.values().filter(move |item| item.owner == Some(user));
        self.selected(user)
            .and_then(|classname| owned().find(|item| item.classname == classname))
            .or_else(|| owned().next())
    }

    /// Every effect recorded so far.
    #[must_use]
    pub fn effects(&self) -> &[HostEffect] {
        &self.effects
    }

    /// Forgets recorded effects.
    pub fn clear_effects(&mut self) {
        self.effects.clear();
    }

    /// Number of give requests recorded.
    #[must_use]
    pub fn give_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, HostEffect::Give { .. }))
            .count()
    }

    /// Number of removal requests recorded.
    #[must_use]
    pub fn remove_count(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, HostEffect::Remove { .. }))
            .count()
    }

    /// Classes selected by `user`, in order.
    #[must_use]
    pub fn selections(&self, user: UserId) -> Vec<&str> {
        self.effects
            .iter()
            .filter_map(|effect| match effect {
                HostEffect::Select { user: who, classname } if *who == user => Some(classname.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Destroys everything the player carries.
    pub fn destroy_items_of(&mut self, user: UserId) -> usize {
        let before = self.items.len();
        self.items.retain(|_, item| item.owner != Some(user));
        before - self.items.len()
    }
}

impl From<&SimItem> for HeldItem {
    fn from(item: &SimItem) -> Self {
        Self {
            handle: item.handle,
            classname: item.classname.clone(),
            item_name: item.item_name.clone(),
            tag: item.tag.clone(),
        }
    }
}

impl LoadoutHost for SimWorld {
    fn held_items(&self, user: UserId) -> Vec<HeldItem> {
        self.items
            .values()
            .filter(|item| item.owner == Some(user))
            .map(HeldItem::from)
            .collect()
    }

    fn give_item(&mut self, user: UserId, item_name: &str) -> Option<HeldItem> {
        let team = self.players.get(&user).map(|player| player.team);
        let spawned = team.and_then(|team| {
            let requested = item_name
                .strip_prefix(self.registry.prefix())
                .unwrap_or(item_name);
            let resolved = self.registry.resolve(team, requested).to_string();
            self.spawn_item(Some(user), &resolved)
        });

        let held = spawned.and_then(|handle| self.items.get(&handle)).map(HeldItem::from);
        self.effects.push(HostEffect::Give {
            user,
            requested: item_name.to_string(),
            spawned: held.as_ref().map(|item| item.item_name.clone()),
        });
        held
    }

    fn remove_item(&mut self, item: ItemHandle) -> RemoveStatus {
        let status = if self.items.remove(&item).is_some() {
            RemoveStatus::Removed
        } else {
            RemoveStatus::AlreadyGone
        };
        self.effects.push(HostEffect::Remove { item, status });
        status
    }

    fn item_flag(&self, item: ItemHandle, flag: ItemFlag) -> Option<bool> {
        let item = self.items.get(&item)?;
        Some(match flag {
            ItemFlag::SilencerOn => item.silencer_on,
            ItemFlag::WeaponMode => item.weapon_mode,
        })
    }

    fn set_item_flag(&mut self, item: ItemHandle, flag: ItemFlag, value: bool) {
        if let Some(entity) = self.items.get_mut(&item) {
            match flag {
                ItemFlag::SilencerOn => entity.silencer_on = value,
                ItemFlag::WeaponMode => entity.weapon_mode = value,
            }
        }
        self.effects.push(HostEffect::SetFlag { item, flag, value });
    }

    fn select_item(&mut self, user: UserId, classname: &str) {
        if let Some(player) = self.players.get_mut(&user) {
            player.selected = Some(classname.to_string());
        }
        self.effects.push(HostEffect::Select {
            user,
            classname: classname.to_string(),
        });
    }

    fn team(&self, user: UserId) -> Team {
        self.players
            .get(&user)
            .map_or(Team::Unassigned, |player| player.team)
    }

    fn set_team(&mut self, user: UserId, team: Team) {
        if let Some(player) = self.players.get_mut(&user) {
            player.team = team;
        }
        self.effects.push(HostEffect::SetTeam { user, team });
    }

    fn silencer_default(&self, weapon: &WeaponDescriptor) -> bool {
        weapon.can_silence() && self.variant.silencer_default()
    }
}
