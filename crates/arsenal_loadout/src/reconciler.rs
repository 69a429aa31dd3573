//! # Equip Reconciler
//!
//! Drives a player's held items toward their active loadout.
//!
//! ## Per-slot States
//!
//! ```text
//! Absent ──give──> WrongItem ──remove+give──> CorrectItemWrongSilencer ──toggle──> Correct
//!    └────────────────give────────────────────────────┘                               ▲
//!                                                       └─────────already matches─────┘
//! ```
//!
//! ## Passes
//!
//! 1. **Strip**: remove every non-exempt held item whose tag the loadout lacks.
//! 2. **Converge**: walk tags in the catalog's descending order, replacing
//!    wrong items through [`TeamSwapSpawner`] and fixing silencer state.
//! 3. **Toggle protocol**: write the attachment flag, mirror it into the
//!    weapon-mode flag, then re-select weapons so the host redraws the model.
//!
//! A second `equip` with nothing changed in between issues no gives and
//! no removals.

use std::sync::Arc;

use arsenal_core::{ItemHandle, PlayerRef, UserId};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::catalog::{is_exempt_tag, WeaponCatalog, WeaponDescriptor};
use crate::host::{HeldItem, ItemFlag, LoadoutHost, RemoveStatus};
use crate::spawner::TeamSwapSpawner;
use crate::store::{HeldState, Loadout, LoadoutStore};

/// Tag of the preferred neutral weapon for single-slot re-selection.
const GRENADE_TAG: &str = "grenade";
/// Tag of the fallback neutral weapon.
const MELEE_TAG: &str = "melee";

/// Effects produced by one reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EquipReport {
    /// Items removed (strip pass and replaced slots).
    pub removed: Vec<ItemHandle>,
    /// Basenames handed out.
    pub spawned: Vec<String>,
    /// Basenames whose silencer state was toggled.
    pub silencer_toggles: Vec<String>,
    /// Whether random mode was applied.
    pub random: bool,
}

impl EquipReport {
    /// Returns true if no item was given or removed and no silencer touched.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.spawned.is_empty() && self.silencer_toggles.is_empty()
    }

    /// Returns true if a silencer was toggled and may need a later re-check.
    #[must_use]
    pub fn needs_silencer_check(&self) -> bool {
        !self.silencer_toggles.is_empty()
    }
}

/// Applies loadouts to players through a [`LoadoutHost`].
#[derive(Clone, Debug)]
pub struct EquipReconciler {
    catalog: Arc<WeaponCatalog>,
    spawner: TeamSwapSpawner,
}

impl EquipReconciler {
    /// Creates a reconciler over `catalog`.
    #[must_use]
    pub fn new(catalog: Arc<WeaponCatalog>) -> Self {
        Self {
            catalog,
            spawner: TeamSwapSpawner::new(),
        }
    }

    /// The catalog this reconciler resolves weapons against.
    #[must_use]
    pub fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    /// Converges held items to the active loadout.
    ///
    /// Unset silencer options of silenceable slots are filled in with the
    /// host default and written back to the store.
    pub fn equip<H: LoadoutHost + ?Sized>(
        &self,
        player: &PlayerRef,
        store: &mut LoadoutStore,
        host: &mut H,
    ) -> EquipReport {
        let user = player.user;
        let loadout = store.active_loadout(&player.identity).clone();
        let mut report = EquipReport::default();

        self.strip(host, user, |tag| loadout.contains_tag(tag), &mut report);

        for tag in self.catalog.converge_order() {
            let Some(slot) = loadout.slot(tag) else {
                continue;
            };
            let Some(weapon) = self.catalog.lookup_by_basename(slot.chosen_basename()) else {
                tracing::warn!(
                    "{} has {} in slot {} but it is not in the catalog",
                    player.identity,
                    slot.chosen_basename(),
                    tag
                );
                continue;
            };

            let item = match self.held_at(host, user, tag) {
                Some(item) if self.catalog.canonicalize(&item.item_name) == weapon.basename() => item,
                held => {
                    if let Some(wrong) = held {
                        tracing::debug!("user {} replacing {} with {}", user, wrong.item_name, weapon.basename());
                        remove(host, wrong.handle, &mut report);
                    }
                    let Some(item) = self.spawner.spawn(host, &self.catalog, user, weapon) else {
                        tracing::warn!("host refused to give {} to user {}", weapon.basename(), user);
                        continue;
                    };
                    report.spawned.push(weapon.basename().to_string());
                    item
                }
            };

            if !weapon.can_silence() {
                continue;
            }

            let wanted = match slot.silencer().as_bool() {
                Some(wanted) => wanted,
                None => {
                    let default_on = host.silencer_default(weapon);
                    store.set_silencer_option(&player.identity, tag, default_on);
                    default_on
                }
            };

            if host.item_flag(item.handle, ItemFlag::SilencerOn) != Some(wanted) {
                self.toggle_silencer(host, user, &item, wanted, &loadout);
                report.silencer_toggles.push(weapon.basename().to_string());
            }
        }

        tracing::debug!(
            "equipped user {}: {} removed, {} given, {} silencer toggles",
            user,
            report.removed.len(),
            report.spawned.len(),
            report.silencer_toggles.len()
        );
        report
    }

    /// Strips the player and gives one random weapon per catalog tag.
    ///
    /// Silencer options are neither read nor written; spawned weapons keep
    /// the host's default attachment state.
    pub fn equip_random<H, R>(
        &self,
        player: &PlayerRef,
        store: &mut LoadoutStore,
        host: &mut H,
        rng: &mut R,
    ) -> EquipReport
    where
        H: LoadoutHost + ?Sized,
        R: Rng + ?Sized,
    {
        let user = player.user;
        let mut report = EquipReport {
            random: true,
            ..EquipReport::default()
        };

        self.strip(host, user, |_| false, &mut report);
        store.set_random_mode(&player.identity, true);

        for tag in self.catalog.tags() {
            let choices: Vec<&WeaponDescriptor> = self.catalog.lookup_by_tag(tag).collect();
            let Some(weapon) = choices.choose(rng) else {
                continue;
            };
            if self.spawner.spawn(host, &self.catalog, user, weapon).is_some() {
                report.spawned.push(weapon.basename().to_string());
            }
        }

        tracing::debug!("user {} equipped randomly: {:?}", user, report.spawned);
        report
    }

    /// Equips the active loadout, or random weapons when the player is in
    /// random mode or the loadout is empty.
    pub fn equip_active<H, R>(
        &self,
        player: &PlayerRef,
        store: &mut LoadoutStore,
        host: &mut H,
        rng: &mut R,
    ) -> EquipReport
    where
        H: LoadoutHost + ?Sized,
        R: Rng + ?Sized,
    {
        if store.random_mode(&player.identity) || store.active_loadout(&player.identity).is_empty() {
            self.equip_random(player, store, host, rng)
        } else {
            self.equip(player, store, host)
        }
    }

    /// Snapshot of what the player carries, keyed by tag.
    ///
    /// Melee and grenade items are left out.
    pub fn held_state<H: LoadoutHost + ?Sized>(&self, host: &H, user: UserId) -> HeldState {
        let mut state = HeldState::new();
        for item in host.held_items(user) {
            let tag = self.tag_of(&item);
            if is_exempt_tag(tag) {
                continue;
            }
            let basename = self.catalog.canonicalize(&item.item_name);
            let silenceable = self
                .catalog
                .lookup_by_basename(basename)
                .is_some_and(WeaponDescriptor::can_silence);
            if silenceable {
                if let Some(on) = host.item_flag(item.handle, ItemFlag::SilencerOn) {
                    state.insert_silencer(tag, on);
                }
            }
            state.insert_item(tag, basename);
        }
        state
    }

    /// Returns true if the player's held items satisfy the active loadout.
    pub fn carries_loadout<H: LoadoutHost + ?Sized>(
        &self,
        player: &PlayerRef,
        store: &mut LoadoutStore,
        host: &H,
    ) -> bool {
        let held = self.held_state(host, player.user);
        store.active_loadout(&player.identity).matches_held_state(&held)
    }

    /// Catalog tag for catalog weapons, host tag otherwise.
    fn tag_of<'a>(&'a self, item: &'a HeldItem) -> &'a str {
        self.catalog
            .lookup_by_name(&item.item_name)
            .map_or(item.tag.as_str(), WeaponDescriptor::tag)
    }

    fn held_at<H: LoadoutHost + ?Sized>(&self, host: &H, user: UserId, tag: &str) -> Option<HeldItem> {
        host.held_items(user)
            .into_iter()
            .find(|item| self.tag_of(item) == tag)
    }

    fn strip<H, K>(&self, host: &mut H, user: UserId, keep: K, report: &mut EquipReport)
    where
        H: LoadoutHost + ?Sized,
        K: Fn(&str) -> bool,
    {
        for item in host.held_items(user) {
            let tag = self.tag_of(&item);
            if is_exempt_tag(tag) || keep(tag) {
                continue;
            }
            tracing::debug!("user {} stripping {}", user, item.item_name);
            remove(host, item.handle, report);
        }
    }

    fn toggle_silencer<H: LoadoutHost + ?Sized>(
        &self,
        host: &mut H,
        user: UserId,
        target: &HeldItem,
        on: bool,
        loadout: &Loadout,
    ) {
        tracing::debug!("user {} silencer on {} -> {}", user, target.item_name, on);
        host.set_item_flag(target.handle, ItemFlag::SilencerOn, on);
        host.set_item_flag(target.handle, ItemFlag::WeaponMode, on);

        let held = host.held_items(user);
        let others: Vec<&str> = self
            .catalog
            .converge_order()
            .iter()
            .filter(|tag| loadout.contains_tag(tag))
            .filter_map(|tag| held.iter().find(|item| self.tag_of(item) == tag.as_str()))
            .filter(|item| item.handle != target.handle)
            .map(|item| item.classname.as_str())
            .collect();

        if others.is_empty() {
            let placeholder = held
                .iter()
                .find(|item| self.tag_of(item) == GRENADE_TAG)
                .or_else(|| held.iter().find(|item| self.tag_of(item) == MELEE_TAG));
            if let Some(placeholder) = placeholder {
                host.select_item(user, &placeholder.classname);
            }
        } else {
            for classname in others {
                host.select_item(user, classname);
            }
        }
        host.select_item(user, &target.classname);
    }
}

/// Removes `item`, recording it only if the host actually removed it.
fn remove<H: LoadoutHost + ?Sized>(host: &mut H, item: ItemHandle, report: &mut EquipReport) {
    match host.remove_item(item) {
        RemoveStatus::Removed => report.removed.push(item),
        RemoveStatus::AlreadyGone => tracing::debug!("item {} was already gone", item),
    }
}
