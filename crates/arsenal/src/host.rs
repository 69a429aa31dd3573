//! # Arena Host
//!
//! The session needs more of the game server than reconciliation does:
//! player vitals, ammunition and map entities. [`ArenaHost`] extends
//! [`LoadoutHost`] with those calls.
//!
//! [`SimArena`] implements it on top of the in-memory [`SimWorld`] and can
//! feed the spawns it performs back into a [`SignalBus`](crate::SignalBus),
//! the way a real server raises a spawn event after a respawn.

use std::collections::BTreeMap;

use arsenal_core::{ItemHandle, Team, UserId};
use arsenal_loadout::{HeldItem, ItemFlag, LoadoutHost, RemoveStatus, SimWorld, WeaponDescriptor};

use crate::signals::{GameSignal, SignalSender};

/// Health restored on spawn and by knife kill rewards.
pub const FULL_HEALTH: u32 = 100;

/// Game server operations used by the deathmatch session.
pub trait ArenaHost: LoadoutHost {
    /// Whether the player is currently alive.
    fn is_alive(&self, user: UserId) -> bool;

    /// Brings a dead player back. Returns false if the host refused.
    fn respawn(&mut self, user: UserId) -> bool;

    /// Turns damage protection on or off.
    fn set_protected(&mut self, user: UserId, protected: bool);

    /// Hands out kevlar and helmet.
    fn give_armor(&mut self, user: UserId);

    /// Sets the player's health.
    fn set_health(&mut self, user: UserId, health: u32);

    /// Enables or disables collisions with other players.
    fn set_noblock(&mut self, user: UserId, noblock: bool);

    /// Weapon the player has drawn.
    fn active_item(&self, user: UserId) -> Option<HeldItem>;

    /// Looks up any item entity, held or on the ground.
    fn item(&self, item: ItemHandle) -> Option<HeldItem>;

    /// Player carrying `item`, `None` if it lies on the ground or is gone.
    fn item_owner(&self, item: ItemHandle) -> Option<UserId>;

    /// Rounds in the item's clip.
    fn clip(&self, item: ItemHandle) -> Option<u32>;

    /// Fills the item's clip.
    fn set_clip(&mut self, item: ItemHandle, rounds: u32);

    /// Sets the item's reserve ammunition.
    fn set_reserve_ammo(&mut self, item: ItemHandle, rounds: u32);

    /// Sends `Disable` to a map brush entity.
    fn disable_entity(&mut self, entity: ItemHandle);
}

// =============================================================================
// Simulated Arena
// =============================================================================

/// Per-player state tracked by [`SimArena`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Vitals {
    /// Alive flag.
    pub alive: bool,
    /// Current health.
    pub health: u32,
    /// Whether armor was handed out this life.
    pub armor: bool,
    /// Damage protection flag.
    pub protected: bool,
    /// Collision flag.
    pub noblock: bool,
    /// Number of spawns so far.
    pub spawns: u32,
}

/// Non-weapon map entity in the simulated arena.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapEntity {
    /// Entity class.
    pub classname: String,
    /// Cleared by [`ArenaHost::disable_entity`].
    pub enabled: bool,
}

/// Map entity handles start here so they never collide with item handles.
const MAP_ENTITY_BASE: u32 = 1 << 20;

/// In-memory [`ArenaHost`] for tests and the simulator binary.
pub struct SimArena {
    world: SimWorld,
    vitals: BTreeMap<UserId, Vitals>,
    entities: BTreeMap<ItemHandle, MapEntity>,
    next_entity: u32,
    signals: Option<SignalSender>,
}

impl SimArena {
    /// Wraps a simulated world.
    #[must_use]
    pub fn new(world: SimWorld) -> Self {
        Self {
            world,
            vitals: BTreeMap::new(),
            entities: BTreeMap::new(),
            next_entity: MAP_ENTITY_BASE,
            signals: None,
        }
    }

    /// Raises [`GameSignal::PlayerSpawned`] on `sender` for every spawn.
    #[must_use]
    pub fn with_signals(mut self, sender: SignalSender) -> Self {
        self.signals = Some(sender);
        self
    }

    /// The underlying item world.
    #[must_use]
    pub fn world(&self) -> &SimWorld {
        &self.world
    }

    /// Mutable access to the underlying item world.
    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    /// Adds a dead player on `team`.
    pub fn add_player(&mut self, user: UserId, team: Team) {
        self.world.add_player(user, team);
        self.vitals.insert(user, Vitals::default());
    }

    /// Removes a player and everything they carried.
    pub fn remove_player(&mut self, user: UserId) {
        self.world.remove_player(user);
        self.vitals.remove(&user);
    }

    /// Spawns a player with a knife and full health.
    ///
    /// Returns false for unknown players.
    pub fn spawn(&mut self, user: UserId) -> bool {
        let Some(vitals) = self.vitals.get_mut(&user) else {
            return false;
        };
        vitals.alive = true;
        vitals.health = FULL_HEALTH;
        vitals.armor = false;
        vitals.spawns += 1;

        let has_melee = self.world.held_items(user).iter().any(|item| item.tag == "melee");
        if !has_melee {
            self.world.spawn_item(Some(user), "knife");
        }

        if let Some(signals) = &self.signals {
            signals.send(GameSignal::PlayerSpawned { user });
        }
        true
    }

    /// Kills a player; everything they carried is destroyed.
    pub fn kill(&mut self, user: UserId) {
        if let Some(vitals) = self.vitals.get_mut(&user) {
            vitals.alive = false;
            vitals.health = 0;
        }
        self.world.destroy_items_of(user);
    }

    /// Vitals of a player.
    #[must_use]
    pub fn vitals(&self, user: UserId) -> Option<&Vitals> {
        self.vitals.get(&user)
    }

    /// Creates a map entity of `classname`.
    pub fn spawn_entity(&mut self, classname: &str) -> ItemHandle {
        let handle = ItemHandle(self.next_entity);
        self.next_entity += 1;
        self.entities.insert(
            handle,
            MapEntity {
                classname: classname.to_string(),
                enabled: true,
            },
        );
        handle
    }

    /// Looks up a map entity.
    #[must_use]
    pub fn entity(&self, handle: ItemHandle) -> Option<&MapEntity> {
        self.entities.get(&handle)
    }
}

impl LoadoutHost for SimArena {
    fn held_items(&self, user: UserId) -> Vec<HeldItem> {
        self.world.held_items(user)
    }

    fn give_item(&mut self, user: UserId, item_name: &str) -> Option<HeldItem> {
        self.world.give_item(user, item_name)
    }

    fn remove_item(&mut self, item: ItemHandle) -> RemoveStatus {
        if self.entities.remove(&item).is_some() {
            return RemoveStatus::Removed;
        }
        self.world.remove_item(item)
    }

    fn item_flag(&self, item: ItemHandle, flag: ItemFlag) -> Option<bool> {
        self.world.item_flag(item, flag)
    }

    fn set_item_flag(&mut self, item: ItemHandle, flag: ItemFlag, value: bool) {
        self.world.set_item_flag(item, flag, value);
    }

    fn select_item(&mut self, user: UserId, classname: &str) {
        self.world.select_item(user, classname);
    }

    fn team(&self, user: UserId) -> Team {
        self.world.team(user)
    }

    fn set_team(&mut self, user: UserId, team: Team) {
        self.world.set_team(user, team);
    }

    fn silencer_default(&self, weapon: &WeaponDescriptor) -> bool {
        self.world.silencer_default(weapon)
    }
}

impl ArenaHost for SimArena {
    fn is_alive(&self, user: UserId) -> bool {
        self.vitals.get(&user).is_some_and(|vitals| vitals.alive)
    }

    fn respawn(&mut self, user: UserId) -> bool {
        if self.is_alive(user) || !self.world.team(user).is_playing() {
            return false;
        }
        self.spawn(user)
    }

    fn set_protected(&mut self, user: UserId, protected: bool) {
        if let Some(vitals) = self.vitals.get_mut(&user) {
            vitals.protected = protected;
        }
    }

    fn give_armor(&mut self, user: UserId) {
        if let Some(vitals) = self.vitals.get_mut(&user) {
            vitals.armor = true;
        }
    }

    fn set_health(&mut self, user: UserId, health: u32) {
        if let Some(vitals) = self.vitals.get_mut(&user) {
            vitals.health = health;
        }
    }

    fn set_noblock(&mut self, user: UserId, noblock: bool) {
        if let Some(vitals) = self.vitals.get_mut(&user) {
            vitals.noblock = noblock;
        }
    }

    fn active_item(&self, user: UserId) -> Option<HeldItem> {
        self.world.active_item(user).map(HeldItem::from)
    }

    fn item(&self, item: ItemHandle) -> Option<HeldItem> {
        self.world.item(item).map(HeldItem::from)
    }

    fn item_owner(&self, item: ItemHandle) -> Option<UserId> {
        self.world.item(item).and_then(|item| item.owner)
    }

    fn clip(&self, item: ItemHandle) -> Option<u32> {
        self.world.item(item).map(|item| item.clip)
    }

    fn set_clip(&mut self, item: ItemHandle, rounds: u32) {
        if let Some(item) = self.world.item_mut(item) {
            item.clip = rounds;
        }
    }

    fn set_reserve_ammo(&mut self, item: ItemHandle, rounds: u32) {
        if let Some(item) = self.world.item_mut(item) {
            item.reserve_ammo = rounds;
        }
    }

    fn disable_entity(&mut self, entity: ItemHandle) {
        if let Some(entity) = self.entities.get_mut(&entity) {
            entity.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arsenal_loadout::{GameVariant, StaticRegistry};

    use crate::signals::SignalBus;

    fn arena() -> SimArena {
        let registry = StaticRegistry::from_toml_str(include_str!("../../../data/hosts/csgo.toml"))
            .expect("host table");
        SimArena::new(SimWorld::new(registry, GameVariant::Csgo))
    }

    #[test]
    fn test_spawn_gives_knife_once() {
        let mut arena = arena();
        arena.add_player(UserId(1), Team::Terrorist);
        assert!(!arena.is_alive(UserId(1)));

        assert!(arena.spawn(UserId(1)));
        assert!(arena.spawn(UserId(1)));
        let knives = arena
            .held_items(UserId(1))
            .iter()
            .filter(|item| item.tag == "melee")
            .count();
        assert_eq!(knives, 1);
        assert_eq!(arena.vitals(UserId(1)).map(|v| v.spawns), Some(2));
    }

    #[test]
    fn test_respawn_requires_dead_player_on_playing_team() {
        let (tx, rx) = SignalBus::create_pair(8);
        let mut arena = arena().with_signals(tx);
        arena.add_player(UserId(1), Team::Spectator);
        arena.add_player(UserId(2), Team::CounterTerrorist);

        assert!(!arena.respawn(UserId(1)));
        assert!(arena.respawn(UserId(2)));
        assert!(!arena.respawn(UserId(2)));
        assert_eq!(rx.drain(), vec![GameSignal::PlayerSpawned { user: UserId(2) }]);

        arena.kill(UserId(2));
        assert!(arena.held_items(UserId(2)).is_empty());
        assert!(!arena.is_alive(UserId(2)));
    }

    #[test]
    fn test_map_entities_are_separate_from_items() {
        let mut arena = arena();
        let zone = arena.spawn_entity("func_buyzone");
        let hostage = arena.spawn_entity("hostage_entity");
        assert!(zone.0 >= MAP_ENTITY_BASE);

        arena.disable_entity(zone);
        assert_eq!(arena.entity(zone).map(|e| e.enabled), Some(false));
        assert_eq!(arena.remove_item(hostage), RemoveStatus::Removed);
        assert!(arena.entity(hostage).is_none());
    }

    #[test]
    fn test_ammo_accessors() {
        let mut arena = arena();
        arena.add_player(UserId(1), Team::Terrorist);
        let ak = arena.world_mut().spawn_item(Some(UserId(1)), "ak47").expect("ak47");

        assert_eq!(arena.clip(ak), Some(30));
        arena.set_clip(ak, 1);
        arena.set_reserve_ammo(ak, 0);
        assert_eq!(arena.world().item(ak).map(|i| (i.clip, i.reserve_ammo)), Some((1, 0)));
        assert_eq!(arena.item_owner(ak), Some(UserId(1)));
    }
}
