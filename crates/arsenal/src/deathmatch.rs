//! # Deathmatch Session
//!
//! Turns host signals into loadout reconciliation and delayed actions.
//!
//! ## Architecture
//!
//! ```text
//!   GameSignal ──> handle() ──┬──> EquipReconciler ──> ArenaHost
//!                             │
//!                             └──> DelayScheduler<DelayedAction>
//!                                        │
//!   tick(dt) ──> pop_due() ──> Dispatch ─┴──> run() ──> ArenaHost
//! ```
//!
//! ## Scheduling Rule
//!
//! Scheduling an action cancels whatever is pending under the same id
//! first, and runs it if it asked to be invoked on cancel. Only then is
//! the new action registered. Spawn protection relies on this: ending the
//! old window never clears a window that was just opened.

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use arsenal_core::{DelayScheduler, Dispatch, ItemHandle, PlayerId, PlayerRef, Team, UserId};
use arsenal_loadout::{
    is_exempt_tag, EquipReconciler, EquipReport, ItemFlag, LoadoutResult, LoadoutStore,
    RemoveStatus, SilencerOption, WeaponCatalog,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::actions::DelayedAction;
use crate::config::{ArenaConfig, GrenadeMode};
use crate::host::{ArenaHost, FULL_HEALTH};
use crate::roster::PlayerRoster;
use crate::signals::{GameSignal, SignalReceiver};

/// Basename of the grenade handed out by the grenade modes.
const GRENADE: &str = "hegrenade";

/// Result of [`Deathmatch::select_loadout`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SelectOutcome {
    /// The player already carries the selected loadout and may edit it.
    Editing,
    /// The selected loadout was equipped.
    Equipping(EquipReport),
    /// The player is dead; the loadout is equipped on the next spawn.
    Deferred,
}

/// A running deathmatch: loadouts, delays and host wiring.
pub struct Deathmatch<H: ArenaHost> {
    config: ArenaConfig,
    catalog: Arc<WeaponCatalog>,
    store: LoadoutStore,
    reconciler: EquipReconciler,
    delays: DelayScheduler<DelayedAction>,
    roster: PlayerRoster,
    rng: ChaCha8Rng,
    host: H,
}

impl<H: ArenaHost> Deathmatch<H> {
    /// Creates a session over `host`.
    ///
    /// Random loadouts draw from `config.rng_seed`, or from the clock
    /// when no seed is configured.
    #[must_use]
    pub fn new(config: ArenaConfig, catalog: Arc<WeaponCatalog>, host: H) -> Self {
        let seed = config.rng_seed.unwrap_or_else(clock_seed);
        tracing::info!(
            "Deathmatch session started: {} weapons, game {}, seed {}",
            catalog.len(),
            catalog.game(),
            seed
        );
        Self {
            store: LoadoutStore::new(Arc::clone(&catalog)),
            reconciler: EquipReconciler::new(Arc::clone(&catalog)),
            catalog,
            delays: DelayScheduler::new(),
            roster: PlayerRoster::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            config,
            host,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Session settings.
    #[must_use]
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Weapon catalog.
    #[must_use]
    pub fn catalog(&self) -> &WeaponCatalog {
        &self.catalog
    }

    /// The host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Mutable access to the host.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Loadout storage.
    #[must_use]
    pub fn store(&self) -> &LoadoutStore {
        &self.store
    }

    /// Mutable access to loadout storage.
    pub fn store_mut(&mut self) -> &mut LoadoutStore {
        &mut self.store
    }

    /// Pending delayed actions.
    #[must_use]
    pub fn delays(&self) -> &DelayScheduler<DelayedAction> {
        &self.delays
    }

    /// Connected players.
    #[must_use]
    pub fn roster(&self) -> &PlayerRoster {
        &self.roster
    }

    // =========================================================================
    // Driving
    // =========================================================================

    /// Handles every signal waiting on `receiver`. Returns how many.
    pub fn pump(&mut self, receiver: &SignalReceiver) -> usize {
        let signals = receiver.drain();
        let count = signals.len();
        for signal in signals {
            self.handle(signal);
        }
        count
    }

    /// Advances the delay clock and runs what came due. Returns how many.
    ///
    /// Actions are taken one at a time so a handler that cancels a later
    /// action in the same tick keeps it from running.
    pub fn tick(&mut self, dt: Duration) -> usize {
        self.delays.advance(dt);
        let mut count = 0;
        while let Some(dispatch) = self.delays.pop_due() {
            self.run(dispatch);
            count += 1;
        }
        count
    }

    /// Handles one host signal.
    pub fn handle(&mut self, signal: GameSignal) {
        match signal {
            GameSignal::PlayerConnected { user, identity } => self.on_connected(user, identity),
            GameSignal::PlayerSpawned { user } => self.on_spawned(user),
            GameSignal::PlayerDied {
                victim,
                attacker,
                weapon,
                headshot,
            } => self.on_died(victim, attacker, &weapon, headshot),
            GameSignal::PlayerDisconnected { user } => self.on_disconnected(user),
            GameSignal::WeaponReloaded { user } => self.on_reloaded(user),
            GameSignal::WeaponFired { user } => self.on_fired(user),
            GameSignal::WeaponDropped { item, .. } => {
                self.delay(DelayedAction::RemoveDropped(item), self.config.drop_cleanup());
            }
            GameSignal::GrenadeDetonated { user } => {
                if self.config.grenade_mode == GrenadeMode::SpawnAndDetonate {
                    self.give_grenade(user);
                }
            }
            GameSignal::SilencerToggled { user, attached } => self.on_silencer_toggled(user, attached),
            GameSignal::EntitySpawned { entity, classname } => self.on_entity_spawned(entity, &classname),
            GameSignal::EntityDeleted { item } => {
                for id in DelayedAction::item_ids(item) {
                    self.cancel(&id);
                }
            }
            GameSignal::RoundStarted => {
                self.delays.set_enabled(true);
                tracing::info!("Round started");
            }
            GameSignal::RoundFreezeEnded => self.on_freeze_ended(),
            GameSignal::RoundEnded => {
                self.cancel_all();
                self.delays.set_enabled(false);
                self.roster.clear_team_changes();
                tracing::info!("Round ended");
            }
            GameSignal::LevelEnded => {
                self.cancel_all();
                self.store.reset_session();
                self.roster.clear_team_changes();
                tracing::info!("Level ended, loadouts kept for {} players", self.store.len());
            }
        }
    }

    // =========================================================================
    // Player Commands
    // =========================================================================

    /// Switches to the loadout a player typed (1-based).
    ///
    /// Returns `None` without touching any state for unknown players and
    /// for non-numeric or non-positive input.
    pub fn select_loadout(&mut self, user: UserId, input: &str) -> Option<SelectOutcome> {
        let player = self.roster.player(user)?;
        let index = self.store.select_from_input(&player.identity, input)?;
        tracing::info!("{} selected loadout {}", player.identity, index + 1);

        if !self.host.is_alive(user) {
            return Some(SelectOutcome::Deferred);
        }
        if self
            .reconciler
            .carries_loadout(&player, &mut self.store, &self.host)
        {
            return Some(SelectOutcome::Editing);
        }
        Some(SelectOutcome::Equipping(self.equip(&player)))
    }

    /// Puts a weapon into the player's active loadout and equips it.
    ///
    /// Returns the equip report, or `None` if the player is unknown or
    /// dead (the choice still applies from the next spawn).
    ///
    /// # Errors
    ///
    /// Returns [`LoadoutError::UnknownWeapon`](arsenal_loadout::LoadoutError::UnknownWeapon)
    /// if `basename` is not in the catalog.
    pub fn choose_weapon(&mut self, user: UserId, basename: &str) -> LoadoutResult<Option<EquipReport>> {
        let Some(player) = self.roster.player(user) else {
            tracing::warn!("weapon choice from unknown user {}", user);
            return Ok(None);
        };
        self.store.choose_weapon(&player.identity, basename)?;

        if !self.host.is_alive(user) {
            return Ok(None);
        }
        Ok(Some(self.equip(&player)))
    }

    /// Moves a player to `team` if their per-round allowance permits.
    ///
    /// Spectating is always allowed. Joining a playing team counts against
    /// `team_changes_per_round`, the first join included.
    pub fn request_team_change(&mut self, user: UserId, team: Team) -> bool {
        if !team.is_playing() {
            self.host.set_team(user, team);
            return true;
        }
        let Some(player) = self.roster.player(user) else {
            return false;
        };
        if !self
            .roster
            .try_team_change(&player.identity, self.config.team_changes_per_round)
        {
            tracing::info!("{} is out of team changes this round", player.identity);
            return false;
        }
        self.host.set_team(user, team);
        true
    }

    /// Decides whether a player may pick up `item`.
    ///
    /// Melee and grenades are always allowed; other weapons outside the
    /// catalog never are. Outside random mode only the weapon the loadout
    /// chose for that tag is allowed. An allowed silenceable pickup gets
    /// its silencer set to a coin flip in random mode, or to the slot's
    /// option otherwise (left alone when unset).
    pub fn allow_pickup(&mut self, user: UserId, item: ItemHandle) -> bool {
        let Some(held) = self.host.item(item) else {
            return false;
        };
        let Some(weapon) = self.catalog.lookup_by_name(&held.item_name) else {
            return is_exempt_tag(&held.tag);
        };
        let Some(player) = self.roster.player(user) else {
            return false;
        };

        let option = if self.store.random_mode(&player.identity) {
            SilencerOption::from_bool(self.rng.gen())
        } else {
            let loadout = self.store.active_loadout(&player.identity);
            match loadout.slot(weapon.tag()) {
                Some(slot) if slot.chosen_basename() == weapon.basename() => slot.silencer(),
                _ => return false,
            }
        };

        if weapon.can_silence() {
            if let Some(on) = option.as_bool() {
                self.host.set_item_flag(item, ItemFlag::SilencerOn, on);
                self.host.set_item_flag(item, ItemFlag::WeaponMode, on);
            }
        }
        true
    }

    // =========================================================================
    // Signal Handlers
    // =========================================================================

    fn on_connected(&mut self, user: UserId, identity: PlayerId) {
        tracing::info!("user {} connected as {}", user, identity);
        self.roster.connect(user, identity);
    }

    fn on_spawned(&mut self, user: UserId) {
        if !self.host.is_alive(user) || !self.host.team(user).is_playing() {
            return;
        }

        self.host.give_armor(user);
        if self.config.grenade_mode.on_spawn() {
            self.give_grenade(user);
        }
        self.host.set_noblock(user, self.config.noblock);
        self.enable_protection(user);

        match self.roster.player(user) {
            Some(player) => {
                self.equip(&player);
            }
            None => tracing::warn!("spawned user {} is not on the roster", user),
        }
    }

    fn on_died(&mut self, victim: UserId, attacker: Option<UserId>, weapon: &str, headshot: bool) {
        if let Some(attacker) = attacker.filter(|attacker| *attacker != victim) {
            if self.host.is_alive(attacker) {
                self.reward(attacker, weapon, headshot);
            }
        }
        self.delay(DelayedAction::Respawn(victim), self.config.respawn());
    }

    fn reward(&mut self, attacker: UserId, weapon: &str, headshot: bool) {
        if headshot && self.config.refill_clip_on_headshot {
            if let Some(item) = self.host.active_item(attacker) {
                if let Some(active) = self.catalog.lookup_by_name(&item.item_name) {
                    self.host.set_clip(item.handle, active.clip_size());
                    self.host.set_reserve_ammo(item.handle, active.max_ammo());
                }
            }
        }

        if weapon == GRENADE && self.config.grenade_mode == GrenadeMode::SpawnAndKill {
            self.give_grenade(attacker);
        }

        if weapon.starts_with("knife") && self.config.restore_health_on_knife_kill {
            self.host.set_health(attacker, FULL_HEALTH);
        }
    }

    fn on_disconnected(&mut self, user: UserId) {
        for id in DelayedAction::player_ids(user) {
            self.cancel(&id);
        }
        if let Some(identity) = self.roster.disconnect(user) {
            self.store
                .forget(&identity, self.config.keep_loadouts_on_disconnect);
            tracing::info!("{} disconnected", identity);
        }
    }

    fn on_reloaded(&mut self, user: UserId) {
        if !self.config.infinite_ammo {
            return;
        }
        let Some(item) = self.host.active_item(user) else {
            return;
        };
        if let Some(weapon) = self.catalog.lookup_by_name(&item.item_name) {
            self.host.set_reserve_ammo(item.handle, weapon.max_ammo());
        }
    }

    fn on_fired(&mut self, user: UserId) {
        if !self.config.infinite_ammo {
            return;
        }
        let Some(item) = self.host.active_item(user) else {
            return;
        };
        if self.catalog.lookup_by_name(&item.item_name).is_none() {
            return;
        }
        if self.host.clip(item.handle) == Some(1) {
            self.delay(DelayedAction::RefillClip(item.handle), self.config.refill_clip());
        }
    }

    fn on_silencer_toggled(&mut self, user: UserId, attached: bool) {
        if !self.host.is_alive(user) {
            return;
        }
        let Some(player) = self.roster.player(user) else {
            return;
        };
        let Some(item) = self.host.active_item(user) else {
            return;
        };
        let Some(weapon) = self.catalog.lookup_by_name(&item.item_name) else {
            return;
        };

        let tracked = self
            .store
            .active_loadout(&player.identity)
            .slot(weapon.tag())
            .is_some_and(|slot| slot.chosen_basename() == weapon.basename());
        if tracked && self.store.set_silencer_option(&player.identity, weapon.tag(), attached) {
            tracing::debug!("{} prefers silencer {} on {}", player.identity, attached, weapon.basename());
        }
    }

    fn on_entity_spawned(&mut self, entity: ItemHandle, classname: &str) {
        if self.config.is_forbidden(classname) {
            if self.host.remove_item(entity) == RemoveStatus::Removed {
                tracing::debug!("removed forbidden {} {}", classname, entity);
            }
        } else if self.config.is_disabled_map_function(classname) {
            self.host.disable_entity(entity);
            tracing::debug!("disabled {} {}", classname, entity);
        }
    }

    fn on_freeze_ended(&mut self) {
        let alive: Vec<UserId> = self
            .roster
            .users()
            .filter(|user| self.host.is_alive(*user))
            .collect();
        for user in alive {
            self.enable_protection(user);
        }
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn equip(&mut self, player: &PlayerRef) -> EquipReport {
        let report = self
            .reconciler
            .equip_active(player, &mut self.store, &mut self.host, &mut self.rng);
        if report.needs_silencer_check() {
            self.delay(DelayedAction::VerifyLoadout(player.user), self.config.silencer_verify());
        }
        report
    }

    fn enable_protection(&mut self, user: UserId) {
        let action = DelayedAction::EndProtection(user);
        self.cancel(&action.id());
        self.host.set_protected(user, true);
        self.delay(action, self.config.spawn_protection());
    }

    fn give_grenade(&mut self, user: UserId) {
        let name = format!("{}{GRENADE}", self.catalog.prefix());
        let held = self
            .host
            .held_items(user)
            .iter()
            .any(|item| item.item_name == name);
        if !held && self.host.give_item(user, &name).is_none() {
            tracing::warn!("host refused a grenade for user {}", user);
        }
    }

    /// Registers `action`, first running a displaced invoke-on-cancel action.
    fn delay(&mut self, action: DelayedAction, after: Duration) {
        let id = action.id();
        self.cancel(&id);
        if let Some(displaced) = self.delays.schedule_with(id, after, action, action.on_cancel()) {
            self.run(displaced);
        }
    }

    fn cancel(&mut self, id: &str) {
        if let Some(dispatch) = self.delays.cancel(id) {
            self.run(dispatch);
        }
    }

    fn cancel_all(&mut self) {
        for dispatch in self.delays.cancel_all() {
            self.run(dispatch);
        }
    }

    fn run(&mut self, dispatch: Dispatch<DelayedAction>) {
        tracing::debug!("running {} ({:?})", dispatch.id, dispatch.trigger);
        match dispatch.action {
            DelayedAction::Respawn(user) => {
                if self.host.is_alive(user) || !self.host.team(user).is_playing() {
                    return;
                }
                if !self.host.respawn(user) {
                    tracing::warn!("host refused to respawn user {}", user);
                }
            }
            DelayedAction::EndProtection(user) => self.host.set_protected(user, false),
            DelayedAction::RemoveDropped(item) => {
                if let Some(owner) = self.host.item_owner(item) {
                    tracing::debug!("dropped {} was picked up by user {}", item, owner);
                    return;
                }
                match self.host.remove_item(item) {
                    RemoveStatus::Removed => tracing::debug!("removed dropped {}", item),
                    RemoveStatus::AlreadyGone => tracing::debug!("dropped {} already gone", item),
                }
            }
            DelayedAction::RefillClip(item) => {
                let clip = self
                    .host
                    .item(item)
                    .and_then(|held| self.catalog.lookup_by_name(&held.item_name))
                    .map(|weapon| weapon.clip_size());
                if let Some(clip) = clip {
                    self.host.set_clip(item, clip);
                }
            }
            DelayedAction::VerifyLoadout(user) => {
                let Some(player) = self.roster.player(user) else {
                    return;
                };
                if !self.host.is_alive(user) || self.store.random_mode(&player.identity) {
                    return;
                }
                if !self
                    .reconciler
                    .carries_loadout(&player, &mut self.store, &self.host)
                {
                    tracing::warn!("{} lost loadout after silencer toggle, re-equipping", player.identity);
                    self.reconciler
                        .equip(&player, &mut self.store, &mut self.host);
                }
            }
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs() ^ u64::from(elapsed.subsec_nanos()))
}
