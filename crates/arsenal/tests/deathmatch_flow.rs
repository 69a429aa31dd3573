//! # Deathmatch Flow Tests
//!
//! Plays signals through a full session on the simulated CS:GO host.

use std::sync::Arc;
use std::time::Duration;

use arsenal::{
    ArenaConfig, ArenaHost, Deathmatch, DelayedAction, GameSignal, SelectOutcome, SignalBus,
    SignalReceiver, SimArena,
};
use arsenal_core::{ItemHandle, PlayerId, Team, UserId};
use arsenal_loadout::{
    GameVariant, HeldItem, HostEffect, LoadoutError, LoadoutHost, RemoveStatus, SilencerOption,
    SimWorld, StaticRegistry, WeaponCatalog,
};

const CSGO_HOST: &str = include_str!("../../../data/hosts/csgo.toml");
const CSGO_WEAPONS: &str = include_str!("../../../data/weapons/csgo.toml");

const STEP: Duration = Duration::from_millis(10);

struct Match {
    session: Deathmatch<SimArena>,
    receiver: SignalReceiver,
}

impl Match {
    fn new(settings: &str) -> Self {
        let config = ArenaConfig::from_toml_str(&format!("rng_seed = 7\n{settings}")).expect("settings");
        let registry = StaticRegistry::from_toml_str(CSGO_HOST).expect("host registry");
        let catalog = Arc::new(WeaponCatalog::load(CSGO_WEAPONS, &registry).expect("catalog loads"));
        let (signals, receiver) = SignalBus::create_pair(64);
        let host = SimArena::new(SimWorld::new(registry, GameVariant::Csgo)).with_signals(signals);
        Self {
            session: Deathmatch::new(config, catalog, host),
            receiver,
        }
    }

    fn identity(user: UserId) -> PlayerId {
        PlayerId::new(format!("STEAM_1:0:{user}"))
    }

    fn join(&mut self, user: u32, team: Team) -> UserId {
        let user = UserId(user);
        self.session.host_mut().add_player(user, team);
        self.session.handle(GameSignal::PlayerConnected {
            user,
            identity: Self::identity(user),
        });
        user
    }

    fn spawn(&mut self, user: UserId) {
        assert!(self.session.host_mut().spawn(user));
        self.pump();
    }

    fn die(&mut self, victim: UserId) {
        self.session.host_mut().kill(victim);
        self.session.handle(GameSignal::PlayerDied {
            victim,
            attacker: None,
            weapon: "world".to_string(),
            headshot: false,
        });
    }

    fn pump(&mut self) {
        self.session.pump(&self.receiver);
    }

    fn advance(&mut self, span: Duration) {
        let mut elapsed = Duration::ZERO;
        while elapsed < span {
            self.pump();
            self.session.tick(STEP);
            elapsed += STEP;
        }
        self.pump();
    }

    fn held(&self, user: UserId, tag: &str) -> Option<HeldItem> {
        self.session
            .host()
            .held_items(user)
            .into_iter()
            .find(|item| item.tag == tag)
    }

    fn ground(&mut self, basename: &str) -> ItemHandle {
        self.session
            .host_mut()
            .world_mut()
            .spawn_item(None, basename)
            .expect("registered weapon")
    }

    fn slot_silencer(&self, user: UserId, tag: &str) -> Option<SilencerOption> {
        let identity = Self::identity(user);
        let set = self.session.store().player(&identity)?;
        let selection = set.active_selection();
        set.loadout(selection)?.slot(tag).map(|slot| slot.silencer())
    }

    fn protected(&self, user: UserId) -> bool {
        self.session
            .host()
            .vitals(user)
            .is_some_and(|vitals| vitals.protected)
    }
}

// =============================================================================
// Spawning and respawning
// =============================================================================

#[test]
fn test_spawn_prepares_player() {
    let mut game = Match::new("grenade_mode = \"spawn\"\nnoblock = true");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);

    let vitals = *game.session.host().vitals(user).expect("vitals");
    assert!(vitals.armor);
    assert!(vitals.protected);
    assert!(vitals.noblock);
    assert_eq!(game.held(user, "grenade").map(|i| i.item_name).as_deref(), Some("weapon_hegrenade"));
    assert!(game.held(user, "secondary").is_some());
    assert!(game.held(user, "primary").is_some());
    assert!(game.session.delays().is_pending("protect_1"));
}

#[test]
fn test_spectator_spawn_is_ignored() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Spectator);
    game.spawn(user);

    let vitals = game.session.host().vitals(user).expect("vitals");
    assert!(!vitals.armor);
    assert!(!vitals.protected);
    assert!(game.held(user, "primary").is_none());
}

#[test]
fn test_respawn_after_delay() {
    let mut game = Match::new("respawn_delay = 2.0");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);
    game.die(user);
    assert!(game.session.delays().is_pending("respawn_1"));

    game.advance(Duration::from_millis(1900));
    assert!(!game.session.host().is_alive(user));

    game.advance(Duration::from_millis(200));
    assert!(game.session.host().is_alive(user));
    assert!(game.held(user, "primary").is_some());
    assert_eq!(game.session.host().vitals(user).map(|v| v.spawns), Some(2));
}

#[test]
fn test_protection_rearm_keeps_player_protected() {
    let mut game = Match::new("spawn_protection_delay = 2.0");
    let user = game.join(1, Team::CounterTerrorist);
    game.spawn(user);
    assert!(game.protected(user));

    game.advance(Duration::from_secs(1));
    game.session.handle(GameSignal::RoundFreezeEnded);
    assert!(game.protected(user));
    assert_eq!(game.session.delays().remaining("protect_1"), Some(Duration::from_secs(2)));

    game.advance(Duration::from_millis(1990));
    assert!(game.protected(user));
    game.advance(Duration::from_millis(20));
    assert!(!game.protected(user));
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_disconnect_cancels_player_delays() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);
    game.session.choose_weapon(user, "ak47").expect("catalog weapon");
    game.die(user);
    assert!(game.session.delays().is_pending("respawn_1"));
    assert!(game.session.delays().is_pending("protect_1"));

    game.session.handle(GameSignal::PlayerDisconnected { user });
    assert!(game.session.delays().is_empty());
    assert!(!game.protected(user));
    assert!(game.session.roster().is_empty());

    let identity = Match::identity(user);
    let set = game.session.store().player(&identity).expect("loadouts kept");
    assert_eq!(set.loadout_count(), 1);
    assert!(set.random_mode());
}

#[test]
fn test_disconnect_can_drop_loadouts() {
    let mut game = Match::new("keep_loadouts_on_disconnect = false");
    let user = game.join(1, Team::Terrorist);
    game.session.choose_weapon(user, "ak47").expect("catalog weapon");

    game.session.handle(GameSignal::PlayerDisconnected { user });
    assert!(game.session.store().player(&Match::identity(user)).is_none());
}

#[test]
fn test_round_end_freezes_delays() {
    let mut game = Match::new("respawn_delay = 2.0");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);
    game.die(user);

    game.session.handle(GameSignal::RoundEnded);
    assert!(game.session.delays().is_empty());
    assert!(!game.session.delays().is_enabled());
    assert!(!game.protected(user));

    game.session.handle(GameSignal::PlayerDied {
        victim: user,
        attacker: None,
        weapon: "world".to_string(),
        headshot: false,
    });
    game.advance(Duration::from_secs(3));
    assert!(!game.session.host().is_alive(user));

    game.session.handle(GameSignal::RoundStarted);
    game.advance(Duration::from_millis(2100));
    assert!(game.session.host().is_alive(user));
}

#[test]
fn test_level_end_keeps_loadouts() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    game.session.choose_weapon(user, "awp").expect("catalog weapon");
    game.session.select_loadout(user, "3");
    assert!(game.session.request_team_change(user, Team::CounterTerrorist));

    game.session.handle(GameSignal::LevelEnded);

    let identity = Match::identity(user);
    let set = game.session.store().player(&identity).expect("loadouts kept");
    assert_eq!(set.active_selection(), 0);
    assert!(set.random_mode());
    assert!(set.loadout(0).is_some_and(|loadout| loadout.contains_tag("primary")));
    assert_eq!(game.session.roster().team_changes(&identity), 0);
}

// =============================================================================
// Weapons on the ground
// =============================================================================

#[test]
fn test_dropped_weapon_cleanup() {
    let mut game = Match::new("drop_cleanup_delay = 1.0");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);

    let lying = game.ground("awp");
    let picked = game.ground("famas");
    let vanished = game.ground("aug");
    for item in [lying, picked, vanished] {
        game.session.handle(GameSignal::WeaponDropped { user, item });
        assert!(game.session.delays().is_pending(&DelayedAction::RemoveDropped(item).id()));
    }

    if let Some(item) = game.session.host_mut().world_mut().item_mut(picked) {
        item.owner = Some(user);
    }
    game.session.host_mut().world_mut().destroy_item(vanished);

    game.advance(Duration::from_millis(1010));
    let world = game.session.host().world();
    assert!(world.item(lying).is_none());
    assert!(world.item(picked).is_some());
    assert!(world.effects().contains(&HostEffect::Remove {
        item: vanished,
        status: RemoveStatus::AlreadyGone,
    }));
}

#[test]
fn test_entity_deleted_cancels_item_delays() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    let item = game.ground("awp");
    game.session.handle(GameSignal::WeaponDropped { user, item });

    game.session.handle(GameSignal::EntityDeleted { item });
    assert!(!game.session.delays().is_pending(&DelayedAction::RemoveDropped(item).id()));
    assert!(game.session.delays().is_empty());
}

#[test]
fn test_forbidden_entities_and_map_functions() {
    let mut game = Match::new("");
    let hostage = game.session.host_mut().spawn_entity("hostage_entity");
    let buyzone = game.session.host_mut().spawn_entity("func_buyzone");
    let spawnpoint = game.session.host_mut().spawn_entity("info_player_terrorist");

    for (entity, classname) in [
        (hostage, "hostage_entity"),
        (buyzone, "func_buyzone"),
        (spawnpoint, "info_player_terrorist"),
    ] {
        game.session.handle(GameSignal::EntitySpawned {
            entity,
            classname: classname.to_string(),
        });
    }

    let host = game.session.host();
    assert!(host.entity(hostage).is_none());
    assert_eq!(host.entity(buyzone).map(|e| e.enabled), Some(false));
    assert_eq!(host.entity(spawnpoint).map(|e| e.enabled), Some(true));
}

// =============================================================================
// Ammunition and kill rewards
// =============================================================================

#[test]
fn test_last_round_refills_clip() {
    let mut game = Match::new("infinite_ammo = true\nrefill_clip_delay = 0.0");
    let user = game.join(1, Team::Terrorist);
    game.session.choose_weapon(user, "ak47").expect("catalog weapon");
    game.spawn(user);

    let ak = game.held(user, "primary").expect("ak47 equipped");
    game.session.host_mut().select_item(user, &ak.classname);
    game.session.host_mut().set_clip(ak.handle, 1);

    game.session.handle(GameSignal::WeaponFired { user });
    assert!(game.session.delays().is_pending(&DelayedAction::RefillClip(ak.handle).id()));

    game.advance(STEP);
    assert_eq!(game.session.host().clip(ak.handle), Some(30));
}

#[test]
fn test_reload_restores_reserve() {
    let mut game = Match::new("infinite_ammo = true");
    let user = game.join(1, Team::Terrorist);
    game.session.choose_weapon(user, "ak47").expect("catalog weapon");
    game.spawn(user);

    let ak = game.held(user, "primary").expect("ak47 equipped");
    game.session.host_mut().select_item(user, &ak.classname);
    game.session.host_mut().set_reserve_ammo(ak.handle, 0);

    game.session.handle(GameSignal::WeaponReloaded { user });
    let reserve = game.session.host().world().item(ak.handle).map(|item| item.reserve_ammo);
    assert_eq!(reserve, Some(90));
}

#[test]
fn test_kill_rewards() {
    let mut game = Match::new(
        "refill_clip_on_headshot = true\nrestore_health_on_knife_kill = true\ngrenade_mode = \"spawn_and_kill\"",
    );
    let attacker = game.join(1, Team::Terrorist);
    let victim = game.join(2, Team::CounterTerrorist);
    game.session.choose_weapon(attacker, "ak47").expect("catalog weapon");
    game.spawn(attacker);
    game.spawn(victim);

    let ak = game.held(attacker, "primary").expect("ak47 equipped");
    let grenade = game.held(attacker, "grenade").expect("spawn grenade");
    {
        let host = game.session.host_mut();
        host.select_item(attacker, &ak.classname);
        host.set_clip(ak.handle, 3);
        host.set_reserve_ammo(ak.handle, 0);
        host.set_health(attacker, 40);
        host.world_mut().destroy_item(grenade.handle);
    }

    game.session.handle(GameSignal::PlayerDied {
        victim,
        attacker: Some(attacker),
        weapon: "hegrenade".to_string(),
        headshot: true,
    });
    let item = game.session.host().world().item(ak.handle).expect("ak47");
    assert_eq!((item.clip, item.reserve_ammo), (30, 90));
    assert!(game.held(attacker, "grenade").is_some());
    assert_eq!(game.session.host().vitals(attacker).map(|v| v.health), Some(40));

    game.session.handle(GameSignal::PlayerDied {
        victim,
        attacker: Some(attacker),
        weapon: "knife".to_string(),
        headshot: false,
    });
    assert_eq!(game.session.host().vitals(attacker).map(|v| v.health), Some(100));
    assert!(game.session.delays().is_pending("respawn_2"));
}

#[test]
fn test_detonation_grenade_only_in_detonate_mode() {
    let mut game = Match::new("grenade_mode = \"spawn_and_detonate\"");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);

    let grenade = game.held(user, "grenade").expect("spawn grenade");
    game.session.host_mut().world_mut().destroy_item(grenade.handle);
    game.session.handle(GameSignal::GrenadeDetonated { user });
    assert!(game.held(user, "grenade").is_some());

    let mut quiet = Match::new("grenade_mode = \"spawn_and_kill\"");
    let user = quiet.join(1, Team::Terrorist);
    quiet.spawn(user);
    let grenade = quiet.held(user, "grenade").expect("spawn grenade");
    quiet.session.host_mut().world_mut().destroy_item(grenade.handle);
    quiet.session.handle(GameSignal::GrenadeDetonated { user });
    assert!(quiet.held(user, "grenade").is_none());
}

// =============================================================================
// Player commands
// =============================================================================

#[test]
fn test_team_change_limit() {
    let mut game = Match::new("team_changes_per_round = 1");
    let user = game.join(1, Team::Unassigned);

    assert!(game.session.request_team_change(user, Team::CounterTerrorist));
    assert!(game.session.request_team_change(user, Team::Terrorist));
    assert!(!game.session.request_team_change(user, Team::CounterTerrorist));
    assert_eq!(game.session.host().team(user), Team::Terrorist);

    assert!(game.session.request_team_change(user, Team::Spectator));
    assert_eq!(game.session.host().team(user), Team::Spectator);

    game.session.handle(GameSignal::RoundEnded);
    assert!(game.session.request_team_change(user, Team::CounterTerrorist));
}

#[test]
fn test_select_loadout_input() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);
    let identity = Match::identity(user);

    for input in ["abc", "0", "-1", ""] {
        assert_eq!(game.session.select_loadout(user, input), None);
    }
    assert_eq!(game.session.store().active_selection(&identity), 0);
    assert!(game.session.store().random_mode(&identity));

    // An empty loadout is trivially carried, so it opens for editing.
    assert_eq!(game.session.select_loadout(user, "2"), Some(SelectOutcome::Editing));
    assert_eq!(game.session.store().active_selection(&identity), 1);
    assert!(!game.session.store().random_mode(&identity));

    game.session.choose_weapon(user, "ak47").expect("catalog weapon");
    assert_eq!(game.session.select_loadout(user, "2"), Some(SelectOutcome::Editing));
    assert_eq!(game.session.select_loadout(user, "1"), Some(SelectOutcome::Editing));
    game.session.choose_weapon(user, "awp").expect("catalog weapon");

    match game.session.select_loadout(user, "2") {
        Some(SelectOutcome::Equipping(report)) => {
            assert!(!report.random);
            assert_eq!(report.spawned, vec!["ak47".to_string()]);
        }
        other => panic!("expected equipping, got {other:?}"),
    }
    assert_eq!(game.held(user, "primary").map(|i| i.item_name).as_deref(), Some("weapon_ak47"));

    game.die(user);
    assert_eq!(game.session.select_loadout(user, "1"), Some(SelectOutcome::Deferred));
    assert_eq!(game.session.select_loadout(UserId(99), "1"), None);
}

#[test]
fn test_choose_unknown_weapon() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    assert!(matches!(
        game.session.choose_weapon(user, "railgun"),
        Err(LoadoutError::UnknownWeapon(name)) if name == "railgun"
    ));
    assert!(matches!(game.session.choose_weapon(user, "ak47"), Ok(None)));
}

#[test]
fn test_silencer_toggle_is_remembered() {
    let mut game = Match::new("");
    let user = game.join(1, Team::CounterTerrorist);
    game.spawn(user);
    game.session.choose_weapon(user, "usp_silencer").expect("catalog weapon");
    assert_eq!(game.slot_silencer(user, "secondary"), Some(SilencerOption::On));

    let usp = game.held(user, "secondary").expect("usp equipped");
    game.session.host_mut().select_item(user, &usp.classname);
    game.session.handle(GameSignal::SilencerToggled {
        user,
        attached: false,
    });
    assert_eq!(game.slot_silencer(user, "secondary"), Some(SilencerOption::Off));
}

#[test]
fn test_verify_reequips_after_host_revert() {
    let mut game = Match::new("silencer_verify_delay = 0.1");
    let user = game.join(1, Team::CounterTerrorist);
    game.spawn(user);
    game.session.choose_weapon(user, "usp_silencer").expect("catalog weapon");
    let identity = Match::identity(user);
    assert!(game.session.store_mut().set_silencer_option(&identity, "secondary", false));

    match game.session.select_loadout(user, "1") {
        Some(SelectOutcome::Equipping(report)) => {
            assert_eq!(report.silencer_toggles, vec!["usp_silencer".to_string()]);
        }
        other => panic!("expected equipping, got {other:?}"),
    }
    assert!(game.session.delays().is_pending("verify_1"));

    let usp = game.held(user, "secondary").expect("usp equipped");
    if let Some(item) = game.session.host_mut().world_mut().item_mut(usp.handle) {
        item.silencer_on = true;
    }

    game.advance(Duration::from_millis(150));
    let item = game.session.host().world().item(usp.handle).expect("usp");
    assert!(!item.silencer_on);
    assert!(!game.session.delays().is_pending("verify_1"));
}

#[test]
fn test_allow_pickup() {
    let mut game = Match::new("");
    let user = game.join(1, Team::Terrorist);
    game.spawn(user);

    let knife = game.ground("knife");
    let random_pick = game.ground("m4a1_silencer");
    assert!(game.session.allow_pickup(user, knife));
    assert!(game.session.allow_pickup(user, random_pick));
    assert!(!game.session.allow_pickup(UserId(99), random_pick));

    game.session.choose_weapon(user, "ak47").expect("catalog weapon");
    game.session.choose_weapon(user, "usp_silencer").expect("catalog weapon");
    let identity = Match::identity(user);
    assert!(game.session.store_mut().set_silencer_option(&identity, "secondary", false));

    let awp = game.ground("awp");
    let ak = game.ground("ak47");
    let deagle = game.ground("deagle");
    let usp = game.ground("usp_silencer");
    assert!(!game.session.allow_pickup(user, awp));
    assert!(game.session.allow_pickup(user, ak));
    assert!(!game.session.allow_pickup(user, deagle));
    assert!(game.session.allow_pickup(user, usp));

    let usp = game.session.host().world().item(usp).expect("usp");
    assert!(!usp.silencer_on);
    assert!(!usp.weapon_mode);
}
