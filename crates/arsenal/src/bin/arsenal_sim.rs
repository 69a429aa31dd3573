//! # Arsenal Simulator
//!
//! Plays one scripted deathmatch round against the simulated host and logs
//! what the session does.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug arsenal_sim --config data/arsenal.toml
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use arsenal::{
    ArenaConfig, ArenaHost, ArenaResult, Deathmatch, GameSignal, SignalBus, SignalReceiver,
    SignalSender, SimArena,
};
use arsenal_core::{PlayerId, Team, UserId};
use arsenal_loadout::{LoadoutHost, SimWorld, StaticRegistry, WeaponCatalog};

/// Fixed server tick.
const TICK: Duration = Duration::from_nanos(1_000_000_000 / 60);

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() -> ExitCode {
    init_tracing();

    let mut config_path = String::from("data/arsenal.toml");
    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if let Some(path) = args.get(i + 1) {
                    config_path.clone_from(path);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: arsenal_sim [--config <PATH>]");
                return ExitCode::SUCCESS;
            }
            _ => {}
        }
        i += 1;
    }

    match run(&config_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("simulation aborted: {}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(config_path: &str) -> ArenaResult<()> {
    let config = ArenaConfig::load(config_path)?;
    let registry = StaticRegistry::load_file(config.host_table())?;
    let catalog = Arc::new(WeaponCatalog::load_file(config.weapon_table(), &registry)?);

    let bus = SignalBus::new(256);
    let signals = bus.sender();
    let receiver = bus.receiver();
    let mut arena = SimArena::new(SimWorld::new(registry, config.game)).with_signals(bus.sender());

    let alice = UserId(1);
    let bob = UserId(2);
    arena.add_player(alice, Team::Terrorist);
    arena.add_player(bob, Team::CounterTerrorist);
    let forbidden = arena.spawn_entity("hostage_entity");
    let buyzone = arena.spawn_entity("func_buyzone");

    let mut session = Deathmatch::new(config, catalog, arena);

    signals.send(GameSignal::RoundStarted);
    signals.send(GameSignal::EntitySpawned {
        entity: forbidden,
        classname: "hostage_entity".to_string(),
    });
    signals.send(GameSignal::EntitySpawned {
        entity: buyzone,
        classname: "func_buyzone".to_string(),
    });
    for (user, name) in [(alice, "alice"), (bob, "bob")] {
        signals.send(GameSignal::PlayerConnected {
            user,
            identity: PlayerId::new(name),
        });
    }
    session.pump(&receiver);

    session.host_mut().spawn(alice);
    session.host_mut().spawn(bob);
    run_for(&mut session, &receiver, Duration::from_millis(100));
    log_held(&session, alice);
    log_held(&session, bob);

    // Bob builds a loadout; the USP-S goes on without its silencer.
    for basename in ["usp_silencer", "m4a1_silencer"] {
        if let Err(err) = session.choose_weapon(bob, basename) {
            tracing::warn!("bob cannot take {}: {}", basename, err);
        }
    }
    signals.send(GameSignal::SilencerToggled {
        user: bob,
        attached: false,
    });
    run_for(&mut session, &receiver, Duration::from_millis(200));
    log_held(&session, bob);

    signals.send(GameSignal::RoundFreezeEnded);
    let protection = session.config().spawn_protection() + TICK;
    run_for(&mut session, &receiver, protection);

    // Alice drops her primary, then bob kills her with a headshot.
    let dropped = session
        .host()
        .held_items(alice)
        .into_iter()
        .find(|item| item.tag == "primary");
    if let Some(item) = dropped {
        session.host_mut().world_mut().drop_item(item.handle);
        signals.send(GameSignal::WeaponDropped {
            user: alice,
            item: item.handle,
        });
    }
    session.host_mut().kill(alice);
    kill_feed(&signals, alice, bob);
    let respawn = session.config().respawn() + TICK * 2;
    run_for(&mut session, &receiver, respawn);
    log_held(&session, alice);

    if let Some(outcome) = session.select_loadout(alice, "2") {
        tracing::info!("alice selected loadout 2: {:?}", outcome);
    }

    signals.send(GameSignal::RoundEnded);
    run_for(&mut session, &receiver, Duration::from_millis(100));
    tracing::info!(
        "round over: {} pending delays, {} host effects",
        session.delays().len(),
        session.host().world().effects().len()
    );
    Ok(())
}

fn kill_feed(signals: &SignalSender, victim: UserId, attacker: UserId) {
    signals.send(GameSignal::PlayerDied {
        victim,
        attacker: Some(attacker),
        weapon: "usp_silencer".to_string(),
        headshot: true,
    });
}

fn run_for(session: &mut Deathmatch<SimArena>, receiver: &SignalReceiver, span: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < span {
        session.pump(receiver);
        session.tick(TICK);
        elapsed += TICK;
    }
    session.pump(receiver);
}

fn log_held(session: &Deathmatch<SimArena>, user: UserId) {
    let held: Vec<String> = session
        .host()
        .held_items(user)
        .into_iter()
        .map(|item| item.item_name)
        .collect();
    let alive = session.host().is_alive(user);
    tracing::info!("user {} (alive: {}) holds {:?}", user, alive, held);
}
