//! # ARSENAL
//!
//! Deathmatch session built on loadout reconciliation and delayed actions.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  GameSignal  ┌──────────────────────────────────────┐
//! │ Host adapter │─────────────>│ Deathmatch                           │
//! └──────────────┘  (SignalBus) │  PlayerRoster    LoadoutStore        │
//!        ▲                      │  DelayScheduler  EquipReconciler     │
//!        │     trait ArenaHost  └──────────────────┬───────────────────┘
//!        └─────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! let config = ArenaConfig::load("data/arsenal.toml")?;
//! let registry = StaticRegistry::load_file(config.host_table())?;
//! let catalog = Arc::new(WeaponCatalog::load_file(config.weapon_table(), &registry)?);
//!
//! let (tx, rx) = SignalBus::create_pair(256);
//! let host = SimArena::new(SimWorld::new(registry, config.game)).with_signals(tx.clone());
//! let mut session = Deathmatch::new(config, catalog, host);
//!
//! loop {
//!     session.pump(&rx);
//!     session.tick(TICK);
//! }
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod actions;
pub mod config;
pub mod deathmatch;
pub mod error;
pub mod host;
pub mod roster;
pub mod signals;

pub use actions::DelayedAction;
pub use config::{ArenaConfig, GrenadeMode};
pub use deathmatch::{Deathmatch, SelectOutcome};
pub use error::{ArenaError, ArenaResult};
pub use host::{ArenaHost, MapEntity, SimArena, Vitals, FULL_HEALTH};
pub use roster::PlayerRoster;
pub use signals::{GameSignal, SignalBus, SignalReceiver, SignalSender};
