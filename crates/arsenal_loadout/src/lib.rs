//! # ARSENAL Loadout
//!
//! Declarative loadouts and the reconciliation engine that keeps a
//! player's held weapons in sync with them.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   validates   ┌───────────────┐
//! │ WeaponCatalog│<──────────────│ LoadoutStore  │  desired state
//! └──────┬───────┘               └───────┬───────┘
//!        │                               │
//!        ▼                               ▼
//! ┌─────────────────────────────────────────────┐
//! │ EquipReconciler ── TeamSwapSpawner          │  converge
//! └──────────────────────┬──────────────────────┘
//!                        ▼
//!                 trait LoadoutHost               held state / effects
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use arsenal_loadout::{EquipReconciler, LoadoutStore, StaticRegistry, WeaponCatalog};
//!
//! let registry = StaticRegistry::load_file("data/hosts/csgo.toml")?;
//! let catalog = Arc::new(WeaponCatalog::load_file("data/weapons/csgo.toml", &registry)?);
//! let mut store = LoadoutStore::new(Arc::clone(&catalog));
//! let reconciler = EquipReconciler::new(catalog);
//!
//! store.choose_weapon(&player.identity, "ak47")?;
//! let report = reconciler.equip(&player, &mut store, &mut host);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod catalog;
pub mod error;
pub mod host;
pub mod reconciler;
pub mod registry;
pub mod sim;
pub mod spawner;
pub mod store;

pub use catalog::{is_exempt_tag, WeaponCatalog, WeaponDescriptor, EXEMPT_TAGS};
pub use error::{ConfigError, ConfigResult, LoadoutError, LoadoutResult};
pub use host::{HeldItem, ItemFlag, LoadoutHost, RemoveStatus};
pub use reconciler::{EquipReconciler, EquipReport};
pub use registry::{GameVariant, StaticRegistry, WeaponClass, WeaponRegistry};
pub use sim::{HostEffect, SimItem, SimWorld};
pub use spawner::TeamSwapSpawner;
pub use store::{HeldState, Loadout, LoadoutSlot, LoadoutStore, PlayerLoadoutSet, SilencerOption};
