//! # ARSENAL Core
//!
//! Shared vocabulary for the ARSENAL deathmatch units.
//!
//! ## Contents
//!
//! - [`ids`] - Identity types for players, held items and teams
//! - [`delay`] - The delayed-action scheduler driven by the server tick
//!
//! ## Design Principles
//!
//! 1. **No host access** - Nothing in this crate talks to the game server
//! 2. **Data, not closures** - Scheduled actions are plain values returned to
//!    their owner when they fire, so the owner can mutate itself freely
//! 3. **Deterministic** - Dispatch order depends only on due time and
//!    registration order

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod delay;
pub mod ids;

pub use delay::{DelayScheduler, Dispatch, OnCancel, Trigger};
pub use ids::{ItemHandle, PlayerId, PlayerRef, Team, UserId};
