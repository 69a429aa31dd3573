//! # Host Signals
//!
//! Game events consumed by the deathmatch session.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐      ┌─────────────┐      ┌──────────────┐
//! │ Host adapter │─────>│ SignalBus   │─────>│  Deathmatch  │
//! │ (game hooks) │      │ (bounded)   │      │ pump() / tick│
//! └──────────────┘      └─────────────┘      └──────────────┘
//! ```
//!
//! Signals flow one way. The session drains the bus once per tick so all
//! host callbacks are handled on the update thread.

use arsenal_core::{ItemHandle, PlayerId, UserId};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

/// Events raised by the host game.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameSignal {
    // =========================================================================
    // Player Lifecycle
    // =========================================================================
    /// A player finished connecting.
    PlayerConnected {
        /// Host user number.
        user: UserId,
        /// Stable identity for loadout storage.
        identity: PlayerId,
    },

    /// A player spawned.
    PlayerSpawned {
        /// Spawned player.
        user: UserId,
    },

    /// A player died.
    PlayerDied {
        /// Player who died.
        victim: UserId,
        /// Killer, if another player.
        attacker: Option<UserId>,
        /// Basename of the killing weapon (`knife`, `hegrenade`, ...).
        weapon: String,
        /// Whether the killing shot was a headshot.
        headshot: bool,
    },

    /// A player left the server.
    PlayerDisconnected {
        /// Leaving player.
        user: UserId,
    },

    // =========================================================================
    // Weapon Events
    // =========================================================================
    /// A player reloaded their active weapon.
    WeaponReloaded {
        /// Reloading player.
        user: UserId,
    },

    /// A player fired their active weapon.
    WeaponFired {
        /// Shooting player.
        user: UserId,
    },

    /// A weapon was dropped on the ground.
    WeaponDropped {
        /// Player who dropped it.
        user: UserId,
        /// The dropped item.
        item: ItemHandle,
    },

    /// A player's thrown grenade exploded.
    GrenadeDetonated {
        /// Thrower.
        user: UserId,
    },

    /// A player attached or detached a silencer by hand.
    SilencerToggled {
        /// Player toggling.
        user: UserId,
        /// Attachment state after the toggle.
        attached: bool,
    },

    /// The host created an entity.
    EntitySpawned {
        /// The new entity.
        entity: ItemHandle,
        /// Its class (`hostage_entity`, `func_buyzone`, ...).
        classname: String,
    },

    /// The host destroyed an entity.
    EntityDeleted {
        /// The destroyed item.
        item: ItemHandle,
    },

    // =========================================================================
    // Round Flow
    // =========================================================================
    /// A round started.
    RoundStarted,

    /// The freeze period at round start ended.
    RoundFreezeEnded,

    /// A round ended.
    RoundEnded,

    /// The map is about to change.
    LevelEnded,
}

/// Bounded channel between the host adapter and the session.
pub struct SignalBus {
    sender: Sender<GameSignal>,
    receiver: Receiver<GameSignal>,
}

impl SignalBus {
    /// Creates a new signal bus.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum signals in flight. 256 covers a full server
    ///   for several ticks.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = bounded(capacity);
        Self { sender, receiver }
    }

    /// Creates a sender handle.
    #[must_use]
    pub fn sender(&self) -> SignalSender {
        SignalSender {
            sender: self.sender.clone(),
        }
    }

    /// Creates a receiver handle.
    #[must_use]
    pub fn receiver(&self) -> SignalReceiver {
        SignalReceiver {
            receiver: self.receiver.clone(),
        }
    }

    /// Creates a connected sender/receiver pair.
    #[must_use]
    pub fn create_pair(capacity: usize) -> (SignalSender, SignalReceiver) {
        let bus = Self::new(capacity);
        (bus.sender(), bus.receiver())
    }
}

/// Handle for raising signals.
#[derive(Clone)]
pub struct SignalSender {
    sender: Sender<GameSignal>,
}

impl SignalSender {
    /// Sends a signal without blocking.
    ///
    /// Returns `false` if the channel is full or the session is gone.
    #[inline]
    pub fn send(&self, signal: GameSignal) -> bool {
        match self.sender.try_send(signal) {
            Ok(()) => true,
            Err(TrySendError::Full(signal)) => {
                tracing::warn!("signal bus full, dropping {:?}", signal);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Handle for consuming signals.
#[derive(Clone)]
pub struct SignalReceiver {
    receiver: Receiver<GameSignal>,
}

impl SignalReceiver {
    /// Takes every pending signal without blocking.
    #[inline]
    pub fn drain(&self) -> Vec<GameSignal> {
        let mut signals = Vec::with_capacity(self.receiver.len());
        while let Ok(signal) = self.receiver.try_recv() {
            signals.push(signal);
        }
        signals
    }

    /// Number of pending signals.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_preserves_order() {
        let (tx, rx) = SignalBus::create_pair(8);
        assert!(tx.send(GameSignal::RoundStarted));
        assert!(tx.send(GameSignal::PlayerSpawned { user: UserId(3) }));
        assert_eq!(rx.pending_count(), 2);

        assert_eq!(
            rx.drain(),
            vec![GameSignal::RoundStarted, GameSignal::PlayerSpawned { user: UserId(3) }]
        );
        assert!(rx.drain().is_empty());
    }

    #[test]
    fn test_full_bus_drops() {
        let (tx, rx) = SignalBus::create_pair(1);
        assert!(tx.send(GameSignal::RoundStarted));
        assert!(!tx.send(GameSignal::RoundEnded));
        assert_eq!(rx.drain(), vec![GameSignal::RoundStarted]);
    }
}
