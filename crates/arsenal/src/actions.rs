//! # Delayed Actions
//!
//! Everything the session defers through the scheduler. The id of each
//! action is derived from its target, so scheduling the same action twice
//! replaces the first and bulk cancellation can go by prefix.

use arsenal_core::{ItemHandle, OnCancel, UserId};

/// An action the session runs once its delay elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DelayedAction {
    /// Bring a dead player back.
    Respawn(UserId),
    /// Drop spawn protection. Also runs when cancelled.
    EndProtection(UserId),
    /// Delete a weapon left on the ground.
    RemoveDropped(ItemHandle),
    /// Fill a weapon's clip.
    RefillClip(ItemHandle),
    /// Re-check a player's loadout after a silencer toggle.
    VerifyLoadout(UserId),
}

impl DelayedAction {
    /// Id prefix of respawn timers.
    pub const RESPAWN: &'static str = "respawn_";
    /// Id prefix of protection timers.
    pub const PROTECT: &'static str = "protect_";
    /// Id prefix of dropped weapon timers.
    pub const DROP: &'static str = "drop_";
    /// Id prefix of clip refill timers.
    pub const REFILL_CLIP: &'static str = "refill_clip_";
    /// Id prefix of loadout re-checks.
    pub const VERIFY: &'static str = "verify_";

    /// Scheduler id of this action.
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Respawn(user) => format!("{}{user}", Self::RESPAWN),
            Self::EndProtection(user) => format!("{}{user}", Self::PROTECT),
            Self::RemoveDropped(item) => format!("{}{item}", Self::DROP),
            Self::RefillClip(item) => format!("{}{item}", Self::REFILL_CLIP),
            Self::VerifyLoadout(user) => format!("{}{user}", Self::VERIFY),
        }
    }

    /// Cancellation policy of this action.
    #[must_use]
    pub const fn on_cancel(&self) -> OnCancel {
        match self {
            Self::EndProtection(_) => OnCancel::Invoke,
            Self::Respawn(_) | Self::RemoveDropped(_) | Self::RefillClip(_) | Self::VerifyLoadout(_) => {
                OnCancel::Discard
            }
        }
    }

    /// Ids of every per-player action of `user`.
    #[must_use]
    pub fn player_ids(user: UserId) -> [String; 3] {
        [
            Self::Respawn(user).id(),
            Self::EndProtection(user).id(),
            Self::VerifyLoadout(user).id(),
        ]
    }

    /// Ids of every per-item action of `item`.
    #[must_use]
    pub fn item_ids(item: ItemHandle) -> [String; 2] {
        [Self::RemoveDropped(item).id(), Self::RefillClip(item).id()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(DelayedAction::Respawn(UserId(7)).id(), "respawn_7");
        assert_eq!(DelayedAction::EndProtection(UserId(7)).id(), "protect_7");
        assert_eq!(DelayedAction::RemoveDropped(ItemHandle(120)).id(), "drop_120");
        assert_eq!(DelayedAction::RefillClip(ItemHandle(120)).id(), "refill_clip_120");
        assert_eq!(DelayedAction::VerifyLoadout(UserId(1)).id(), "verify_1");
    }

    #[test]
    fn test_only_protection_runs_on_cancel() {
        assert_eq!(DelayedAction::EndProtection(UserId(1)).on_cancel(), OnCancel::Invoke);
        assert_eq!(DelayedAction::Respawn(UserId(1)).on_cancel(), OnCancel::Discard);
        assert_eq!(DelayedAction::RemoveDropped(ItemHandle(1)).on_cancel(), OnCancel::Discard);
    }
}
