//! # Player Roster
//!
//! Maps connected users to their persistent identity and counts team
//! changes per round. Entries are created on connect and removed on
//! disconnect; team change counts are keyed by identity so reconnecting
//! does not reset them.

use std::collections::{BTreeMap, HashMap};

use arsenal_core::{PlayerId, PlayerRef, UserId};

/// Connected players and per-round team change counts.
#[derive(Debug, Default)]
pub struct PlayerRoster {
    players: BTreeMap<UserId, PlayerId>,
    team_changes: HashMap<PlayerId, u32>,
}

impl PlayerRoster {
    /// Creates an empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connected user.
    pub fn connect(&mut self, user: UserId, identity: PlayerId) {
        self.players.insert(user, identity);
    }

    /// Removes a user, returning their identity.
    pub fn disconnect(&mut self, user: UserId) -> Option<PlayerId> {
        self.players.remove(&user)
    }

    /// Both identities of a connected user.
    #[must_use]
    pub fn player(&self, user: UserId) -> Option<PlayerRef> {
        self.players
            .get(&user)
            .map(|identity| PlayerRef::new(user, identity.clone()))
    }

    /// Connected users, ascending.
    pub fn users(&self) -> impl Iterator<Item = UserId> + '_ {
        self.players.keys().copied()
    }

    /// Number of connected users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    /// Returns true if nobody is connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Counts a team change if the player still has one left.
    ///
    /// The first join of a round is included, so `limit` extra switches
    /// allow `limit + 1` joins in total.
    pub fn try_team_change(&mut self, identity: &PlayerId, limit: u32) -> bool {
        let used = self.team_changes.entry(identity.clone()).or_insert(0);
        if *used < limit.saturating_add(1) {
            *used += 1;
            true
        } else {
            false
        }
    }

    /// Team changes recorded for `identity` this round.
    #[must_use]
    pub fn team_changes(&self, identity: &PlayerId) -> u32 {
        self.team_changes.get(identity).copied().unwrap_or(0)
    }

    /// Resets team change counts (round or level end).
    pub fn clear_team_changes(&mut self) {
        self.team_changes.clear();
    }
}
