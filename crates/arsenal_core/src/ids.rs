//! # Identity Types
//!
//! A player is known to the host by a short-lived [`UserId`] (valid while
//! connected) and to the loadout store by a stable [`PlayerId`] (survives
//! reconnects). [`PlayerRef`] carries both.

use std::fmt;

/// Connection-scoped player number assigned by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserId(pub u32);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable player identity used to key persistent loadouts.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates an identity from the host's unique id string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identity string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for PlayerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Both identities of one connected player.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PlayerRef {
    /// Host-side number, used for every host call.
    pub user: UserId,
    /// Persistent identity, used for loadout storage.
    pub identity: PlayerId,
}

impl PlayerRef {
    /// Pairs a host user number with a persistent identity.
    #[must_use]
    pub fn new(user: UserId, identity: impl Into<PlayerId>) -> Self {
        Self {
            user,
            identity: identity.into(),
        }
    }
}

/// Opaque handle of a host-side item entity.
///
/// Handles may be recycled by the host once the entity is destroyed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemHandle(pub u32);

impl fmt::Display for ItemHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Team membership as numbered by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Team {
    /// Not yet assigned.
    #[default]
    Unassigned = 0,
    /// Watching only.
    Spectator = 1,
    /// First playing team.
    Terrorist = 2,
    /// Second playing team.
    CounterTerrorist = 3,
}

impl Team {
    /// Converts the host's team number.
    #[inline]
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        match index {
            1 => Self::Spectator,
            2 => Self::Terrorist,
            3 => Self::CounterTerrorist,
            _ => Self::Unassigned,
        }
    }

    /// Returns the host's team number.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u8 {
        self as u8
    }

    /// Returns true for the two teams that actually fight.
    #[inline]
    #[must_use]
    pub const fn is_playing(self) -> bool {
        matches!(self, Self::Terrorist | Self::CounterTerrorist)
    }

    /// Returns the other playing team, or `None` for non-playing teams.
    #[inline]
    #[must_use]
    pub const fn opposing(self) -> Option<Self> {
        match self {
            Self::Terrorist => Some(Self::CounterTerrorist),
            Self::CounterTerrorist => Some(Self::Terrorist),
            Self::Unassigned | Self::Spectator => None,
        }
    }
}
