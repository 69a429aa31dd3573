//! # Team-Swap Spawner
//!
//! The host resolves a give request through the player's team-specific
//! inventory table, so asking for `m4a1` as a counter-terrorist may hand
//! out `m4a1_silencer`. When the spawned item is not the requested
//! weapon, the spawner removes it, flips the player to the opposing team
//! for exactly one more request, and flips them back.

use arsenal_core::UserId;

use crate::catalog::{WeaponCatalog, WeaponDescriptor};
use crate::host::{HeldItem, LoadoutHost, RemoveStatus};

/// Gives catalog weapons with a single corrective team-flip retry.
#[derive(Clone, Copy, Debug, Default)]
pub struct TeamSwapSpawner;

impl TeamSwapSpawner {
    /// Creates a spawner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Gives `weapon` to the player.
    ///
    /// Returns the spawned item, which after a failed retry may still be a
    /// different weapon. Returns `None` only if the host refused to spawn.
    pub fn spawn<H: LoadoutHost + ?Sized>(
        &self,
        host: &mut H,
        catalog: &WeaponCatalog,
        user: UserId,
        weapon: &WeaponDescriptor,
    ) -> Option<HeldItem> {
        let first = host.give_item(user, weapon.name())?;
        if catalog.canonicalize(&first.item_name) == weapon.basename() {
            return Some(first);
        }

        let team = host.team(user);
        let Some(opposing) = team.opposing() else {
            tracing::warn!(
                "user {} got {} instead of {} and cannot switch teams",
                user,
                first.item_name,
                weapon.basename()
            );
            return Some(first);
        };

        tracing::debug!(
            "user {} got {} instead of {}, retrying as {:?}",
            user,
            first.item_name,
            weapon.basename(),
            opposing
        );
        if host.remove_item(first.handle) == RemoveStatus::AlreadyGone {
            tracing::debug!("user {} lost {} before the retry", user, first.item_name);
        }
        host.set_team(user, opposing);
        let second = host.give_item(user, weapon.name());
        host.set_team(user, team);

        if let Some(item) = &second {
            if catalog.canonicalize(&item.item_name) != weapon.basename() {
                tracing::warn!(
                    "user {} still got {} instead of {}",
                    user,
                    item.item_name,
                    weapon.basename()
                );
            }
        }
        second
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arsenal_core::Team;

    use crate::registry::{GameVariant, StaticRegistry, WeaponClass};
    use crate::sim::{HostEffect, SimWorld};

    fn world() -> (SimWorld, WeaponCatalog) {
        let mut registry = StaticRegistry::new("csgo", "weapon_");
        for basename in ["m4a1", "m4a1_silencer", "ak47"] {
            registry.insert(WeaponClass {
                basename: basename.to_string(),
                name: format!("weapon_{basename}"),
                classname: format!("weapon_{basename}"),
                tag: "primary".to_string(),
                clip: 30,
                max_ammo: 90,
                silenceable: basename == "m4a1_silencer",
            });
        }
        registry.add_resolution(Team::CounterTerrorist, "m4a1", "m4a1_silencer");
        registry.add_resolution(Team::Terrorist, "m4a1", "ak47");

        let catalog = WeaponCatalog::load(
            "[primary]\nm4a1 = \"M4A4\"\nm4a1_silencer = \"M4A1-S\"\nak47 = \"AK-47\"",
            &registry,
        )
        .expect("catalog");
        (SimWorld::new(registry, GameVariant::Csgo), catalog)
    }

    #[test]
    fn test_direct_hit_needs_no_swap() {
        let (mut world, catalog) = world();
        world.add_player(UserId(1), Team::Terrorist);
        let ak = catalog.lookup_by_basename("ak47").expect("ak47");

        let item = TeamSwapSpawner::new().spawn(&mut world, &catalog, UserId(1), ak);
        assert_eq!(item.map(|i| i.item_name).as_deref(), Some("weapon_ak47"));
        assert_eq!(world.give_count(), 1);
    }

    #[test]
    fn test_swap_restores_team() {
        let (mut world, catalog) = world();
        world.add_player(UserId(1), Team::CounterTerrorist);
        let m4 = catalog.lookup_by_basename("m4a1").expect("m4a1");

        // Both teams resolve m4a1 to something else, so the one retry fails.
        let item = TeamSwapSpawner::new().spawn(&mut world, &catalog, UserId(1), m4);
        assert_eq!(item.map(|i| i.item_name).as_deref(), Some("weapon_ak47"));
        assert_eq!(world.give_count(), 2);
        assert_eq!(world.team(UserId(1)), Team::CounterTerrorist);
        assert!(world.effects().contains(&HostEffect::SetTeam {
            user: UserId(1),
            team: Team::Terrorist,
        }));
    }
}
