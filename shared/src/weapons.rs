//! Weapon catalog, the single source of truth for client and server.

use serde::{Deserialize, Serialize};

/// Every weapon the game knows about. `Ak47` is the spawn loadout.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WeaponKind {
    #[default]
    Ak47,
    Ak48,
    Ak49,
}

/// Static attributes for one weapon. Times are in milliseconds to match the
/// wire representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeaponAttributes {
    pub name: &'static str,
    pub max_ammo: u32,
    pub damage: i32,
    pub fire_rate: u32,
    pub reload_ms: u64,
    pub fire_interval_ms: u64,
}

impl WeaponKind {
    pub const ALL: [WeaponKind; 3] = [WeaponKind::Ak47, WeaponKind::Ak48, WeaponKind::Ak49];

    /// Catalog lookup. Total; every variant has an entry.
    pub fn attributes(self) -> WeaponAttributes {
        match self {
            WeaponKind::Ak47 => WeaponAttributes {
                name: "AK-47",
                max_ammo: 30,
                damage: 10,
                fire_rate: 7,
                reload_ms: 2000,
                fire_interval_ms: 150,
            },
            WeaponKind::Ak48 => WeaponAttributes {
                name: "AK-48",
                max_ammo: 10,
                damage: 25,
                fire_rate: 5,
                reload_ms: 1800,
                fire_interval_ms: 500,
            },
            WeaponKind::Ak49 => WeaponAttributes {
                name: "AK-49",
                max_ammo: 100,
                damage: 2,
                fire_rate: 10,
                reload_ms: 3000,
                fire_interval_ms: 100,
            },
        }
    }

    /// Parse a wire id. Accepts bare kind names and legacy model-path ids
    /// (`"weapons/ak47.glb"`). Unknown ids fall back to the default weapon so
    /// a bad peer string can never break the state machine.
    pub fn parse(id: &str) -> Self {
        let id = id.to_ascii_lowercase();
        for kind in Self::ALL {
            if id.contains(kind.wire_id()) {
                return kind;
            }
        }
        Self::default()
    }

    /// Canonical lowercase id used on the wire.
    pub fn wire_id(self) -> &'static str {
        match self {
            WeaponKind::Ak47 => "ak47",
            WeaponKind::Ak48 => "ak48",
            WeaponKind::Ak49 => "ak49",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_bare_and_path_ids() {
        assert_eq!(WeaponKind::parse("ak48"), WeaponKind::Ak48);
        assert_eq!(WeaponKind::parse("weapons/AK49.glb"), WeaponKind::Ak49);
    }

    #[test]
    fn parse_falls_back_to_default() {
        assert_eq!(WeaponKind::parse(""), WeaponKind::Ak47);
        assert_eq!(WeaponKind::parse("railgun"), WeaponKind::Ak47);
    }

    #[test]
    fn catalog_is_total() {
        for kind in WeaponKind::ALL {
            let attrs = kind.attributes();
            assert!(attrs.max_ammo > 0);
            assert!(attrs.damage > 0);
            assert!(attrs.fire_interval_ms > 0);
        }
    }
}
