//! Weapon event definitions.
//!
//! Convention: intents use noun form (hasn't happened yet), mutations and
//! feedback use past tense (it happened).

use bevy::prelude::*;
use ricochet_shared::weapons::WeaponKind;

// ── Intents ─────────────────────────────────────────────────────────

/// Intent: start reloading the entity's current weapon.
/// Ignored while dead or already reloading.
#[derive(Event, Clone, Copy, Debug)]
pub struct ReloadIntent {
    pub entity: Entity,
}

/// Intent: switch to another weapon.
/// Rejected while reloading, a no-op when already holding it, and rate
/// limited by [`super::SwitchThrottle`].
#[derive(Event, Clone, Copy, Debug)]
pub struct SwitchIntent {
    pub entity: Entity,
    pub weapon: WeaponKind,
}

// ── Mutations ───────────────────────────────────────────────────────

/// Mutation: a reload began; [`super::ReloadState`] was inserted.
#[derive(Event, Clone, Copy, Debug)]
pub struct ReloadStarted {
    pub entity: Entity,
    pub weapon: WeaponKind,
}

/// Mutation: the reload completed and the pool was refilled.
#[derive(Event, Clone, Copy, Debug)]
pub struct ReloadFinished {
    pub entity: Entity,
    pub weapon: WeaponKind,
}

/// Mutation: the held weapon changed.
#[derive(Event, Clone, Copy, Debug)]
pub struct WeaponSwitched {
    pub entity: Entity,
    pub weapon: WeaponKind,
}

// ── Feedback ────────────────────────────────────────────────────────

/// Feedback: reload progress stepped, in whole percent (0–100).
#[derive(Event, Clone, Copy, Debug)]
pub struct ReloadProgress {
    pub entity: Entity,
    pub percent: u8,
}

/// Feedback: a switch request was refused (mid-reload or throttled).
#[derive(Event, Clone, Copy, Debug)]
pub struct SwitchRejected {
    pub entity: Entity,
    pub attempted: WeaponKind,
}
