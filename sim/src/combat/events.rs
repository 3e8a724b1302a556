//! Combat event definitions: the full fire and damage chain.
//!
//! Fire chain:   [`FireIntent`] → [`ShotFired`] + ([`RemoteHit`] |
//!               [`DamageTaken`] | [`SurfaceImpact`])
//! Death chain:  [`DamageTaken`] → [`Died`]
//! Life chain:   [`RebirthIntent`] reverses [`Died`]'s latch
//!
//! Convention: intents use noun form (hasn't happened yet), mutations and
//! feedback use past tense (it happened). The tense tells you the event's
//! role.

use bevy::prelude::*;
use smol_str::SmolStr;

// ── Intents ─────────────────────────────────────────────────────────

/// Intent: a locally-owned entity pulled the trigger.
/// Resolved by the shoot module: preconditions, recoil, raycast, attribution.
#[derive(Event, Clone, Copy, Debug)]
pub struct FireIntent {
    pub shooter: Entity,
}

/// Intent: replay a shot visually with no hit detection. Used for remote
/// entities, whose hits are resolved by their owning peer.
#[derive(Event, Clone, Copy, Debug)]
pub struct CosmeticFire {
    pub entity: Entity,
}

/// Intent: revive a dead entity. Valid only while the `Dead` latch is set.
#[derive(Event, Clone, Copy, Debug)]
pub struct RebirthIntent {
    pub entity: Entity,
}

/// Intent: a locally-owned entity's respawn countdown elapsed. For the local
/// player the replication layer turns this into a rebirth request to the
/// server; for bots it resolves into [`RebirthIntent`] directly.
#[derive(Event, Clone, Copy, Debug)]
pub struct RebirthRequested {
    pub entity: Entity,
}

// ── Mutations ───────────────────────────────────────────────────────

/// Mutation: the single damage entry point, local or replicated in origin.
/// Applies hp loss, records the attacker, and latches death.
#[derive(Event, Clone, Debug)]
pub struct DamageTaken {
    pub target: Entity,
    pub amount: i32,
    pub attacker_id: SmolStr,
    pub attacker_position: Vec3,
}

/// Cross-domain mutation: an entity died. Kill credit is resolved by the
/// same observer that latches the death.
#[derive(Event, Clone, Debug)]
pub struct Died {
    pub entity: Entity,
    pub killer_id: SmolStr,
}

// ── Feedback ────────────────────────────────────────────────────────

/// Feedback: a shot left the muzzle, with tracer endpoints for the effects
/// layer. Fires on both resolved and cosmetic shots.
#[derive(Event, Clone, Copy, Debug)]
pub struct ShotFired {
    pub shooter: Entity,
    pub origin: Vec3,
    pub target: Vec3,
}

/// Feedback: a shot ended on world geometry, with the decal point and normal.
#[derive(Event, Clone, Copy, Debug)]
pub struct SurfaceImpact {
    pub shooter: Entity,
    pub point: Vec3,
    pub normal: Vec3,
}

/// Feedback: a locally-resolved shot struck a remote combatant. The
/// replication layer relays it as a damage report to the target's owner.
#[derive(Event, Clone, Debug)]
pub struct RemoteHit {
    pub target_id: SmolStr,
    pub amount: i32,
    pub attacker_id: SmolStr,
    pub attacker_position: Vec3,
}

/// Compass direction of incoming damage in the victim's local frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashDirection {
    Front,
    Back,
    Left,
    Right,
}

/// Feedback: the local player took damage; drives the directional hurt indicator.
#[derive(Event, Clone, Copy, Debug)]
pub struct DamageFlash {
    pub entity: Entity,
    pub direction: FlashDirection,
}
