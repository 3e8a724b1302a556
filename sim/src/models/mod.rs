//! Core data model: combatant components, the player registry, room phase.

use bevy::prelude::*;
use smol_str::SmolStr;
use std::collections::HashMap;

use ricochet_shared::snapshot::PlayerStats;
use ricochet_shared::weapons::WeaponKind;

use crate::weapons::{AmmoPool, FireControl, SwitchThrottle};

pub mod settings;

pub use settings::SimSettings;

pub fn plugin(app: &mut App) {
    // Minimal plugin sets ship without the state machinery `init_state`
    // relies on.
    if !app.is_plugin_added::<bevy::state::app::StatesPlugin>() {
        app.add_plugins(bevy::state::app::StatesPlugin);
    }
    app.init_resource::<PlayerRegistry>().init_state::<RoomPhase>();
}

/// Stable per-session id assigned by the room server.
#[derive(Component, Clone, Hash, Eq, PartialEq, Debug)]
pub struct PlayerId(pub SmolStr);

impl PlayerId {
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Who drives this combatant. Fixed at spawn.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Controller {
    /// Driven by [`crate::player::LocalInput`]; resolves its own hits.
    Local,
    /// Driven by inbound snapshots; hits are resolved by its owner elsewhere.
    Remote,
    /// Driven by [`crate::bot::BotBrain`]; locally owned like `Local`.
    Bot,
}

impl Controller {
    /// Locally-owned entities are mutated by their controller and the damage
    /// contract. Remote entities only by the reconciler and the contract.
    pub fn is_locally_owned(self) -> bool {
        !matches!(self, Controller::Remote)
    }
}

/// Health component for anything that can take damage. Aliveness is decided
/// by the [`Dead`] marker, not by hp reaching zero.
#[derive(Component, Debug, Clone)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn new(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Clamped damage application. Returns true when this hit brought hp to
    /// zero.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.current = (self.current - amount).max(0);
        self.current == 0
    }

    pub fn restore(&mut self) {
        self.current = self.max;
    }
}

/// Latched death marker. Inserted on the kill transition, removed only by
/// rebirth. Its presence gates damage, firing, and rebirth validity.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Dead;

/// Server-assigned base attack stat, replicated but not consulted by the
/// resolver (weapon damage wins).
#[derive(Component, Debug, Clone, Copy)]
pub struct AttackPower(pub i32);

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct CurrentWeapon(pub WeaponKind);

/// Pitch of the aim in radians, replicated separately from body yaw.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct VerticalAim(pub f32);

#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Score(pub u32);

/// Most recent damage source, overwritten on every hit.
#[derive(Component, Debug, Clone)]
pub struct LastAttacker {
    pub id: SmolStr,
    pub position: Vec3,
}

/// What the character is visibly doing, for outbound replication.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct CurrentAction(pub ricochet_shared::snapshot::ActionKind);

/// Everything a combatant spawns with, regardless of controller.
#[derive(Bundle)]
pub struct CombatantBundle {
    pub id: PlayerId,
    pub controller: Controller,
    pub transform: Transform,
    pub health: Health,
    pub attack_power: AttackPower,
    pub weapon: CurrentWeapon,
    pub vertical_aim: VerticalAim,
    pub score: Score,
    pub action: CurrentAction,
    pub ammo: AmmoPool,
    pub fire_control: FireControl,
    pub switch_throttle: SwitchThrottle,
}

impl CombatantBundle {
    pub fn new(id: impl Into<SmolStr>, controller: Controller, stats: PlayerStats, position: Vec3) -> Self {
        Self {
            id: PlayerId::new(id),
            controller,
            transform: Transform::from_translation(position),
            health: Health::new(stats.max_hp),
            attack_power: AttackPower(stats.attack_power),
            weapon: CurrentWeapon::default(),
            vertical_aim: VerticalAim::default(),
            score: Score::default(),
            action: CurrentAction::default(),
            ammo: AmmoPool::full(),
            fire_control: FireControl::default(),
            switch_throttle: SwitchThrottle::default(),
        }
    }
}

/// The arena of combatants keyed by id. All cross-entity access (kill credit,
/// damage routing, departures) resolves through here instead of holding live
/// entity references.
#[derive(Resource, Default)]
pub struct PlayerRegistry {
    entries: HashMap<SmolStr, Entity>,
}

impl PlayerRegistry {
    pub fn insert(&mut self, id: SmolStr, entity: Entity) {
        self.entries.insert(id, entity);
    }

    pub fn remove(&mut self, id: &str) -> Option<Entity> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Entity> {
        self.entries.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SmolStr, Entity)> {
        self.entries.iter().map(|(id, entity)| (id, *entity))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Room lifecycle mirrored from the server.
#[derive(States, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RoomPhase {
    #[default]
    Lobby,
    Playing,
    Finished,
}

impl From<ricochet_shared::snapshot::RoomStatus> for RoomPhase {
    fn from(status: ricochet_shared::snapshot::RoomStatus) -> Self {
        use ricochet_shared::snapshot::RoomStatus;
        match status {
            RoomStatus::Lobby => RoomPhase::Lobby,
            RoomStatus::Playing => RoomPhase::Playing,
            RoomStatus::Finished => RoomPhase::Finished,
        }
    }
}
