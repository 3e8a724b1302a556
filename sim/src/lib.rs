//! Headless entity replication and combat core for a room-based arena
//! shooter.
//!
//! The crate is a set of Bevy plugins over a transport abstraction: local
//! input (or a bot brain) produces fire/reload/switch intents, the combat
//! resolver turns them into damage, and the replication adapter keeps every
//! peer's view converging through throttled snapshots. Rendering, assets,
//! input devices, and the real wire all live outside.

use bevy::prelude::*;
use smol_str::SmolStr;
use std::sync::Arc;

use ricochet_shared::snapshot::PlayerStats;

pub mod bot;
pub mod combat;
pub mod models;
pub mod networking;
pub mod player;
pub mod weapons;
pub mod world;

pub use models::{Controller, SimSettings};

/// Phases of one logical tick. Transport ingest runs first so every system
/// in the tick sees the same replicated state; outbound sync runs last so it
/// observes the tick's results.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimSet {
    Ingest,
    World,
    Control,
    Combat,
    Sync,
}

pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        if !app.world().contains_resource::<SimSettings>() {
            app.insert_resource(SimSettings::load());
        }

        app.configure_sets(
            Update,
            (
                SimSet::Ingest,
                SimSet::World,
                SimSet::Control,
                SimSet::Combat,
                SimSet::Sync,
            )
                .chain(),
        );

        app.add_plugins((
            models::plugin,
            world::plugin,
            weapons::plugin,
            combat::plugin,
            player::plugin,
            bot::plugin,
            networking::plugin,
        ));
    }
}

/// Minimal app for deterministic headless runs: the time plugin is replaced
/// by a manually advanced clock, so tests step the simulation with
/// `Time::advance_by` and exact durations.
pub fn create_headless_app(settings: SimSettings) -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins.build().disable::<bevy::time::TimePlugin>())
        .insert_resource(Time::<()>::default())
        .insert_resource(settings)
        .add_plugins(SimulationPlugin);
    app
}

/// Spawn a combatant and register it in the arena. `Local` gets the
/// [`player::LocalPlayer`] marker, `Bot` gets a default brain.
pub fn spawn_combatant(
    world: &mut World,
    id: impl Into<SmolStr>,
    controller: Controller,
    stats: PlayerStats,
    position: Vec3,
) -> Entity {
    let id: SmolStr = id.into();
    let mut spawned = world.spawn(models::CombatantBundle::new(
        id.clone(),
        controller,
        stats,
        position,
    ));
    match controller {
        Controller::Local => {
            spawned.insert(player::LocalPlayer);
        }
        Controller::Bot => {
            spawned.insert(bot::BotBrain::default());
        }
        Controller::Remote => {}
    }
    let entity = spawned.id();
    world
        .resource_mut::<models::PlayerRegistry>()
        .insert(id, entity);
    entity
}

/// Open the room session: join through the transport and install the
/// connection resource the replication systems run against.
pub fn connect_room(
    world: &mut World,
    transport: Arc<dyn networking::Transport>,
    local_id: impl Into<SmolStr>,
    username: &str,
) {
    let connection = networking::RoomConnection {
        transport,
        local_id: local_id.into(),
    };
    connection.send(networking::ClientMessage::JoinRoom {
        username: username.into(),
    });
    world.insert_resource(connection);
}
