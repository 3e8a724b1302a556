//! Headless demo: one input-scripted player and two bots trading fire over
//! the loopback room server.

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use std::sync::Arc;
use std::time::Duration;

use ricochet::models::{Dead, Health, PlayerId, Score, SimSettings};
use ricochet::networking::{ClientMessage, LoopbackServer, RoomConnection};
use ricochet::player::LocalInput;
use ricochet::{Controller, SimulationPlugin, connect_room, spawn_combatant};
use ricochet_shared::arena;
use ricochet_shared::snapshot::PlayerStats;

fn main() {
    let server = LoopbackServer::new();

    let mut app = App::new();
    app.add_plugins((
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_millis(16))),
        LogPlugin::default(),
    ))
    .insert_resource(SimSettings::load())
    .add_plugins(SimulationPlugin)
    .add_systems(Update, (script_trigger, report_scoreboard));

    let transport = Arc::new(server.connect("pilot"));
    let world = app.world_mut();
    connect_room(world, transport, "pilot", "pilot");

    spawn_combatant(
        world,
        "pilot",
        Controller::Local,
        PlayerStats::default(),
        arena::spawn_anchor(0),
    );
    spawn_combatant(
        world,
        "bot-alpha",
        Controller::Bot,
        PlayerStats::default(),
        arena::spawn_anchor(1),
    );
    spawn_combatant(
        world,
        "bot-beta",
        Controller::Bot,
        PlayerStats::default(),
        arena::spawn_anchor(2),
    );

    world.resource::<RoomConnection>().send(ClientMessage::Ready(true));

    info!("Demo arena up: pilot vs two bots");
    app.run();
}

/// Hold the trigger in bursts so the pilot cycles through firing, running
/// dry, and reloading.
fn script_trigger(time: Res<Time>, mut input: ResMut<LocalInput>) {
    input.trigger_held = time.elapsed_secs() % 2.0 < 0.7;
}

fn report_scoreboard(
    time: Res<Time>,
    mut since_report: Local<f32>,
    query: Query<(&PlayerId, &Score, &Health, Has<Dead>)>,
) {
    *since_report += time.delta_secs();
    if *since_report < 5.0 {
        return;
    }
    *since_report = 0.0;

    for (id, score, health, dead) in &query {
        let status = if dead { " (down)" } else { "" };
        info!("{id}: {} kills, {} hp{status}", score.0, health.current);
    }
}
