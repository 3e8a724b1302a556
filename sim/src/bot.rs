//! Bot controller: the third strategy next to local input and replication.
//!
//! Bots are locally owned like the local player, so their shots run through
//! the real resolver, not the cosmetic path.

use bevy::prelude::*;

use crate::SimSet;
use crate::combat::{FireIntent, RebirthIntent, RebirthRequested};
use crate::models::{Controller, Dead, PlayerId, VerticalAim};

const THINK_INTERVAL_SECS: f32 = 0.5;
const FIRE_INTERVAL_SECS: f32 = 0.6;

pub fn plugin(app: &mut App) {
    app.add_observer(on_rebirth_requested)
        .add_systems(Update, drive_bots.in_set(SimSet::Control));
}

/// Periodic aim-and-fire driver for one bot.
#[derive(Component, Debug)]
pub struct BotBrain {
    pub think: Timer,
    pub fire: Timer,
    pub target: Option<Entity>,
}

impl Default for BotBrain {
    fn default() -> Self {
        Self {
            think: Timer::from_seconds(THINK_INTERVAL_SECS, TimerMode::Repeating),
            fire: Timer::from_seconds(FIRE_INTERVAL_SECS, TimerMode::Repeating),
            target: None,
        }
    }
}

/// Re-target on the think cadence (nearest living combatant), track the aim
/// every tick, and pull the trigger on the fire cadence.
fn drive_bots(
    time: Res<Time>,
    mut set: ParamSet<(
        Query<(Entity, &Transform, Has<Dead>), With<PlayerId>>,
        Query<(Entity, &mut BotBrain, &mut Transform, &mut VerticalAim, Has<Dead>)>,
    )>,
    mut commands: Commands,
) {
    let candidates: Vec<(Entity, Vec3, bool)> = set
        .p0()
        .iter()
        .map(|(entity, transform, dead)| (entity, transform.translation, dead))
        .collect();

    for (entity, mut brain, mut transform, mut aim, is_dead) in &mut set.p1() {
        brain.think.tick(time.delta());
        brain.fire.tick(time.delta());

        if is_dead {
            brain.target = None;
            continue;
        }

        if brain.think.just_finished() || brain.target.is_none() {
            let own_position = transform.translation;
            brain.target = candidates
                .iter()
                .filter(|(other, _, dead)| *other != entity && !dead)
                .min_by(|a, b| {
                    let da = a.1.distance_squared(own_position);
                    let db = b.1.distance_squared(own_position);
                    da.total_cmp(&db)
                })
                .map(|(other, _, _)| *other);
        }

        let Some(target) = brain.target else {
            continue;
        };
        let Some(&(_, target_position, target_dead)) =
            candidates.iter().find(|(other, _, _)| *other == target)
        else {
            brain.target = None;
            continue;
        };
        if target_dead {
            brain.target = None;
            continue;
        }

        // Face the target and pitch the muzzle at its torso.
        let delta = target_position - transform.translation;
        let yaw = delta.x.atan2(delta.z);
        transform.rotation = Quat::from_rotation_y(yaw);

        let muzzle_height = 0.7;
        let torso_height = 1.0;
        let dy = (target_position.y + torso_height) - (transform.translation.y + muzzle_height);
        let horizontal = Vec2::new(delta.x, delta.z).length();
        // Positive pitch points the muzzle down.
        aim.0 = -dy.atan2(horizontal.max(0.001));

        if brain.fire.just_finished() {
            commands.trigger(FireIntent { shooter: entity });
        }
    }
}

/// Observer: bots have no server round-trip; their respawn request resolves
/// into a rebirth on the spot.
fn on_rebirth_requested(
    on: On<RebirthRequested>,
    query: Query<&Controller>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    if matches!(query.get(entity), Ok(Controller::Bot)) {
        commands.trigger(RebirthIntent { entity });
    }
}
