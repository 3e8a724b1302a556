//! Local controller: input-driven fire/reload/switch and the respawn cycle.

use bevy::prelude::*;
use std::time::Duration;

use ricochet_shared::weapons::WeaponKind;

use crate::SimSet;
use crate::combat::{
    DamageFlash, DamageTaken, Died, FireIntent, FlashDirection, RebirthRequested,
};
use crate::models::{Controller, CurrentWeapon, Dead, SimSettings};
use crate::weapons::{ReloadIntent, SwitchIntent};

pub fn plugin(app: &mut App) {
    app.init_resource::<LocalInput>()
        .add_observer(on_death_start_countdown)
        .add_observer(on_local_damage_flash)
        .add_systems(
            Update,
            (apply_local_input, tick_fire_repeat, tick_respawn_countdown)
                .chain()
                .in_set(SimSet::Control),
        );
}

/// Marker for the one entity driven by [`LocalInput`].
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct LocalPlayer;

/// Camera pose for the local player's aim, written by the out-of-scope
/// camera/input layer each frame. Without it the local player falls back to
/// the body muzzle model.
#[derive(Component, Debug, Clone, Copy)]
pub struct AimRig {
    pub origin: Vec3,
    pub forward: Vec3,
}

/// Abstract input state, written by the input-device layer.
/// Edge-triggered fields are consumed when applied.
#[derive(Resource, Debug, Default)]
pub struct LocalInput {
    pub trigger_held: bool,
    pub reload_pressed: bool,
    pub switch_request: Option<WeaponKind>,
}

/// Armed while the trigger is held: repeats the shot at the active weapon's
/// fire interval. Removed on release, on weapon switch, and on death.
#[derive(Component, Debug)]
pub struct FireRepeat {
    pub timer: Timer,
}

impl FireRepeat {
    pub fn new(weapon: WeaponKind) -> Self {
        Self {
            timer: Timer::new(
                Duration::from_millis(weapon.attributes().fire_interval_ms),
                TimerMode::Repeating,
            ),
        }
    }
}

/// Delay between a locally-owned death and the automatic rebirth request.
#[derive(Component, Debug)]
pub struct RespawnCountdown {
    pub timer: Timer,
}

/// Turn the input resource into intents. The first shot fires on the press
/// edge; the repeating timer takes over while the trigger stays held.
fn apply_local_input(
    mut input: ResMut<LocalInput>,
    query: Query<(Entity, &CurrentWeapon, Has<Dead>, Has<FireRepeat>), With<LocalPlayer>>,
    mut commands: Commands,
) {
    let Ok((entity, weapon, is_dead, repeating)) = query.single() else {
        return;
    };

    if input.reload_pressed {
        input.reload_pressed = false;
        commands.trigger(ReloadIntent { entity });
    }

    if let Some(kind) = input.switch_request.take() {
        commands.trigger(SwitchIntent {
            entity,
            weapon: kind,
        });
    }

    if input.trigger_held && !is_dead && !repeating {
        commands.trigger(FireIntent { shooter: entity });
        commands.entity(entity).insert(FireRepeat::new(weapon.0));
    } else if !input.trigger_held && repeating {
        commands.entity(entity).remove::<FireRepeat>();
    }
}

fn tick_fire_repeat(
    time: Res<Time>,
    input: Res<LocalInput>,
    mut query: Query<(Entity, &mut FireRepeat), With<LocalPlayer>>,
    mut commands: Commands,
) {
    for (entity, mut repeat) in &mut query {
        repeat.timer.tick(time.delta());
        if repeat.timer.just_finished() && input.trigger_held {
            commands.trigger(FireIntent { shooter: entity });
        }
    }
}

/// Observer: arm the respawn countdown when a locally-owned entity dies.
/// Remote deaths are their owner's business.
fn on_death_start_countdown(
    on: On<Died>,
    settings: Res<SimSettings>,
    query: Query<&Controller>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    let Ok(controller) = query.get(entity) else {
        return;
    };
    if !controller.is_locally_owned() {
        return;
    }

    commands.entity(entity).insert(RespawnCountdown {
        timer: Timer::from_seconds(settings.respawn_countdown_secs, TimerMode::Once),
    });
}

fn tick_respawn_countdown(
    time: Res<Time>,
    mut query: Query<(Entity, &mut RespawnCountdown)>,
    mut commands: Commands,
) {
    for (entity, mut countdown) in &mut query {
        countdown.timer.tick(time.delta());
        if countdown.timer.is_finished() {
            commands.entity(entity).remove::<RespawnCountdown>();
            commands.trigger(RebirthRequested { entity });
        }
    }
}

/// Observer: directional hurt indicator for the local player. The compass
/// direction comes from the attacker's position in the victim's local frame.
fn on_local_damage_flash(
    on: On<DamageTaken>,
    query: Query<&Transform, With<LocalPlayer>>,
    mut commands: Commands,
) {
    let event = on.event();
    let Ok(transform) = query.get(event.target) else {
        return;
    };

    let local = transform.rotation.inverse() * (event.attacker_position - transform.translation);
    let direction = if local.z.abs() >= local.x.abs() {
        if local.z >= 0.0 {
            FlashDirection::Front
        } else {
            FlashDirection::Back
        }
    } else if local.x >= 0.0 {
        FlashDirection::Right
    } else {
        FlashDirection::Left
    };

    commands.trigger(DamageFlash {
        entity: event.target,
        direction,
    });
}
