//! The combat resolver: preconditions, recoil, hitscan, attribution.

use bevy::prelude::*;
use rand::Rng;

use ricochet_shared::combat::{self, Ray, damage_with_variance, defaults, muzzle};
use ricochet_shared::snapshot::ActionKind;

use crate::models::{Controller, CurrentAction, CurrentWeapon, Dead, PlayerId, VerticalAim};
use crate::player::AimRig;
use crate::weapons::{AmmoPool, FireControl, ReloadIntent, ReloadState};
use crate::world::{RayHit, WorldGeometry};

use super::{CosmeticFire, DamageTaken, FireIntent, RemoteHit, ShotFired, SurfaceImpact};

/// Local aim rays extend this far ahead of the camera before recoil.
const AIM_TARGET_DISTANCE: f32 = 10.0;

pub(super) fn plugin(app: &mut App) {
    app.add_observer(on_fire_intent).add_observer(on_cosmetic_fire);
}

/// Observer: resolve one shot for a locally-owned entity.
///
/// Preconditions (dead, reloading, fire guard, ammo) gate silently. Recoil
/// perturbs the aim target before the raycast, so the tracer and the hit
/// test agree on the same line. Ammo is spent on every successful shot, hit
/// or miss, and an empty pool auto-starts the reload.
fn on_fire_intent(
    on: On<FireIntent>,
    geometry: Res<WorldGeometry>,
    mut shooters: Query<(
        &PlayerId,
        &Transform,
        &Controller,
        &CurrentWeapon,
        &VerticalAim,
        &mut AmmoPool,
        &mut FireControl,
        &mut CurrentAction,
        Option<&AimRig>,
        Has<Dead>,
        Has<ReloadState>,
    )>,
    targets: Query<(&PlayerId, &Controller)>,
    mut commands: Commands,
) {
    let shooter = on.event().shooter;
    let Ok((
        shooter_id,
        transform,
        controller,
        weapon,
        aim,
        mut ammo,
        mut fire_control,
        mut action,
        rig,
        is_dead,
        is_reloading,
    )) = shooters.get_mut(shooter)
    else {
        return;
    };

    if is_dead || is_reloading || !fire_control.can_fire() {
        return;
    }

    if ammo.ammo(weapon.0).is_empty() {
        commands.trigger(ReloadIntent { entity: shooter });
        return;
    }

    let (origin, aim_target) = match (controller, rig) {
        // Local player aims with the camera pose fed by the input layer.
        (Controller::Local, Some(rig)) => {
            (rig.origin, rig.origin + rig.forward * AIM_TARGET_DISTANCE)
        }
        // Everyone else aims with the body muzzle model: yaw from the
        // transform, pitch from the replicated vertical aim.
        _ => {
            let yaw = transform.rotation.to_euler(EulerRot::YXZ).0;
            let rotation = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(aim.0);
            (
                transform.translation + rotation * muzzle::ORIGIN_OFFSET,
                transform.translation + rotation * muzzle::TARGET_OFFSET,
            )
        }
    };

    let mut rng = rand::rng();
    let forward = (aim_target - origin).normalize_or(Vec3::Z);
    let right = forward.cross(Vec3::Y).normalize_or(Vec3::X);
    let target = combat::perturb_aim(
        aim_target,
        right,
        Vec3::Y,
        rng.random_range(-1.0..=1.0),
        rng.random_range(defaults::MIN_VERTICAL_ROLL..=1.0),
    );
    let ray = Ray::between(origin, target);

    ammo.try_consume(weapon.0);
    fire_control.mark_fired();
    action.0 = ActionKind::Shoot;

    commands.trigger(ShotFired {
        shooter,
        origin,
        target,
    });

    if ammo.ammo(weapon.0).is_empty() {
        commands.trigger(ReloadIntent { entity: shooter });
    }

    match geometry.raycast(&ray, shooter) {
        Some(RayHit::Combatant { entity, .. }) => {
            let Ok((target_id, target_controller)) = targets.get(entity) else {
                return;
            };
            let amount = damage_with_variance(
                weapon.0.attributes().damage,
                rng.random_range(-defaults::DAMAGE_VARIANCE..=defaults::DAMAGE_VARIANCE),
            );
            if target_controller.is_locally_owned() {
                commands.trigger(DamageTaken {
                    target: entity,
                    amount,
                    attacker_id: shooter_id.0.clone(),
                    attacker_position: transform.translation,
                });
            }
            if !matches!(target_controller, Controller::Bot) {
                // Remote bodies: the owner applies the damage, we only
                // report it. The local player: the report keeps the server's
                // row in step, so its rebirth gate sees the death. The echo
                // matches the already-applied hp and lands as a no-op.
                commands.trigger(RemoteHit {
                    target_id: target_id.0.clone(),
                    amount,
                    attacker_id: shooter_id.0.clone(),
                    attacker_position: transform.translation,
                });
            }
        }
        Some(RayHit::Surface { point, normal, .. }) => {
            commands.trigger(SurfaceImpact {
                shooter,
                point,
                normal,
            });
        }
        None => {}
    }
}

/// Observer: replay a remote shot visually. No preconditions, no ammo, no
/// hit detection; the owning peer already resolved all of that.
fn on_cosmetic_fire(
    on: On<CosmeticFire>,
    query: Query<(&Transform, &VerticalAim)>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    let Ok((transform, aim)) = query.get(entity) else {
        return;
    };

    let yaw = transform.rotation.to_euler(EulerRot::YXZ).0;
    let rotation = Quat::from_rotation_y(yaw) * Quat::from_rotation_x(aim.0);
    commands.trigger(ShotFired {
        shooter: entity,
        origin: transform.translation + rotation * muzzle::ORIGIN_OFFSET,
        target: transform.translation + rotation * muzzle::TARGET_OFFSET,
    });
}
