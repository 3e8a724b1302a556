//! The authoritative damage contract and the rebirth path.

use bevy::prelude::*;
use rand::Rng;
use std::time::Duration;

use ricochet_shared::arena;
use ricochet_shared::combat::defaults;
use ricochet_shared::snapshot::ActionKind;

use crate::SimSet;
use crate::models::{
    Controller, CurrentAction, Dead, Health, LastAttacker, PlayerId, PlayerRegistry, Score,
};
use crate::player::FireRepeat;
use crate::weapons::{AmmoPool, ReloadState};

use super::{DamageTaken, Died, RebirthIntent};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(on_damage)
        .add_observer(on_rebirth)
        .add_systems(Update, tick_relocation.in_set(SimSet::Combat));
}

/// Observer: the single damage entry point.
///
/// Hits on an already-dead target are no-ops; the death latch makes repeated
/// or late damage reports idempotent. The attacker is recorded on every
/// applied hit. The kill transition latches [`Dead`], stops any armed fire
/// repeat, and awards the attacker one score point, except for self-kills.
fn on_damage(
    on: On<DamageTaken>,
    registry: Res<PlayerRegistry>,
    mut targets: Query<(&PlayerId, &Controller, &mut Health, &mut CurrentAction, Has<Dead>)>,
    mut scores: Query<(&mut Score, &Controller)>,
    mut commands: Commands,
) {
    let event = on.event();
    let Ok((target_id, target_controller, mut health, mut action, is_dead)) =
        targets.get_mut(event.target)
    else {
        debug!("Dropping damage for missing target {:?}", event.target);
        return;
    };

    if is_dead {
        debug!("Ignoring damage on dead target {target_id}");
        return;
    }

    let died = health.take_damage(event.amount);
    commands.entity(event.target).insert(LastAttacker {
        id: event.attacker_id.clone(),
        position: event.attacker_position,
    });

    if !died {
        return;
    }

    action.0 = ActionKind::Die;
    commands
        .entity(event.target)
        .insert(Dead)
        .remove::<FireRepeat>();

    let is_self_kill = event.attacker_id == target_id.0;
    if !is_self_kill {
        if let Some(attacker) = registry.get(&event.attacker_id) {
            if let Ok((mut score, attacker_controller)) = scores.get_mut(attacker) {
                // Kills the server can see come back as score on a
                // replicated row; crediting those here too would count them
                // twice. Only wire-invisible kills are credited locally.
                let credit_is_replicated = match attacker_controller {
                    Controller::Remote => true,
                    Controller::Local => matches!(target_controller, Controller::Remote),
                    Controller::Bot => false,
                };
                if !credit_is_replicated {
                    score.0 += 1;
                }
            }
        }
    }

    commands.trigger(Died {
        entity: event.target,
        killer_id: event.attacker_id.clone(),
    });
}

/// Relocation armed by rebirth: the body revives in place and jumps to its
/// spawn anchor a beat later, mirroring how the movement layer settles.
#[derive(Component, Debug)]
pub struct PendingRelocation {
    pub timer: Timer,
    pub anchor: Vec3,
}

/// Observer: revive a dead entity.
///
/// Valid only while the death latch is set; a stray rebirth on a living
/// entity does nothing. Restores hp, refills every ammo pool, clears any
/// in-flight reload, and arms the delayed relocation.
fn on_rebirth(
    on: On<RebirthIntent>,
    mut query: Query<(&Controller, &mut Health, &mut AmmoPool, &mut CurrentAction), With<Dead>>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    let Ok((controller, mut health, mut ammo, mut action)) = query.get_mut(entity) else {
        debug!("Ignoring rebirth for {entity:?}: not dead or missing");
        return;
    };

    health.restore();
    ammo.refill_all();
    action.0 = ActionKind::Idle;
    commands.entity(entity).remove::<(Dead, ReloadState)>();

    // Remote bodies relocate wherever their owner replicates them to; only
    // locally-owned entities pick an anchor here.
    if controller.is_locally_owned() {
        let anchor = arena::spawn_anchor(rand::rng().random_range(0..arena::SPAWN_ANCHORS.len()));
        commands.entity(entity).insert(PendingRelocation {
            timer: Timer::new(
                Duration::from_millis(defaults::RELOCATION_DELAY_MS),
                TimerMode::Once,
            ),
            anchor,
        });
    }
}

fn tick_relocation(
    time: Res<Time>,
    mut query: Query<(Entity, &mut PendingRelocation, &mut Transform)>,
    mut commands: Commands,
) {
    for (entity, mut relocation, mut transform) in &mut query {
        relocation.timer.tick(time.delta());
        if relocation.timer.is_finished() {
            transform.translation = relocation.anchor;
            commands.entity(entity).remove::<PendingRelocation>();
        }
    }
}
