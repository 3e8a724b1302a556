//! Server→client reconciliation: diff inbound room state against the ECS.

use bevy::prelude::*;
use smol_str::SmolStr;
use std::collections::HashMap;

use ricochet_shared::snapshot::{ActionKind, RoomUserState};

use crate::combat::{CosmeticFire, DamageTaken, RebirthIntent};
use crate::models::{
    CombatantBundle, Controller, CurrentAction, CurrentWeapon, Dead, Health, PlayerRegistry,
    RoomPhase, Score,
};
use crate::player::LocalPlayer;

use super::{InboundQueue, PingTracker, RoomConnection, ServerUpdate};

/// Latest accepted pose for a remote combatant. Written here, consumed by
/// the interpolation system.
#[derive(Component, Debug, Clone, Copy)]
pub struct RemoteTarget {
    pub position: Vec3,
    pub rotation: Quat,
    pub vertical_aim: f32,
}

/// Last applied `update_timestamp` for one remote sender. Guards the pose
/// field group against stale and reordered snapshots.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct SnapshotClock {
    pub last_timestamp: u64,
}

/// Apply everything the transport delivered this tick: room phase changes,
/// roster changes, and per-user snapshots.
///
/// Snapshots split into two field groups. Pose (position, rotation, aim,
/// action, weapon) is last-write-wins by `update_timestamp`; stale snapshots
/// drop it silently. Hp, score, and attacker effects are applied in arrival
/// order, funneled through the same damage contract local hits use.
pub(super) fn reconcile(
    mut queue: ResMut<InboundQueue>,
    mut registry: ResMut<PlayerRegistry>,
    conn: Res<RoomConnection>,
    time: Res<Time>,
    mut next_phase: ResMut<NextState<RoomPhase>>,
    mut ping: ResMut<PingTracker>,
    mut remotes: Query<(
        &mut RemoteTarget,
        &mut SnapshotClock,
        &Health,
        &mut Score,
        &mut CurrentWeapon,
        &mut CurrentAction,
        Has<Dead>,
    )>,
    mut local: Query<(&Health, &mut Score, Has<Dead>), (With<LocalPlayer>, Without<RemoteTarget>)>,
    mut commands: Commands,
) {
    // Damage triggers are deferred commands, so `Health` stays pre-drain for
    // the whole loop. Amounts already issued this drain are tracked here and
    // subtracted before diffing, or several echoes for one entity would each
    // re-apply the same delta.
    let mut issued: HashMap<Entity, i32> = HashMap::new();

    for update in queue.0.drain(..) {
        match update {
            ServerUpdate::RoomStatus(status) => {
                next_phase.set(status.into());
            }
            ServerUpdate::Pong { nonce } => {
                ping.record_pong(nonce, time.elapsed_secs());
            }
            ServerUpdate::UserLeft(id) => match registry.remove(&id) {
                Some(entity) => {
                    info!("User {id} left, despawning");
                    commands.entity(entity).despawn();
                }
                None => debug!("UserLeft for unknown id {id}"),
            },
            ServerUpdate::UserState { id, state } => {
                if id == conn.local_id {
                    apply_own_state(&id, &state, &registry, &mut local, &mut issued, &mut commands);
                } else {
                    apply_remote_state(
                        id,
                        state,
                        &mut registry,
                        &mut remotes,
                        &mut issued,
                        &mut commands,
                    );
                }
            }
        }
    }
}

/// The server echoes our own row back after authoritative changes (damage
/// dealt to us, kill credit, rebirth). Hp drops route through the damage
/// contract; hp returning from zero completes the rebirth round-trip.
fn apply_own_state(
    id: &SmolStr,
    state: &RoomUserState,
    registry: &PlayerRegistry,
    local: &mut Query<(&Health, &mut Score, Has<Dead>), (With<LocalPlayer>, Without<RemoteTarget>)>,
    issued: &mut HashMap<Entity, i32>,
    commands: &mut Commands,
) {
    let Some(entity) = registry.get(id) else {
        debug!("Own state arrived before local spawn, dropping");
        return;
    };
    let Ok((health, mut score, is_dead)) = local.get_mut(entity) else {
        return;
    };
    let Some(snapshot) = &state.character else {
        return;
    };

    score.0 = snapshot.score;

    apply_vitals(entity, health, is_dead, snapshot, issued, commands);
}

/// Derive damage and rebirth from a replicated hp against the entity's
/// effective hp (component value minus amounts already issued this drain).
/// Both outcomes funnel through the regular contract observers.
fn apply_vitals(
    entity: Entity,
    health: &Health,
    is_dead: bool,
    snapshot: &ricochet_shared::snapshot::CharacterSnapshot,
    issued: &mut HashMap<Entity, i32>,
    commands: &mut Commands,
) {
    let effective_hp = health.current - issued.get(&entity).copied().unwrap_or(0);

    if !is_dead && snapshot.current_hp < effective_hp {
        let amount = effective_hp - snapshot.current_hp;
        *issued.entry(entity).or_insert(0) += amount;
        commands.trigger(DamageTaken {
            target: entity,
            amount,
            attacker_id: snapshot.last_attacker_id.clone().unwrap_or_default(),
            attacker_position: snapshot.last_attacker_position.unwrap_or_default(),
        });
    } else if (is_dead || effective_hp <= 0) && snapshot.current_hp > 0 {
        commands.trigger(RebirthIntent { entity });
    }
}

fn apply_remote_state(
    id: SmolStr,
    state: RoomUserState,
    registry: &mut PlayerRegistry,
    remotes: &mut Query<(
        &mut RemoteTarget,
        &mut SnapshotClock,
        &Health,
        &mut Score,
        &mut CurrentWeapon,
        &mut CurrentAction,
        Has<Dead>,
    )>,
    issued: &mut HashMap<Entity, i32>,
    commands: &mut Commands,
) {
    let Some(entity) = registry.get(&id) else {
        spawn_remote(id, state, registry, commands);
        return;
    };
    let Ok((mut target, mut clock, health, mut score, mut weapon, mut action, is_dead)) =
        remotes.get_mut(entity)
    else {
        return;
    };
    let Some(snapshot) = &state.character else {
        return;
    };

    // Pose field group: last-write-wins.
    if snapshot.is_newer_than(clock.last_timestamp) {
        clock.last_timestamp = snapshot.update_timestamp;
        target.position = snapshot.position;
        target.rotation = snapshot.rotation;
        target.vertical_aim = snapshot.vertical_aim;
        weapon.0 = snapshot.weapon;
        if snapshot.action == ActionKind::Shoot {
            commands.trigger(CosmeticFire { entity });
        }
        action.0 = snapshot.action;
    } else {
        debug!(
            "Dropping stale pose for {id}: {} <= {}",
            snapshot.update_timestamp, clock.last_timestamp
        );
    }

    // Hp/score/attacker field group: arrival order.
    score.0 = snapshot.score;
    apply_vitals(entity, health, is_dead, snapshot, issued, commands);
}

fn spawn_remote(
    id: SmolStr,
    state: RoomUserState,
    registry: &mut PlayerRegistry,
    commands: &mut Commands,
) {
    let snapshot = state.character.clone().unwrap_or_default();
    info!("Spawning remote combatant {id}");

    let mut spawned = commands.spawn((
        CombatantBundle::new(id.clone(), Controller::Remote, state.player, snapshot.position),
        RemoteTarget {
            position: snapshot.position,
            rotation: snapshot.rotation,
            vertical_aim: snapshot.vertical_aim,
        },
        SnapshotClock {
            last_timestamp: snapshot.update_timestamp,
        },
    ));
    spawned.insert((
        Transform::from_translation(snapshot.position).with_rotation(snapshot.rotation),
        Health {
            current: snapshot.current_hp.max(0),
            max: state.player.max_hp,
        },
        CurrentWeapon(snapshot.weapon),
        Score(snapshot.score),
        CurrentAction(snapshot.action),
    ));
    if snapshot.current_hp <= 0 {
        spawned.insert(Dead);
    }

    registry.insert(id, spawned.id());
}
