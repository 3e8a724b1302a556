//! Outbound snapshot relay, remote interpolation, and ping cadence.

use bevy::prelude::*;

use ricochet_shared::snapshot::{ActionKind, CharacterSnapshot};

use crate::models::{
    CurrentAction, CurrentWeapon, Dead, Health, LastAttacker, Score, SimSettings, VerticalAim,
};
use crate::player::LocalPlayer;
use crate::weapons::{ReloadStarted, WeaponSwitched};

use super::{ClientMessage, PingTracker, RemoteTarget, RoomConnection, SyncClock};

/// Outbound pose throttle. Events bypass it.
#[derive(Resource)]
pub(super) struct SyncTimer(pub Timer);

impl FromWorld for SyncTimer {
    fn from_world(world: &mut World) -> Self {
        let interval = world
            .get_resource::<SimSettings>()
            .map(|s| s.sync_interval_secs)
            .unwrap_or_else(|| SimSettings::default().sync_interval_secs);
        Self(Timer::from_seconds(interval, TimerMode::Repeating))
    }
}

#[derive(Resource)]
pub(super) struct PingTimer(pub Timer);

impl FromWorld for PingTimer {
    fn from_world(world: &mut World) -> Self {
        let interval = world
            .get_resource::<SimSettings>()
            .map(|s| s.ping_interval_secs)
            .unwrap_or_else(|| SimSettings::default().ping_interval_secs);
        Self(Timer::from_seconds(interval, TimerMode::Repeating))
    }
}

/// Last snapshot actually sent, for minimum-delta filtering.
#[derive(Resource, Default)]
pub(super) struct LastSent(pub Option<CharacterSnapshot>);

fn build_snapshot(
    transform: &Transform,
    health: &Health,
    action: ActionKind,
    aim: &VerticalAim,
    weapon: &CurrentWeapon,
    score: &Score,
    last_attacker: Option<&LastAttacker>,
) -> CharacterSnapshot {
    CharacterSnapshot {
        position: transform.translation,
        rotation: transform.rotation,
        action,
        current_hp: health.current,
        vertical_aim: aim.0,
        weapon: weapon.0,
        score: score.0,
        last_attacker_id: last_attacker.map(|a| a.id.clone()),
        last_attacker_position: last_attacker.map(|a| a.position),
        update_timestamp: 0,
    }
}

/// Throttled pose sync: every interval, send the local snapshot unless the
/// pose moved less than the minimum delta since the last send.
pub(super) fn send_local_snapshot(
    time: Res<Time>,
    mut timer: ResMut<SyncTimer>,
    mut clock: ResMut<SyncClock>,
    mut last_sent: ResMut<LastSent>,
    conn: Res<RoomConnection>,
    query: Query<
        (
            &Transform,
            &Health,
            &CurrentAction,
            &VerticalAim,
            &CurrentWeapon,
            &Score,
            Option<&LastAttacker>,
        ),
        With<LocalPlayer>,
    >,
) {
    timer.0.tick(time.delta());
    if !timer.0.just_finished() {
        return;
    }
    let Ok((transform, health, action, aim, weapon, score, last_attacker)) = query.single() else {
        return;
    };

    let mut snapshot = build_snapshot(transform, health, action.0, aim, weapon, score, last_attacker);
    if let Some(previous) = &last_sent.0 {
        if !snapshot.pose_differs_from(previous) {
            return;
        }
    }

    snapshot.update_timestamp = clock.stamp(&time);
    last_sent.0 = Some(snapshot.clone());
    conn.send(ClientMessage::UpdateCharacterState(snapshot));
}

/// Observer: a local shot is replicated immediately, outside the throttle,
/// with `action == Shoot`. The action reverts to idle right after so the
/// next throttled send doesn't repeat the shot.
pub(super) fn send_on_shot(
    on: On<crate::combat::ShotFired>,
    time: Res<Time>,
    mut clock: ResMut<SyncClock>,
    mut last_sent: ResMut<LastSent>,
    conn: Option<Res<RoomConnection>>,
    mut query: Query<
        (
            &Transform,
            &Health,
            &mut CurrentAction,
            &VerticalAim,
            &CurrentWeapon,
            &Score,
            Option<&LastAttacker>,
            Has<Dead>,
        ),
        With<LocalPlayer>,
    >,
) {
    let Some(conn) = conn else { return };
    let Ok((transform, health, mut action, aim, weapon, score, last_attacker, is_dead)) =
        query.get_mut(on.event().shooter)
    else {
        return;
    };

    let mut snapshot =
        build_snapshot(transform, health, ActionKind::Shoot, aim, weapon, score, last_attacker);
    snapshot.update_timestamp = clock.stamp(&time);
    last_sent.0 = Some(snapshot.clone());
    conn.send(ClientMessage::UpdateCharacterState(snapshot));

    if !is_dead {
        action.0 = ActionKind::Idle;
    }
}

/// Observer: an accepted weapon switch is relayed immediately.
pub(super) fn send_on_weapon_switch(
    on: On<WeaponSwitched>,
    time: Res<Time>,
    mut clock: ResMut<SyncClock>,
    mut last_sent: ResMut<LastSent>,
    conn: Option<Res<RoomConnection>>,
    query: Query<
        (
            &Transform,
            &Health,
            &CurrentAction,
            &VerticalAim,
            &CurrentWeapon,
            &Score,
            Option<&LastAttacker>,
        ),
        With<LocalPlayer>,
    >,
) {
    let Some(conn) = conn else { return };
    let event = on.event();
    let Ok((transform, health, action, aim, weapon, score, last_attacker)) = query.get(event.entity)
    else {
        return;
    };

    conn.send(ClientMessage::UpdateWeaponType(event.weapon));

    let mut snapshot = build_snapshot(transform, health, action.0, aim, weapon, score, last_attacker);
    snapshot.update_timestamp = clock.stamp(&time);
    last_sent.0 = Some(snapshot.clone());
    conn.send(ClientMessage::UpdateCharacterState(snapshot));
}

/// Observer: reload start is relayed immediately as well, so peers see the
/// state edge without waiting out the throttle window.
pub(super) fn send_on_reload_edge(
    on: On<ReloadStarted>,
    time: Res<Time>,
    mut clock: ResMut<SyncClock>,
    mut last_sent: ResMut<LastSent>,
    conn: Option<Res<RoomConnection>>,
    query: Query<
        (
            &Transform,
            &Health,
            &CurrentAction,
            &VerticalAim,
            &CurrentWeapon,
            &Score,
            Option<&LastAttacker>,
        ),
        With<LocalPlayer>,
    >,
) {
    let Some(conn) = conn else { return };
    let Ok((transform, health, action, aim, weapon, score, last_attacker)) =
        query.get(on.event().entity)
    else {
        return;
    };

    let mut snapshot = build_snapshot(transform, health, action.0, aim, weapon, score, last_attacker);
    snapshot.update_timestamp = clock.stamp(&time);
    last_sent.0 = Some(snapshot.clone());
    conn.send(ClientMessage::UpdateCharacterState(snapshot));
}

pub(super) fn send_ping(
    time: Res<Time>,
    mut timer: ResMut<PingTimer>,
    mut tracker: ResMut<PingTracker>,
    conn: Res<RoomConnection>,
) {
    timer.0.tick(time.delta());
    if !timer.0.just_finished() {
        return;
    }
    let nonce = tracker.next_nonce;
    tracker.next_nonce += 1;
    tracker.sent_at = Some(time.elapsed_secs());
    conn.send(ClientMessage::Ping { nonce });
}

/// Exponential blend of remote bodies toward their latest accepted snapshot:
/// a fixed factor per tick for position and rotation, a gentler one for
/// vertical aim. Never overshoots; the blend only closes distance.
pub(super) fn interpolate_remotes(
    settings: Res<SimSettings>,
    mut query: Query<(&RemoteTarget, &mut Transform, &mut VerticalAim)>,
) {
    for (target, mut transform, mut aim) in &mut query {
        transform.translation = transform
            .translation
            .lerp(target.position, settings.position_blend);
        transform.rotation = transform.rotation.slerp(target.rotation, settings.position_blend);
        aim.0 += (target.vertical_aim - aim.0) * settings.aim_blend;
    }
}
