//! Weapon switching: same-weapon no-op, reload lock, rate limiting.

use bevy::prelude::*;

use crate::SimSet;
use crate::models::{CurrentWeapon, Dead};
use crate::player::FireRepeat;

use super::{FireControl, ReloadState, SwitchIntent, SwitchRejected, SwitchThrottle, WeaponSwitched};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(on_switch_intent)
        .add_systems(Update, tick_weapon_guards.in_set(SimSet::World));
}

/// Observer: apply a switch request.
/// An accepted switch disarms any armed fire repeat; the replication layer
/// relays it immediately, outside the pose throttle.
fn on_switch_intent(
    on: On<SwitchIntent>,
    mut query: Query<(
        &mut CurrentWeapon,
        &mut SwitchThrottle,
        Has<Dead>,
        Has<ReloadState>,
    )>,
    mut commands: Commands,
) {
    let event = on.event();
    let Ok((mut current, mut throttle, is_dead, is_reloading)) = query.get_mut(event.entity) else {
        return;
    };

    if is_dead || current.0 == event.weapon {
        return;
    }

    if is_reloading || !throttle.try_accept() {
        commands.trigger(SwitchRejected {
            entity: event.entity,
            attempted: event.weapon,
        });
        return;
    }

    current.0 = event.weapon;
    commands.entity(event.entity).remove::<FireRepeat>();
    commands.trigger(WeaponSwitched {
        entity: event.entity,
        weapon: event.weapon,
    });
}

/// Advance per-entity fire guards and switch cooldowns.
fn tick_weapon_guards(time: Res<Time>, mut query: Query<(&mut FireControl, &mut SwitchThrottle)>) {
    for (mut control, mut throttle) in &mut query {
        control.tick(time.delta());
        throttle.tick(time.delta());
    }
}
