//! The reload state machine: intent → [`ReloadState`] → refill.

use bevy::prelude::*;

use crate::SimSet;
use crate::models::{CurrentWeapon, Dead};

use super::{AmmoPool, ReloadFinished, ReloadIntent, ReloadProgress, ReloadStarted, ReloadState};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(on_reload_intent)
        .add_systems(Update, tick_reloads.in_set(SimSet::Combat));
}

/// Observer: begin a reload unless dead, already running, or pointless
/// because the current magazine is full.
/// The state captures the weapon active right now; a later switch attempt is
/// rejected for the duration, so the refill always lands in this pool.
fn on_reload_intent(
    on: On<ReloadIntent>,
    query: Query<(&CurrentWeapon, &AmmoPool, Has<Dead>, Has<ReloadState>)>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    let Ok((weapon, ammo, is_dead, is_reloading)) = query.get(entity) else {
        return;
    };
    if is_dead || is_reloading {
        return;
    }
    let pool = ammo.ammo(weapon.0);
    if pool.current >= pool.max {
        return;
    }

    commands.entity(entity).insert(ReloadState::new(weapon.0));
    commands.trigger(ReloadStarted {
        entity,
        weapon: weapon.0,
    });
}

/// Tick running reloads, stepping progress feedback and refilling the bound
/// pool on completion. There is no cancel path; only rebirth removes the
/// state early.
fn tick_reloads(
    time: Res<Time>,
    mut reloading: Query<(Entity, &mut ReloadState, &mut AmmoPool)>,
    mut commands: Commands,
) {
    for (entity, mut state, mut ammo) in &mut reloading {
        state.timer.tick(time.delta());

        let percent = state.percent();
        if percent != state.last_percent && !state.timer.is_finished() {
            state.last_percent = percent;
            commands.trigger(ReloadProgress { entity, percent });
        }

        if state.timer.is_finished() {
            ammo.refill(state.weapon);
            commands.entity(entity).remove::<ReloadState>();
            commands.trigger(ReloadProgress {
                entity,
                percent: 100,
            });
            commands.trigger(ReloadFinished {
                entity,
                weapon: state.weapon,
            });
        }
    }
}
