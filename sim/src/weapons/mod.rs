//! Weapon state: ammo pools, the reload state machine, weapon switching.

use bevy::prelude::*;

mod components;
mod events;
mod reload;
mod switch;

pub use components::*;
pub use events::*;

pub fn plugin(app: &mut App) {
    app.add_plugins((reload::plugin, switch::plugin));
}
