//! Combat: the hitscan resolver and the authoritative damage contract.

use bevy::prelude::*;

mod damage;
pub mod events;
mod shoot;

pub use events::*;

pub fn plugin(app: &mut App) {
    app.add_plugins((shoot::plugin, damage::plugin));
}
