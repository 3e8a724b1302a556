//! Pure game logic shared by the simulation core and any server implementation.
//!
//! No engine types here; `glam` math and `serde` wire types only, so the same
//! crate can back an authoritative server without dragging in Bevy.

pub mod arena;
pub mod combat;
pub mod snapshot;
pub mod weapons;
