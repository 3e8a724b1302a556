//! Wire-level replication types.
//!
//! `CharacterSnapshot` is the unit of state sync: each peer broadcasts its own
//! snapshot and applies everyone else's. `update_timestamp` is monotonic per
//! sender and drives last-write-wins conflict resolution on the receiver.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::weapons::WeaponKind;

/// What the character is visibly doing. `Shoot` doubles as the cosmetic fire
/// signal for observers.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ActionKind {
    #[default]
    Idle,
    Run,
    Die,
    Shoot,
}

/// Spawn-time stats the room server assigns to every player.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerStats {
    pub max_hp: i32,
    pub attack_power: i32,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            max_hp: crate::combat::defaults::MAX_HP,
            attack_power: crate::combat::defaults::ATTACK_POWER,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct UserProfile {
    pub username: SmolStr,
}

/// One user's replicated state as stored by the room server.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct RoomUserState {
    pub ready: bool,
    pub player: PlayerStats,
    pub profile: UserProfile,
    pub character: Option<CharacterSnapshot>,
}

/// Room lifecycle as reported by the server.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoomStatus {
    #[default]
    Lobby,
    Playing,
    Finished,
}

/// Full per-character replication snapshot.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CharacterSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub action: ActionKind,
    pub current_hp: i32,
    pub vertical_aim: f32,
    pub weapon: WeaponKind,
    pub score: u32,
    pub last_attacker_id: Option<SmolStr>,
    pub last_attacker_position: Option<Vec3>,
    /// Sender-local milliseconds, strictly increasing per sender.
    pub update_timestamp: u64,
}

impl Default for CharacterSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            action: ActionKind::Idle,
            current_hp: crate::combat::defaults::MAX_HP,
            vertical_aim: 0.0,
            weapon: WeaponKind::default(),
            score: 0,
            last_attacker_id: None,
            last_attacker_position: None,
            update_timestamp: 0,
        }
    }
}

/// Outbound sync skips updates whose pose moved less than this since the last
/// send. Events (fire, reload, weapon change, damage) bypass the filter.
pub const MIN_SYNC_DELTA: f32 = 0.01;

impl CharacterSnapshot {
    /// Last-write-wins guard for the transform/action field group. Equal
    /// timestamps are stale: only strictly newer snapshots may replace pose.
    pub fn is_newer_than(&self, last_applied_timestamp: u64) -> bool {
        self.update_timestamp > last_applied_timestamp
    }

    /// Whether the pose changed enough since `previous` to justify a
    /// throttled sync message.
    pub fn pose_differs_from(&self, previous: &CharacterSnapshot) -> bool {
        self.position.distance(previous.position) > MIN_SYNC_DELTA
            || self.rotation.angle_between(previous.rotation) > MIN_SYNC_DELTA
            || (self.vertical_aim - previous.vertical_aim).abs() > MIN_SYNC_DELTA
            || self.action != previous.action
            || self.weapon != previous.weapon
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_timestamp_is_stale() {
        let snapshot = CharacterSnapshot {
            update_timestamp: 100,
            ..Default::default()
        };
        assert!(!snapshot.is_newer_than(100));
        assert!(!snapshot.is_newer_than(150));
        assert!(snapshot.is_newer_than(99));
    }

    #[test]
    fn tiny_pose_change_is_filtered() {
        let previous = CharacterSnapshot::default();
        let mut next = previous.clone();
        next.position.x = 0.005;
        assert!(!next.pose_differs_from(&previous));

        next.position.x = 0.5;
        assert!(next.pose_differs_from(&previous));
    }

    #[test]
    fn action_change_always_counts() {
        let previous = CharacterSnapshot::default();
        let mut next = previous.clone();
        next.action = ActionKind::Shoot;
        assert!(next.pose_differs_from(&previous));
    }
}
