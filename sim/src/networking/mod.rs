//! Replication adapter: transport abstraction, outbound relays, inbound
//! reconciliation, RTT measurement.
//!
//! The real wire lives behind [`Transport`]; the simulation never sees
//! sockets. Outbound sends are fire-and-forget: a failure is logged and local
//! state is never rolled back.

use bevy::prelude::*;
use smol_str::SmolStr;
use std::sync::Arc;
use thiserror::Error;

use ricochet_shared::snapshot::{CharacterSnapshot, RoomStatus, RoomUserState};
use ricochet_shared::weapons::WeaponKind;

use crate::SimSet;

pub mod loopback;
mod reconcile;
mod sync;

pub use loopback::{LoopbackServer, LoopbackTransport};
pub use reconcile::{RemoteTarget, SnapshotClock};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("send failed: {0}")]
    SendFailed(String),
}

/// Client → server messages. The sender is implied by the connection.
#[derive(Debug, Clone)]
pub enum ClientMessage {
    JoinRoom { username: SmolStr },
    Ready(bool),
    LeaveRoom,
    UpdateCharacterState(CharacterSnapshot),
    TakeDamage {
        target: SmolStr,
        amount: i32,
        attacker: SmolStr,
        attacker_position: Vec3,
    },
    Rebirth,
    UpdateWeaponType(WeaponKind),
    Ping { nonce: u32 },
}

/// Server → client updates.
#[derive(Debug, Clone)]
pub enum ServerUpdate {
    RoomStatus(RoomStatus),
    UserState { id: SmolStr, state: RoomUserState },
    UserLeft(SmolStr),
    Pong { nonce: u32 },
}

/// The injected session channel. Object-safe so tests and the demo can hand
/// in a loopback while a real client hands in a socket-backed one.
pub trait Transport: Send + Sync {
    fn send(&self, message: ClientMessage) -> Result<(), TransportError>;
    /// Drain everything the server pushed since the last poll.
    fn poll(&self) -> Vec<ServerUpdate>;
}

/// Active room session.
#[derive(Resource, Clone)]
pub struct RoomConnection {
    pub transport: Arc<dyn Transport>,
    pub local_id: SmolStr,
}

impl RoomConnection {
    /// Send, logging instead of propagating: outbound failures never roll
    /// back local state.
    pub fn send(&self, message: ClientMessage) {
        if let Err(e) = self.transport.send(message) {
            warn!("Failed to send to room server: {e}");
        }
    }
}

/// Source of `update_timestamp`: sim-time milliseconds, bumped so stamps are
/// strictly increasing even within one tick.
#[derive(Resource, Default)]
pub struct SyncClock {
    last: u64,
}

impl SyncClock {
    pub fn stamp(&mut self, time: &Time) -> u64 {
        let now = time.elapsed().as_millis() as u64;
        self.last = now.max(self.last + 1);
        self.last
    }
}

/// Updates received but not yet applied this tick.
#[derive(Resource, Default)]
pub struct InboundQueue(pub Vec<ServerUpdate>);

/// Tracks round-trip time via ping nonces, exponentially smoothed.
#[derive(Resource, Default)]
pub struct PingTracker {
    pub next_nonce: u32,
    pub sent_at: Option<f32>,
    pub smoothed_rtt_ms: f32,
}

impl PingTracker {
    pub fn record_pong(&mut self, nonce: u32, now_secs: f32) {
        if nonce + 1 != self.next_nonce {
            return;
        }
        let Some(sent_at) = self.sent_at.take() else {
            return;
        };
        let rtt_ms = (now_secs - sent_at) * 1000.0;
        if self.smoothed_rtt_ms <= 0.0 {
            self.smoothed_rtt_ms = rtt_ms;
        } else {
            self.smoothed_rtt_ms = self.smoothed_rtt_ms * 0.8 + rtt_ms * 0.2;
        }
    }
}

pub fn plugin(app: &mut App) {
    app.init_resource::<InboundQueue>()
        .init_resource::<SyncClock>()
        .init_resource::<PingTracker>()
        .init_resource::<sync::SyncTimer>()
        .init_resource::<sync::PingTimer>()
        .init_resource::<sync::LastSent>()
        .add_observer(relay_remote_hit)
        .add_observer(relay_rebirth_request)
        .add_observer(relay_leave_on_departure)
        .add_observer(sync::send_on_shot)
        .add_observer(sync::send_on_weapon_switch)
        .add_observer(sync::send_on_reload_edge)
        .add_systems(
            Update,
            (poll_transport, reconcile::reconcile)
                .chain()
                .run_if(resource_exists::<RoomConnection>)
                .in_set(SimSet::Ingest),
        )
        .add_systems(
            Update,
            (
                sync::send_local_snapshot,
                sync::send_ping,
                sync::interpolate_remotes,
            )
                .run_if(resource_exists::<RoomConnection>)
                .in_set(SimSet::Sync),
        );
}

fn poll_transport(conn: Res<RoomConnection>, mut queue: ResMut<InboundQueue>) {
    queue.0.extend(conn.transport.poll());
}

/// Observer: a locally-resolved shot struck a remote combatant, so report the
/// damage to its owner through the server.
fn relay_remote_hit(on: On<crate::combat::RemoteHit>, conn: Option<Res<RoomConnection>>) {
    let Some(conn) = conn else { return };
    let event = on.event();
    conn.send(ClientMessage::TakeDamage {
        target: event.target_id.clone(),
        amount: event.amount,
        attacker: event.attacker_id.clone(),
        attacker_position: event.attacker_position,
    });
}

/// Observer: the local player's respawn countdown elapsed, so ask the server
/// for a rebirth. The actual revival happens when the server echoes the
/// restored hp back. Without a session the revival applies directly.
fn relay_rebirth_request(
    on: On<crate::combat::RebirthRequested>,
    players: Query<(), With<crate::player::LocalPlayer>>,
    conn: Option<Res<RoomConnection>>,
    mut commands: Commands,
) {
    let entity = on.event().entity;
    if players.get(entity).is_err() {
        return;
    }
    match conn {
        Some(conn) => conn.send(ClientMessage::Rebirth),
        None => commands.trigger(crate::combat::RebirthIntent { entity }),
    }
}

/// Observer: tell the server when the local session ends.
fn relay_leave_on_departure(_on: On<SessionClosed>, conn: Option<Res<RoomConnection>>) {
    let Some(conn) = conn else { return };
    conn.send(ClientMessage::LeaveRoom);
}

/// Intent: the application is tearing the session down.
#[derive(Event, Clone, Copy, Debug)]
pub struct SessionClosed;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn sync_clock_is_strictly_monotonic() {
        let mut clock = SyncClock::default();
        let mut time = Time::<()>::default();
        time.advance_by(Duration::from_millis(100));

        let first = clock.stamp(&time);
        let second = clock.stamp(&time);
        assert_eq!(first, 100);
        assert!(second > first);

        time.advance_by(Duration::from_millis(1000));
        assert!(clock.stamp(&time) > second);
    }

    #[test]
    fn ping_tracker_smooths_rtt() {
        let mut tracker = PingTracker::default();

        tracker.next_nonce = 1;
        tracker.sent_at = Some(0.0);
        tracker.record_pong(0, 0.1);
        assert!((tracker.smoothed_rtt_ms - 100.0).abs() < 1e-3);

        tracker.next_nonce = 2;
        tracker.sent_at = Some(1.0);
        tracker.record_pong(1, 1.2);
        // 0.8 * 100 + 0.2 * 200
        assert!((tracker.smoothed_rtt_ms - 120.0).abs() < 1e-3);
    }

    #[test]
    fn mismatched_pong_is_ignored() {
        let mut tracker = PingTracker::default();
        tracker.next_nonce = 5;
        tracker.sent_at = Some(0.0);
        tracker.record_pong(2, 0.5);
        assert_eq!(tracker.smoothed_rtt_ms, 0.0);
        assert!(tracker.sent_at.is_some());
    }
}
