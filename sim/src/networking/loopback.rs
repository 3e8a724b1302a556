//! In-process room server for the demo binary and integration tests.
//!
//! One [`LoopbackServer`] holds the authoritative room; each connected party
//! gets a [`LoopbackTransport`] handle whose sends apply immediately and
//! whose polls drain that party's inbox. Tests drive a second handle as a
//! fake peer to inject traffic.

use bevy::prelude::*;
use smol_str::SmolStr;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use ricochet_shared::arena;
use ricochet_shared::snapshot::{
    ActionKind, CharacterSnapshot, RoomStatus, RoomUserState, UserProfile,
};

use super::{ClientMessage, ServerUpdate, Transport, TransportError};

#[derive(Default)]
struct ServerState {
    status: RoomStatus,
    users: HashMap<SmolStr, RoomUserState>,
    inboxes: HashMap<SmolStr, VecDeque<ServerUpdate>>,
    joined: usize,
}

#[derive(Clone, Default)]
pub struct LoopbackServer {
    state: Arc<Mutex<ServerState>>,
}

impl LoopbackServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a party and hand back its transport handle.
    pub fn connect(&self, id: impl Into<SmolStr>) -> LoopbackTransport {
        let id = id.into();
        if let Ok(mut state) = self.state.lock() {
            state.inboxes.entry(id.clone()).or_default();
        }
        LoopbackTransport {
            state: Arc::clone(&self.state),
            id,
        }
    }
}

pub struct LoopbackTransport {
    state: Arc<Mutex<ServerState>>,
    id: SmolStr,
}

impl Transport for LoopbackTransport {
    fn send(&self, message: ClientMessage) -> Result<(), TransportError> {
        let mut state = self.state.lock().map_err(|_| TransportError::Closed)?;
        state.handle(&self.id, message);
        Ok(())
    }

    fn poll(&self) -> Vec<ServerUpdate> {
        match self.state.lock() {
            Ok(mut state) => state
                .inboxes
                .get_mut(&self.id)
                .map(|inbox| inbox.drain(..).collect())
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }
}

impl ServerState {
    fn handle(&mut self, sender: &SmolStr, message: ClientMessage) {
        match message {
            ClientMessage::JoinRoom { username } => self.join(sender, username),
            ClientMessage::Ready(ready) => self.ready(sender, ready),
            ClientMessage::LeaveRoom => self.leave(sender),
            ClientMessage::UpdateCharacterState(snapshot) => self.update_character(sender, snapshot),
            ClientMessage::UpdateWeaponType(kind) => {
                if let Some(character) = self.character_mut(sender) {
                    character.weapon = kind;
                }
                self.broadcast_user(sender, false);
            }
            ClientMessage::TakeDamage {
                target,
                amount,
                attacker,
                attacker_position,
            } => self.take_damage(&target, amount, &attacker, attacker_position),
            ClientMessage::Rebirth => self.rebirth(sender),
            ClientMessage::Ping { nonce } => {
                self.push_to(sender, ServerUpdate::Pong { nonce });
            }
        }
    }

    fn join(&mut self, sender: &SmolStr, username: SmolStr) {
        let spawn = arena::spawn_anchor(self.joined);
        self.joined += 1;

        let state = RoomUserState {
            ready: false,
            player: Default::default(),
            profile: UserProfile { username },
            character: Some(CharacterSnapshot {
                position: spawn,
                ..Default::default()
            }),
        };
        self.users.insert(sender.clone(), state);

        // The joiner gets the room as it stands; everyone learns about the
        // joiner.
        self.push_to(sender, ServerUpdate::RoomStatus(self.status));
        for (id, user) in self.users.clone() {
            if &id != sender {
                self.push_to(sender, ServerUpdate::UserState { id, state: user });
            }
        }
        self.broadcast_user(sender, true);
    }

    fn ready(&mut self, sender: &SmolStr, ready: bool) {
        if let Some(user) = self.users.get_mut(sender) {
            user.ready = ready;
        }
        self.broadcast_user(sender, false);

        if !self.users.is_empty() && self.users.values().all(|u| u.ready) {
            self.status = RoomStatus::Playing;
            let status = self.status;
            for id in self.inbox_ids() {
                self.push_to(&id, ServerUpdate::RoomStatus(status));
            }
        }
    }

    fn leave(&mut self, sender: &SmolStr) {
        self.users.remove(sender);
        self.inboxes.remove(sender);
        for id in self.inbox_ids() {
            self.push_to(&id, ServerUpdate::UserLeft(sender.clone()));
        }
    }

    /// Merge a pose update. Hp, score, and attacker fields stay
    /// server-authoritative; only their owner's damage reports move them.
    fn update_character(&mut self, sender: &SmolStr, snapshot: CharacterSnapshot) {
        if let Some(character) = self.character_mut(sender) {
            character.position = snapshot.position;
            character.rotation = snapshot.rotation;
            character.action = snapshot.action;
            character.vertical_aim = snapshot.vertical_aim;
            character.weapon = snapshot.weapon;
            character.update_timestamp = snapshot.update_timestamp;
        }
        self.broadcast_user(sender, false);
    }

    fn take_damage(&mut self, target: &SmolStr, amount: i32, attacker: &SmolStr, attacker_position: Vec3) {
        let Some(character) = self.character_mut(target) else {
            return;
        };
        // Dead targets ignore damage; late reports are no-ops.
        if character.current_hp <= 0 {
            return;
        }

        character.current_hp = (character.current_hp - amount).max(0);
        character.last_attacker_id = Some(attacker.clone());
        character.last_attacker_position = Some(attacker_position);
        let killed = character.current_hp == 0;
        if killed {
            character.action = ActionKind::Die;
        }

        self.broadcast_user(target, true);

        // Kill credit, except for self-kills.
        if killed && attacker != target {
            if let Some(character) = self.character_mut(attacker) {
                character.score += 1;
            }
            self.broadcast_user(attacker, true);
        }
    }

    fn rebirth(&mut self, sender: &SmolStr) {
        let max_hp = self.users.get(sender).map(|u| u.player.max_hp).unwrap_or_default();
        let Some(character) = self.character_mut(sender) else {
            return;
        };
        if character.current_hp > 0 {
            return;
        }
        character.current_hp = max_hp;
        character.action = ActionKind::Idle;
        self.broadcast_user(sender, true);
    }

    fn character_mut(&mut self, id: &SmolStr) -> Option<&mut CharacterSnapshot> {
        self.users.get_mut(id).and_then(|u| u.character.as_mut())
    }

    fn inbox_ids(&self) -> Vec<SmolStr> {
        self.inboxes.keys().cloned().collect()
    }

    fn push_to(&mut self, id: &SmolStr, update: ServerUpdate) {
        if let Some(inbox) = self.inboxes.get_mut(id) {
            inbox.push_back(update);
        }
    }

    /// Broadcast one user's row. `include_owner` is set for server-initiated
    /// changes (damage, score, rebirth) so the owner reacts to them too;
    /// plain pose relays skip the sender.
    fn broadcast_user(&mut self, id: &SmolStr, include_owner: bool) {
        let Some(state) = self.users.get(id).cloned() else {
            return;
        };
        for inbox_id in self.inbox_ids() {
            if !include_owner && &inbox_id == id {
                continue;
            }
            self.push_to(
                &inbox_id,
                ServerUpdate::UserState {
                    id: id.clone(),
                    state: state.clone(),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined_pair() -> (LoopbackServer, LoopbackTransport, LoopbackTransport) {
        let server = LoopbackServer::new();
        let alice = server.connect("alice");
        let bob = server.connect("bob");
        alice
            .send(ClientMessage::JoinRoom { username: "alice".into() })
            .unwrap();
        bob.send(ClientMessage::JoinRoom { username: "bob".into() })
            .unwrap();
        // clear join traffic
        alice.poll();
        bob.poll();
        (server, alice, bob)
    }

    fn hp_of(updates: &[ServerUpdate], id: &str) -> Option<i32> {
        updates.iter().rev().find_map(|u| match u {
            ServerUpdate::UserState { id: uid, state } if uid == id => {
                state.character.as_ref().map(|c| c.current_hp)
            }
            _ => None,
        })
    }

    #[test]
    fn damage_clamps_and_ignores_dead() {
        let (_server, alice, bob) = joined_pair();

        alice
            .send(ClientMessage::TakeDamage {
                target: "bob".into(),
                amount: 150,
                attacker: "alice".into(),
                attacker_position: Vec3::ZERO,
            })
            .unwrap();
        let updates = bob.poll();
        assert_eq!(hp_of(&updates, "bob"), Some(0));

        // Late report on a dead target changes nothing.
        alice
            .send(ClientMessage::TakeDamage {
                target: "bob".into(),
                amount: 10,
                attacker: "alice".into(),
                attacker_position: Vec3::ZERO,
            })
            .unwrap();
        assert!(bob.poll().is_empty());
    }

    #[test]
    fn kill_awards_score_but_not_for_self_kills() {
        let (_server, alice, bob) = joined_pair();

        alice
            .send(ClientMessage::TakeDamage {
                target: "bob".into(),
                amount: 100,
                attacker: "alice".into(),
                attacker_position: Vec3::ZERO,
            })
            .unwrap();
        let updates = alice.poll();
        let alice_score = updates.iter().rev().find_map(|u| match u {
            ServerUpdate::UserState { id, state } if id == "alice" => {
                state.character.as_ref().map(|c| c.score)
            }
            _ => None,
        });
        assert_eq!(alice_score, Some(1));

        // Bob rebirths, then kills himself: no credit.
        bob.send(ClientMessage::Rebirth).unwrap();
        bob.send(ClientMessage::TakeDamage {
            target: "bob".into(),
            amount: 100,
            attacker: "bob".into(),
            attacker_position: Vec3::ZERO,
        })
        .unwrap();
        let updates = bob.poll();
        let bob_score = updates.iter().rev().find_map(|u| match u {
            ServerUpdate::UserState { id, state } if id == "bob" => {
                state.character.as_ref().map(|c| c.score)
            }
            _ => None,
        });
        assert_eq!(bob_score, Some(0));
    }

    #[test]
    fn rebirth_requires_death_and_restores_hp() {
        let (_server, alice, bob) = joined_pair();

        // Alive: rebirth is a no-op.
        bob.send(ClientMessage::Rebirth).unwrap();
        assert!(bob.poll().is_empty());

        alice
            .send(ClientMessage::TakeDamage {
                target: "bob".into(),
                amount: 100,
                attacker: "alice".into(),
                attacker_position: Vec3::ZERO,
            })
            .unwrap();
        bob.poll();

        bob.send(ClientMessage::Rebirth).unwrap();
        let updates = bob.poll();
        assert_eq!(hp_of(&updates, "bob"), Some(100));
    }

    #[test]
    fn room_starts_when_everyone_is_ready() {
        let (_server, alice, bob) = joined_pair();
        alice.send(ClientMessage::Ready(true)).unwrap();
        assert!(!alice.poll().iter().any(|u| matches!(
            u,
            ServerUpdate::RoomStatus(RoomStatus::Playing)
        )));

        bob.send(ClientMessage::Ready(true)).unwrap();
        assert!(alice.poll().iter().any(|u| matches!(
            u,
            ServerUpdate::RoomStatus(RoomStatus::Playing)
        )));
    }

    #[test]
    fn pose_updates_skip_the_sender() {
        let (_server, alice, bob) = joined_pair();
        let snapshot = CharacterSnapshot {
            position: Vec3::new(1.0, 0.0, 2.0),
            update_timestamp: 10,
            ..Default::default()
        };
        alice
            .send(ClientMessage::UpdateCharacterState(snapshot))
            .unwrap();
        assert!(alice.poll().is_empty());
        assert!(!bob.poll().is_empty());
    }
}
