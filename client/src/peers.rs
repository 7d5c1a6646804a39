use std::collections::HashMap;

use doodle_shared::protocol::{PeerId, ServerMsg};
use doodle_shared::vec3::{Rotation, Vec3};

use crate::connection::NetEvent;
use crate::reconnect::ConnectionState;

/// Proxy for another player, as last reported by the relay.
#[derive(Debug, Clone, PartialEq)]
pub struct RemotePeer {
    pub id: PeerId,
    pub position: Vec3,
    pub rotation: Option<Rotation>,
}

impl RemotePeer {
    fn at_origin(id: PeerId) -> Self {
        Self {
            id,
            position: Vec3::ZERO,
            rotation: None,
        }
    }
}

/// What changed in the proxy set, for the presentation layer to mirror.
#[derive(Debug, Clone, PartialEq)]
pub enum PeerChange {
    /// The whole set was replaced from a fresh roster.
    Reset,
    Joined(PeerId),
    Moved(PeerId),
    Left(PeerId),
    State(ConnectionState),
}

/// Presentation-side view of the session.
#[derive(Debug)]
pub struct PeerView {
    pub state: ConnectionState,
    pub self_id: Option<PeerId>,
    peers: HashMap<PeerId, RemotePeer>,
}

impl Default for PeerView {
    fn default() -> Self {
        Self {
            state: ConnectionState::Connecting,
            self_id: None,
            peers: HashMap::new(),
        }
    }
}

impl PeerView {
    pub fn get(&self, id: &str) -> Option<&RemotePeer> {
        self.peers.get(id)
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn peers(&self) -> impl Iterator<Item = &RemotePeer> {
        self.peers.values()
    }

    pub fn apply(&mut self, event: &NetEvent) -> Option<PeerChange> {
        match event {
            NetEvent::StateChanged(state) => {
                self.state = *state;
                Some(PeerChange::State(*state))
            }
            NetEvent::Message(msg) => self.apply_message(msg),
        }
    }

    fn apply_message(&mut self, msg: &ServerMsg) -> Option<PeerChange> {
        match msg {
            ServerMsg::Connect { id, clients } => {
                // A new session means new ids; proxies from the last one are stale.
                self.self_id = Some(id.clone());
                self.peers = clients
                    .iter()
                    .filter(|c| &c.id != id)
                    .map(|c| {
                        let peer = RemotePeer {
                            id: c.id.clone(),
                            position: c.position,
                            rotation: c.rotation,
                        };
                        (c.id.clone(), peer)
                    })
                    .collect();
                Some(PeerChange::Reset)
            }
            ServerMsg::NewPlayer { id } => {
                if self.is_self(id) {
                    return None;
                }
                self.peers
                    .insert(id.clone(), RemotePeer::at_origin(id.clone()));
                Some(PeerChange::Joined(id.clone()))
            }
            ServerMsg::PlayerMove {
                id,
                position,
                rotation,
            } => {
                let peer = self.peers.get_mut(id)?;
                peer.position = *position;
                if rotation.is_some() {
                    peer.rotation = *rotation;
                }
                Some(PeerChange::Moved(id.clone()))
            }
            ServerMsg::PlayerLeft { id } => {
                self.peers.remove(id)?;
                Some(PeerChange::Left(id.clone()))
            }
        }
    }

    fn is_self(&self, id: &str) -> bool {
        self.self_id.as_deref() == Some(id)
    }

    /// One-line status, in the spirit of a debug overlay.
    pub fn summary(&self) -> String {
        format!(
            "Network: {} | Your ID: {} | Remote Players: {}",
            self.state.label(),
            self.self_id.as_deref().unwrap_or("Unknown"),
            self.peers.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doodle_shared::protocol::RosterEntry;
    use doodle_shared::vec3::vec3;

    fn msg(m: ServerMsg) -> NetEvent {
        NetEvent::Message(m)
    }

    fn connect(id: &str, others: &[&str]) -> NetEvent {
        msg(ServerMsg::Connect {
            id: id.to_string(),
            clients: others
                .iter()
                .map(|o| RosterEntry {
                    id: o.to_string(),
                    position: vec3(1.0, 1.0, 1.0),
                    rotation: None,
                })
                .collect(),
        })
    }

    #[test]
    fn connect_stores_self_and_roster() {
        let mut view = PeerView::default();
        assert_eq!(view.apply(&connect("me", &["a", "b"])), Some(PeerChange::Reset));
        assert_eq!(view.self_id.as_deref(), Some("me"));
        assert_eq!(view.len(), 2);
        assert_eq!(view.get("a").unwrap().position, vec3(1.0, 1.0, 1.0));
    }

    #[test]
    fn roster_never_contains_self() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &["me", "a"]));
        assert!(view.get("me").is_none());
        assert_eq!(view.len(), 1);
    }

    #[test]
    fn reconnect_replaces_stale_proxies() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &["a", "b"]));
        view.apply(&connect("me2", &["c"]));
        assert_eq!(view.self_id.as_deref(), Some("me2"));
        assert!(view.get("a").is_none());
        assert!(view.get("c").is_some());
    }

    #[test]
    fn new_player_starts_at_origin() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &[]));
        let change = view.apply(&msg(ServerMsg::NewPlayer { id: "a".to_string() }));
        assert_eq!(change, Some(PeerChange::Joined("a".to_string())));
        assert_eq!(view.get("a").unwrap().position, Vec3::ZERO);
    }

    #[test]
    fn new_player_for_self_is_ignored() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &[]));
        assert_eq!(view.apply(&msg(ServerMsg::NewPlayer { id: "me".to_string() })), None);
        assert!(view.is_empty());
    }

    #[test]
    fn move_updates_known_peer() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &["a"]));
        let change = view.apply(&msg(ServerMsg::PlayerMove {
            id: "a".to_string(),
            position: vec3(1.0, 2.0, 3.0),
            rotation: Some(Rotation::new(0.2, 0.4)),
        }));
        assert_eq!(change, Some(PeerChange::Moved("a".to_string())));
        let a = view.get("a").unwrap();
        assert_eq!(a.position, vec3(1.0, 2.0, 3.0));
        assert_eq!(a.rotation, Some(Rotation::new(0.2, 0.4)));
    }

    #[test]
    fn move_for_unknown_peer_is_noop() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &[]));
        let change = view.apply(&msg(ServerMsg::PlayerMove {
            id: "ghost".to_string(),
            position: vec3(1.0, 2.0, 3.0),
            rotation: None,
        }));
        assert_eq!(change, None);
        assert!(view.is_empty());
    }

    #[test]
    fn player_left_removes_proxy() {
        let mut view = PeerView::default();
        view.apply(&connect("me", &["a"]));
        let change = view.apply(&msg(ServerMsg::PlayerLeft { id: "a".to_string() }));
        assert_eq!(change, Some(PeerChange::Left("a".to_string())));
        assert!(view.is_empty());
        // Second leave for the same id changes nothing.
        assert_eq!(view.apply(&msg(ServerMsg::PlayerLeft { id: "a".to_string() })), None);
    }

    #[test]
    fn state_changes_show_in_summary() {
        let mut view = PeerView::default();
        assert_eq!(
            view.summary(),
            "Network: Connecting | Your ID: Unknown | Remote Players: 0"
        );
        view.apply(&NetEvent::StateChanged(ConnectionState::Open));
        view.apply(&connect("me", &["a"]));
        assert_eq!(
            view.summary(),
            "Network: Connected | Your ID: me | Remote Players: 1"
        );
    }
}
