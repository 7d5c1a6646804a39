use crate::peer::{generate_peer_id, Outbound, Peer};
use doodle_shared::protocol::{PeerId, RosterEntry, ServerMsg};
use doodle_shared::vec3::{Rotation, Vec3};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;

/// Connection registry owned by the relay task.
///
/// Every mutation is followed by the fan-out it implies, so callers never
/// observe a registry change without the matching broadcast.
pub struct Registry {
    peers: HashMap<PeerId, Peer>,
    rng: ChaCha8Rng,
    id_len: usize,
}

impl Registry {
    pub fn new(id_len: usize, rng_seed: Option<u64>) -> Self {
        let rng = match rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            peers: HashMap::new(),
            rng,
            id_len,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.peers.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Peer> {
        self.peers.get(id)
    }

    /// Register a new connection. Sends it `connect` with the roster of
    /// everyone else, then tells everyone else about it.
    pub fn join(&mut self, outbound: Outbound) -> PeerId {
        let id = self.fresh_id();
        let peer = Peer::new(id.clone(), outbound);

        peer.send(ServerMsg::Connect {
            id: id.clone(),
            clients: self.roster_except(&id),
        });
        self.peers.insert(id.clone(), peer);

        self.broadcast(Some(&id), &ServerMsg::NewPlayer { id: id.clone() });
        id
    }

    /// Store a position report and forward it. Returns false if `id` is no
    /// longer registered, in which case nothing is sent.
    pub fn update_position(
        &mut self,
        id: &str,
        position: Vec3,
        rotation: Option<Rotation>,
    ) -> bool {
        let Some(peer) = self.peers.get_mut(id) else {
            return false;
        };
        peer.position = position;
        if rotation.is_some() {
            peer.rotation = rotation;
        }

        self.broadcast(
            Some(id),
            &ServerMsg::PlayerMove {
                id: id.to_string(),
                position,
                rotation,
            },
        );
        true
    }

    /// Drop a peer and announce it. Returns false if it was already gone.
    pub fn leave(&mut self, id: &str) -> bool {
        if self.peers.remove(id).is_none() {
            return false;
        }
        self.broadcast(None, &ServerMsg::PlayerLeft { id: id.to_string() });
        true
    }

    /// Everyone except `id`.
    pub fn roster_except(&self, id: &str) -> Vec<RosterEntry> {
        self.peers
            .values()
            .filter(|p| p.id != id)
            .map(Peer::roster_entry)
            .collect()
    }

    /// Fan out to every registered peer except `except`. Peers whose socket
    /// task has already gone away are skipped; their `Leave` is on its way.
    pub fn broadcast(&self, except: Option<&str>, msg: &ServerMsg) -> usize {
        let mut delivered = 0;
        for peer in self.peers.values() {
            if Some(peer.id.as_str()) == except {
                continue;
            }
            if peer.send(msg.clone()) {
                delivered += 1;
            }
        }
        delivered
    }

    fn fresh_id(&mut self) -> PeerId {
        loop {
            let id = generate_peer_id(&mut self.rng, self.id_len);
            if !self.peers.contains_key(&id) {
                return id;
            }
        }
    }
}
