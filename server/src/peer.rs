use doodle_shared::protocol::{PeerId, RosterEntry, ServerMsg};
use doodle_shared::vec3::{Rotation, Vec3};
use rand::Rng;
use tokio::sync::mpsc;

/// Outbound queue of one connection. The socket task drains it.
pub type Outbound = mpsc::UnboundedSender<ServerMsg>;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// One connected client as the relay sees it.
#[derive(Debug)]
pub struct Peer {
    pub id: PeerId,
    pub outbound: Outbound,
    pub position: Vec3,
    pub rotation: Option<Rotation>,
}

impl Peer {
    pub fn new(id: PeerId, outbound: Outbound) -> Self {
        Self {
            id,
            outbound,
            position: Vec3::ZERO,
            rotation: None,
        }
    }

    pub fn roster_entry(&self) -> RosterEntry {
        RosterEntry {
            id: self.id.clone(),
            position: self.position,
            rotation: self.rotation,
        }
    }

    /// Queue a message for this peer. Returns false if the socket task is gone.
    pub fn send(&self, msg: ServerMsg) -> bool {
        !self.outbound.is_closed() && self.outbound.send(msg).is_ok()
    }
}

/// Random base-36 id of `len` characters.
pub fn generate_peer_id<R: Rng>(rng: &mut R, len: usize) -> PeerId {
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn peer_id_has_requested_length_and_alphabet() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let id = generate_peer_id(&mut rng, 9);
            assert_eq!(id.len(), 9);
            assert!(id
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
        }
    }

    #[test]
    fn consecutive_ids_differ() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let a = generate_peer_id(&mut rng, 9);
        let b = generate_peer_id(&mut rng, 9);
        assert_ne!(a, b);
    }

    #[test]
    fn new_peer_starts_at_origin() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let peer = Peer::new("abc".to_string(), tx);
        assert_eq!(peer.position, Vec3::ZERO);
        assert!(peer.rotation.is_none());
        assert_eq!(peer.roster_entry().id, "abc");
    }

    #[test]
    fn send_to_dropped_socket_reports_failure() {
        let (tx, rx) = mpsc::unbounded_channel();
        let peer = Peer::new("abc".to_string(), tx);
        drop(rx);
        assert!(!peer.send(ServerMsg::NewPlayer {
            id: "x".to_string()
        }));
    }
}
