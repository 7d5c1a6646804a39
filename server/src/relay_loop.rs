use crate::config::ServerConfig;
use crate::peer::Outbound;
use crate::registry::Registry;
use doodle_shared::protocol::PeerId;
use doodle_shared::vec3::{Rotation, Vec3};
use tokio::sync::{mpsc, oneshot};

/// Commands from client connections to the relay task
#[derive(Debug)]
pub enum RelayCommand {
    PeerJoin {
        outbound: Outbound,
        response: oneshot::Sender<PeerId>,
    },
    Position {
        id: PeerId,
        position: Vec3,
        rotation: Option<Rotation>,
    },
    PeerLeave {
        id: PeerId,
    },
    /// Current registry size, for tests and diagnostics.
    PeerCount {
        response: oneshot::Sender<usize>,
    },
}

/// Run the relay. Owns the registry; every mutation and fan-out happens here,
/// one command at a time.
pub async fn run_relay_loop(mut cmd_rx: mpsc::Receiver<RelayCommand>, config: ServerConfig) {
    let mut registry = Registry::new(config.id_len, config.rng_seed);

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            RelayCommand::PeerJoin { outbound, response } => {
                let id = registry.join(outbound);
                tracing::info!(peer = %id, peers = registry.len(), "Peer joined");
                if response.send(id.clone()).is_err() {
                    // Socket task gave up before we answered.
                    registry.leave(&id);
                }
            }
            RelayCommand::Position {
                id,
                position,
                rotation,
            } => {
                if !registry.update_position(&id, position, rotation) {
                    tracing::debug!(peer = %id, "Dropping position from departed peer");
                }
            }
            RelayCommand::PeerLeave { id } => {
                if registry.leave(&id) {
                    tracing::info!(peer = %id, peers = registry.len(), "Peer left");
                }
            }
            RelayCommand::PeerCount { response } => {
                let _ = response.send(registry.len());
            }
        }
    }

    tracing::info!("Relay loop ended");
}
