//! Headless player: walks in a circle and logs who else is around.

use std::time::Duration;

use doodle_client::config::AdapterConfig;
use doodle_client::connection::NetworkAdapter;
use doodle_client::peers::{PeerChange, PeerView};
use doodle_client::reconnect::ConnectionState;
use doodle_shared::vec3::{vec3, Rotation};

const TICK_HZ: f64 = 60.0;
const WALK_RADIUS: f64 = 8.0;
/// Radians per second around the circle
const WALK_SPEED: f64 = 0.6;
const SUMMARY_EVERY: Duration = Duration::from_secs(2);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = AdapterConfig::from_env();
    if let Err(e) = config.validate() {
        eprintln!("Invalid client configuration: {}", e);
        std::process::exit(1);
    }

    let mut adapter = NetworkAdapter::spawn(config);
    let mut view = PeerView::default();

    let dt = 1.0 / TICK_HZ;
    let mut tick = tokio::time::interval(Duration::from_secs_f64(dt));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut summary = tokio::time::interval(SUMMARY_EVERY);
    let mut angle: f64 = 0.0;

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = tick.tick() => {
                angle += WALK_SPEED * dt;
                let position = vec3(WALK_RADIUS * angle.cos(), 1.0, WALK_RADIUS * angle.sin());
                // Face along the walk direction.
                adapter.set_local_pose(position, Some(Rotation::new(0.0, -angle)));

                for evt in adapter.poll_events() {
                    match view.apply(&evt) {
                        Some(PeerChange::Joined(id)) => tracing::info!(peer = %id, "Player joined"),
                        Some(PeerChange::Left(id)) => tracing::info!(peer = %id, "Player left"),
                        Some(PeerChange::Reset) => tracing::info!("{}", view.summary()),
                        Some(PeerChange::State(ConnectionState::Stopped)) => {
                            tracing::warn!("Relay unreachable, stopping");
                            return;
                        }
                        Some(PeerChange::Moved(_)) | Some(PeerChange::State(_)) | None => {}
                    }
                }
            }
            _ = summary.tick() => {
                tracing::info!("{}", view.summary());
                for peer in view.peers() {
                    tracing::debug!(
                        peer = %peer.id,
                        x = peer.position.x,
                        y = peer.position.y,
                        z = peer.position.z,
                        "Remote player"
                    );
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Leaving");
                adapter.close().await;
                return;
            }
        }
    }
}
