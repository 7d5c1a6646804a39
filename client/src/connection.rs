use std::time::Duration;

use doodle_shared::protocol::{decode_server_msg, ClientMsg, DecodeError, ServerMsg};
use doodle_shared::vec3::{Rotation, Vec3};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;

use crate::config::AdapterConfig;
use crate::reconnect::{CloseCause, ConnectionState, Reconnector};

#[derive(Debug, Clone, PartialEq)]
pub enum NetEvent {
    StateChanged(ConnectionState),
    Message(ServerMsg),
}

/// Latest local player pose, as reported to the relay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPose {
    pub position: Vec3,
    pub rotation: Option<Rotation>,
}

/// Owns the connection task. Events are drained by the game loop; the pose
/// is overwritten by it.
pub struct NetworkAdapter {
    event_rx: mpsc::UnboundedReceiver<NetEvent>,
    pose_tx: watch::Sender<Option<LocalPose>>,
    shutdown_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl NetworkAdapter {
    /// Start connecting. Must be called from within a tokio runtime.
    pub fn spawn(config: AdapterConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (pose_tx, pose_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_connection(config, event_tx, pose_rx, shutdown_rx));

        Self {
            event_rx,
            pose_tx,
            shutdown_tx,
            task: Some(task),
        }
    }

    pub fn set_local_pose(&self, position: Vec3, rotation: Option<Rotation>) {
        self.pose_tx.send_replace(Some(LocalPose { position, rotation }));
    }

    /// Drain everything that arrived since the last call.
    pub fn poll_events(&mut self) -> Vec<NetEvent> {
        let mut out = Vec::new();
        while let Ok(evt) = self.event_rx.try_recv() {
            out.push(evt);
        }
        out
    }

    /// Wait for the next event. `None` once the task has stopped and every
    /// event has been read.
    pub async fn next_event(&mut self) -> Option<NetEvent> {
        self.event_rx.recv().await
    }

    /// Close deliberately: cancels any pending reconnect and sends a normal
    /// close frame if open. Resolves once the connection task has finished.
    pub async fn close(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Connection task ended abnormally: {}", e);
            }
        }
    }
}

impl Drop for NetworkAdapter {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

enum SessionEnd {
    Closed(CloseCause),
    Shutdown,
}

fn emit(event_tx: &mpsc::UnboundedSender<NetEvent>, state: ConnectionState) {
    let _ = event_tx.send(NetEvent::StateChanged(state));
}

async fn run_connection(
    config: AdapterConfig,
    event_tx: mpsc::UnboundedSender<NetEvent>,
    pose_rx: watch::Receiver<Option<LocalPose>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut reconnector = Reconnector::new(config.reconnect);

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        emit(&event_tx, ConnectionState::Connecting);
        tracing::info!(url = %config.url, "Connecting to relay");

        let end = tokio::select! {
            _ = shutdown_rx.changed() => SessionEnd::Shutdown,
            result = tokio_tungstenite::connect_async(config.url.as_str()) => match result {
                Ok((ws, _)) => {
                    reconnector.on_open();
                    emit(&event_tx, ConnectionState::Open);
                    tracing::info!(url = %config.url, "Connected to relay");
                    run_session(ws, config.send_interval, &event_tx, pose_rx.clone(), &mut shutdown_rx).await
                }
                Err(e) => {
                    tracing::warn!(url = %config.url, error = %e, "Connection failed");
                    SessionEnd::Closed(CloseCause::Abnormal)
                }
            },
        };

        emit(&event_tx, ConnectionState::Closed);

        let cause = match end {
            SessionEnd::Shutdown => break,
            SessionEnd::Closed(cause) => cause,
        };

        let Some(delay) = reconnector.on_close(cause) else {
            if cause == CloseCause::Abnormal {
                tracing::warn!(attempts = reconnector.attempts(), "Giving up on relay");
            }
            break;
        };

        tracing::info!(
            attempt = reconnector.attempts(),
            "Reconnecting in {:.1}s",
            delay.as_secs_f64()
        );
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    emit(&event_tx, ConnectionState::Stopped);
}

async fn run_session<S>(
    ws: tokio_tungstenite::WebSocketStream<S>,
    send_interval: Duration,
    event_tx: &mpsc::UnboundedSender<NetEvent>,
    pose_rx: watch::Receiver<Option<LocalPose>>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> SessionEnd
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws.split();

    let mut send_timer = tokio::time::interval(send_interval);
    send_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                emit(event_tx, ConnectionState::Closing);
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client closing".into(),
                };
                let _ = write.send(Message::Close(Some(frame))).await;
                return SessionEnd::Shutdown;
            }

            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match decode_server_msg(&text) {
                        Ok(server_msg) => {
                            let _ = event_tx.send(NetEvent::Message(server_msg));
                        }
                        Err(DecodeError::UnknownKind(kind)) => {
                            tracing::debug!(%kind, "Ignoring unknown message type");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Dropping bad message from relay");
                        }
                    },
                    Some(Ok(Message::Close(frame))) => {
                        emit(event_tx, ConnectionState::Closing);
                        let code = frame.map(|f| u16::from(f.code));
                        tracing::info!(?code, "Relay closed the connection");
                        return SessionEnd::Closed(CloseCause::from_code(code));
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Connection error");
                        return SessionEnd::Closed(CloseCause::Abnormal);
                    }
                    None => return SessionEnd::Closed(CloseCause::Abnormal),
                }
            }

            _ = send_timer.tick() => {
                // Only the latest pose matters; nothing is queued while closed.
                let Some(pose) = *pose_rx.borrow() else {
                    continue;
                };
                let msg = ClientMsg::Position {
                    position: pose.position,
                    rotation: pose.rotation,
                };
                if let Ok(text) = serde_json::to_string(&msg) {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        return SessionEnd::Closed(CloseCause::Abnormal);
                    }
                }
            }
        }
    }
}
