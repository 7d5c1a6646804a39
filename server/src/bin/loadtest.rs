//! Load test for the doodle relay.
//!
//! Spawns multiple fake WebSocket clients that:
//! - Connect to the relay and wait for `connect`
//! - Periodically send position updates
//! - Count the playerMove / newPlayer / playerLeft fan-out they receive
//!
//! Usage: cargo run --bin loadtest -- [OPTIONS]
//!
//! Options:
//!   --clients N      Number of clients to spawn (default: 50)
//!   --duration S     Test duration in seconds (default: 30)
//!   --rate R         Position updates per second per client (default: 20)
//!   --url URL        Relay URL (default: ws://127.0.0.1:3000/)

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message};

// === Protocol types (minimal subset) ===

#[derive(Serialize)]
struct Xyz {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Serialize)]
struct PositionMsg {
    #[serde(rename = "type")]
    msg_type: &'static str,
    position: Xyz,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ServerMsg {
    #[serde(rename = "connect")]
    Connect {},
    #[serde(rename = "newPlayer")]
    NewPlayer {},
    #[serde(rename = "playerMove")]
    PlayerMove {},
    #[serde(rename = "playerLeft")]
    PlayerLeft {},
}

// === Metrics ===

#[derive(Default)]
struct Metrics {
    connected: AtomicU64,
    messages_received: AtomicU64,
    moves_received: AtomicU64,
    joins_received: AtomicU64,
    leaves_received: AtomicU64,
    positions_sent: AtomicU64,
    errors: AtomicU64,
    latency_sum_ms: AtomicU64,
    latency_count: AtomicU64,
}

// === Client task ===

async fn run_client(client_id: u32, url: String, rate: f64, duration: Duration, metrics: Arc<Metrics>) {
    let connect_start = Instant::now();

    let (mut ws, _) = match connect_async(&url).await {
        Ok(conn) => conn,
        Err(e) => {
            if client_id < 5 {
                eprintln!("Client {} failed to connect: {}", client_id, e);
            }
            metrics.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    // Wait for connect before doing anything else
    let got_connect = tokio::time::timeout(Duration::from_secs(5), async {
        while let Some(msg) = ws.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                    if let Ok(ServerMsg::Connect {}) = serde_json::from_str::<ServerMsg>(&text) {
                        return true;
                    }
                }
                Ok(Message::Close(_)) | Err(_) => return false,
                _ => {}
            }
        }
        false
    })
    .await;

    if !matches!(got_connect, Ok(true)) {
        if client_id < 3 {
            eprintln!("Client {} never got connect", client_id);
        }
        metrics.errors.fetch_add(1, Ordering::Relaxed);
        return;
    }

    let connect_latency = connect_start.elapsed();
    metrics
        .latency_sum_ms
        .fetch_add(connect_latency.as_millis() as u64, Ordering::Relaxed);
    metrics.latency_count.fetch_add(1, Ordering::Relaxed);
    metrics.connected.fetch_add(1, Ordering::Relaxed);

    let send_interval = if rate > 0.0 {
        Duration::from_secs_f64(1.0 / rate)
    } else {
        Duration::from_secs(3600) // Effectively never
    };
    let mut send_timer = tokio::time::interval(send_interval);
    send_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let test_end = Instant::now() + duration;
    let phase = client_id as f64 * 0.37;
    let mut t = 0.0f64;

    loop {
        if Instant::now() >= test_end {
            break;
        }

        tokio::select! {
            _ = send_timer.tick() => {
                // Walk a circle so every update differs
                t += send_interval.as_secs_f64();
                let msg = PositionMsg {
                    msg_type: "position",
                    position: Xyz {
                        x: 10.0 * (t + phase).cos(),
                        y: 1.0,
                        z: 10.0 * (t + phase).sin(),
                    },
                };
                let Ok(json) = serde_json::to_string(&msg) else {
                    continue;
                };
                if ws.send(Message::Text(json.into())).await.is_ok() {
                    metrics.positions_sent.fetch_add(1, Ordering::Relaxed);
                } else {
                    metrics.errors.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }

            msg = ws.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        metrics.messages_received.fetch_add(1, Ordering::Relaxed);
                        match serde_json::from_str::<ServerMsg>(&text) {
                            Ok(ServerMsg::PlayerMove {}) => {
                                metrics.moves_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::NewPlayer {}) => {
                                metrics.joins_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::PlayerLeft {}) => {
                                metrics.leaves_received.fetch_add(1, Ordering::Relaxed);
                            }
                            Ok(ServerMsg::Connect {}) | Err(_) => {}
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        if client_id < 3 {
                            eprintln!("Client {} got Close: {:?}", client_id, frame);
                        }
                        break;
                    }
                    None => break,
                    Some(Err(e)) => {
                        if client_id < 3 {
                            eprintln!("Client {} error: {}", client_id, e);
                        }
                        metrics.errors.fetch_add(1, Ordering::Relaxed);
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = ws.close(None).await;
    metrics.connected.fetch_sub(1, Ordering::Relaxed);
}

// === Main ===

#[tokio::main]
async fn main() {
    let args: Vec<String> = std::env::args().collect();

    let mut num_clients: u32 = 50;
    let mut duration_secs: u64 = 30;
    let mut rate: f64 = 20.0;
    let mut url = "ws://127.0.0.1:3000/".to_string();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--clients" => {
                i += 1;
                num_clients = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(50);
            }
            "--duration" => {
                i += 1;
                duration_secs = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(30);
            }
            "--rate" => {
                i += 1;
                rate = args.get(i).and_then(|s| s.parse().ok()).unwrap_or(20.0);
            }
            "--url" => {
                i += 1;
                url = args.get(i).cloned().unwrap_or(url);
            }
            _ => {}
        }
        i += 1;
    }

    println!("=== Doodle Relay Load Test ===");
    println!("Clients: {}", num_clients);
    println!("Duration: {}s", duration_secs);
    println!("Position rate: {}/s per client", rate);
    println!("URL: {}", url);
    println!();

    let metrics = Arc::new(Metrics::default());
    let duration = Duration::from_secs(duration_secs);

    let mut handles = Vec::with_capacity(num_clients as usize);
    let spawn_start = Instant::now();

    for client_id in 0..num_clients {
        let url = url.clone();
        let metrics = Arc::clone(&metrics);

        handles.push(tokio::spawn(async move {
            run_client(client_id, url, rate, duration, metrics).await;
        }));

        // Stagger spawns slightly to avoid thundering herd
        if client_id % 50 == 49 {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    println!("All clients spawned in {:?}", spawn_start.elapsed());
    println!();

    // Print stats periodically
    let metrics_clone = Arc::clone(&metrics);
    let stats_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        let start = Instant::now();

        loop {
            interval.tick().await;
            let elapsed = start.elapsed().as_secs();
            println!(
                "[{:3}s] connected={}, msgs={}, moves={}, sent={}, errors={}",
                elapsed,
                metrics_clone.connected.load(Ordering::Relaxed),
                metrics_clone.messages_received.load(Ordering::Relaxed),
                metrics_clone.moves_received.load(Ordering::Relaxed),
                metrics_clone.positions_sent.load(Ordering::Relaxed),
                metrics_clone.errors.load(Ordering::Relaxed),
            );
        }
    });

    for handle in handles {
        let _ = handle.await;
    }
    stats_handle.abort();

    // Final stats
    let msgs = metrics.messages_received.load(Ordering::Relaxed);
    let moves = metrics.moves_received.load(Ordering::Relaxed);
    let sent = metrics.positions_sent.load(Ordering::Relaxed);
    let latency_sum = metrics.latency_sum_ms.load(Ordering::Relaxed);
    let latency_count = metrics.latency_count.load(Ordering::Relaxed);

    println!();
    println!("=== Final Results ===");
    println!("Total messages received: {}", msgs);
    println!("Total playerMove received: {}", moves);
    println!(
        "Total newPlayer / playerLeft received: {} / {}",
        metrics.joins_received.load(Ordering::Relaxed),
        metrics.leaves_received.load(Ordering::Relaxed)
    );
    println!("Total positions sent: {}", sent);
    println!("Total errors: {}", metrics.errors.load(Ordering::Relaxed));
    if latency_count > 0 {
        println!("Average connect latency: {}ms", latency_sum / latency_count);
    }

    // Every position should fan out to every other client.
    let expected_moves = sent * num_clients.saturating_sub(1) as u64;
    if expected_moves > 0 {
        println!(
            "Fan-out delivery: {:.1}% ({} of {} expected)",
            moves as f64 / expected_moves as f64 * 100.0,
            moves,
            expected_moves
        );
    }
}
