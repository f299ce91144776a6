//! Head pose WebSocket server: QVR service -> WebSocket -> browser.
//!
//!   - Polls head poses from the QVR service
//!   - Broadcasts JSON over WebSocket to all connected clients (~60 Hz)
//!
//! Usage:
//!   QVR_SERVER_PORT=8080 cargo run --release --example server
//!   Connect to ws://<device>:8080

use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tungstenite::Message;

type WsClient = Arc<Mutex<tungstenite::WebSocket<TcpStream>>>;

fn main() {
    env_logger::init();

    let port: u16 = std::env::var("QVR_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8080);

    let clients: Arc<Mutex<Vec<WsClient>>> = Arc::new(Mutex::new(Vec::new()));

    let pose_clients = clients.clone();
    let running = Arc::new(AtomicBool::new(true));
    let pose_running = running.clone();

    let pose_thread = std::thread::Builder::new()
        .name("qvr-pose".into())
        .spawn(move || {
            pose_loop(pose_clients, pose_running);
        })
        .unwrap_or_else(|e| {
            eprintln!("Failed to spawn pose thread: {}", e);
            std::process::exit(1);
        });

    let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).unwrap_or_else(|e| {
        eprintln!("Failed to bind port {}: {}", port, e);
        std::process::exit(1);
    });

    eprintln!("[WS] Listening on ws://0.0.0.0:{}", port);

    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                eprintln!("[TCP] accept error: {}", e);
                continue;
            }
        };

        let clients = clients.clone();
        std::thread::spawn(move || {
            handle_websocket(stream, clients);
        });
    }

    running.store(false, Ordering::Relaxed);
    let _ = pose_thread.join();
}

/// Handle WebSocket: add to broadcast list, wait for disconnect.
///
/// The pose thread is the sole writer. This thread stays alive until the
/// pose thread drops the client after a send failure.
fn handle_websocket(stream: TcpStream, clients: Arc<Mutex<Vec<WsClient>>>) {
    // Write timeout keeps a slow client from stalling the pose thread
    stream.set_write_timeout(Some(Duration::from_secs(2))).ok();
    stream.set_nodelay(true).ok();

    let ws = match tungstenite::accept(stream) {
        Ok(ws) => ws,
        Err(e) => {
            eprintln!("[WS] handshake error: {}", e);
            return;
        }
    };

    let ws = Arc::new(Mutex::new(ws));
    if let Ok(mut list) = clients.lock() {
        list.push(ws.clone());
        eprintln!("[WS] Client connected ({} total)", list.len());
    }

    loop {
        std::thread::sleep(Duration::from_secs(1));
        let still_active = clients
            .lock()
            .map(|list| list.iter().any(|c| Arc::ptr_eq(c, &ws)))
            .unwrap_or(false);
        if !still_active {
            break;
        }
    }

    let remaining = clients.lock().map(|list| list.len()).unwrap_or(0);
    eprintln!("[WS] Client disconnected ({} total)", remaining);
}

/// Pose loop: reads head poses and broadcasts JSON to WebSocket clients.
fn pose_loop(clients: Arc<Mutex<Vec<WsClient>>>, running: Arc<AtomicBool>) {
    eprintln!("[QVR] Connecting to service...");

    let client = match qvrservice::Client::connect() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[QVR] Failed to connect: {}", e);
            eprintln!("[QVR] Server will continue without tracking data.");
            while running.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_secs(1));
            }
            return;
        }
    };

    if let Ok(v) = client.service_version() {
        eprintln!("[QVR] Service: {}", v);
    }

    let broadcast_interval = Duration::from_millis(16); // ~60 Hz to browser
    let mut last_report = Instant::now();
    let mut sent: u64 = 0;

    while running.load(Ordering::Relaxed) {
        let pose = match client.head_tracking_data() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("[QVR] Error: {}", e);
                break;
            }
        };

        let euler = pose.euler_deg();
        let json = format!(
            "{{\"x\":{:.4},\"y\":{:.4},\"z\":{:.4},\"roll\":{:.1},\"pitch\":{:.1},\"yaw\":{:.1},\"t\":{}}}",
            pose.translation[0],
            pose.translation[1],
            pose.translation[2],
            euler[0],
            euler[1],
            euler[2],
            pose.ts,
        );

        let msg = Message::Text(json);
        if let Ok(mut list) = clients.lock() {
            list.retain(|ws_arc| match ws_arc.lock() {
                Ok(mut ws) => ws.send(msg.clone()).is_ok(),
                Err(_) => false,
            });
        }
        sent += 1;

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(5) {
            let count = clients.lock().map(|list| list.len()).unwrap_or(0);
            let elapsed = now.duration_since(last_report).as_secs_f64();
            eprintln!(
                "[QVR] {} msg/s, {} client(s)",
                (sent as f64 / elapsed) as u32,
                count
            );
            sent = 0;
            last_report = now;
        }

        std::thread::sleep(broadcast_interval);
    }
}
