//! Start VR mode and stream head poses to stdout.
//!
//! Usage: cargo run --example stream
//! Runs for QVR_STREAM_SECS seconds (default 10), then stops VR mode.

use qvrservice::{Client, QvrError, StatusEvent, VrModeState};
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let mut client = match Client::connect() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    let run_for = Duration::from_secs(
        std::env::var("QVR_STREAM_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10),
    );

    let status = match client.subscribe_status(qvrservice::events::DEFAULT_CAPACITY) {
        Ok(s) => Some(s),
        Err(QvrError::ApiNotSupported) => None,
        Err(e) => {
            eprintln!("Failed to register status callback: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = client.start_vr_mode() {
        eprintln!("Failed to start VR mode: {}", e);
        std::process::exit(1);
    }

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        match client.vr_mode() {
            Ok(VrModeState::Started) => break,
            Ok(_) if Instant::now() < deadline => {}
            Ok(mode) => {
                eprintln!("VR mode stuck in {:?}", mode);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                std::process::exit(1);
            }
        }
        match &status {
            Some(s) => {
                if let Ok(StatusEvent::StateChanged { current, previous }) =
                    s.recv_timeout(Duration::from_millis(100))
                {
                    println!("VR mode {:?} -> {:?}", previous, current);
                }
            }
            None => std::thread::sleep(Duration::from_millis(100)),
        }
    }

    println!("Streaming head poses for {:?}...", run_for);

    let mut ring = client.open_pose_ring().ok();
    if ring.is_none() {
        println!("Pose ring unavailable, polling head tracking data");
    }

    let start = Instant::now();
    let mut count: u64 = 0;
    let mut last_report = Instant::now();
    let mut last_ts = 0u64;

    while start.elapsed() < run_for {
        let pose = match ring.as_mut() {
            Some(r) => r.poll(),
            None => client.head_tracking_data().ok().filter(|p| p.ts != last_ts),
        };

        let Some(p) = pose else {
            std::thread::sleep(Duration::from_micros(500));
            continue;
        };
        last_ts = p.ts;
        count += 1;

        // Print every ~100th sample to avoid flooding the terminal
        if count % 100 == 1 {
            println!(
                "ts={:<16} pos=[{:+.4}, {:+.4}, {:+.4}]  quat=[{:+.3}, {:+.3}, {:+.3}, {:+.3}]  q={:.2}",
                p.ts,
                p.translation[0], p.translation[1], p.translation[2],
                p.rotation[0], p.rotation[1], p.rotation[2], p.rotation[3],
                p.pose_quality,
            );
        }

        let now = Instant::now();
        if now.duration_since(last_report) >= Duration::from_secs(3) {
            let elapsed = start.elapsed().as_secs_f64();
            println!("--- {} samples in {:.1}s ({:.1} Hz) ---", count, elapsed, count as f64 / elapsed);
            last_report = now;
        }
    }

    if let Err(e) = client.stop_vr_mode() {
        eprintln!("Failed to stop VR mode: {}", e);
    }

    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "\nTotal: {} samples in {:.1}s ({:.1} Hz)",
        count,
        elapsed,
        count as f64 / elapsed
    );
}
