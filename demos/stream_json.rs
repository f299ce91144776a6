//! Stream head poses as JSON lines.
//!
//! {"x":0.021,"y":1.602,"z":-0.028,"roll":5.2,"pitch":3.1,"yaw":1.4,"t":1596314000}
//!
//! Assumes VR mode is already started by the owning client.
//! Usage: cargo run --release --example stream_json

use std::io::{self, Write};
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let client = match qvrservice::Client::connect() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to connect: {}", e);
            std::process::exit(1);
        }
    };

    match client.service_version() {
        Ok(v) => eprintln!("Service:  {}", v),
        Err(e) => eprintln!("Service:  <{}>", e),
    }

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut last_ts = 0u64;
    let mut last_sample = Instant::now();

    loop {
        let pose = match client.head_tracking_data() {
            Ok(p) => p,
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        };

        if pose.ts == last_ts {
            if last_sample.elapsed() >= Duration::from_secs(30) {
                eprintln!("Stopping after 30s without new poses");
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
            continue;
        }
        last_ts = pose.ts;
        last_sample = Instant::now();

        let euler = pose.euler_deg();
        let _ = writeln!(
            out,
            "{{\"x\":{:.4},\"y\":{:.4},\"z\":{:.4},\"roll\":{:.1},\"pitch\":{:.1},\"yaw\":{:.1},\"t\":{}}}",
            pose.translation[0],
            pose.translation[1],
            pose.translation[2],
            euler[0],
            euler[1],
            euler[2],
            pose.ts,
        );
        let _ = out.flush();
    }
}
