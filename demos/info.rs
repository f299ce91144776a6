//! Print service and client info from the QVR service daemon.

fn main() {
    env_logger::init();

    let client = match qvrservice::Client::connect() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    println!("API version:     {}", client.api_version());
    print_result("Service version", client.service_version());
    print_result("Client version", client.client_version());
    print_result("Tracker offset", client.tracker_android_offset_ns().map(|ns| format!("{} ns", ns)));
    print_result("VR mode", client.vr_mode().map(|m| format!("{:?}", m)));
    print_result(
        "Tracking mode",
        client
            .tracking_mode()
            .map(|t| format!("{:?} (supported: {:?})", t.current, t.supported)),
    );
    print_result(
        "Pose ring",
        client
            .ring_buffer_descriptor(qvrservice::RingBufferId::Pose)
            .map(|d| format!("{} x {} bytes in {} byte region", d.num_elements, d.element_size, d.size)),
    );
}

fn print_result<T: std::fmt::Display>(label: &str, value: qvrservice::Result<T>) {
    match value {
        Ok(v) => println!("{:<16} {}", format!("{}:", label), v),
        Err(e) => println!("{:<16} <{}>", format!("{}:", label), e),
    }
}
