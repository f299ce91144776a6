//! # qvrservice - Rust SDK for the QVR service daemon
//!
//! Loads the vendor client library at runtime and talks to the VR service
//! through its ops table. Provides:
//! - Frozen `#[repr(C)]` layouts for pose, IMU and ring buffer data
//! - A loader shim forwarding calls with unsupported-API detection
//! - A safe `Client` with VR mode, tracking mode, parameters and tracking data
//! - Status and display interrupt callbacks bridged to channels
//! - A reader for the shared-memory pose ring
//! - C FFI for integration with C/C++ consumers
//!
//! ## Quick Start
//! ```no_run
//! use qvrservice::{Client, VrModeState};
//! use std::time::Duration;
//!
//! let mut client = Client::connect().unwrap();
//! println!("service: {}", client.service_version().unwrap());
//!
//! let status = client.subscribe_status(16).unwrap();
//! client.start_vr_mode().unwrap();
//! while client.vr_mode().unwrap() != VrModeState::Started {
//!     let _ = status.recv_timeout(Duration::from_millis(100));
//! }
//! let pose = client.head_tracking_data().unwrap();
//! println!("rot: {:?} pos: {:?}", pose.rotation, pose.translation);
//! ```

pub mod error;
pub mod types;
pub mod sys;
pub mod loader;
pub mod param;
pub mod events;
pub mod ring;
pub mod client;
pub mod ffi;

#[cfg(test)]
pub(crate) mod mock;

pub use error::QvrError;
pub use types::*;
pub use loader::{ClientHelper, LoaderConfig};
pub use client::Client;
pub use events::{DisplayInterrupt, EventStream, InterruptStream, StatusEvent, StatusStream};
pub use ring::{PoseRing, RingLayout, RingReader};

/// Result type alias for qvrservice operations.
pub type Result<T> = std::result::Result<T, QvrError>;
