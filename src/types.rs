use crate::error::QvrError;

/// VR mode state as reported by the service daemon.
///
/// `Starting -> Started` and `Stopping -> Stopped` are driven by the
/// daemon; `Started <-> Stopped` transitions are requested by the client
/// that owns VR mode.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VrModeState {
    Unsupported = 0,
    Starting = 1,
    Started = 2,
    Stopping = 3,
    Stopped = 4,
}

impl VrModeState {
    /// True while the daemon is moving between started and stopped.
    pub fn is_transitioning(self) -> bool {
        matches!(self, VrModeState::Starting | VrModeState::Stopping)
    }
}

impl TryFrom<u32> for VrModeState {
    type Error = QvrError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(VrModeState::Unsupported),
            1 => Ok(VrModeState::Starting),
            2 => Ok(VrModeState::Started),
            3 => Ok(VrModeState::Stopping),
            4 => Ok(VrModeState::Stopped),
            other => Err(QvrError::InvalidState(other)),
        }
    }
}

bitflags::bitflags! {
    /// Tracking mode bits. `GetTrackingMode` reports a union of these as the
    /// supported set.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[repr(C)]
    pub struct TrackingMode: u32 {
        const ROTATIONAL     = 1 << 0;
        const POSITIONAL     = 1 << 1;
        const ROTATIONAL_MAG = 1 << 2;
    }
}

impl TrackingMode {
    /// `TRACKING_MODE_NONE`.
    pub const NONE: TrackingMode = TrackingMode::empty();
}

/// Current and supported tracking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackingModeInfo {
    pub current: TrackingMode,
    pub supported: TrackingMode,
}

/// Display interrupt sources.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayInterruptId {
    Vsync = 0,
    Lineptr = 1,
}

/// Client status reported through the status callback.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientStatus {
    Disconnected = 0,
    StateChanged = 1,
    SensorError = 2,
}

impl ClientStatus {
    pub fn from_raw(value: u32) -> Option<ClientStatus> {
        match value {
            0 => Some(ClientStatus::Disconnected),
            1 => Some(ClientStatus::StateChanged),
            2 => Some(ClientStatus::SensorError),
            _ => None,
        }
    }
}

/// Shared-memory ring identifiers.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RingBufferId {
    Pose = 0,
}

/// Linux scheduling policy passed to `SetThreadPriority`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedPolicy {
    Other = 0,
    Fifo = 1,
    RoundRobin = 2,
}

/// Head pose sample produced by the tracker.
///
/// Layout (136 bytes, 8-byte aligned):
/// ```text
/// offset  field                  size
/// ------  ---------------------  ----
///   0     rotation [x, y, z, w]   16
///  16     translation [x, y, z]   12
///  28     reserved                 4
///  32     ts (ns)                  8
///  40     reserved1                8
///  48     prediction_coff_s       12
///  60     reserved2                4
///  64     prediction_coff_b       12
///  76     reserved3                4
///  80     prediction_coff_bdt     12
///  92     reserved4                4
///  96     prediction_coff_bdt2    12
/// 108     flags (2 x 1-bit)        4
/// 112     pose_quality             4
/// 116     sensor_quality           4
/// 120     camera_quality           4
/// 124     reserved5               12
/// ```
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeadTrackingData {
    /// Orientation quaternion [x, y, z, w].
    pub rotation: [f32; 4],
    /// Position in meters.
    pub translation: [f32; 3],
    pub reserved: u32,
    /// Tracker clock timestamp in nanoseconds.
    pub ts: u64,
    pub reserved1: u64,
    pub prediction_coff_s: [f32; 3],
    pub reserved2: u32,
    pub prediction_coff_b: [f32; 3],
    pub reserved3: u32,
    pub prediction_coff_bdt: [f32; 3],
    pub reserved4: u32,
    pub prediction_coff_bdt2: [f32; 3],
    /// C bitfield: bit 0 `flags_3dof_mag_used`, bit 1 `flags_3dof_mag_calibrated`.
    pub flags: u32,
    pub pose_quality: f32,
    pub sensor_quality: f32,
    pub camera_quality: f32,
    pub reserved5: [u8; 12],
}

const _: () = assert!(std::mem::size_of::<HeadTrackingData>() == 136);

impl HeadTrackingData {
    pub const FLAG_3DOF_MAG_USED: u32 = 1 << 0;
    pub const FLAG_3DOF_MAG_CALIBRATED: u32 = 1 << 1;

    pub fn mag_used(&self) -> bool {
        self.flags & Self::FLAG_3DOF_MAG_USED != 0
    }

    pub fn mag_calibrated(&self) -> bool {
        self.flags & Self::FLAG_3DOF_MAG_CALIBRATED != 0
    }

    pub fn set_mag_used(&mut self, used: bool) {
        self.set_flag(Self::FLAG_3DOF_MAG_USED, used);
    }

    pub fn set_mag_calibrated(&mut self, calibrated: bool) {
        self.set_flag(Self::FLAG_3DOF_MAG_CALIBRATED, calibrated);
    }

    fn set_flag(&mut self, bit: u32, on: bool) {
        if on {
            self.flags |= bit;
        } else {
            self.flags &= !bit;
        }
    }

    /// Euler angles [roll, pitch, yaw] in degrees from the rotation quaternion.
    pub fn euler_deg(&self) -> [f64; 3] {
        let [x, y, z, w] = self.rotation.map(f64::from);
        let roll = (2.0 * (w * x + y * z)).atan2(1.0 - 2.0 * (x * x + y * y));
        let pitch = (2.0 * (w * y - z * x)).clamp(-1.0, 1.0).asin();
        let yaw = (2.0 * (w * z + x * y)).atan2(1.0 - 2.0 * (y * y + z * z));
        [roll.to_degrees(), pitch.to_degrees(), yaw.to_degrees()]
    }
}

/// Raw IMU sample. Layout: two u64 timestamps, six f32 axes, 24 reserved bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorDataRaw {
    /// Gyroscope timestamp in nanoseconds.
    pub gts: u64,
    /// Accelerometer timestamp in nanoseconds.
    pub ats: u64,
    pub gx: f32,
    pub gy: f32,
    pub gz: f32,
    pub ax: f32,
    pub ay: f32,
    pub az: f32,
    pub reserved: [u8; 24],
}

const _: () = assert!(std::mem::size_of::<SensorDataRaw>() == 64);

impl SensorDataRaw {
    pub fn gyro(&self) -> [f32; 3] {
        [self.gx, self.gy, self.gz]
    }

    pub fn accel(&self) -> [f32; 3] {
        [self.ax, self.ay, self.az]
    }
}

/// Shared-memory ring description. The consumer maps `fd`, reads the u32
/// index at `index_offset` and then the element at
/// `ring_offset + index * element_size`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RingBufferDesc {
    pub fd: i32,
    pub size: u32,
    pub index_offset: u32,
    pub ring_offset: u32,
    pub element_size: u32,
    pub num_elements: u32,
}

const _: () = assert!(std::mem::size_of::<RingBufferDesc>() == 24);
