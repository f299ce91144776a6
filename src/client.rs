use crate::error::check;
use crate::events::{self, CallbackContext, DisplayInterrupt, InterruptStream, StatusEvent, StatusStream};
use crate::loader::{ClientHelper, LoaderConfig};
use crate::param;
use crate::ring::PoseRing;
use crate::sys::DispInterruptConfig;
use crate::types::{
    DisplayInterruptId, HeadTrackingData, RingBufferDesc, RingBufferId, SchedPolicy, SensorDataRaw,
    TrackingMode, TrackingModeInfo, VrModeState,
};
use crate::{QvrError, Result};

/// A connected QVR service client.
///
/// Owns the vendor client handle and the contexts of any registered
/// callbacks. Dropping it destroys the handle first and frees the callback
/// contexts afterwards, so the vendor never calls into freed memory.
pub struct Client {
    // Must stay the first field: dropped before the contexts below.
    helper: ClientHelper,
    status_ctx: Option<Box<CallbackContext<StatusEvent>>>,
    interrupt_ctx: [Option<Box<CallbackContext<DisplayInterrupt>>>; 2],
}

impl Client {
    /// Connect using `LoaderConfig::from_env()`.
    pub fn connect() -> Result<Client> {
        Self::connect_with(&LoaderConfig::from_env())
    }

    /// Connect by loading the vendor library described by `config`.
    pub fn connect_with(config: &LoaderConfig) -> Result<Client> {
        Ok(Self::from_helper(ClientHelper::create_with(config)?))
    }

    /// Wrap an already created helper.
    pub fn from_helper(helper: ClientHelper) -> Client {
        Client {
            helper,
            status_ctx: None,
            interrupt_ctx: [None, None],
        }
    }

    pub fn helper(&self) -> &ClientHelper {
        &self.helper
    }

    /// Vendor wrapper API version.
    pub fn api_version(&self) -> i32 {
        self.helper.api_version()
    }

    /// Current VR mode state.
    pub fn vr_mode(&self) -> Result<VrModeState> {
        let raw = self.helper.get_vr_mode();
        if raw < 0 {
            check(raw)?;
        }
        VrModeState::try_from(raw as u32)
    }

    /// Request VR mode. The daemon passes through `Starting` on its own.
    pub fn start_vr_mode(&self) -> Result<()> {
        check(self.helper.start_vr_mode())?;
        log::info!("VR mode start requested");
        Ok(())
    }

    /// Stop VR mode. Only the client that started it may stop it.
    pub fn stop_vr_mode(&self) -> Result<()> {
        check(self.helper.stop_vr_mode())?;
        log::info!("VR mode stop requested");
        Ok(())
    }

    /// Current and supported tracking modes.
    pub fn tracking_mode(&self) -> Result<TrackingModeInfo> {
        let mut current = 0u32;
        let mut supported = 0u32;
        check(unsafe { self.helper.get_tracking_mode(&mut current, &mut supported) })?;
        Ok(TrackingModeInfo {
            current: TrackingMode::from_bits_truncate(current),
            supported: TrackingMode::from_bits_truncate(supported),
        })
    }

    pub fn set_tracking_mode(&self, mode: TrackingMode) -> Result<()> {
        check(self.helper.set_tracking_mode(mode.bits()))
    }

    /// Receive client status notifications on a bounded channel.
    ///
    /// Replaces any previous subscription; the previous stream then ends.
    pub fn subscribe_status(&mut self, capacity: usize) -> Result<StatusStream> {
        let (ctx, stream) = events::channel(capacity, None);
        check(unsafe {
            self.helper
                .set_client_status_callback(Some(events::status_trampoline), ctx.as_ctx())
        })?;
        self.status_ctx = Some(ctx);
        Ok(stream)
    }

    /// Unregister the status callback.
    pub fn clear_status_callback(&mut self) -> Result<()> {
        check(unsafe {
            self.helper
                .set_client_status_callback(None, std::ptr::null_mut())
        })?;
        self.status_ctx = None;
        Ok(())
    }

    /// Receive display interrupts for `id`. `line` is used for line
    /// pointer interrupts only.
    pub fn subscribe_display_interrupt(
        &mut self,
        id: DisplayInterruptId,
        line: u32,
        capacity: usize,
    ) -> Result<InterruptStream> {
        let (ctx, stream) = events::channel(capacity, Some(id));
        let mut cfg = DispInterruptConfig {
            cb: Some(events::interrupt_trampoline),
            ctx: ctx.as_ctx(),
            line,
        };
        self.configure_interrupt(id, &mut cfg)?;
        self.interrupt_ctx[id as usize] = Some(ctx);
        Ok(stream)
    }

    /// Disable display interrupts for `id`.
    pub fn clear_display_interrupt(&mut self, id: DisplayInterruptId) -> Result<()> {
        let mut cfg = DispInterruptConfig {
            cb: None,
            ctx: std::ptr::null_mut(),
            line: 0,
        };
        self.configure_interrupt(id, &mut cfg)?;
        self.interrupt_ctx[id as usize] = None;
        Ok(())
    }

    fn configure_interrupt(&self, id: DisplayInterruptId, cfg: &mut DispInterruptConfig) -> Result<()> {
        check(unsafe {
            self.helper.set_display_interrupt_config(
                id as u32,
                cfg as *mut DispInterruptConfig as *mut std::ffi::c_void,
                std::mem::size_of::<DispInterruptConfig>() as u32,
            )
        })
    }

    /// Ask the daemon to change scheduling of thread `tid`.
    pub fn set_thread_priority(&self, tid: i32, policy: SchedPolicy, priority: i32) -> Result<()> {
        check(self.helper.set_thread_priority(tid, policy as i32, priority))
    }

    /// Read a string parameter.
    pub fn param(&self, name: &str) -> Result<String> {
        let key = param::to_cstring(name)?;
        param::read_param(|len, value| unsafe { self.helper.get_param(key.as_ptr(), len, value) })
    }

    /// Write a string parameter.
    pub fn set_param(&self, name: &str, value: &str) -> Result<()> {
        let key = param::to_cstring(name)?;
        let value = param::to_cstring(value)?;
        check(unsafe { self.helper.set_param(key.as_ptr(), value.as_ptr()) })
    }

    pub fn service_version(&self) -> Result<String> {
        self.param(param::QVRSERVICE_SERVICE_VERSION)
    }

    pub fn client_version(&self) -> Result<String> {
        self.param(param::QVRSERVICE_CLIENT_VERSION)
    }

    /// Fixed offset between the tracker clock and Android's clock, in ns.
    pub fn tracker_android_offset_ns(&self) -> Result<i64> {
        param::parse_offset_ns(&self.param(param::QVRSERVICE_TRACKER_ANDROID_OFFSET_NS)?)
    }

    /// Latest raw IMU sample, copied out of vendor memory.
    pub fn sensor_raw_data(&self) -> Result<SensorDataRaw> {
        let mut data: *mut SensorDataRaw = std::ptr::null_mut();
        check(unsafe { self.helper.get_sensor_raw_data(&mut data) })?;
        unsafe { data.as_ref() }.copied().ok_or(QvrError::NullData)
    }

    /// Latest head pose, copied out of vendor memory.
    pub fn head_tracking_data(&self) -> Result<HeadTrackingData> {
        let mut data: *mut HeadTrackingData = std::ptr::null_mut();
        check(unsafe { self.helper.get_head_tracking_data(&mut data) })?;
        unsafe { data.as_ref() }.copied().ok_or(QvrError::NullData)
    }

    /// Head pose for a past tracker timestamp.
    pub fn historical_head_tracking_data(&self, timestamp_ns: i64) -> Result<HeadTrackingData> {
        let mut data: *mut HeadTrackingData = std::ptr::null_mut();
        check(unsafe {
            self.helper
                .get_historical_head_tracking_data(&mut data, timestamp_ns)
        })?;
        unsafe { data.as_ref() }.copied().ok_or(QvrError::NullData)
    }

    pub fn ring_buffer_descriptor(&self, id: RingBufferId) -> Result<RingBufferDesc> {
        let mut desc = RingBufferDesc::default();
        check(unsafe { self.helper.get_ring_buffer_descriptor(id as u32, &mut desc) })?;
        Ok(desc)
    }

    /// Map the pose ring for polling without a call per sample.
    #[cfg(unix)]
    pub fn open_pose_ring(&self) -> Result<PoseRing> {
        PoseRing::open(&self.ring_buffer_descriptor(RingBufferId::Pose)?)
    }

    /// Destroy the vendor handle, then release callback contexts.
    pub fn close(self) {
        drop(self);
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("api_version", &self.helper.api_version())
            .field("status_callback", &self.status_ctx.is_some())
            .finish()
    }
}
