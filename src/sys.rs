//! Raw ABI shared with the vendor client library.
//!
//! Everything here mirrors the vendor header: return codes, callback
//! shapes, the ops table and the wrapper returned by the factory symbol.
//! Field order of `ClientOps` is frozen; slots added by newer vendor
//! releases only ever append.

use crate::types::{HeadTrackingData, RingBufferDesc, SensorDataRaw};
use std::ffi::{c_char, c_void};
use std::marker::{PhantomData, PhantomPinned};

// -- Return codes --
pub const QVR_SUCCESS: i32 = 0;
pub const QVR_ERROR: i32 = -1;
pub const QVR_CALLBACK_NOT_SUPPORTED: i32 = -2;
pub const QVR_API_NOT_SUPPORTED: i32 = -3;
pub const QVR_INVALID_PARAM: i32 = -4;

// -- Loader --
pub const QVRSERVICE_CLIENT_LIB: &str = "libqvrservice_client.qti.so";
pub const QVRSERVICE_CLIENT_FACTORY: &str = "getQvrServiceClientInstance";

// -- Well-known parameter keys (read-only) --
pub const QVRSERVICE_SERVICE_VERSION: &str = "qvrservice_service_version";
pub const QVRSERVICE_CLIENT_VERSION: &str = "qvrservice_client_version";
pub const QVRSERVICE_TRACKER_ANDROID_OFFSET_NS: &str = "qvrservice_tracker_android_offset_ns";

/// Opaque client handle owned by the vendor library.
#[repr(C)]
pub struct ClientHandle {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Display interrupt callback: `(ctx, timestamp_ns)`.
pub type DispInterruptCallbackFn = unsafe extern "C" fn(ctx: *mut c_void, ts: u64);

/// Client status callback: `(ctx, status, arg1, arg2)`.
pub type ClientStatusCallbackFn =
    unsafe extern "C" fn(ctx: *mut c_void, status: u32, arg1: u64, arg2: u64);

/// Configuration passed to `SetDisplayInterruptConfig`.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct DispInterruptConfig {
    /// Null disables the interrupt.
    pub cb: Option<DispInterruptCallbackFn>,
    pub ctx: *mut c_void,
    /// Scan line for `DISP_INTERRUPT_LINEPTR`, ignored for vsync.
    pub line: u32,
}

pub type CreateFn = unsafe extern "C" fn() -> *mut ClientHandle;
pub type DestroyFn = unsafe extern "C" fn(client: *mut ClientHandle);
pub type SetClientStatusCallbackFn = unsafe extern "C" fn(
    client: *mut ClientHandle,
    cb: Option<ClientStatusCallbackFn>,
    ctx: *mut c_void,
) -> i32;
pub type GetVrModeFn = unsafe extern "C" fn(client: *mut ClientHandle) -> i32;
pub type StartVrModeFn = unsafe extern "C" fn(client: *mut ClientHandle) -> i32;
pub type StopVrModeFn = unsafe extern "C" fn(client: *mut ClientHandle) -> i32;
pub type GetTrackingModeFn = unsafe extern "C" fn(
    client: *mut ClientHandle,
    mode: *mut u32,
    supported_modes: *mut u32,
) -> i32;
pub type SetTrackingModeFn = unsafe extern "C" fn(client: *mut ClientHandle, mode: u32) -> i32;
pub type SetDisplayInterruptConfigFn = unsafe extern "C" fn(
    client: *mut ClientHandle,
    id: u32,
    cfg: *mut c_void,
    cfg_size: u32,
) -> i32;
pub type SetThreadPriorityFn =
    unsafe extern "C" fn(client: *mut ClientHandle, tid: i32, policy: i32, priority: i32) -> i32;
pub type GetParamFn = unsafe extern "C" fn(
    client: *mut ClientHandle,
    name: *const c_char,
    len: *mut u32,
    value: *mut c_char,
) -> i32;
pub type SetParamFn =
    unsafe extern "C" fn(client: *mut ClientHandle, name: *const c_char, value: *const c_char) -> i32;
pub type GetSensorRawDataFn =
    unsafe extern "C" fn(client: *mut ClientHandle, data: *mut *mut SensorDataRaw) -> i32;
pub type GetHeadTrackingDataFn =
    unsafe extern "C" fn(client: *mut ClientHandle, data: *mut *mut HeadTrackingData) -> i32;
pub type GetRingBufferDescriptorFn =
    unsafe extern "C" fn(client: *mut ClientHandle, id: u32, desc: *mut RingBufferDesc) -> i32;
pub type GetHistoricalHeadTrackingDataFn = unsafe extern "C" fn(
    client: *mut ClientHandle,
    data: *mut *mut HeadTrackingData,
    timestamp_ns: i64,
) -> i32;

/// Function table populated by the vendor library.
///
/// A `None` slot means the loaded library predates that operation.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ClientOps {
    pub create: Option<CreateFn>,
    pub destroy: Option<DestroyFn>,
    pub set_client_status_callback: Option<SetClientStatusCallbackFn>,
    pub get_vr_mode: Option<GetVrModeFn>,
    pub start_vr_mode: Option<StartVrModeFn>,
    pub stop_vr_mode: Option<StopVrModeFn>,
    pub get_tracking_mode: Option<GetTrackingModeFn>,
    pub set_tracking_mode: Option<SetTrackingModeFn>,
    pub set_display_interrupt_config: Option<SetDisplayInterruptConfigFn>,
    pub set_thread_priority: Option<SetThreadPriorityFn>,
    pub get_param: Option<GetParamFn>,
    pub set_param: Option<SetParamFn>,
    pub get_sensor_raw_data: Option<GetSensorRawDataFn>,
    pub get_head_tracking_data: Option<GetHeadTrackingDataFn>,
    pub get_ring_buffer_descriptor: Option<GetRingBufferDescriptorFn>,
    pub get_historical_head_tracking_data: Option<GetHistoricalHeadTrackingDataFn>,
}

/// Returned by the factory symbol.
#[repr(C)]
#[derive(Debug)]
pub struct ClientWrapper {
    pub api_version: i32,
    pub ops: *mut ClientOps,
}

/// Signature of `getQvrServiceClientInstance`.
pub type ClientFactoryFn = unsafe extern "C" fn() -> *mut ClientWrapper;

const _: () = assert!(std::mem::size_of::<ClientOps>() == 16 * std::mem::size_of::<usize>());
