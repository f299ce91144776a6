//! In-process stand-in for the vendor client library, used by unit tests.
//!
//! Counters are thread-local so parallel tests do not observe each other.
//! Status callbacks fire synchronously on the calling thread.

use crate::sys::{self, ClientHandle, ClientOps, ClientStatusCallbackFn, ClientWrapper, DispInterruptConfig};
use crate::types::{ClientStatus, HeadTrackingData, RingBufferDesc, SensorDataRaw, VrModeState};
use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_char, c_void, CStr};

pub const API_VERSION: i32 = 4;

thread_local! {
    static CALLS: Cell<usize> = const { Cell::new(0) };
    static DESTROYS: Cell<usize> = const { Cell::new(0) };
    static FAIL_NEXT_CREATE: Cell<bool> = const { Cell::new(false) };
    static LAST: Cell<*mut MockService> = const { Cell::new(std::ptr::null_mut()) };
}

/// Number of vendor entry points invoked on this thread.
pub fn call_count() -> usize {
    CALLS.with(|c| c.get())
}

/// Number of `Destroy` calls on this thread.
pub fn destroy_count() -> usize {
    DESTROYS.with(|c| c.get())
}

/// Make the next `Create` return null.
pub fn fail_next_create() {
    FAIL_NEXT_CREATE.with(|c| c.set(true));
}

/// Access the most recently created service on this thread.
pub fn with_service<R>(f: impl FnOnce(&mut MockService) -> R) -> R {
    let ptr = LAST.with(|c| c.get());
    assert!(!ptr.is_null(), "no mock service created on this thread");
    f(unsafe { &mut *ptr })
}

fn bump() {
    CALLS.with(|c| c.set(c.get() + 1));
}

/// Daemon-side state behind one client handle.
pub struct MockService {
    pub mode: VrModeState,
    pub tracking: u32,
    pub supported: u32,
    pub params: HashMap<String, String>,
    pub status_cb: Option<(ClientStatusCallbackFn, *mut c_void)>,
    pub interrupts: [Option<DispInterruptConfig>; 2],
    pub thread_priority: Option<(i32, i32, i32)>,
    pub head: HeadTrackingData,
    pub raw: SensorDataRaw,
    pub history: Vec<HeadTrackingData>,
    pub ring: RingBufferDesc,
}

impl MockService {
    fn new() -> Self {
        let mut params = HashMap::new();
        params.insert(sys::QVRSERVICE_SERVICE_VERSION.to_string(), "5.2.1".to_string());
        params.insert(sys::QVRSERVICE_CLIENT_VERSION.to_string(), "5.2.0".to_string());
        params.insert(
            sys::QVRSERVICE_TRACKER_ANDROID_OFFSET_NS.to_string(),
            "-1234567".to_string(),
        );

        let head = HeadTrackingData {
            rotation: [0.0, 0.0, 0.0, 1.0],
            translation: [0.1, 1.6, -0.2],
            ts: 5_000_000,
            pose_quality: 0.9,
            ..Default::default()
        };
        let history = (1..=3)
            .map(|i| HeadTrackingData {
                ts: i * 1_000_000,
                translation: [i as f32, 0.0, 0.0],
                ..head
            })
            .collect();

        Self {
            mode: VrModeState::Stopped,
            tracking: TRACKING_ROTATIONAL,
            supported: TRACKING_ROTATIONAL | TRACKING_POSITIONAL,
            params,
            status_cb: None,
            interrupts: [None, None],
            thread_priority: None,
            head,
            raw: SensorDataRaw {
                gts: 10,
                ats: 11,
                gz: 0.5,
                az: 9.81,
                ..Default::default()
            },
            history,
            ring: RingBufferDesc {
                fd: 42,
                size: 4096,
                index_offset: 0,
                ring_offset: 64,
                element_size: 136,
                num_elements: 8,
            },
        }
    }

    /// Deliver a status event to the registered callback, if any.
    pub fn fire_status(&self, status: ClientStatus, arg1: u64, arg2: u64) {
        if let Some((cb, ctx)) = self.status_cb {
            unsafe { cb(ctx, status as u32, arg1, arg2) };
        }
    }

    /// Deliver a display interrupt for `id`, if configured.
    pub fn fire_interrupt(&self, id: usize, ts: u64) {
        if let Some(cfg) = self.interrupts.get(id).copied().flatten() {
            if let Some(cb) = cfg.cb {
                unsafe { cb(cfg.ctx, ts) };
            }
        }
    }

    fn transition(&mut self, next: VrModeState) {
        let previous = self.mode;
        self.mode = next;
        self.fire_status(ClientStatus::StateChanged, next as u64, previous as u64);
    }
}

const TRACKING_ROTATIONAL: u32 = 0x1;
const TRACKING_POSITIONAL: u32 = 0x2;

unsafe fn service<'a>(client: *mut ClientHandle) -> &'a mut MockService {
    &mut *(client as *mut MockService)
}

unsafe extern "C" fn create() -> *mut ClientHandle {
    bump();
    if FAIL_NEXT_CREATE.with(|c| c.replace(false)) {
        return std::ptr::null_mut();
    }
    let ptr = Box::into_raw(Box::new(MockService::new()));
    LAST.with(|c| c.set(ptr));
    ptr as *mut ClientHandle
}

unsafe extern "C" fn destroy(client: *mut ClientHandle) {
    bump();
    DESTROYS.with(|c| c.set(c.get() + 1));
    let ptr = client as *mut MockService;
    LAST.with(|c| {
        if c.get() == ptr {
            c.set(std::ptr::null_mut());
        }
    });
    drop(Box::from_raw(ptr));
}

unsafe extern "C" fn set_client_status_callback(
    client: *mut ClientHandle,
    cb: Option<ClientStatusCallbackFn>,
    ctx: *mut c_void,
) -> i32 {
    bump();
    service(client).status_cb = cb.map(|cb| (cb, ctx));
    sys::QVR_SUCCESS
}

unsafe extern "C" fn get_vr_mode(client: *mut ClientHandle) -> i32 {
    bump();
    service(client).mode as i32
}

unsafe extern "C" fn start_vr_mode(client: *mut ClientHandle) -> i32 {
    bump();
    let svc = service(client);
    if svc.mode == VrModeState::Started {
        return sys::QVR_ERROR;
    }
    svc.transition(VrModeState::Starting);
    svc.transition(VrModeState::Started);
    sys::QVR_SUCCESS
}

unsafe extern "C" fn stop_vr_mode(client: *mut ClientHandle) -> i32 {
    bump();
    let svc = service(client);
    if svc.mode != VrModeState::Started {
        return sys::QVR_ERROR;
    }
    svc.transition(VrModeState::Stopping);
    svc.transition(VrModeState::Stopped);
    sys::QVR_SUCCESS
}

unsafe extern "C" fn get_tracking_mode(
    client: *mut ClientHandle,
    mode: *mut u32,
    supported: *mut u32,
) -> i32 {
    bump();
    let svc = service(client);
    if !mode.is_null() {
        *mode = svc.tracking;
    }
    if !supported.is_null() {
        *supported = svc.supported;
    }
    sys::QVR_SUCCESS
}

unsafe extern "C" fn set_tracking_mode(client: *mut ClientHandle, mode: u32) -> i32 {
    bump();
    let svc = service(client);
    if mode & !svc.supported != 0 {
        return sys::QVR_INVALID_PARAM;
    }
    if svc.mode == VrModeState::Started {
        return sys::QVR_ERROR;
    }
    svc.tracking = mode;
    sys::QVR_SUCCESS
}

unsafe extern "C" fn set_display_interrupt_config(
    client: *mut ClientHandle,
    id: u32,
    cfg: *mut c_void,
    cfg_size: u32,
) -> i32 {
    bump();
    let svc = service(client);
    if id as usize >= svc.interrupts.len()
        || cfg.is_null()
        || cfg_size as usize != std::mem::size_of::<DispInterruptConfig>()
    {
        return sys::QVR_INVALID_PARAM;
    }
    let cfg = *(cfg as *const DispInterruptConfig);
    svc.interrupts[id as usize] = cfg.cb.map(|_| cfg);
    sys::QVR_SUCCESS
}

unsafe extern "C" fn set_thread_priority(
    client: *mut ClientHandle,
    tid: i32,
    policy: i32,
    priority: i32,
) -> i32 {
    bump();
    service(client).thread_priority = Some((tid, policy, priority));
    sys::QVR_SUCCESS
}

/// Vendor-side fill: reports the full length (with NUL) in `*len` and
/// copies what fits, always NUL-terminating a non-empty buffer.
unsafe extern "C" fn get_param(
    client: *mut ClientHandle,
    name: *const c_char,
    len: *mut u32,
    value: *mut c_char,
) -> i32 {
    bump();
    if name.is_null() || len.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    let svc = service(client);
    let key = CStr::from_ptr(name).to_string_lossy();
    let Some(v) = svc.params.get(key.as_ref()) else {
        return sys::QVR_INVALID_PARAM;
    };
    let required = v.len() as u32 + 1;
    if !value.is_null() && *len > 0 {
        let n = v.len().min(*len as usize - 1);
        std::ptr::copy_nonoverlapping(v.as_ptr() as *const c_char, value, n);
        *value.add(n) = 0;
    }
    *len = required;
    sys::QVR_SUCCESS
}

unsafe extern "C" fn set_param(
    client: *mut ClientHandle,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    bump();
    if name.is_null() || value.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    let key = CStr::from_ptr(name).to_string_lossy().into_owned();
    if key == sys::QVRSERVICE_SERVICE_VERSION
        || key == sys::QVRSERVICE_CLIENT_VERSION
        || key == sys::QVRSERVICE_TRACKER_ANDROID_OFFSET_NS
    {
        return sys::QVR_INVALID_PARAM;
    }
    let value = CStr::from_ptr(value).to_string_lossy().into_owned();
    service(client).params.insert(key, value);
    sys::QVR_SUCCESS
}

unsafe extern "C" fn get_sensor_raw_data(
    client: *mut ClientHandle,
    data: *mut *mut SensorDataRaw,
) -> i32 {
    bump();
    if data.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    *data = &mut service(client).raw;
    sys::QVR_SUCCESS
}

unsafe extern "C" fn get_head_tracking_data(
    client: *mut ClientHandle,
    data: *mut *mut HeadTrackingData,
) -> i32 {
    bump();
    if data.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    *data = &mut service(client).head;
    sys::QVR_SUCCESS
}

unsafe extern "C" fn get_ring_buffer_descriptor(
    client: *mut ClientHandle,
    id: u32,
    desc: *mut RingBufferDesc,
) -> i32 {
    bump();
    if id != 0 || desc.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    *desc = service(client).ring;
    sys::QVR_SUCCESS
}

/// Returns the newest stored sample not later than `timestamp_ns`.
unsafe extern "C" fn get_historical_head_tracking_data(
    client: *mut ClientHandle,
    data: *mut *mut HeadTrackingData,
    timestamp_ns: i64,
) -> i32 {
    bump();
    if data.is_null() || timestamp_ns < 0 {
        return sys::QVR_INVALID_PARAM;
    }
    let svc = service(client);
    match svc
        .history
        .iter_mut()
        .rev()
        .find(|s| s.ts <= timestamp_ns as u64)
    {
        Some(sample) => {
            *data = sample;
            sys::QVR_SUCCESS
        }
        None => sys::QVR_ERROR,
    }
}

/// Ops table and wrapper with a stable address for the test's lifetime.
pub struct MockVendor {
    _ops: Box<ClientOps>,
    wrapper: Box<ClientWrapper>,
}

impl MockVendor {
    /// Every slot populated.
    pub fn full() -> Self {
        Self::new(|_| {})
    }

    /// Every slot populated, then adjusted by `edit` (e.g. to clear slots
    /// and emulate an older vendor library).
    pub fn new(edit: impl FnOnce(&mut ClientOps)) -> Self {
        let mut ops = Box::new(ClientOps {
            create: Some(create),
            destroy: Some(destroy),
            set_client_status_callback: Some(set_client_status_callback),
            get_vr_mode: Some(get_vr_mode),
            start_vr_mode: Some(start_vr_mode),
            stop_vr_mode: Some(stop_vr_mode),
            get_tracking_mode: Some(get_tracking_mode),
            set_tracking_mode: Some(set_tracking_mode),
            set_display_interrupt_config: Some(set_display_interrupt_config),
            set_thread_priority: Some(set_thread_priority),
            get_param: Some(get_param),
            set_param: Some(set_param),
            get_sensor_raw_data: Some(get_sensor_raw_data),
            get_head_tracking_data: Some(get_head_tracking_data),
            get_ring_buffer_descriptor: Some(get_ring_buffer_descriptor),
            get_historical_head_tracking_data: Some(get_historical_head_tracking_data),
        });
        edit(&mut ops);
        let wrapper = Box::new(ClientWrapper {
            api_version: API_VERSION,
            ops: &mut *ops,
        });
        Self { _ops: ops, wrapper }
    }

    pub fn wrapper(&self) -> *const ClientWrapper {
        &*self.wrapper
    }
}
