//! C FFI layer for qvrservice.
//!
//! Mirrors the vendor header's inline helpers: every call null-checks the
//! helper handle (`QVR_INVALID_PARAM`), then forwards through the ops table
//! (`QVR_API_NOT_SUPPORTED` for empty slots).
//! The generated C header is written to `include/qvrservice.h` by cbindgen.

use crate::error::LastError;
use crate::loader::{ClientHelper, LoaderConfig};
use crate::sys::{self, ClientStatusCallbackFn};
use crate::types::{HeadTrackingData, RingBufferDesc, SensorDataRaw};
use std::ffi::{c_char, c_void};

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque client handle for C consumers.
pub struct QvrClient(ClientHelper);

macro_rules! helper_or_invalid {
    ($client:expr) => {
        match $client.as_ref() {
            Some(client) => &client.0,
            None => return sys::QVR_INVALID_PARAM,
        }
    };
}

/// Load the vendor library and create a client.
/// Honors `QVRSERVICE_CLIENT_LIB`. Returns NULL on error (check `qvr_last_error()`).
#[no_mangle]
pub extern "C" fn qvr_client_create() -> *mut QvrClient {
    create_client(&LoaderConfig::from_env())
}

fn create_client(config: &LoaderConfig) -> *mut QvrClient {
    match ClientHelper::create_with(config) {
        Ok(helper) => {
            LAST_ERROR.clear();
            Box::into_raw(Box::new(QvrClient(helper)))
        }
        Err(e) => {
            log::warn!("qvr_client_create failed: {}", e);
            LAST_ERROR.set(&e);
            std::ptr::null_mut()
        }
    }
}

/// Destroy a client, unload the vendor library and free the handle.
///
/// # Safety
/// `client` must be a pointer returned by `qvr_client_create`, or null.
/// It must not be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_destroy(client: *mut QvrClient) {
    if !client.is_null() {
        drop(Box::from_raw(client));
    }
}

/// Vendor wrapper API version, or `QVR_INVALID_PARAM` for a null client.
///
/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_api_version(client: *const QvrClient) -> i32 {
    helper_or_invalid!(client).api_version()
}

/// Register (or clear with a null `cb`) the client status callback.
///
/// # Safety
/// `client` must be a valid client pointer, or null. `ctx` must stay valid
/// while registered; `cb` may run on vendor threads and must not block.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_set_status_callback(
    client: *mut QvrClient,
    cb: Option<ClientStatusCallbackFn>,
    ctx: *mut c_void,
) -> i32 {
    helper_or_invalid!(client).set_client_status_callback(cb, ctx)
}

/// Current VR mode state (>= 0) or a negative error code.
///
/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_vr_mode(client: *mut QvrClient) -> i32 {
    helper_or_invalid!(client).get_vr_mode()
}

/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_start_vr_mode(client: *mut QvrClient) -> i32 {
    helper_or_invalid!(client).start_vr_mode()
}

/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_stop_vr_mode(client: *mut QvrClient) -> i32 {
    helper_or_invalid!(client).stop_vr_mode()
}

/// # Safety
/// `client` must be a valid client pointer, or null. `mode` and
/// `supported_modes` must be valid for writes.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_tracking_mode(
    client: *mut QvrClient,
    mode: *mut u32,
    supported_modes: *mut u32,
) -> i32 {
    helper_or_invalid!(client).get_tracking_mode(mode, supported_modes)
}

/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_set_tracking_mode(client: *mut QvrClient, mode: u32) -> i32 {
    helper_or_invalid!(client).set_tracking_mode(mode)
}

/// # Safety
/// `client` must be a valid client pointer, or null. `cfg` must point to
/// `cfg_size` bytes of the config expected for `id`.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_set_display_interrupt_config(
    client: *mut QvrClient,
    id: u32,
    cfg: *mut c_void,
    cfg_size: u32,
) -> i32 {
    helper_or_invalid!(client).set_display_interrupt_config(id, cfg, cfg_size)
}

/// # Safety
/// `client` must be a valid client pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_set_thread_priority(
    client: *mut QvrClient,
    tid: i32,
    policy: i32,
    priority: i32,
) -> i32 {
    helper_or_invalid!(client).set_thread_priority(tid, policy, priority)
}

/// Two-phase read: pass a null `value` to receive the required length in
/// `*len`, then call again with a buffer of `*len` bytes.
///
/// # Safety
/// `client` must be a valid client pointer, or null. `name` must be a
/// NUL-terminated string, `len` valid for reads and writes, `value` null
/// or valid for `*len` bytes.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_param(
    client: *mut QvrClient,
    name: *const c_char,
    len: *mut u32,
    value: *mut c_char,
) -> i32 {
    let helper = helper_or_invalid!(client);
    if name.is_null() || len.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    helper.get_param(name, len, value)
}

/// # Safety
/// `client` must be a valid client pointer, or null. `name` and `value`
/// must be NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_set_param(
    client: *mut QvrClient,
    name: *const c_char,
    value: *const c_char,
) -> i32 {
    let helper = helper_or_invalid!(client);
    if name.is_null() || value.is_null() {
        return sys::QVR_INVALID_PARAM;
    }
    helper.set_param(name, value)
}

/// On success `*data` points to vendor-owned memory valid until the next call.
///
/// # Safety
/// `client` must be a valid client pointer, or null. `data` must be valid
/// for a pointer write.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_sensor_raw_data(
    client: *mut QvrClient,
    data: *mut *mut SensorDataRaw,
) -> i32 {
    helper_or_invalid!(client).get_sensor_raw_data(data)
}

/// On success `*data` points to vendor-owned memory valid until the next call.
///
/// # Safety
/// `client` must be a valid client pointer, or null. `data` must be valid
/// for a pointer write.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_head_tracking_data(
    client: *mut QvrClient,
    data: *mut *mut HeadTrackingData,
) -> i32 {
    helper_or_invalid!(client).get_head_tracking_data(data)
}

/// # Safety
/// `client` must be a valid client pointer, or null. `data` must be valid
/// for a pointer write.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_historical_head_tracking_data(
    client: *mut QvrClient,
    data: *mut *mut HeadTrackingData,
    timestamp_ns: i64,
) -> i32 {
    helper_or_invalid!(client).get_historical_head_tracking_data(data, timestamp_ns)
}

/// # Safety
/// `client` must be a valid client pointer, or null. `desc` must be valid
/// for writes.
#[no_mangle]
pub unsafe extern "C" fn qvr_client_get_ring_buffer_descriptor(
    client: *mut QvrClient,
    id: u32,
    desc: *mut RingBufferDesc,
) -> i32 {
    helper_or_invalid!(client).get_ring_buffer_descriptor(id, desc)
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next qvrservice API call.
#[no_mangle]
pub extern "C" fn qvr_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockVendor};
    use std::ffi::CString;

    fn mock_client(vendor: &MockVendor) -> *mut QvrClient {
        let helper = unsafe { ClientHelper::from_wrapper(vendor.wrapper(), None) }.unwrap();
        Box::into_raw(Box::new(QvrClient(helper)))
    }

    #[test]
    fn test_null_client_is_invalid_param() {
        let null: *mut QvrClient = std::ptr::null_mut();
        let calls = mock::call_count();
        unsafe {
            assert_eq!(qvr_client_api_version(null), sys::QVR_INVALID_PARAM);
            assert_eq!(qvr_client_get_vr_mode(null), sys::QVR_INVALID_PARAM);
            assert_eq!(qvr_client_start_vr_mode(null), sys::QVR_INVALID_PARAM);
            assert_eq!(qvr_client_stop_vr_mode(null), sys::QVR_INVALID_PARAM);
            assert_eq!(qvr_client_set_tracking_mode(null, 1), sys::QVR_INVALID_PARAM);
            assert_eq!(
                qvr_client_set_thread_priority(null, 1, 1, 1),
                sys::QVR_INVALID_PARAM
            );
            let mut desc = RingBufferDesc::default();
            assert_eq!(
                qvr_client_get_ring_buffer_descriptor(null, 0, &mut desc),
                sys::QVR_INVALID_PARAM
            );
            let mut data = std::ptr::null_mut();
            assert_eq!(
                qvr_client_get_head_tracking_data(null, &mut data),
                sys::QVR_INVALID_PARAM
            );
            assert_eq!(
                qvr_client_get_historical_head_tracking_data(null, &mut data, 0),
                sys::QVR_INVALID_PARAM
            );
            let mut raw = std::ptr::null_mut();
            assert_eq!(
                qvr_client_get_sensor_raw_data(null, &mut raw),
                sys::QVR_INVALID_PARAM
            );
            assert_eq!(
                qvr_client_set_status_callback(null, None, std::ptr::null_mut()),
                sys::QVR_INVALID_PARAM
            );
            let (mut mode, mut supported) = (0u32, 0u32);
            assert_eq!(
                qvr_client_get_tracking_mode(null, &mut mode, &mut supported),
                sys::QVR_INVALID_PARAM
            );
            let mut cfg = sys::DispInterruptConfig {
                cb: None,
                ctx: std::ptr::null_mut(),
                line: 0,
            };
            assert_eq!(
                qvr_client_set_display_interrupt_config(
                    null,
                    0,
                    &mut cfg as *mut sys::DispInterruptConfig as *mut c_void,
                    std::mem::size_of::<sys::DispInterruptConfig>() as u32,
                ),
                sys::QVR_INVALID_PARAM
            );
            let name = CString::new(sys::QVRSERVICE_SERVICE_VERSION).unwrap();
            let value = CString::new("1").unwrap();
            let mut len = 0u32;
            assert_eq!(
                qvr_client_get_param(null, name.as_ptr(), &mut len, std::ptr::null_mut()),
                sys::QVR_INVALID_PARAM
            );
            assert_eq!(
                qvr_client_set_param(null, name.as_ptr(), value.as_ptr()),
                sys::QVR_INVALID_PARAM
            );
            qvr_client_destroy(null);
        }
        assert_eq!(mock::call_count(), calls);
    }

    #[test]
    fn test_empty_slot_is_api_not_supported() {
        let vendor = MockVendor::new(|ops| ops.set_thread_priority = None);
        let client = mock_client(&vendor);
        let calls = mock::call_count();
        unsafe {
            assert_eq!(
                qvr_client_set_thread_priority(client, 1, 0, 0),
                sys::QVR_API_NOT_SUPPORTED
            );
        }
        assert_eq!(mock::call_count(), calls);
        unsafe { qvr_client_destroy(client) };
    }

    #[test]
    fn test_two_phase_param_over_ffi() {
        let vendor = MockVendor::full();
        let client = mock_client(&vendor);
        let name = CString::new(sys::QVRSERVICE_SERVICE_VERSION).unwrap();

        unsafe {
            let mut len = 0u32;
            let ret = qvr_client_get_param(client, name.as_ptr(), &mut len, std::ptr::null_mut());
            assert_eq!(ret, sys::QVR_SUCCESS);
            assert_eq!(len, 6); // "5.2.1" + NUL

            // Smaller buffer: truncated but NUL-terminated, full length reported.
            let mut small = [0x7f as c_char; 3];
            let mut small_len = small.len() as u32;
            let ret = qvr_client_get_param(client, name.as_ptr(), &mut small_len, small.as_mut_ptr());
            assert_eq!(ret, sys::QVR_SUCCESS);
            assert_eq!(small_len, 6);
            assert_eq!(small.map(|c| c as u8), [b'5', b'.', 0]);

            assert_eq!(
                qvr_client_get_param(client, name.as_ptr(), std::ptr::null_mut(), std::ptr::null_mut()),
                sys::QVR_INVALID_PARAM
            );
            qvr_client_destroy(client);
        }
    }

    #[test]
    fn test_forwarded_tracking_data() {
        let vendor = MockVendor::full();
        let client = mock_client(&vendor);
        unsafe {
            let mut data: *mut HeadTrackingData = std::ptr::null_mut();
            assert_eq!(
                qvr_client_get_head_tracking_data(client, &mut data),
                sys::QVR_SUCCESS
            );
            assert_eq!((*data).ts, 5_000_000);

            let mut mode = 0u32;
            let mut supported = 0u32;
            assert_eq!(
                qvr_client_get_tracking_mode(client, &mut mode, &mut supported),
                sys::QVR_SUCCESS
            );
            assert_eq!((mode, supported), (0x1, 0x3));
            assert_eq!(qvr_client_api_version(client), mock::API_VERSION);
            qvr_client_destroy(client);
        }
    }

    #[test]
    fn test_destroy_once() {
        let vendor = MockVendor::full();
        let before = mock::destroy_count();
        let client = mock_client(&vendor);
        unsafe { qvr_client_destroy(client) };
        assert_eq!(mock::destroy_count(), before + 1);
    }

    #[test]
    fn test_create_without_library_sets_last_error() {
        let config = LoaderConfig {
            library: "libqvrservice_missing_for_test.so".into(),
            ..LoaderConfig::default()
        };
        let client = create_client(&config);
        assert!(client.is_null());
        assert!(!qvr_last_error().is_null());
    }
}
