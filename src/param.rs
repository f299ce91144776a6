//! Key/value parameter access.
//!
//! Values are read in two phases: a call with a null buffer reports the
//! required length (including the trailing NUL), a second call fills a
//! buffer of that length. The value can change between the two calls, so
//! the fill is retried a few times before settling for a truncated value.

use crate::error::check;
use crate::{QvrError, Result};
use std::ffi::{c_char, CString};

pub use crate::sys::{
    QVRSERVICE_CLIENT_VERSION, QVRSERVICE_SERVICE_VERSION, QVRSERVICE_TRACKER_ANDROID_OFFSET_NS,
};

/// Fill attempts after the length query.
pub const MAX_FILL_ATTEMPTS: usize = 3;

/// Convert a key or value to a C string.
pub(crate) fn to_cstring(s: &str) -> Result<CString> {
    CString::new(s).map_err(|_| QvrError::ParamEncoding)
}

/// Run the two-phase protocol against `get(len, value)`.
///
/// `get` receives a pointer to the in/out length and the output buffer
/// (null for the length query) and returns a vendor code.
pub fn read_param<F>(mut get: F) -> Result<String>
where
    F: FnMut(*mut u32, *mut c_char) -> i32,
{
    let mut required: u32 = 0;
    check(get(&mut required, std::ptr::null_mut()))?;

    let mut buf: Vec<u8> = Vec::new();
    for attempt in 1..=MAX_FILL_ATTEMPTS {
        if required == 0 {
            return Ok(String::new());
        }
        buf.clear();
        buf.resize(required as usize, 0);

        let capacity = required;
        let mut len = capacity;
        check(get(&mut len, buf.as_mut_ptr() as *mut c_char))?;

        if len <= capacity {
            return Ok(decode(&buf));
        }
        log::debug!(
            "Parameter grew from {} to {} bytes during read (attempt {}/{})",
            capacity,
            len,
            attempt,
            MAX_FILL_ATTEMPTS
        );
        required = len;
    }

    log::warn!("Parameter kept growing, returning truncated value");
    Ok(decode(&buf))
}

/// Text up to the first NUL, or the whole buffer when none was written.
fn decode(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).to_string()
}

/// Parse the tracker-to-Android clock offset.
pub fn parse_offset_ns(value: &str) -> Result<i64> {
    value
        .trim()
        .parse::<i64>()
        .map_err(|_| QvrError::InvalidOffset(value.to_string()))
}
