use std::fmt;

use crate::sys;

/// Errors returned by the QVR service client.
#[derive(Debug, thiserror::Error)]
pub enum QvrError {
    #[error("Failed to load vendor library {name}: {source}")]
    LibraryLoad {
        name: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Symbol {name} not found in vendor library: {source}")]
    SymbolNotFound {
        name: String,
        #[source]
        source: libloading::Error,
    },

    #[error("Vendor library returned no ops table")]
    NoOpsTable,

    #[error("Vendor client creation failed")]
    CreateFailed,

    #[error("QVR service call failed")]
    Failed,

    #[error("Callback not supported by the QVR service")]
    CallbackNotSupported,

    #[error("API not supported by the loaded vendor library")]
    ApiNotSupported,

    #[error("Invalid parameter")]
    InvalidParam,

    #[error("Unknown QVR return code {0}")]
    UnknownCode(i32),

    #[error("Unknown VR mode state {0}")]
    InvalidState(u32),

    #[error("Vendor returned a null data pointer")]
    NullData,

    #[error("Parameter name or value contains an interior NUL byte")]
    ParamEncoding,

    #[error("Invalid tracker clock offset: {0:?}")]
    InvalidOffset(String),

    #[error("Invalid ring buffer layout: {0}")]
    RingLayout(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout waiting for event")]
    Timeout,

    #[error("Event stream stopped")]
    StreamStopped,
}

impl QvrError {
    /// Map a vendor return code to an error. `QVR_SUCCESS` maps to `None`.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            sys::QVR_SUCCESS => None,
            sys::QVR_ERROR => Some(QvrError::Failed),
            sys::QVR_CALLBACK_NOT_SUPPORTED => Some(QvrError::CallbackNotSupported),
            sys::QVR_API_NOT_SUPPORTED => Some(QvrError::ApiNotSupported),
            sys::QVR_INVALID_PARAM => Some(QvrError::InvalidParam),
            other => Some(QvrError::UnknownCode(other)),
        }
    }

    /// The wire code closest to this error, for the C layer.
    pub fn code(&self) -> i32 {
        match self {
            QvrError::CallbackNotSupported => sys::QVR_CALLBACK_NOT_SUPPORTED,
            QvrError::ApiNotSupported => sys::QVR_API_NOT_SUPPORTED,
            QvrError::InvalidParam | QvrError::ParamEncoding => sys::QVR_INVALID_PARAM,
            QvrError::UnknownCode(code) => *code,
            _ => sys::QVR_ERROR,
        }
    }
}

/// Turn a vendor return code into a `Result`.
pub(crate) fn check(code: i32) -> crate::Result<()> {
    match QvrError::from_code(code) {
        None => Ok(()),
        Some(err) => Err(err),
    }
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &QvrError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut msg) = self.message.lock() {
            msg.clear();
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
