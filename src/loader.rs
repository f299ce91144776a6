//! Vendor library loader and call forwarding.
//!
//! `ClientHelper` owns the loaded library, the ops table it exported and
//! the client handle created through it. Every forwarding method returns
//! the vendor's code unchanged, or `QVR_API_NOT_SUPPORTED` when the loaded
//! library leaves that slot empty.

use crate::sys::{self, ClientHandle, ClientOps, ClientWrapper};
use crate::types::{HeadTrackingData, RingBufferDesc, SensorDataRaw};
use crate::{QvrError, Result};
use libloading::Library;
use std::ffi::{c_char, c_void};
use std::ptr::NonNull;

/// Where to find the vendor client library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Library name or path handed to the dynamic loader.
    pub library: String,
    /// Factory symbol returning the ops table wrapper.
    pub symbol: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            library: sys::QVRSERVICE_CLIENT_LIB.to_string(),
            symbol: sys::QVRSERVICE_CLIENT_FACTORY.to_string(),
        }
    }
}

impl LoaderConfig {
    /// Defaults, overridden by `QVRSERVICE_CLIENT_LIB` and
    /// `QVRSERVICE_CLIENT_SYMBOL` when set and non-empty.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Same as `from_env`, reading variables through `var`.
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            library: read_env_string(var("QVRSERVICE_CLIENT_LIB"), &defaults.library),
            symbol: read_env_string(var("QVRSERVICE_CLIENT_SYMBOL"), &defaults.symbol),
        }
    }
}

fn read_env_string(value: Option<String>, default: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => default.to_string(),
    }
}

macro_rules! forward {
    ($self:ident, $slot:ident $(, $arg:expr)*) => {
        match $self.ops().$slot {
            Some(f) => f($self.client.as_ptr() $(, $arg)*),
            None => {
                log::debug!(concat!(stringify!($slot), " not supported by vendor library"));
                sys::QVR_API_NOT_SUPPORTED
            }
        }
    };
}

/// Loaded vendor library plus the client handle created through it.
///
/// Single owner: the handle must not be used from several threads at once,
/// so the helper is `Send` but not `Sync`.
pub struct ClientHelper {
    ops: NonNull<ClientOps>,
    client: NonNull<ClientHandle>,
    api_version: i32,
    destroyed: bool,
    // Declared last: unloaded only after the handle is destroyed.
    library: Option<Library>,
}

unsafe impl Send for ClientHelper {}

impl ClientHelper {
    /// Load the vendor library with the default name and create a client.
    pub fn create() -> Result<ClientHelper> {
        Self::create_with(&LoaderConfig::default())
    }

    /// Load the vendor library described by `config` and create a client.
    pub fn create_with(config: &LoaderConfig) -> Result<ClientHelper> {
        let library = unsafe { Library::new(&config.library) }.map_err(|source| {
            QvrError::LibraryLoad {
                name: config.library.clone(),
                source,
            }
        })?;

        let wrapper = {
            let factory = unsafe { library.get::<sys::ClientFactoryFn>(config.symbol.as_bytes()) }
                .map_err(|source| QvrError::SymbolNotFound {
                    name: config.symbol.clone(),
                    source,
                })?;
            unsafe { factory() }
        };

        // On error `library` is dropped here, before returning.
        let helper = unsafe { Self::from_wrapper(wrapper, Some(library))? };
        log::info!(
            "Loaded {} (api_version={})",
            config.library,
            helper.api_version
        );
        Ok(helper)
    }

    /// Create a client from an already resolved wrapper.
    ///
    /// # Safety
    /// `wrapper` must be null or point to a valid `ClientWrapper` whose ops
    /// table stays valid for as long as `library` (or, when `None`, the
    /// process) keeps it loaded.
    pub unsafe fn from_wrapper(
        wrapper: *const ClientWrapper,
        library: Option<Library>,
    ) -> Result<ClientHelper> {
        let wrapper = wrapper.as_ref().ok_or(QvrError::NoOpsTable)?;
        let ops = NonNull::new(wrapper.ops).ok_or(QvrError::NoOpsTable)?;

        let create = ops.as_ref().create.ok_or(QvrError::ApiNotSupported)?;
        let client = NonNull::new(create()).ok_or(QvrError::CreateFailed)?;

        Ok(ClientHelper {
            ops,
            client,
            api_version: wrapper.api_version,
            destroyed: false,
            library,
        })
    }

    /// Version reported by the vendor wrapper.
    pub fn api_version(&self) -> i32 {
        self.api_version
    }

    /// Query the ops table, e.g. `helper.supports(|ops| ops.get_param.is_some())`.
    pub fn supports(&self, f: impl FnOnce(&ClientOps) -> bool) -> bool {
        f(self.ops())
    }

    fn ops(&self) -> &ClientOps {
        unsafe { self.ops.as_ref() }
    }

    /// Register or clear (`cb = None`) the client status callback.
    ///
    /// # Safety
    /// `ctx` must stay valid until the callback is replaced or the helper
    /// is dropped. `cb` may run on vendor threads at any time.
    pub unsafe fn set_client_status_callback(
        &self,
        cb: Option<sys::ClientStatusCallbackFn>,
        ctx: *mut c_void,
    ) -> i32 {
        forward!(self, set_client_status_callback, cb, ctx)
    }

    /// Current VR mode as a raw state value, or a negative error code.
    pub fn get_vr_mode(&self) -> i32 {
        unsafe { forward!(self, get_vr_mode) }
    }

    pub fn start_vr_mode(&self) -> i32 {
        unsafe { forward!(self, start_vr_mode) }
    }

    pub fn stop_vr_mode(&self) -> i32 {
        unsafe { forward!(self, stop_vr_mode) }
    }

    /// # Safety
    /// `mode` and `supported` must be valid for writes or null, as the
    /// vendor accepts.
    pub unsafe fn get_tracking_mode(&self, mode: *mut u32, supported: *mut u32) -> i32 {
        forward!(self, get_tracking_mode, mode, supported)
    }

    pub fn set_tracking_mode(&self, mode: u32) -> i32 {
        unsafe { forward!(self, set_tracking_mode, mode) }
    }

    /// # Safety
    /// `cfg` must point to `cfg_size` readable bytes of the config struct
    /// expected for `id`; any callback context inside must outlive the
    /// registration.
    pub unsafe fn set_display_interrupt_config(
        &self,
        id: u32,
        cfg: *mut c_void,
        cfg_size: u32,
    ) -> i32 {
        forward!(self, set_display_interrupt_config, id, cfg, cfg_size)
    }

    pub fn set_thread_priority(&self, tid: i32, policy: i32, priority: i32) -> i32 {
        unsafe { forward!(self, set_thread_priority, tid, policy, priority) }
    }

    /// Two-phase parameter read; see [`crate::param`].
    ///
    /// # Safety
    /// `name` must be a NUL-terminated string, `len` valid for reads and
    /// writes, and `value` null or valid for `*len` bytes.
    pub unsafe fn get_param(&self, name: *const c_char, len: *mut u32, value: *mut c_char) -> i32 {
        forward!(self, get_param, name, len, value)
    }

    /// # Safety
    /// `name` and `value` must be NUL-terminated strings.
    pub unsafe fn set_param(&self, name: *const c_char, value: *const c_char) -> i32 {
        forward!(self, set_param, name, value)
    }

    /// # Safety
    /// `data` must be valid for a pointer write.
    pub unsafe fn get_sensor_raw_data(&self, data: *mut *mut SensorDataRaw) -> i32 {
        forward!(self, get_sensor_raw_data, data)
    }

    /// # Safety
    /// `data` must be valid for a pointer write.
    pub unsafe fn get_head_tracking_data(&self, data: *mut *mut HeadTrackingData) -> i32 {
        forward!(self, get_head_tracking_data, data)
    }

    /// # Safety
    /// `desc` must be valid for writes.
    pub unsafe fn get_ring_buffer_descriptor(&self, id: u32, desc: *mut RingBufferDesc) -> i32 {
        forward!(self, get_ring_buffer_descriptor, id, desc)
    }

    /// # Safety
    /// `data` must be valid for a pointer write.
    pub unsafe fn get_historical_head_tracking_data(
        &self,
        data: *mut *mut HeadTrackingData,
        timestamp_ns: i64,
    ) -> i32 {
        forward!(self, get_historical_head_tracking_data, data, timestamp_ns)
    }

    /// Destroy the vendor client and unload the library.
    pub fn destroy(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        match self.ops().destroy {
            Some(destroy) => unsafe { destroy(self.client.as_ptr()) },
            None => log::warn!("Vendor library has no Destroy entry, leaking client handle"),
        }
        if self.library.take().is_some() {
            log::info!("Unloaded vendor client library");
        }
    }
}

impl Drop for ClientHelper {
    fn drop(&mut self) {
        self.teardown();
    }
}
