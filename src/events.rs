use crate::types::{ClientStatus, DisplayInterruptId, VrModeState};
use crate::{QvrError, Result};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use std::ffi::c_void;
use std::time::Duration;

/// Default channel depth for event streams.
pub const DEFAULT_CAPACITY: usize = 64;

/// Client status notification from the service daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// The daemon connection was lost.
    Disconnected,
    /// VR mode moved from `previous` to `current`.
    StateChanged {
        current: VrModeState,
        previous: VrModeState,
    },
    SensorError,
    /// A status this crate does not know, passed through raw.
    Other { status: u32, arg1: u64, arg2: u64 },
}

impl StatusEvent {
    pub fn from_raw(status: u32, arg1: u64, arg2: u64) -> StatusEvent {
        match ClientStatus::from_raw(status) {
            Some(ClientStatus::Disconnected) => StatusEvent::Disconnected,
            Some(ClientStatus::SensorError) => StatusEvent::SensorError,
            Some(ClientStatus::StateChanged) => {
                let current = u32::try_from(arg1).ok().and_then(|s| VrModeState::try_from(s).ok());
                let previous = u32::try_from(arg2).ok().and_then(|s| VrModeState::try_from(s).ok());
                match (current, previous) {
                    (Some(current), Some(previous)) => StatusEvent::StateChanged { current, previous },
                    _ => StatusEvent::Other { status, arg1, arg2 },
                }
            }
            None => StatusEvent::Other { status, arg1, arg2 },
        }
    }
}

/// One display interrupt with its timestamp in nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayInterrupt {
    pub id: DisplayInterruptId,
    pub timestamp_ns: u64,
}

/// Receiving side of a vendor callback bridged to a channel.
pub struct EventStream<T> {
    receiver: Receiver<T>,
}

impl<T> EventStream<T> {
    /// Receive the next event (blocks until available).
    pub fn recv(&self) -> Result<T> {
        self.receiver.recv().map_err(|_| QvrError::StreamStopped)
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Receive an event with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<T> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => QvrError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => QvrError::StreamStopped,
        })
    }

    /// Drain everything queued right now.
    pub fn drain(&self) -> Vec<T> {
        self.receiver.try_iter().collect()
    }
}

pub type StatusStream = EventStream<StatusEvent>;
pub type InterruptStream = EventStream<DisplayInterrupt>;

/// Context handed to the vendor as the callback `ctx` pointer.
///
/// Boxed so its address is stable while registered.
pub(crate) struct CallbackContext<T> {
    sender: Sender<T>,
    tag: Option<DisplayInterruptId>,
}

impl<T> CallbackContext<T> {
    pub(crate) fn as_ctx(&self) -> *mut c_void {
        self as *const Self as *mut c_void
    }

    /// Never blocks: vendor threads must not stall on a slow consumer.
    fn deliver(&self, event: T) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::trace!("Event channel full, dropping event"),
            Err(TrySendError::Disconnected(_)) => log::trace!("Event stream dropped, discarding event"),
        }
    }
}

/// Bounded channel plus the boxed context for it.
pub(crate) fn channel<T>(
    capacity: usize,
    tag: Option<DisplayInterruptId>,
) -> (Box<CallbackContext<T>>, EventStream<T>) {
    let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
    (Box::new(CallbackContext { sender, tag }), EventStream { receiver })
}

/// `ClientStatusCallbackFn` trampoline. `ctx` is a `CallbackContext<StatusEvent>`.
pub(crate) unsafe extern "C" fn status_trampoline(ctx: *mut c_void, status: u32, arg1: u64, arg2: u64) {
    if ctx.is_null() {
        return;
    }
    let context = &*(ctx as *const CallbackContext<StatusEvent>);
    context.deliver(StatusEvent::from_raw(status, arg1, arg2));
}

/// `DispInterruptCallbackFn` trampoline. `ctx` is a `CallbackContext<DisplayInterrupt>`.
pub(crate) unsafe extern "C" fn interrupt_trampoline(ctx: *mut c_void, ts: u64) {
    if ctx.is_null() {
        return;
    }
    let context = &*(ctx as *const CallbackContext<DisplayInterrupt>);
    let id = context.tag.unwrap_or(DisplayInterruptId::Vsync);
    context.deliver(DisplayInterrupt {
        id,
        timestamp_ns: ts,
    });
}
