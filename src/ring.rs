//! Shared-memory ring reader.
//!
//! The daemon publishes samples into a ring inside a shared-memory region
//! and bumps a u32 index at `index_offset`. A reader loads the index, then
//! copies the element at `ring_offset + (index % num_elements) * element_size`.
//! If the index moves while the copy is in flight the copy is retried. A
//! producer that keeps lapping the reader for every attempt can still hand
//! back a slot that was rewritten mid-copy; the last attempt is returned
//! unchecked.

use crate::types::{HeadTrackingData, RingBufferDesc, SensorDataRaw};
use crate::{QvrError, Result};
use std::marker::PhantomData;
use std::mem::size_of;
use std::sync::atomic::{fence, Ordering};

/// Copy attempts before giving up on a steady index.
const MAX_READ_ATTEMPTS: usize = 4;

/// Types that may be copied out of the ring from raw bytes.
///
/// # Safety
/// Implementors must be `#[repr(C)]` and valid for any bit pattern.
pub unsafe trait RingElement: Copy {}

unsafe impl RingElement for HeadTrackingData {}
unsafe impl RingElement for SensorDataRaw {}

/// Validated byte geometry of a ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RingLayout {
    size: usize,
    index_offset: usize,
    ring_offset: usize,
    element_size: usize,
    num_elements: usize,
}

impl RingLayout {
    /// Check `desc` against an element type of `min_element_size` bytes.
    pub fn new(desc: &RingBufferDesc, min_element_size: usize) -> Result<RingLayout> {
        let layout = RingLayout {
            size: desc.size as usize,
            index_offset: desc.index_offset as usize,
            ring_offset: desc.ring_offset as usize,
            element_size: desc.element_size as usize,
            num_elements: desc.num_elements as usize,
        };

        if layout.num_elements == 0 {
            return Err(QvrError::RingLayout("ring has no elements".into()));
        }
        if layout.element_size < min_element_size {
            return Err(QvrError::RingLayout(format!(
                "element size {} smaller than {}",
                layout.element_size, min_element_size
            )));
        }
        if layout.index_offset.checked_add(4).map_or(true, |end| end > layout.size) {
            return Err(QvrError::RingLayout(format!(
                "index offset {} outside {} byte region",
                layout.index_offset, layout.size
            )));
        }
        let ring_end = layout
            .element_size
            .checked_mul(layout.num_elements)
            .and_then(|bytes| bytes.checked_add(layout.ring_offset));
        if ring_end.map_or(true, |end| end > layout.size) {
            return Err(QvrError::RingLayout(format!(
                "{} elements of {} bytes at offset {} exceed {} byte region",
                layout.num_elements, layout.element_size, layout.ring_offset, layout.size
            )));
        }
        Ok(layout)
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn num_elements(&self) -> usize {
        self.num_elements
    }

    /// Byte offset of the slot for a published index.
    pub fn slot_offset(&self, index: u32) -> usize {
        self.ring_offset + (index as usize % self.num_elements) * self.element_size
    }

    /// Load the published index from a region of at least `size` bytes.
    ///
    /// # Safety
    /// `base` must be valid for reads of `self.size()` bytes.
    unsafe fn load_index(&self, base: *const u8) -> u32 {
        let raw = std::ptr::read_volatile(base.add(self.index_offset) as *const [u8; 4]);
        fence(Ordering::Acquire);
        u32::from_ne_bytes(raw)
    }

    /// Copy the element the producer published last.
    ///
    /// # Safety
    /// `base` must be valid for reads of `self.size()` bytes and this layout
    /// must have been validated for `T`.
    unsafe fn read_latest<T: RingElement>(&self, base: *const u8) -> (u32, T) {
        let mut index = self.load_index(base);
        for _ in 0..MAX_READ_ATTEMPTS {
            let slot = base.add(self.slot_offset(index)) as *const T;
            let element = std::ptr::read_unaligned(slot);
            fence(Ordering::Acquire);
            let after = self.load_index(base);
            if after == index {
                return (index, element);
            }
            log::trace!("Ring index moved {} -> {} during read, retrying", index, after);
            index = after;
        }
        log::debug!("Ring index still moving after {} reads", MAX_READ_ATTEMPTS);
        let element = std::ptr::read_unaligned(base.add(self.slot_offset(index)) as *const T);
        (index, element)
    }

    /// Read the latest element from an in-memory copy of the region.
    pub fn read_from<T: RingElement>(&self, bytes: &[u8]) -> Result<(u32, T)> {
        if bytes.len() < self.size || self.element_size < size_of::<T>() {
            return Err(QvrError::RingLayout(format!(
                "region of {} bytes does not match layout",
                bytes.len()
            )));
        }
        Ok(unsafe { self.read_latest(bytes.as_ptr()) })
    }
}

/// Read-only mapping of a daemon ring.
pub struct RingReader<T: RingElement> {
    map: memmap2::Mmap,
    layout: RingLayout,
    last_index: Option<u32>,
    _marker: PhantomData<T>,
}

/// Ring of head tracking samples (`RingBufferId::Pose`).
pub type PoseRing = RingReader<HeadTrackingData>;

impl<T: RingElement> RingReader<T> {
    /// Map the region described by `desc`. The descriptor keeps owning
    /// its fd; the mapping stays valid after the fd is closed.
    #[cfg(unix)]
    pub fn open(desc: &RingBufferDesc) -> Result<RingReader<T>> {
        let layout = RingLayout::new(desc, size_of::<T>())?;
        if desc.fd < 0 {
            return Err(QvrError::RingLayout(format!("invalid fd {}", desc.fd)));
        }
        let map = unsafe {
            memmap2::MmapOptions::new()
                .len(layout.size())
                .map(desc.fd as std::os::unix::io::RawFd)?
        };
        log::info!(
            "Mapped ring: {} bytes, {} x {} byte elements",
            layout.size,
            layout.num_elements,
            layout.element_size
        );
        Ok(RingReader {
            map,
            layout,
            last_index: None,
            _marker: PhantomData,
        })
    }

    pub fn layout(&self) -> &RingLayout {
        &self.layout
    }

    /// Current published index.
    pub fn index(&self) -> u32 {
        unsafe { self.layout.load_index(self.map.as_ptr()) }
    }

    /// Latest published element.
    pub fn latest(&self) -> T {
        unsafe { self.layout.read_latest::<T>(self.map.as_ptr()).1 }
    }

    /// Latest element if the producer advanced since the previous call.
    pub fn poll(&mut self) -> Option<T> {
        let (index, element) = unsafe { self.layout.read_latest::<T>(self.map.as_ptr()) };
        if self.last_index == Some(index) {
            return None;
        }
        self.last_index = Some(index);
        Some(element)
    }
}
