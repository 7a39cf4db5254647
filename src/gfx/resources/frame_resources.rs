//! Double-buffered constant storage
//!
//! Two device-resident constant stores alternate by frame index, fed from one
//! CPU-writable staging store. While the GPU reads store `k` for frame `N`,
//! the copy for frame `N + 1` lands in the other store. This holds as long as
//! the device never has more than one presented frame in flight.

use crate::error::DeviceResult;
use crate::gfx::device::{BufferDescriptor, BufferHandle, BufferUsage, GraphicsDevice};

use super::frame_constants::FrameConstants;

/// Number of rotating constant stores.
pub const FRAMES_IN_FLIGHT: usize = 2;

/// Rounds `size` up to the next multiple of `alignment`.
pub fn aligned_size(size: u64, alignment: u64) -> u64 {
    size.next_multiple_of(alignment.max(1))
}

#[derive(Debug)]
pub struct FrameResources {
    constant_stores: [BufferHandle; FRAMES_IN_FLIGHT],
    staging: BufferHandle,
    store_size: u64,
    frame_index: u64,
}

impl FrameResources {
    /// Allocates the constant stores and the staging store.
    ///
    /// Called once at startup. Any allocation failure is returned as is; there
    /// is nothing to render with if it fails.
    pub fn initialize<D: GraphicsDevice>(device: &mut D) -> DeviceResult<Self> {
        let store_size = aligned_size(FrameConstants::SIZE, device.constant_alignment());

        let constant_stores = [
            device.create_buffer(&BufferDescriptor::sized(
                "Constant Store 0",
                BufferUsage::Constant,
                store_size,
            ))?,
            device.create_buffer(&BufferDescriptor::sized(
                "Constant Store 1",
                BufferUsage::Constant,
                store_size,
            ))?,
        ];
        let staging = device.create_buffer(&BufferDescriptor::sized(
            "Constant Staging",
            BufferUsage::Staging,
            store_size,
        ))?;

        log::debug!(
            "Frame constants: {} bytes, {} stores of {} bytes",
            FrameConstants::SIZE,
            FRAMES_IN_FLIGHT,
            store_size
        );

        Ok(Self {
            constant_stores,
            staging,
            store_size,
            frame_index: 0,
        })
    }

    /// Writes `constants` into the staging store.
    ///
    /// The mapping is scoped to this call and released even if the write fails.
    pub fn write_staging<D: GraphicsDevice>(
        &self,
        device: &mut D,
        constants: &FrameConstants,
    ) -> DeviceResult<()> {
        let mut view = device.map_for_write(self.staging)?;
        view.write(0, constants.as_bytes())
    }

    /// Schedules the staging to constant store copy for the current frame and
    /// returns the store the draw must read.
    pub fn record_upload<D: GraphicsDevice>(&self, device: &mut D) -> DeviceResult<BufferHandle> {
        let store = self.current_store();
        device.copy_buffer(store, self.staging)?;
        Ok(store)
    }

    /// Moves to the next frame. Returns the new frame index.
    pub fn advance(&mut self) -> u64 {
        self.frame_index = self.frame_index.wrapping_add(1);
        self.frame_index
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Index of the constant store used by the current frame.
    pub fn current_slot(&self) -> usize {
        (self.frame_index % FRAMES_IN_FLIGHT as u64) as usize
    }

    pub fn current_store(&self) -> BufferHandle {
        self.constant_stores[self.current_slot()]
    }

    pub fn constant_stores(&self) -> &[BufferHandle; FRAMES_IN_FLIGHT] {
        &self.constant_stores
    }

    pub fn staging(&self) -> BufferHandle {
        self.staging
    }

    pub fn store_size(&self) -> u64 {
        self.store_size
    }
}
