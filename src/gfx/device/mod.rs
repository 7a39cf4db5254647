//! Graphics device abstraction
//!
//! The frame logic only needs a handful of capabilities from the GPU: create
//! buffers and sized render targets, copy between buffers, write into a
//! CPU-visible buffer, issue the mesh draw and present. [`GraphicsDevice`]
//! captures exactly that, so the same frame code drives a real
//! [`WgpuDevice`] or the recording [`HeadlessDevice`] used in tests.

pub mod headless;
pub mod wgpu_device;

pub use headless::HeadlessDevice;
pub use wgpu_device::WgpuDevice;

use crate::error::DeviceResult;

/// Handle to a device buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub(crate) u32);

/// Handle to a sized render target (color or depth)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle(pub(crate) u32);

/// How a buffer is used by the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    /// Immutable vertex data, contents required at creation.
    Vertex,
    /// Immutable 32-bit index data, contents required at creation.
    Index,
    /// GPU-resident constant store, only written by device copies.
    Constant,
    /// CPU-writable buffer used as the source of device copies.
    Staging,
}

impl BufferUsage {
    /// Immutable buffers are filled once at creation and never written again.
    pub fn is_immutable(self) -> bool {
        matches!(self, BufferUsage::Vertex | BufferUsage::Index)
    }
}

/// Buffer creation parameters.
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub size: u64,
    pub usage: BufferUsage,
    pub contents: Option<&'a [u8]>,
}

impl<'a> BufferDescriptor<'a> {
    /// Descriptor for an immutable buffer initialised from `contents`.
    pub fn with_contents(label: &'a str, usage: BufferUsage, contents: &'a [u8]) -> Self {
        Self {
            label,
            size: contents.len() as u64,
            usage,
            contents: Some(contents),
        }
    }

    /// Descriptor for an uninitialised buffer of `size` bytes.
    pub fn sized(label: &'a str, usage: BufferUsage, size: u64) -> Self {
        Self {
            label,
            size,
            usage,
            contents: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// View of the current back buffer
    Color,
    /// Depth buffer matching the back buffer size
    Depth,
}

/// Rasterizer viewport in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with the `[0, 1]` depth range.
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Everything the render pass needs to draw the mesh for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
    pub constants: BufferHandle,
    pub color_target: TargetHandle,
    pub depth_target: TargetHandle,
    pub viewport: Viewport,
}

/// Capabilities the frame logic consumes from a GPU.
///
/// Calls are issued from one thread in submission order. Implementations may
/// execute asynchronously but must preserve that order.
pub trait GraphicsDevice {
    /// Human readable backend name, used in logs.
    fn name(&self) -> &'static str;

    /// Required size alignment of constant stores, in bytes.
    fn constant_alignment(&self) -> u64;

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle>;

    /// Reallocates the swap chain back buffers at the new size.
    fn resize_back_buffer(&mut self, width: u32, height: u32) -> DeviceResult<()>;

    /// Creates a color view of the current back buffer, or a depth buffer.
    fn create_sized_target(
        &mut self,
        width: u32,
        height: u32,
        kind: TargetKind,
    ) -> DeviceResult<TargetHandle>;

    fn release_target(&mut self, target: TargetHandle);

    /// Records a full copy of `src` into `dst`, ordered before later draws.
    fn copy_buffer(&mut self, dst: BufferHandle, src: BufferHandle) -> DeviceResult<()>;

    /// Makes a staging buffer CPU-writable. Prefer [`GraphicsDevice::map_for_write`].
    fn map_buffer(&mut self, buffer: BufferHandle) -> DeviceResult<()>;

    /// Writes into a buffer previously mapped with [`GraphicsDevice::map_buffer`].
    fn write_mapped(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> DeviceResult<()>;

    /// Ends CPU access to a mapped buffer. Must be infallible.
    fn unmap_buffer(&mut self, buffer: BufferHandle);

    /// Issues the mesh draw into the color/depth targets.
    fn draw(&mut self, call: &DrawCall) -> DeviceResult<()>;

    /// Submits the frame and presents it. `sync_interval` 0 disables vsync.
    fn present(&mut self, sync_interval: u32) -> DeviceResult<()>;

    /// Maps `buffer` for writing and returns a guard that unmaps on drop.
    ///
    /// The mapping is released on every exit path, including early returns
    /// through `?` and panics during the write.
    fn map_for_write(&mut self, buffer: BufferHandle) -> DeviceResult<MappedWrite<'_, Self>>
    where
        Self: Sized,
    {
        self.map_buffer(buffer)?;
        Ok(MappedWrite {
            device: self,
            buffer,
        })
    }
}

/// Scoped CPU write access to a mapped buffer.
pub struct MappedWrite<'a, D: GraphicsDevice> {
    device: &'a mut D,
    buffer: BufferHandle,
}

impl<D: GraphicsDevice> MappedWrite<'_, D> {
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) -> DeviceResult<()> {
        self.device.write_mapped(self.buffer, offset, data)
    }
}

impl<D: GraphicsDevice> Drop for MappedWrite<'_, D> {
    fn drop(&mut self) {
        self.device.unmap_buffer(self.buffer);
    }
}
