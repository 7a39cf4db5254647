//! Recording device for tests and CI.
//!
//! This device performs no GPU work. It keeps buffer contents in host memory,
//! records every copy, draw and present in submission order, and tracks how
//! many frames the simulated GPU still has in flight so that a copy into a
//! constant store that is still being read shows up as an error instead of a
//! silent race.

use std::collections::{HashMap, VecDeque};

use crate::error::{DeviceError, DeviceResult};

use super::{
    BufferDescriptor, BufferHandle, BufferUsage, DrawCall, GraphicsDevice, TargetHandle,
    TargetKind,
};

/// Constant buffer alignment reported by the headless device.
pub const HEADLESS_CONSTANT_ALIGNMENT: u64 = 256;

/// A command recorded by [`HeadlessDevice`].
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Copy { dst: BufferHandle, src: BufferHandle },
    Draw(DrawCall),
    Present { sync_interval: u32 },
}

/// A live sized target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetInfo {
    pub kind: TargetKind,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
struct HeadlessBuffer {
    label: String,
    usage: BufferUsage,
    bytes: Vec<u8>,
    mapped: bool,
}

#[derive(Debug)]
pub struct HeadlessDevice {
    buffers: Vec<HeadlessBuffer>,
    targets: HashMap<u32, TargetInfo>,
    next_target: u32,
    targets_created: usize,
    back_buffer: (u32, u32),
    back_buffer_allocations: usize,
    commands: Vec<DeviceCommand>,
    memory_budget: Option<u64>,
    allocated_bytes: u64,
    fail_next_present: bool,
    fail_next_back_buffer: bool,
    max_frame_latency: usize,
    frame_reads: Vec<BufferHandle>,
    in_flight: VecDeque<Vec<BufferHandle>>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Creates a device that keeps at most one frame in flight.
    pub fn new() -> Self {
        Self {
            buffers: Vec::new(),
            targets: HashMap::new(),
            next_target: 0,
            targets_created: 0,
            back_buffer: (0, 0),
            back_buffer_allocations: 0,
            commands: Vec::new(),
            memory_budget: None,
            allocated_bytes: 0,
            fail_next_present: false,
            fail_next_back_buffer: false,
            max_frame_latency: 1,
            frame_reads: Vec::new(),
            in_flight: VecDeque::new(),
        }
    }

    /// Simulates a device that queues up to `frames` presented frames before
    /// the CPU is blocked.
    pub fn with_frame_latency(mut self, frames: usize) -> Self {
        self.max_frame_latency = frames.max(1);
        self
    }

    /// Buffer creation fails once the total allocated size would exceed `bytes`.
    pub fn with_memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = Some(bytes);
        self
    }

    /// Makes the next [`GraphicsDevice::present`] call fail.
    pub fn fail_next_present(&mut self) {
        self.fail_next_present = true;
    }

    /// Makes the next [`GraphicsDevice::resize_back_buffer`] call fail.
    pub fn fail_next_back_buffer(&mut self) {
        self.fail_next_back_buffer = true;
    }

    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    /// Destinations of every recorded copy, in submission order.
    pub fn copy_destinations(&self) -> Vec<BufferHandle> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Copy { dst, .. } => Some(*dst),
                _ => None,
            })
            .collect()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DeviceCommand::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    pub fn present_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|command| matches!(command, DeviceCommand::Present { .. }))
            .count()
    }

    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn buffer_usage(&self, buffer: BufferHandle) -> Option<BufferUsage> {
        self.buffers.get(buffer.0 as usize).map(|b| b.usage)
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.buffers.get(buffer.0 as usize).map(|b| b.label.as_str())
    }

    /// Host copy of a buffer's contents. Empty for unknown handles.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> &[u8] {
        self.buffers
            .get(buffer.0 as usize)
            .map(|b| b.bytes.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_mapped(&self, buffer: BufferHandle) -> bool {
        self.buffers
            .get(buffer.0 as usize)
            .is_some_and(|b| b.mapped)
    }

    pub fn target(&self, target: TargetHandle) -> Option<TargetInfo> {
        self.targets.get(&target.0).copied()
    }

    pub fn live_target_count(&self) -> usize {
        self.targets.len()
    }

    /// Total number of targets ever created.
    pub fn targets_created(&self) -> usize {
        self.targets_created
    }

    pub fn back_buffer_size(&self) -> (u32, u32) {
        self.back_buffer
    }

    /// Number of times the back buffer has been reallocated.
    pub fn back_buffer_allocations(&self) -> usize {
        self.back_buffer_allocations
    }

    fn buffer(&self, buffer: BufferHandle, operation: &'static str) -> DeviceResult<&HeadlessBuffer> {
        self.buffers
            .get(buffer.0 as usize)
            .ok_or_else(|| DeviceError::operation(operation, format!("unknown buffer {:?}", buffer)))
    }

    fn buffer_mut(
        &mut self,
        buffer: BufferHandle,
        operation: &'static str,
    ) -> DeviceResult<&mut HeadlessBuffer> {
        self.buffers
            .get_mut(buffer.0 as usize)
            .ok_or_else(|| DeviceError::operation(operation, format!("unknown buffer {:?}", buffer)))
    }

    fn check_target(&self, target: TargetHandle, kind: TargetKind) -> DeviceResult<TargetInfo> {
        match self.targets.get(&target.0) {
            Some(info) if info.kind == kind => Ok(*info),
            Some(info) => Err(DeviceError::operation(
                "draw",
                format!("target {:?} is {:?}, expected {:?}", target, info.kind, kind),
            )),
            None => Err(DeviceError::operation(
                "draw",
                format!("target {:?} has been released", target),
            )),
        }
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn name(&self) -> &'static str {
        "Headless"
    }

    fn constant_alignment(&self) -> u64 {
        HEADLESS_CONSTANT_ALIGNMENT
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle> {
        log::trace!(
            "HeadlessDevice: creating buffer {:?} ({:?}, {} bytes)",
            desc.label,
            desc.usage,
            desc.size
        );

        if desc.usage.is_immutable() && desc.contents.is_none() {
            return Err(DeviceError::operation(
                "create_buffer",
                format!("immutable buffer {} created without contents", desc.label),
            ));
        }
        if let Some(budget) = self.memory_budget {
            if self.allocated_bytes + desc.size > budget {
                return Err(DeviceError::allocation(
                    "buffer",
                    format!(
                        "{} needs {} bytes, {} of {} already in use",
                        desc.label, desc.size, self.allocated_bytes, budget
                    ),
                ));
            }
        }

        let mut bytes = vec![0u8; desc.size as usize];
        if let Some(contents) = desc.contents {
            let len = contents.len().min(bytes.len());
            bytes[..len].copy_from_slice(&contents[..len]);
        }

        self.allocated_bytes += desc.size;
        self.buffers.push(HeadlessBuffer {
            label: desc.label.to_string(),
            usage: desc.usage,
            bytes,
            mapped: false,
        });
        Ok(BufferHandle(self.buffers.len() as u32 - 1))
    }

    fn resize_back_buffer(&mut self, width: u32, height: u32) -> DeviceResult<()> {
        if width == 0 || height == 0 {
            return Err(DeviceError::operation(
                "resize_back_buffer",
                format!("invalid size {}x{}", width, height),
            ));
        }
        if std::mem::take(&mut self.fail_next_back_buffer) {
            return Err(DeviceError::allocation(
                "back buffer",
                format!("no memory for {}x{} swap chain", width, height),
            ));
        }
        log::trace!("HeadlessDevice: back buffer {}x{}", width, height);
        self.back_buffer = (width, height);
        self.back_buffer_allocations += 1;
        Ok(())
    }

    fn create_sized_target(
        &mut self,
        width: u32,
        height: u32,
        kind: TargetKind,
    ) -> DeviceResult<TargetHandle> {
        if width == 0 || height == 0 {
            return Err(DeviceError::allocation(
                "render target",
                format!("{:?} target cannot be {}x{}", kind, width, height),
            ));
        }
        if kind == TargetKind::Color && (width, height) != self.back_buffer {
            return Err(DeviceError::operation(
                "create_sized_target",
                format!(
                    "color view {}x{} does not match back buffer {}x{}",
                    width, height, self.back_buffer.0, self.back_buffer.1
                ),
            ));
        }

        let handle = TargetHandle(self.next_target);
        self.next_target += 1;
        self.targets_created += 1;
        self.targets.insert(
            handle.0,
            TargetInfo {
                kind,
                width,
                height,
            },
        );
        log::trace!("HeadlessDevice: created {:?} target {}x{}", kind, width, height);
        Ok(handle)
    }

    fn release_target(&mut self, target: TargetHandle) {
        self.targets.remove(&target.0);
    }

    fn copy_buffer(&mut self, dst: BufferHandle, src: BufferHandle) -> DeviceResult<()> {
        if self.in_flight.iter().any(|reads| reads.contains(&dst)) {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!(
                    "write-after-read hazard: {:?} is still read by an in-flight frame",
                    dst
                ),
            ));
        }

        let source = self.buffer(src, "copy_buffer")?;
        if source.mapped {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!("source {} is still mapped", source.label),
            ));
        }
        let bytes = source.bytes.clone();

        let target = self.buffer_mut(dst, "copy_buffer")?;
        if target.usage.is_immutable() {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!("destination {} is immutable", target.label),
            ));
        }
        if target.bytes.len() < bytes.len() {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!(
                    "destination {} holds {} bytes, source has {}",
                    target.label,
                    target.bytes.len(),
                    bytes.len()
                ),
            ));
        }
        target.bytes[..bytes.len()].copy_from_slice(&bytes);

        log::trace!("HeadlessDevice: copy {:?} -> {:?}", src, dst);
        self.commands.push(DeviceCommand::Copy { dst, src });
        Ok(())
    }

    fn map_buffer(&mut self, buffer: BufferHandle) -> DeviceResult<()> {
        let entry = self.buffer_mut(buffer, "map_buffer")?;
        if entry.usage != BufferUsage::Staging {
            return Err(DeviceError::operation(
                "map_buffer",
                format!("{} is not a staging buffer", entry.label),
            ));
        }
        if entry.mapped {
            return Err(DeviceError::operation(
                "map_buffer",
                format!("{} is already mapped", entry.label),
            ));
        }
        entry.mapped = true;
        Ok(())
    }

    fn write_mapped(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> DeviceResult<()> {
        let entry = self.buffer_mut(buffer, "write_mapped")?;
        if !entry.mapped {
            return Err(DeviceError::operation(
                "write_mapped",
                format!("{} is not mapped", entry.label),
            ));
        }
        let start = offset as usize;
        let end = start + data.len();
        if end > entry.bytes.len() {
            return Err(DeviceError::operation(
                "write_mapped",
                format!(
                    "write of {} bytes at offset {} overruns {} ({} bytes)",
                    data.len(),
                    offset,
                    entry.label,
                    entry.bytes.len()
                ),
            ));
        }
        entry.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.get_mut(buffer.0 as usize) {
            entry.mapped = false;
        }
    }

    fn draw(&mut self, call: &DrawCall) -> DeviceResult<()> {
        self.check_target(call.color_target, TargetKind::Color)?;
        self.check_target(call.depth_target, TargetKind::Depth)?;

        let constants = self.buffer(call.constants, "draw")?;
        if constants.usage != BufferUsage::Constant {
            return Err(DeviceError::operation(
                "draw",
                format!("{} is not a constant buffer", constants.label),
            ));
        }

        log::trace!(
            "HeadlessDevice: draw {} indices with constants {:?}",
            call.index_count,
            call.constants
        );
        self.frame_reads.push(call.constants);
        self.commands.push(DeviceCommand::Draw(*call));
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> DeviceResult<()> {
        if std::mem::take(&mut self.fail_next_present) {
            return Err(DeviceError::operation("present", "device removed"));
        }

        // The submitted frame joins the queue; the oldest frames retire once
        // the queue exceeds the device latency.
        self.in_flight.push_back(std::mem::take(&mut self.frame_reads));
        while self.in_flight.len() > self.max_frame_latency {
            self.in_flight.pop_front();
        }

        log::trace!("HeadlessDevice: present (sync interval {})", sync_interval);
        self.commands.push(DeviceCommand::Present { sync_interval });
        Ok(())
    }
}
