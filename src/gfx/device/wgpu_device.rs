//! [`GraphicsDevice`] on top of wgpu and a window surface.
//!
//! Copies and draws are recorded into one command encoder per frame, which is
//! submitted at [`GraphicsDevice::present`]. The color target is a logical
//! handle to the swap chain; the actual surface texture is acquired by the
//! first draw of a frame.

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use crate::error::{DeviceError, DeviceResult};
use crate::gfx::resources::{FrameConstants, TextureResource};
use crate::gfx::scene::Vertex3D;

use super::{
    BufferDescriptor, BufferHandle, BufferUsage, DrawCall, GraphicsDevice, TargetHandle,
    TargetKind,
};

const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 0.025,
    g: 0.025,
    b: 0.025,
    a: 1.0,
};

struct WgpuBuffer {
    label: String,
    buffer: wgpu::Buffer,
    usage: BufferUsage,
    /// Constant stores carry their own bind group.
    bind_group: Option<wgpu::BindGroup>,
    mapped: bool,
}

enum WgpuTarget {
    BackBuffer,
    Depth(TextureResource),
}

pub struct WgpuDevice {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    surface_configured: bool,
    present_modes: Vec<wgpu::PresentMode>,
    /// sRGB view of the surface texture used as the color attachment.
    view_format: wgpu::TextureFormat,

    pipeline: wgpu::RenderPipeline,
    constants_layout: wgpu::BindGroupLayout,

    buffers: Vec<WgpuBuffer>,
    targets: HashMap<u32, WgpuTarget>,
    next_target: u32,

    encoder: Option<wgpu::CommandEncoder>,
    frame: Option<wgpu::SurfaceTexture>,
}

impl WgpuDevice {
    /// Brings up the adapter, device and mesh pipeline for `window`.
    ///
    /// The surface is not configured until the first
    /// [`GraphicsDevice::resize_back_buffer`].
    pub async fn new(
        window: impl Into<wgpu::SurfaceTarget<'static>>,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> DeviceResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });
        let surface = instance
            .create_surface(window)
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;

        log::info!("Using adapter: {}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("WGPU Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults()
                    .using_resolution(adapter.limits()),
                memory_hints: wgpu::MemoryHints::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(|e| DeviceError::Initialization(e.to_string()))?;

        let surface_capabilities = surface.get_capabilities(&adapter);
        let format = surface_capabilities
            .formats
            .iter()
            .copied()
            .find(|f| !f.is_srgb())
            .or_else(|| surface_capabilities.formats.first().copied())
            .ok_or_else(|| {
                DeviceError::Initialization("surface reports no supported formats".to_string())
            })?;
        let view_format = format.add_srgb_suffix();
        let alpha_mode = surface_capabilities
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);
        let present_modes = surface_capabilities.present_modes.clone();

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: select_present_mode(&present_modes, if vsync { 1 } else { 0 }),
            alpha_mode,
            view_formats: if view_format != format {
                vec![view_format]
            } else {
                vec![]
            },
            // Two constant stores are only enough while at most one frame is queued
            desired_maximum_frame_latency: 1,
        };

        let constants_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Frame Constants Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(FrameConstants::SIZE),
                },
                count: None,
            }],
        });

        let pipeline = create_mesh_pipeline(&device, &constants_layout, view_format);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            surface_configured: false,
            present_modes,
            view_format,
            pipeline,
            constants_layout,
            buffers: Vec::new(),
            targets: HashMap::new(),
            next_target: 0,
            encoder: None,
            frame: None,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    /// Runs `create` inside an error scope and reports allocation or
    /// validation failures as [`DeviceError::Allocation`].
    fn allocate<T>(
        &self,
        resource: &'static str,
        create: impl FnOnce(&wgpu::Device) -> T,
    ) -> DeviceResult<T> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = create(&self.device);
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match out_of_memory.or(validation) {
            Some(err) => Err(DeviceError::allocation(resource, err.to_string())),
            None => Ok(value),
        }
    }

    fn buffer(&self, buffer: BufferHandle, operation: &'static str) -> DeviceResult<&WgpuBuffer> {
        lookup(&self.buffers, buffer, operation)
    }
}

impl GraphicsDevice for WgpuDevice {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn constant_alignment(&self) -> u64 {
        self.device.limits().min_uniform_buffer_offset_alignment as u64
    }

    fn create_buffer(&mut self, desc: &BufferDescriptor<'_>) -> DeviceResult<BufferHandle> {
        let usage = match desc.usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Constant => wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            BufferUsage::Staging => wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::COPY_SRC,
        };

        let buffer = match desc.contents {
            Some(contents) => self.allocate("buffer", |device| {
                device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(desc.label),
                    contents,
                    usage,
                })
            })?,
            None if desc.usage.is_immutable() => {
                return Err(DeviceError::operation(
                    "create_buffer",
                    format!("immutable buffer {} created without contents", desc.label),
                ));
            }
            None => self.allocate("buffer", |device| {
                device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(desc.label),
                    size: desc.size,
                    usage,
                    mapped_at_creation: false,
                })
            })?,
        };

        let bind_group = (desc.usage == BufferUsage::Constant).then(|| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(desc.label),
                layout: &self.constants_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: buffer.as_entire_binding(),
                }],
            })
        });

        log::debug!("Created {:?} buffer {:?} ({} bytes)", desc.usage, desc.label, desc.size);

        self.buffers.push(WgpuBuffer {
            label: desc.label.to_string(),
            buffer,
            usage: desc.usage,
            bind_group,
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

        // Any half-recorded frame refers to the old swap chain.
        self.frame = None;
        self.encoder = None;

        self.config.width = width;
        self.config.height = height;
        self.allocate("back buffer", |device| self.surface.configure(device, &self.config))?;
        self.surface_configured = true;
        Ok(())
    }

    fn create_sized_target(
        &mut self,
        width: u32,
        height: u32,
        kind: TargetKind,
    ) -> DeviceResult<TargetHandle> {
        let target = match kind {
            TargetKind::Color => {
                if !self.surface_configured
                    || (width, height) != (self.config.width, self.config.height)
                {
                    return Err(DeviceError::operation(
                        "create_sized_target",
                        format!("no {}x{} back buffer to view", width, height),
                    ));
                }
                WgpuTarget::BackBuffer
            }
            TargetKind::Depth => WgpuTarget::Depth(self.allocate("depth buffer", |device| {
                TextureResource::create_depth_texture(device, width, height, "Depth Buffer")
            })?),
        };

        let handle = TargetHandle(self.next_target);
        self.next_target += 1;
        self.targets.insert(handle.0, target);
        Ok(handle)
    }

    fn release_target(&mut self, target: TargetHandle) {
        self.targets.remove(&target.0);
    }

    fn copy_buffer(&mut self, dst: BufferHandle, src: BufferHandle) -> DeviceResult<()> {
        let Self {
            device,
            buffers,
            encoder,
            ..
        } = self;
        let source = lookup(buffers, src, "copy_buffer")?;
        if source.mapped {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!("source {} is still mapped", source.label),
            ));
        }
        let target = lookup(buffers, dst, "copy_buffer")?;
        let size = source.buffer.size();
        if target.buffer.size() < size {
            return Err(DeviceError::operation(
                "copy_buffer",
                format!("destination {} is smaller than {}", target.label, source.label),
            ));
        }

        encoder
            .get_or_insert_with(|| create_frame_encoder(device))
            .copy_buffer_to_buffer(&source.buffer, 0, &target.buffer, 0, size);
        log::trace!("Recorded copy {:?} -> {:?}", src, dst);
        Ok(())
    }

    /// Opens a write window on a staging buffer.
    ///
    /// Writes go through the queue and land before the next submission, after
    /// every earlier submission has read the buffer, so nothing here waits on
    /// the GPU.
    fn map_buffer(&mut self, buffer: BufferHandle) -> DeviceResult<()> {
        let entry = self.buffer(buffer, "map_buffer")?;
        if entry.usage != BufferUsage::Staging || entry.mapped {
            return Err(DeviceError::operation(
                "map_buffer",
                format!("{} cannot be mapped for writing", entry.label),
            ));
        }

        self.buffers[buffer.0 as usize].mapped = true;
        Ok(())
    }

    fn write_mapped(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> DeviceResult<()> {
        let entry = self.buffer(buffer, "write_mapped")?;
        if !entry.mapped {
            return Err(DeviceError::operation(
                "write_mapped",
                format!("{} is not mapped", entry.label),
            ));
        }
        let end = offset + data.len() as u64;
        if end > entry.buffer.size() {
            return Err(DeviceError::operation(
                "write_mapped",
                format!(
                    "write of {} bytes at offset {} overruns {}",
                    data.len(),
                    offset,
                    entry.label
                ),
            ));
        }
        if !is_copy_aligned(offset, data.len() as u64) {
            return Err(DeviceError::operation(
                "write_mapped",
                format!(
                    "write of {} bytes at offset {} is not {}-byte aligned",
                    data.len(),
                    offset,
                    wgpu::COPY_BUFFER_ALIGNMENT
                ),
            ));
        }
        if data.is_empty() {
            return Ok(());
        }

        self.queue.write_buffer(&entry.buffer, offset, data);
        Ok(())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        if let Some(entry) = self.buffers.get_mut(buffer.0 as usize) {
            entry.mapped = false;
        }
    }

    fn draw(&mut self, call: &DrawCall) -> DeviceResult<()> {
        if self.frame.is_none() {
            let frame = self
                .surface
                .get_current_texture()
                .map_err(|e| DeviceError::operation("draw", e.to_string()))?;
            self.frame = Some(frame);
        }

        let Self {
            device,
            view_format,
            pipeline,
            buffers,
            targets,
            encoder,
            frame,
            ..
        } = self;
        let Some(frame) = frame.as_ref() else {
            return Err(DeviceError::operation("draw", "no surface texture acquired"));
        };

        let vertices = lookup(buffers, call.vertex_buffer, "draw")?;
        let indices = lookup(buffers, call.index_buffer, "draw")?;
        let bind_group = lookup(buffers, call.constants, "draw")?
            .bind_group
            .as_ref()
            .ok_or_else(|| DeviceError::operation("draw", "constants are not a constant store"))?;

        if !matches!(targets.get(&call.color_target.0), Some(WgpuTarget::BackBuffer)) {
            return Err(DeviceError::operation("draw", "color target has been released"));
        }
        let Some(WgpuTarget::Depth(depth)) = targets.get(&call.depth_target.0) else {
            return Err(DeviceError::operation("draw", "depth target has been released"));
        };

        let color_view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("Back Buffer View"),
            format: Some(*view_format),
            ..Default::default()
        });

        let encoder = encoder.get_or_insert_with(|| create_frame_encoder(device));

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Mesh Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &color_view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &depth.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            let viewport = call.viewport;
            render_pass.set_viewport(
                viewport.x,
                viewport.y,
                viewport.width,
                viewport.height,
                viewport.min_depth,
                viewport.max_depth,
            );
            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, bind_group, &[]);
            render_pass.set_vertex_buffer(0, vertices.buffer.slice(..));
            render_pass.set_index_buffer(indices.buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..call.index_count, 0, 0..1);
        }

        log::trace!("Recorded draw of {} indices", call.index_count);
        Ok(())
    }

    fn present(&mut self, sync_interval: u32) -> DeviceResult<()> {
        if let Some(encoder) = self.encoder.take() {
            self.queue.submit(std::iter::once(encoder.finish()));
        }
        if let Some(frame) = self.frame.take() {
            frame.present();
        }

        let present_mode = select_present_mode(&self.present_modes, sync_interval);
        if present_mode != self.config.present_mode {
            log::debug!("Switching present mode to {:?}", present_mode);
            self.config.present_mode = present_mode;
            if self.surface_configured {
                self.surface.configure(&self.device, &self.config);
            }
        }
        Ok(())
    }
}

fn lookup<'a>(
    buffers: &'a [WgpuBuffer],
    buffer: BufferHandle,
    operation: &'static str,
) -> DeviceResult<&'a WgpuBuffer> {
    buffers
        .get(buffer.0 as usize)
        .ok_or_else(|| DeviceError::operation(operation, format!("unknown buffer {:?}", buffer)))
}

/// Queue writes need offset and size in whole copy units.
fn is_copy_aligned(offset: u64, len: u64) -> bool {
    offset % wgpu::COPY_BUFFER_ALIGNMENT == 0 && len % wgpu::COPY_BUFFER_ALIGNMENT == 0
}

fn create_frame_encoder(device: &wgpu::Device) -> wgpu::CommandEncoder {
    device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
        label: Some("Frame Encoder"),
    })
}

/// Fifo for vsync, otherwise the lowest latency mode the surface offers.
fn select_present_mode(available: &[wgpu::PresentMode], sync_interval: u32) -> wgpu::PresentMode {
    if sync_interval > 0 {
        return wgpu::PresentMode::Fifo;
    }
    [wgpu::PresentMode::Immediate, wgpu::PresentMode::Mailbox]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(wgpu::PresentMode::Fifo)
}

fn create_mesh_pipeline(
    device: &wgpu::Device,
    constants_layout: &wgpu::BindGroupLayout,
    color_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("Mesh Shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("shader.wgsl").into()),
    });

    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("Mesh Pipeline Layout"),
        bind_group_layouts: &[constants_layout],
        push_constant_ranges: &[],
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("Mesh Pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[Vertex3D::desc()],
            compilation_options: Default::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
            unclipped_depth: false,
        },
        depth_stencil: Some(wgpu::DepthStencilState {
            format: TextureResource::DEPTH_FORMAT,
            depth_write_enabled: true,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        multiview: None,
        cache: None,
    })
}
