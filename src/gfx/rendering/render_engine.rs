//! Frame driver for the mesh viewer
//!
//! Owns the graphics device together with everything that lives on it: the
//! immutable mesh buffers, the double-buffered frame constants and the sized
//! render targets. Each frame runs `update` → `draw` → `present`.

use crate::config::ViewerConfig;
use crate::error::{DeviceError, DeviceResult};
use crate::gfx::{
    device::{BufferDescriptor, BufferHandle, BufferUsage, DrawCall, GraphicsDevice},
    resources::{FrameResources, SizedRenderTargets},
    scene::{Mesh, Scene},
};

/// Device copies of a welded mesh. Written once at creation.
#[derive(Debug, Clone, Copy)]
pub struct MeshBuffers {
    pub vertex_buffer: BufferHandle,
    pub index_buffer: BufferHandle,
    pub index_count: u32,
}

impl MeshBuffers {
    pub fn upload<D: GraphicsDevice>(device: &mut D, mesh: &Mesh) -> DeviceResult<Self> {
        let index_count = u32::try_from(mesh.index_count()).map_err(|_| {
            DeviceError::allocation(
                "index buffer",
                format!("{} indices exceed a 32-bit draw", mesh.index_count()),
            )
        })?;

        let vertex_buffer = device.create_buffer(&BufferDescriptor::with_contents(
            "Mesh Vertices",
            BufferUsage::Vertex,
            bytemuck::cast_slice(mesh.vertices()),
        ))?;
        let index_buffer = device.create_buffer(&BufferDescriptor::with_contents(
            "Mesh Indices",
            BufferUsage::Index,
            bytemuck::cast_slice(mesh.indices()),
        ))?;

        Ok(Self {
            vertex_buffer,
            index_buffer,
            index_count,
        })
    }
}

/// Core rendering engine driving one mesh through a [`GraphicsDevice`]
pub struct RenderEngine<D: GraphicsDevice> {
    device: D,
    scene: Scene,
    mesh: MeshBuffers,
    frame_resources: FrameResources,
    targets: SizedRenderTargets,
    sync_interval: u32,
}

impl<D: GraphicsDevice> RenderEngine<D> {
    /// Uploads `mesh` and allocates the frame constants.
    ///
    /// Targets start out pending; call [`RenderEngine::resize`] with the output
    /// size before the first frame.
    pub fn new(mut device: D, mesh: &Mesh, config: &ViewerConfig) -> DeviceResult<Self> {
        let mesh_buffers = MeshBuffers::upload(&mut device, mesh)?;
        let frame_resources = FrameResources::initialize(&mut device)?;
        let scene = Scene::new(config, &mesh.bounds());

        log::info!(
            "{} device ready: {} vertices, {} indices uploaded",
            device.name(),
            mesh.vertex_count(),
            mesh.index_count()
        );

        Ok(Self {
            device,
            scene,
            mesh: mesh_buffers,
            frame_resources,
            targets: SizedRenderTargets::new(),
            sync_interval: config.window.sync_interval(),
        })
    }

    /// Recreates the render targets for a new output size. Zero sizes are
    /// accepted and suspend drawing.
    pub fn resize(&mut self, width: u32, height: u32) -> DeviceResult<()> {
        self.targets.resize(&mut self.device, width, height)
    }

    /// Advances the scene by `dt` seconds and stages its constants.
    pub fn update(&mut self, dt: f32) -> DeviceResult<()> {
        let constants = self.scene.update(dt, self.targets.aspect_ratio());
        self.frame_resources
            .write_staging(&mut self.device, &constants)
    }

    /// Copies the staged constants into this frame's store, then draws the
    /// mesh reading that store. Does nothing while the output is not
    /// displayable.
    pub fn draw(&mut self) -> DeviceResult<()> {
        let Some((color_target, depth_target)) = self.targets.targets() else {
            return Ok(());
        };

        let constants = self.frame_resources.record_upload(&mut self.device)?;
        self.device.draw(&DrawCall {
            vertex_buffer: self.mesh.vertex_buffer,
            index_buffer: self.mesh.index_buffer,
            index_count: self.mesh.index_count,
            constants,
            color_target,
            depth_target,
            viewport: self.targets.viewport(),
        })
    }

    /// Presents the frame and rotates to the next constant store. Does
    /// nothing while the output is not displayable.
    pub fn present(&mut self) -> DeviceResult<()> {
        if !self.targets.is_ready() {
            return Ok(());
        }
        self.device.present(self.sync_interval)?;
        self.frame_resources.advance();
        Ok(())
    }

    /// Runs a full frame.
    pub fn render_frame(&mut self, dt: f32) -> DeviceResult<()> {
        self.update(dt)?;
        self.draw()?;
        self.present()
    }

    /// Releases the render targets ahead of shutdown.
    pub fn release_targets(&mut self) {
        self.targets.release(&mut self.device);
    }

    pub fn set_sync_interval(&mut self, sync_interval: u32) {
        self.sync_interval = sync_interval;
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn mesh_buffers(&self) -> &MeshBuffers {
        &self.mesh
    }

    pub fn frame_resources(&self) -> &FrameResources {
        &self.frame_resources
    }

    pub fn render_targets(&self) -> &SizedRenderTargets {
        &self.targets
    }
}
