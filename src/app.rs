use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

use crate::config::ViewerConfig;
use crate::gfx::{device::WgpuDevice, rendering::RenderEngine, scene::Mesh};

/// Windowed mesh viewer.
///
/// The mesh is loaded by the caller before the application exists, so a bad
/// file never opens a window.
pub struct ViewerApp {
    event_loop: Option<EventLoop<()>>,
    app_state: AppState,
}

struct AppState {
    config: ViewerConfig,
    mesh: Mesh,
    window: Option<Arc<Window>>,
    render_engine: Option<RenderEngine<WgpuDevice>>,
    last_frame: Instant,
    frames_rendered: u64,
    /// First fatal error; stops the event loop and is returned from `run`.
    error: Option<anyhow::Error>,
}

impl ViewerApp {
    pub fn new(config: ViewerConfig, mesh: Mesh) -> anyhow::Result<Self> {
        let event_loop = EventLoop::new().context("failed to create event loop")?;

        Ok(Self {
            event_loop: Some(event_loop),
            app_state: AppState {
                config,
                mesh,
                window: None,
                render_engine: None,
                last_frame: Instant::now(),
                frames_rendered: 0,
                error: None,
            },
        })
    }

    /// Runs the event loop until the window closes or a frame fails.
    pub fn run(mut self) -> anyhow::Result<()> {
        let event_loop = self
            .event_loop
            .take()
            .context("event loop already consumed")?;
        event_loop.set_control_flow(ControlFlow::Poll);

        event_loop
            .run_app(&mut self.app_state)
            .context("event loop terminated abnormally")?;

        match self.app_state.error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl AppState {
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error) {
        log::error!("{:#}", err);
        if self.error.is_none() {
            self.error = Some(err);
        }
        event_loop.exit();
    }

    fn create_renderer(&mut self, window: Arc<Window>) -> anyhow::Result<()> {
        let PhysicalSize { width, height } = window.inner_size();

        let device = pollster::block_on(WgpuDevice::new(
            window.clone(),
            width,
            height,
            self.config.window.vsync,
        ))
        .context("failed to initialize the graphics device")?;

        let mut render_engine = RenderEngine::new(device, &self.mesh, &self.config)
            .context("failed to upload mesh and frame resources")?;
        render_engine
            .resize(width, height)
            .context("failed to create render targets")?;

        self.window = Some(window);
        self.render_engine = Some(render_engine);
        self.last_frame = Instant::now();
        Ok(())
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };

        let now = Instant::now();
        let dt = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        if let Err(err) = render_engine.render_frame(dt) {
            self.fail(event_loop, anyhow::Error::new(err).context("frame failed"));
            return;
        }

        self.frames_rendered += 1;
        if self
            .config
            .max_frames
            .is_some_and(|max| self.frames_rendered >= max)
        {
            log::info!("Rendered {} frames, exiting", self.frames_rendered);
            event_loop.exit();
        }
    }
}

impl ApplicationHandler for AppState {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let attributes = WindowAttributes::default()
            .with_title(self.config.window.title.clone())
            .with_inner_size(LogicalSize::new(
                self.config.window.width,
                self.config.window.height,
            ));

        let window = match event_loop.create_window(attributes) {
            Ok(window) => Arc::new(window),
            Err(err) => {
                self.fail(event_loop, anyhow::Error::new(err).context("failed to create window"));
                return;
            }
        };

        if let Err(err) = self.create_renderer(window) {
            self.fail(event_loop, err);
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        let Some(render_engine) = self.render_engine.as_mut() else {
            return;
        };

        if render_engine
            .scene_mut()
            .camera_manager
            .process_event(&event)
        {
            return;
        }

        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(KeyCode::Escape),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            }
            | WindowEvent::CloseRequested => {
                event_loop.exit();
            }
            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Err(err) = render_engine.resize(width, height) {
                    self.fail(event_loop, anyhow::Error::new(err).context("resize failed"));
                }
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => (),
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(ref window) = self.window {
            window.request_redraw();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(render_engine) = self.render_engine.as_mut() {
            render_engine.release_targets();
        }
    }
}
