//! # Graphics Module
//!
//! All graphics functionality of the viewer.
//!
//! ## Architecture Overview
//!
//! - **Device** ([`device`]) - The [`GraphicsDevice`](device::GraphicsDevice) seam with
//!   a wgpu implementation and a recording headless one
//! - **Scene** ([`scene`]) - Mesh ingestion and per-frame object/light/camera state
//! - **Camera** ([`camera`]) - Orbit camera driven by left-button drags
//! - **Resources** ([`resources`]) - Frame constants, double-buffered constant stores,
//!   sized render targets
//! - **Rendering** ([`rendering`]) - The per-frame update, upload, draw and present sequence
//!
//! ## Usage
//!
//! ```no_run
//! use weldview::gfx::{device::HeadlessDevice, rendering::RenderEngine, scene::load_mesh};
//! use weldview::ViewerConfig;
//!
//! let mesh = load_mesh("cube.obj")?;
//! let mut engine = RenderEngine::new(HeadlessDevice::new(), &mesh, &ViewerConfig::default())?;
//! engine.resize(800, 600)?;
//! engine.render_frame(1.0 / 60.0)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod camera;
pub mod device;
pub mod rendering;
pub mod resources;
pub mod scene;

pub use rendering::RenderEngine;
