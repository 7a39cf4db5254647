// src/lib.rs
//! weldview
//!
//! An OBJ mesh viewer built on wgpu and winit. Meshes are welded into an
//! indexed vertex buffer at load time; per-frame constants reach the GPU
//! through a staging store and two alternating constant stores.

pub mod app;
pub mod config;
pub mod error;
pub mod gfx;

// Re-export main types for convenience
pub use app::ViewerApp;
pub use config::ViewerConfig;
pub use error::{DeviceError, MeshError};
