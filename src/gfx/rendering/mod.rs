// src/gfx/rendering/mod.rs
//! Core rendering functionality
//!
//! Drives the per-frame update, constant upload, draw and present sequence.

pub mod render_engine;

// Re-export main types
pub use render_engine::{MeshBuffers, RenderEngine};
