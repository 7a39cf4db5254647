//! # Scene Module
//!
//! Mesh ingestion and the per-frame CPU state of the viewer.
//!
//! ## Key Components
//!
//! - [`load_mesh`] - Reads an OBJ file and welds it into an indexed [`Mesh`]
//! - [`Mesh`] / [`Bounds`] - Welded vertices, 32-bit indices and the bounding box
//! - [`Vertex3D`] - Interleaved position/normal vertex, also the welding key
//! - [`Scene`] - Object, light and orbit camera advanced by `update(dt)`
//!
//! ## Usage
//!
//! ```no_run
//! use weldview::gfx::scene::load_mesh;
//!
//! let mesh = load_mesh("assets/cube.obj")?;
//! println!("{} vertices, {} indices", mesh.vertex_count(), mesh.index_count());
//! # Ok::<(), weldview::error::MeshError>(())
//! ```

pub mod mesh;
pub mod scene;
pub mod vertex;

// Re-export main types
pub use mesh::{load_mesh, load_mesh_from_bytes, Bounds, Mesh, VertexWelder};
pub use scene::{Light, ObjectProperties, Scene};
pub use vertex::Vertex3D;
