//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use weldview::gfx::{
    device::HeadlessDevice,
    rendering::RenderEngine,
    scene::{load_mesh_from_bytes, Mesh},
};
use weldview::ViewerConfig;

/// Cube with one normal per face: 8 positions, 6 normals, 12 triangles.
pub const CUBE_OBJ: &str = "\
o Cube
v -1.0 -1.0  1.0
v  1.0 -1.0  1.0
v  1.0  1.0  1.0
v -1.0  1.0  1.0
v -1.0 -1.0 -1.0
v  1.0 -1.0 -1.0
v  1.0  1.0 -1.0
v -1.0  1.0 -1.0
vn  0.0  0.0  1.0
vn  0.0  0.0 -1.0
vn  1.0  0.0  0.0
vn -1.0  0.0  0.0
vn  0.0  1.0  0.0
vn  0.0 -1.0  0.0
f 1//1 2//1 3//1
f 1//1 3//1 4//1
f 6//2 5//2 8//2
f 6//2 8//2 7//2
f 2//3 6//3 7//3
f 2//3 7//3 3//3
f 5//4 1//4 4//4
f 5//4 4//4 8//4
f 4//5 3//5 7//5
f 4//5 7//5 8//5
f 5//6 6//6 2//6
f 5//6 2//6 1//6
";

pub fn cube() -> Mesh {
    load_mesh_from_bytes(CUBE_OBJ.as_bytes()).expect("cube fixture parses")
}

pub fn engine_with(device: HeadlessDevice) -> RenderEngine<HeadlessDevice> {
    RenderEngine::new(device, &cube(), &ViewerConfig::default()).expect("engine starts")
}

pub fn engine() -> RenderEngine<HeadlessDevice> {
    engine_with(HeadlessDevice::new())
}

/// Writes `contents` to a unique file in the temp directory.
pub fn temp_file(name: &str, contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!("weldview-{}-{}", std::process::id(), name));
    std::fs::write(&path, contents).expect("temp file is writable");
    path
}
