//! Viewer configuration and command line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Window and presentation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
    /// Present with vertical sync (sync interval 1) or immediately (0).
    pub vsync: bool,
}

/// The displayed object.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectConfig {
    pub position: [f32; 3],
    pub scale: f32,
    /// Degrees per second about +Y.
    pub rotation_speed: f32,
    pub color: [f32; 3],
    pub shininess: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightConfig {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

/// Orbit camera settings. Angles are in degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub distance: f32,
    pub polar: f32,
    pub azimuth: f32,
    pub rotate_rate: f32,
    pub min_polar: f32,
    pub max_polar: f32,
    pub fovy: f32,
    pub znear: f32,
    pub zfar: f32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub object: ObjectConfig,
    pub light: LightConfig,
    pub camera: CameraConfig,
    /// Exit after this many presented frames.
    pub max_frames: Option<u64>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "weldview".to_string(),
            width: 1280,
            height: 720,
            vsync: true,
        }
    }
}

impl Default for ObjectConfig {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 0.0],
            scale: 0.7,
            rotation_speed: 10.0,
            color: [0.6, 0.7, 0.1],
            shininess: 256.0,
        }
    }
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            position: [1.0, 3.0, 0.0],
            color: [1.0, 1.0, 1.0],
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            distance: 5.0,
            polar: 60.0,
            azimuth: 0.0,
            rotate_rate: 7.0,
            min_polar: 5.0,
            max_polar: 175.0,
            fovy: 60.0,
            znear: 0.25,
            zfar: 1000.0,
        }
    }
}

impl WindowConfig {
    pub fn sync_interval(&self) -> u32 {
        if self.vsync {
            1
        } else {
            0
        }
    }
}

/// weldview command line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "weldview",
    about = "View a Wavefront OBJ mesh with vertex welding and double-buffered frame constants",
    long_about = "Loads a triangle mesh from a .obj file, welds duplicate (position, normal) \
        corners into an indexed mesh and renders it with a slowly rotating object and \
        an orbit camera.\n\n\
        Drag with the left mouse button to orbit. Set RUST_LOG=debug for load and \
        resize diagnostics.",
    version
)]
pub struct CliArgs {
    /// Path to the .obj mesh to display. Per-corner normals are required.
    pub mesh: PathBuf,

    /// Initial window width in pixels.
    #[arg(long)]
    pub width: Option<u32>,

    /// Initial window height in pixels.
    #[arg(long)]
    pub height: Option<u32>,

    /// Disable vertical sync (may cause tearing).
    #[arg(long)]
    pub no_vsync: bool,

    /// Uniform object scale.
    #[arg(long)]
    pub scale: Option<f32>,

    /// Exit after rendering N frames (useful for testing).
    #[arg(long)]
    pub max_frames: Option<u64>,
}

impl CliArgs {
    /// Overlays the arguments onto `config`.
    pub fn apply(&self, mut config: ViewerConfig) -> ViewerConfig {
        if let Some(width) = self.width {
            config.window.width = width;
        }
        if let Some(height) = self.height {
            config.window.height = height;
        }
        if self.no_vsync {
            config.window.vsync = false;
        }
        if let Some(scale) = self.scale {
            config.object.scale = scale;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        config
    }
}
