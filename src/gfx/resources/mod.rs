//! GPU-side frame resources: constant storage, sized targets and textures.

pub mod frame_constants;
pub mod frame_resources;
pub mod render_targets;
pub mod texture_resource;

pub use frame_constants::FrameConstants;
pub use frame_resources::{aligned_size, FrameResources, FRAMES_IN_FLIGHT};
pub use render_targets::SizedRenderTargets;
pub use texture_resource::TextureResource;
