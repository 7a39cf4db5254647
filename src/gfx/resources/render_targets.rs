use crate::error::DeviceResult;
use crate::gfx::device::{GraphicsDevice, TargetHandle, TargetKind, Viewport};

/// Color and depth targets sized to the output.
///
/// Both targets are valid for the stored dimensions or neither exists. A zero
/// width or height leaves the targets pending, which makes drawing a no-op
/// until the next non-zero resize.
#[derive(Debug, Default)]
pub struct SizedRenderTargets {
    width: u32,
    height: u32,
    targets: Option<(TargetHandle, TargetHandle)>,
}

impl SizedRenderTargets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Brings the targets in line with `(width, height)`.
    ///
    /// The back buffer is only reallocated when the dimensions change. The
    /// color view and depth buffer are recreated on every call.
    pub fn resize<D: GraphicsDevice>(
        &mut self,
        device: &mut D,
        width: u32,
        height: u32,
    ) -> DeviceResult<()> {
        self.release(device);

        let displayable = width > 0 && height > 0;
        if (width, height) != (self.width, self.height) {
            if displayable {
                log::info!("Reallocating back buffer at {}x{}", width, height);
                device.resize_back_buffer(width, height)?;
            }
            self.width = width;
            self.height = height;
        }

        if !displayable {
            log::debug!("Output is {}x{}, not displayable", width, height);
            return Ok(());
        }

        let color = device.create_sized_target(width, height, TargetKind::Color)?;
        let depth = match device.create_sized_target(width, height, TargetKind::Depth) {
            Ok(depth) => depth,
            Err(err) => {
                device.release_target(color);
                return Err(err);
            }
        };
        self.targets = Some((color, depth));
        Ok(())
    }

    /// Releases both targets. The stored dimensions are kept.
    pub fn release<D: GraphicsDevice>(&mut self, device: &mut D) {
        if let Some((color, depth)) = self.targets.take() {
            device.release_target(color);
            device.release_target(depth);
        }
    }

    pub fn is_ready(&self) -> bool {
        self.targets.is_some()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// `(color, depth)` when both are valid.
    pub fn targets(&self) -> Option<(TargetHandle, TargetHandle)> {
        self.targets
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::full(self.width, self.height)
    }

    /// Width over height. A zero dimension reports 1 so the projection stays
    /// valid while the output is not displayable.
    pub fn aspect_ratio(&self) -> f32 {
        if self.width == 0 || self.height == 0 {
            return 1.0;
        }
        self.width as f32 / self.height as f32
    }
}
