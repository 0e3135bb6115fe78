use std::path::Path;

use image::DynamicImage;

use crate::drawing::{draw_layout_mut, OverlayConfig};
use crate::{GridLayout, PatchError};

/// Saves the image with the planned patch grid drawn on it.
///
/// # Errors
/// Returns [`PatchError`] if encoding or writing fails.
///
/// # Examples
///
/// ```rust
/// use image::DynamicImage;
/// use patchgrid::{debug::save_image_with_layout, drawing::OverlayConfig, plan, ImageDimensions};
///
/// let image = DynamicImage::new_rgb8(120, 80);
/// let layout = plan(ImageDimensions::from(&image), 6);
/// # let dir = tempfile::tempdir().unwrap();
/// # let output_path = dir.path().join("preview.png");
/// save_image_with_layout(&image, &layout, &output_path, &OverlayConfig::default()).unwrap();
/// ```
pub fn save_image_with_layout(
    image: &DynamicImage,
    layout: &GridLayout,
    output_path: impl AsRef<Path>,
    config: &OverlayConfig,
) -> Result<(), PatchError> {
    let mut rgba = image.to_rgba8();
    draw_layout_mut(&mut rgba, layout, config);
    rgba.save(output_path).map_err(PatchError::from)
}
