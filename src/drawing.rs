//! This module draws planned patch boundaries on images.
//! It is feature-gated under the `drawing` feature and requires the `image` and `imageproc` crates.
//!
//! # Examples
//!
//! ```rust
//! use image::DynamicImage;
//! use patchgrid::{drawing::*, plan, ImageDimensions};
//!
//! let image = DynamicImage::new_rgb8(120, 80);
//! let layout = plan(ImageDimensions::from(&image), 6);
//!
//! let mut rgba = image.to_rgba8();
//! draw_layout_mut(&mut rgba, &layout, &OverlayConfig::default());
//! ```

use image::{Rgba, RgbaImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::GridLayout;

/// Configuration for the patch-grid overlay.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Color of the per-patch cell outlines.
    pub cell_color: Rgba<u8>,
    /// Color of the outline around the covered region.
    pub boundary_color: Rgba<u8>,
    /// Thickness of the outlines, in pixels.
    pub line_thickness: u32,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        OverlayConfig {
            cell_color: Rgba([255, 0, 0, 255]),     // Red
            boundary_color: Rgba([0, 0, 255, 255]), // Blue
            line_thickness: 2,
        }
    }
}

/// Draws the layout's patch cells and the boundary of the covered region
/// onto the image. Pixels outside the covered region are left untouched,
/// visualizing what extraction will discard.
pub fn draw_layout_mut(image: &mut RgbaImage, layout: &GridLayout, config: &OverlayConfig) {
    let edge = layout.edge;
    if edge == 0 {
        return;
    }
    for row in 0..layout.rows {
        for column in 0..layout.columns {
            outline_rect(
                image,
                column * edge,
                row * edge,
                edge,
                edge,
                config.line_thickness,
                config.cell_color,
            );
        }
    }
    outline_rect(
        image,
        0,
        0,
        layout.columns * edge,
        layout.rows * edge,
        config.line_thickness,
        config.boundary_color,
    );
}

/// Draws nested hollow rectangles to emulate line thickness.
fn outline_rect(
    image: &mut RgbaImage,
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    thickness: u32,
    color: Rgba<u8>,
) {
    for inset in 0..thickness {
        let shrink = inset * 2;
        if width <= shrink || height <= shrink {
            break;
        }
        let rect =
            Rect::at((x + inset) as i32, (y + inset) as i32).of_size(width - shrink, height - shrink);
        draw_hollow_rect_mut(image, rect, color);
    }
}
