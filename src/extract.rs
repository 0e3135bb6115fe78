//! Cropping and persistence of square patches from a source image.

use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};

use image::{imageops::FilterType, DynamicImage, GenericImageView};
use tracing::*;

use crate::{plan, GridLayout, ImageDimensions, PatchError};

/// Lazy row-major iterator over the square patches of a layout.
///
/// Each item is `(row, column, patch)`. Cells at the image's trailing edge
/// are clipped to the image bounds and resized back to `edge x edge` with
/// Lanczos resampling, so every yielded patch is exactly square. Emission
/// stops at `cap` patches even when the layout's grid holds more.
///
/// Layout cells are assumed to lie within the image; layouts produced by
/// [`plan`] always do.
///
/// # Example
/// ```
/// use image::DynamicImage;
/// use patchgrid::{plan, ImageDimensions, Patches};
///
/// let image = DynamicImage::new_rgb8(120, 80);
/// let layout = plan(ImageDimensions::from(&image), 6);
/// let patches: Vec<_> = Patches::new(&image, layout, 6).collect();
/// assert_eq!(patches.len(), 6);
/// ```
pub struct Patches<'a> {
    image: &'a DynamicImage,
    layout: GridLayout,
    cap: u32,
    index: u32,
}

impl<'a> Patches<'a> {
    pub fn new(image: &'a DynamicImage, layout: GridLayout, cap: u32) -> Self {
        Self {
            image,
            layout,
            cap,
            index: 0,
        }
    }

    /// Number of patches the iterator will yield in total.
    pub fn total(&self) -> u32 {
        self.layout.patch_count().min(self.cap)
    }
}

impl Iterator for Patches<'_> {
    type Item = (u32, u32, DynamicImage);

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.total() {
            return None;
        }
        let (width, height) = self.image.dimensions();
        let row = self.index / self.layout.columns;
        let column = self.index % self.layout.columns;
        self.index += 1;

        let edge = self.layout.edge;
        let left = column * edge;
        let top = row * edge;
        let right = (left + edge).min(width);
        let bottom = (top + edge).min(height);

        let mut patch = self.image.crop_imm(left, top, right - left, bottom - top);
        if patch.width() != edge || patch.height() != edge {
            trace!(
                "Resizing clipped patch ({}, {}) from {}x{} to {}x{}",
                row,
                column,
                patch.width(),
                patch.height(),
                edge,
                edge
            );
            patch = patch.resize_exact(edge, edge, FilterType::Lanczos3);
        }
        Some((row, column, patch))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.total() - self.index) as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Patches<'_> {}

/// Divides the image at `image_path` into `target` square patches and writes
/// them as PNG files named `<stem>_patch_<row>_<column>.png`.
///
/// The output directory defaults to the image's own directory and is created
/// if missing. The target count is a hard emission cap: no call writes more
/// than `target` files, even when the chosen grid holds more cells. Returns
/// the number of patches written.
///
/// # Errors
/// [`PatchError::NotFound`] when `image_path` does not exist (checked before
/// any directory is created), [`PatchError::InvalidTarget`] for a zero
/// target, [`PatchError::InvalidDimensions`] when the image cannot hold a
/// single patch, and codec/storage errors propagated from the underlying
/// libraries.
///
/// # Example
/// ```no_run
/// use patchgrid::extract_patches;
///
/// let written = extract_patches("drone_01.JPG", 9, None)?;
/// assert_eq!(written, 9);
/// # Ok::<(), patchgrid::PatchError>(())
/// ```
pub fn extract_patches(
    image_path: impl AsRef<Path>,
    target: u32,
    output_dir: Option<&Path>,
) -> Result<usize, PatchError> {
    let image_path = image_path.as_ref();
    if !image_path.exists() {
        return Err(PatchError::NotFound {
            path: image_path.to_path_buf(),
        });
    }
    if target == 0 {
        return Err(PatchError::InvalidTarget(target));
    }

    let image = image::open(image_path)?;
    let dims = ImageDimensions::from(&image);

    let output_dir = match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => match image_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        },
    };
    fs::create_dir_all(&output_dir)?;

    let base_name = image_path
        .file_stem()
        .unwrap_or_else(|| OsStr::new("patch"))
        .to_string_lossy();

    let layout = plan(dims, target);
    if layout.edge == 0 {
        return Err(PatchError::InvalidDimensions {
            width: dims.width,
            height: dims.height,
        });
    }
    debug!(
        "Planned {}x{} grid with edge {} ({:?}) for target {}",
        layout.rows, layout.columns, layout.edge, layout.mode, target
    );

    let mut written = 0;
    for (row, column, patch) in Patches::new(&image, layout, target) {
        let patch_path = output_dir.join(format!("{base_name}_patch_{row}_{column}.png"));
        patch.save(&patch_path)?;
        trace!("Wrote {}", patch_path.display());
        written += 1;
    }

    info!(
        "Created {} square patches of {}x{} from {}x{} image",
        written, layout.edge, layout.edge, dims.width, dims.height
    );
    Ok(written)
}

/// Unit tests for patch extraction.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayoutMode;
    use image::{Rgb, RgbImage};
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use test_case::test_case;

    fn write_gradient_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
        let image = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        });
        let path = dir.join(name);
        image.save(&path).unwrap();
        path
    }

    #[test]
    fn missing_image_reports_not_found_without_creating_output() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.png");
        let output = dir.path().join("patches");

        let err = extract_patches(&missing, 9, Some(&output)).unwrap_err();
        assert!(matches!(err, PatchError::NotFound { .. }));
        assert!(err.to_string().contains("absent.png"));
        assert!(!output.exists());
    }

    #[test]
    fn zero_target_is_rejected() {
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "source.png", 100, 100);

        let err = extract_patches(&source, 0, Some(dir.path())).unwrap_err();
        assert!(matches!(err, PatchError::InvalidTarget(0)));
    }

    #[test]
    fn images_too_small_for_a_patch_are_rejected() {
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "tiny.png", 2, 2);

        let err = extract_patches(&source, 5, Some(dir.path())).unwrap_err();
        assert!(matches!(
            err,
            PatchError::InvalidDimensions {
                width: 2,
                height: 2
            }
        ));
    }

    #[test_case(1000, 1000, 9, 333, 3, 3 ; "square nine")]
    #[test_case(1200, 800, 6, 400, 2, 3 ; "landscape six")]
    #[test_case(50, 50, 9, 16, 3, 3 ; "small nine")]
    fn writes_square_patches_at_the_layout_edge(
        width: u32,
        height: u32,
        target: u32,
        edge: u32,
        rows: u32,
        columns: u32,
    ) {
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "source.png", width, height);
        let output = dir.path().join("patches");

        let written = extract_patches(&source, target, Some(&output)).unwrap();
        assert_eq!(written, target as usize);

        for row in 0..rows {
            for column in 0..columns {
                let patch =
                    image::open(output.join(format!("source_patch_{row}_{column}.png"))).unwrap();
                assert_eq!(patch.dimensions(), (edge, edge));
            }
        }
    }

    #[test]
    fn fallback_grids_truncate_row_major_at_the_target() {
        // 6x100 with target 7 has no viable arrangement; the 3x3 fallback
        // holds nine cells but only seven may be emitted.
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "strip.png", 6, 100);
        let output = dir.path().join("patches");

        let layout = plan(ImageDimensions::new(6, 100), 7);
        assert_eq!(layout.mode, LayoutMode::Fallback);

        let written = extract_patches(&source, 7, Some(&output)).unwrap();
        assert_eq!(written, 7);

        let produced: Vec<_> = (0..3)
            .flat_map(|row| (0..3).map(move |column| (row, column)))
            .filter(|(row, column)| {
                output
                    .join(format!("strip_patch_{row}_{column}.png"))
                    .exists()
            })
            .collect();
        assert_eq!(
            produced,
            vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (2, 0)]
        );
        assert_eq!(fs::read_dir(&output).unwrap().count(), 7);

        let patch = image::open(output.join("strip_patch_0_0.png")).unwrap();
        assert_eq!(patch.dimensions(), (2, 2));
    }

    #[test]
    fn patch_pixels_come_from_the_matching_quadrant() {
        let colors = [
            Rgb([255u8, 0, 0]),
            Rgb([0u8, 255, 0]),
            Rgb([0u8, 0, 255]),
            Rgb([255u8, 255, 0]),
        ];
        let image = RgbImage::from_fn(100, 100, |x, y| {
            colors[((y >= 50) as usize) * 2 + ((x >= 50) as usize)]
        });
        let dir = tempdir().unwrap();
        let source = dir.path().join("quadrants.png");
        image.save(&source).unwrap();
        let output = dir.path().join("patches");

        let written = extract_patches(&source, 4, Some(&output)).unwrap();
        assert_eq!(written, 4);

        for row in 0..2u32 {
            for column in 0..2u32 {
                let patch =
                    image::open(output.join(format!("quadrants_patch_{row}_{column}.png")))
                        .unwrap()
                        .to_rgb8();
                assert_eq!(patch.dimensions(), (50, 50));
                let expected = colors[(row * 2 + column) as usize];
                assert_eq!(*patch.get_pixel(0, 0), expected);
                assert_eq!(*patch.get_pixel(49, 49), expected);
            }
        }
    }

    #[test]
    fn repeated_extraction_is_byte_identical() {
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "source.png", 120, 80);
        let output = dir.path().join("patches");

        extract_patches(&source, 6, Some(&output)).unwrap();
        let first: Vec<_> = (0..2)
            .flat_map(|row| (0..3).map(move |column| (row, column)))
            .map(|(row, column)| {
                fs::read(output.join(format!("source_patch_{row}_{column}.png"))).unwrap()
            })
            .collect();

        extract_patches(&source, 6, Some(&output)).unwrap();
        for (index, (row, column)) in (0..2)
            .flat_map(|row| (0..3).map(move |column| (row, column)))
            .enumerate()
        {
            let bytes =
                fs::read(output.join(format!("source_patch_{row}_{column}.png"))).unwrap();
            assert_eq!(bytes, first[index]);
        }
    }

    #[test]
    fn output_defaults_to_the_image_directory() {
        let dir = tempdir().unwrap();
        let source = write_gradient_image(dir.path(), "source.png", 100, 100);

        let written = extract_patches(&source, 4, None).unwrap();
        assert_eq!(written, 4);
        assert!(dir.path().join("source_patch_0_0.png").exists());
        assert!(dir.path().join("source_patch_1_1.png").exists());
    }

    #[test]
    fn patches_normalize_clipped_cells_to_the_edge() {
        // A hand-built layout whose last column runs past the image: the
        // clipped 200-wide crop is resized back up to the full edge.
        let image = DynamicImage::ImageRgb8(RgbImage::from_fn(1000, 400, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 0])
        }));
        let layout = GridLayout {
            rows: 1,
            columns: 3,
            edge: 400,
            mode: LayoutMode::Exact,
        };

        let patches: Vec<_> = Patches::new(&image, layout, 3).collect();
        assert_eq!(patches.len(), 3);
        for (_, _, patch) in &patches {
            assert_eq!((patch.width(), patch.height()), (400, 400));
        }
    }

    #[test]
    fn the_cap_limits_emission_below_the_grid_size() {
        let image = DynamicImage::new_rgb8(90, 90);
        let layout = plan(ImageDimensions::from(&image), 9);
        assert_eq!(layout.patch_count(), 9);

        let patches = Patches::new(&image, layout, 4);
        assert_eq!(patches.total(), 4);
        let indices: Vec<_> = patches.map(|(row, column, _)| (row, column)).collect();
        assert_eq!(indices, vec![(0, 0), (0, 1), (0, 2), (1, 0)]);
    }
}
