//! This crate divides raster images into grids of square patches.
//! It uses the `image` and `imageproc` crates for image manipulation and `insta` for snapshot testing.
//!
//! The layout search lives here; cropping and persistence live in [`extract`].
//!
//! # Example
//! ```
//! use patchgrid::{plan, ImageDimensions, LayoutMode};
//!
//! let layout = plan(ImageDimensions::new(1200, 800), 6);
//! assert_eq!((layout.rows, layout.columns, layout.edge), (2, 3, 400));
//! assert_eq!(layout.mode, LayoutMode::Exact);
//! ```

/// Debug module for saving an image with its planned patch grid drawn on top.
#[cfg(feature = "drawing")]
pub mod debug;
/// Drawing of planned patch boundaries on images.
/// Feature-gated under the `drawing` feature and requires the `image` and `imageproc` crates.
#[cfg(feature = "drawing")]
pub mod drawing;
pub mod extract;

use std::path::PathBuf;

use image::{DynamicImage, GenericImageView};
use smallvec::SmallVec;
use thiserror::Error;
use tracing::*;

pub use extract::{extract_patches, Patches};

/// Default number of patches produced when the caller does not choose one.
pub const DEFAULT_TARGET_PATCHES: u32 = 9;
// Grid used both for the nine-patch default and as the degenerate fallback
const FALLBACK_GRID_SIDE: u32 = 3;
// Count mismatch dominates squareness when ranking candidates
const COUNT_MISMATCH_WEIGHT: u64 = 1000;
// Divisor pairs of realistic targets fit on the stack
const DEFAULT_CANDIDATE_CAPACITY: usize = 8;

/// A type alias for SmallVec sized for typical candidate counts.
pub type CandidateVec = SmallVec<[LayoutCandidate; DEFAULT_CANDIDATE_CAPACITY]>;

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("image file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("failed to decode or encode image: {0}")]
    Codec(#[from] image::ImageError),

    #[error("failed to prepare output: {0}")]
    Storage(#[from] std::io::Error),

    #[error("image too small to cut a single patch: width={width}, height={height}")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid target patch count: {0}")]
    InvalidTarget(u32),
}

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ImageDimensions {
    pub width: u32,
    pub height: u32,
}

impl ImageDimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl From<&DynamicImage> for ImageDimensions {
    fn from(image: &DynamicImage) -> Self {
        let (width, height) = image.dimensions();
        Self { width, height }
    }
}

/// How the chosen layout relates to the requested patch count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum LayoutMode {
    /// The achievable patch count at the chosen edge equals the target.
    Exact,
    /// The achievable count differs; emission is a row-major under-fill.
    Truncated,
    /// No viable arrangement was found; the fixed 3x3 fallback is in effect.
    Fallback,
}

/// A grid arrangement: how many rows and columns of square patches to cut,
/// and the patch edge length in pixels.
///
/// # Example
/// ```
/// use patchgrid::{search_grid, ImageDimensions};
///
/// let layout = search_grid(ImageDimensions::new(1200, 800), 6);
/// assert_eq!(layout.patch_count(), 6);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GridLayout {
    pub rows: u32,
    pub columns: u32,
    /// Side length, in pixels, of every emitted patch.
    pub edge: u32,
    pub mode: LayoutMode,
}

impl GridLayout {
    /// Number of patches the row/column arrangement yields.
    pub fn patch_count(&self) -> u32 {
        self.rows * self.columns
    }
}

/// A scored (rows, columns) arrangement considered by [`search_grid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct LayoutCandidate {
    pub rows: u32,
    pub columns: u32,
    pub patch_height: u32,
    pub patch_width: u32,
    pub edge: u32,
    /// Patch count the image can actually hold at this edge length.
    pub achieved: u64,
    pub score: u64,
}

impl LayoutCandidate {
    /// Scores the arrangement with `rows` rows, or `None` when `rows` does
    /// not divide the target or the resulting edge collapses to zero.
    fn evaluate(dims: ImageDimensions, target: u32, rows: u32) -> Option<Self> {
        if target % rows != 0 {
            return None;
        }
        let columns = target / rows;
        let patch_height = dims.height / rows;
        let patch_width = dims.width / columns;
        let edge = patch_height.min(patch_width);
        if edge == 0 {
            return None;
        }
        let achieved = u64::from(dims.width / edge) * u64::from(dims.height / edge);
        let squareness = u64::from(patch_height.abs_diff(patch_width));
        let score = if achieved == u64::from(target) {
            squareness
        } else {
            achieved.abs_diff(u64::from(target)) * COUNT_MISMATCH_WEIGHT + squareness
        };
        Some(Self {
            rows,
            columns,
            patch_height,
            patch_width,
            edge,
            achieved,
            score,
        })
    }
}

/// Enumerates every scorable arrangement for the target count, in ascending
/// row order.
///
/// Rows run from 1 to `floor(sqrt(target)) + 1`, so both orientations of a
/// near-square factorization are considered.
pub fn enumerate_candidates(dims: ImageDimensions, target: u32) -> CandidateVec {
    trace!(
        "Enumerating arrangements for target={} on {}x{}",
        target,
        dims.width,
        dims.height
    );
    let limit = f64::from(target).sqrt() as u32 + 1;
    (1..=limit)
        .filter_map(|rows| LayoutCandidate::evaluate(dims, target, rows))
        .collect()
}

/// Searches for the factorization of `target` into rows x columns whose
/// patches are closest to square while still hitting the requested count.
///
/// Count correctness dominates squareness in the score; on an exact score tie
/// the arrangement with fewer rows wins. When no arrangement is viable (the
/// image is too small for any scorable edge) a fixed 3x3 layout is returned
/// with [`LayoutMode::Fallback`], possibly with a zero edge.
///
/// # Example
/// ```
/// use patchgrid::{search_grid, ImageDimensions, LayoutMode};
///
/// // A wide strip cannot hold nine square patches in a 3x3 grid, so the
/// // search settles on a single row.
/// let layout = search_grid(ImageDimensions::new(9000, 100), 9);
/// assert_eq!((layout.rows, layout.columns, layout.edge), (1, 9, 100));
/// assert_eq!(layout.mode, LayoutMode::Truncated);
/// ```
pub fn search_grid(dims: ImageDimensions, target: u32) -> GridLayout {
    let mut best: Option<LayoutCandidate> = None;
    for candidate in enumerate_candidates(dims, target) {
        trace!(
            "Candidate {}x{} edge={} achieved={} score={}",
            candidate.rows,
            candidate.columns,
            candidate.edge,
            candidate.achieved,
            candidate.score
        );
        // Strict comparison keeps the first candidate on ties
        if best.map_or(true, |b| candidate.score < b.score) {
            best = Some(candidate);
        }
    }

    match best {
        Some(chosen) => {
            let mode = if chosen.achieved == u64::from(target) {
                LayoutMode::Exact
            } else {
                LayoutMode::Truncated
            };
            GridLayout {
                rows: chosen.rows,
                columns: chosen.columns,
                edge: chosen.edge,
                mode,
            }
        }
        None => {
            debug!(
                "No viable arrangement for target={} on {}x{}, falling back to {}x{}",
                target, dims.width, dims.height, FALLBACK_GRID_SIDE, FALLBACK_GRID_SIDE
            );
            GridLayout {
                rows: FALLBACK_GRID_SIDE,
                columns: FALLBACK_GRID_SIDE,
                edge: (dims.height / FALLBACK_GRID_SIDE).min(dims.width / FALLBACK_GRID_SIDE),
                mode: LayoutMode::Fallback,
            }
        }
    }
}

/// Builds a layout with a caller-chosen grid shape, sizing the edge so that
/// every patch is square and the grid fits inside the image.
///
/// `rows` and `columns` must be positive.
///
/// # Example
/// ```
/// use patchgrid::{fixed_grid, ImageDimensions};
///
/// let layout = fixed_grid(ImageDimensions::new(1000, 1000), 3, 3);
/// assert_eq!(layout.edge, 333);
/// ```
pub fn fixed_grid(dims: ImageDimensions, rows: u32, columns: u32) -> GridLayout {
    debug_assert!(rows > 0 && columns > 0);
    GridLayout {
        rows,
        columns,
        edge: (dims.height / rows).min(dims.width / columns),
        mode: LayoutMode::Exact,
    }
}

/// Chooses a layout for the target patch count.
///
/// Dispatches by count: the nine-patch default always uses the fixed 3x3
/// grid it has historically produced, every other count goes through
/// [`search_grid`]. Call [`search_grid`] directly to get the general search
/// result for nine as well.
///
/// # Example
/// ```
/// use patchgrid::{plan, ImageDimensions};
///
/// // Forced 3x3 regardless of aspect ratio.
/// let layout = plan(ImageDimensions::new(9000, 100), 9);
/// assert_eq!((layout.rows, layout.columns, layout.edge), (3, 3, 33));
/// ```
pub fn plan(dims: ImageDimensions, target: u32) -> GridLayout {
    match target {
        DEFAULT_TARGET_PATCHES => fixed_grid(dims, FALLBACK_GRID_SIDE, FALLBACK_GRID_SIDE),
        _ => search_grid(dims, target),
    }
}
