//! Shared constants for sheet layout and export
//!
//! This module centralizes magic numbers used by both the preview and the
//! print path, so the two stay millimeter-consistent.

// =============================================================================
// Unit Conversion
// =============================================================================

/// Points per millimeter (1 inch = 72 points, 1 inch = 25.4mm)
pub const POINTS_PER_MM: f32 = 72.0 / 25.4; // ≈ 2.83465

/// Convert millimeters to points
#[inline]
pub fn mm_to_pt(mm: f32) -> f32 {
    mm * POINTS_PER_MM
}

// =============================================================================
// Rasterization
// =============================================================================

/// Pixels per millimeter for print composites (≈300 DPI)
pub const PRINT_SCALE: f32 = 11.8;

/// Pixels per millimeter for on-screen preview thumbnails
pub const PREVIEW_SCALE: f32 = 4.0;

/// JPEG quality for rasters embedded in the PDF
pub const PDF_JPEG_QUALITY: u8 = 85;

// =============================================================================
// Edit Limits
// =============================================================================

/// Smallest zoom the crop editor offers
pub const MIN_ZOOM: f32 = 0.1;

/// Largest zoom the crop editor offers
pub const MAX_ZOOM: f32 = 10.0;

/// Upper bound on the pixel count of a baked or zoomed raster
pub const MAX_RASTER_PIXELS: u64 = 64 * 1024 * 1024;

// =============================================================================
// Cut Lines
// =============================================================================

/// Line width for cut lines between slots (points)
pub const CUT_LINE_WIDTH: f32 = 0.5;

/// Dash and gap length for cut lines (millimeters)
pub const CUT_LINE_DASH_MM: f32 = 1.0;

/// Gray level of cut lines (0 = black, 1 = white)
pub const CUT_LINE_GRAY: f32 = 200.0 / 255.0;

// =============================================================================
// Output Names
// =============================================================================

/// Default file name for the PDF export
pub const DEFAULT_PDF_FILENAME: &str = "stickers.pdf";

/// Default file name for the archive export
pub const DEFAULT_ARCHIVE_FILENAME: &str = "stickers-images.zip";

/// Folder inside the archive holding the image files
pub const ARCHIVE_IMAGE_DIR: &str = "stickers";

/// Metadata document inside the archive
pub const ARCHIVE_METADATA_FILE: &str = "metadata.json";

/// Current metadata document version
pub const METADATA_VERSION: u32 = 2;
