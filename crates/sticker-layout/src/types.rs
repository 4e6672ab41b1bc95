use crate::unit::UnitId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StickerError {
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Task join error: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
    #[error("Failed to decode image for unit {unit}: {source}")]
    Decode {
        unit: UnitId,
        #[source]
        source: image::ImageError,
    },
    #[error("Unknown image unit: {0}")]
    UnknownUnit(UnitId),
    #[error("Invalid color: {0}")]
    Color(String),
}

pub type Result<T> = std::result::Result<T, StickerError>;

/// Paper orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Portrait: height > width
    #[default]
    Portrait,
    /// Landscape: width > height
    Landscape,
}

/// Standard paper sizes
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperSize {
    A3,
    #[default]
    A4,
    A5,
    Letter,
    Legal,
    Custom { width_mm: f32, height_mm: f32 },
}

impl PaperSize {
    /// Get base dimensions (always portrait: width < height for standard sizes)
    pub fn dimensions_mm(self) -> (f32, f32) {
        match self {
            PaperSize::A3 => (297.0, 420.0),
            PaperSize::A4 => (210.0, 297.0),
            PaperSize::A5 => (148.0, 210.0),
            PaperSize::Letter => (215.9, 279.4),
            PaperSize::Legal => (215.9, 355.6),
            PaperSize::Custom {
                width_mm,
                height_mm,
            } => (width_mm, height_mm),
        }
    }

    /// Get dimensions with orientation applied
    pub fn dimensions_with_orientation(self, orientation: Orientation) -> (f32, f32) {
        let (w, h) = self.dimensions_mm();
        match orientation {
            Orientation::Portrait => (w, h),
            Orientation::Landscape => (h, w),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaperSize::A3 => "A3",
            PaperSize::A4 => "A4",
            PaperSize::A5 => "A5",
            PaperSize::Letter => "Letter",
            PaperSize::Legal => "Legal",
            PaperSize::Custom { .. } => "Custom",
        }
    }
}

/// How many independent image slots share one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SlotCount {
    One,
    #[default]
    Two,
}

impl SlotCount {
    pub fn count(self) -> usize {
        match self {
            SlotCount::One => 1,
            SlotCount::Two => 2,
        }
    }
}

impl TryFrom<u8> for SlotCount {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(SlotCount::One),
            2 => Ok(SlotCount::Two),
            other => Err(format!("slot count must be 1 or 2, got {}", other)),
        }
    }
}

impl From<SlotCount> for u8 {
    fn from(value: SlotCount) -> Self {
        value.count() as u8
    }
}

/// Split direction of a two-slot cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotDirection {
    /// Left/right split
    #[default]
    Vertical,
    /// Top/bottom split
    Horizontal,
}

/// How a raster is fitted into its target rectangle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Crop to fill
    #[default]
    Cover,
    /// Letterbox to fit
    Contain,
}

/// How much of the grid a single placement occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StickerSize {
    /// One slot
    #[default]
    Half,
    /// A whole cell, bypassing slot splitting
    Full,
}

/// Sheet margins in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Margins {
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

impl Margins {
    pub fn new(top: f32, bottom: f32, left: f32, right: f32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }
}

/// Spacing between adjacent cells in millimeters
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Gaps {
    pub x: f32,
    pub y: f32,
}

impl Gaps {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Statistics about a packed sheet
#[derive(Debug, Clone, PartialEq)]
pub struct SheetStatistics {
    /// Number of image units in the list
    pub units: usize,
    /// Sum of all unit quantities
    pub placements: usize,
    /// Total packed cells
    pub cells: usize,
    /// Cells holding one full-size placement
    pub full_cells: usize,
    /// Cells split into two slots
    pub split_cells: usize,
    /// Split cells whose second slot is empty
    pub empty_slots: usize,
    /// Output pages
    pub pages: usize,
    /// Cells per page
    pub cells_per_page: usize,
}

impl SheetStatistics {
    /// Share of the available cells that hold something
    pub fn fill_ratio(&self) -> f32 {
        let capacity = self.pages * self.cells_per_page;
        if capacity == 0 {
            0.0
        } else {
            self.cells as f32 / capacity as f32
        }
    }
}
