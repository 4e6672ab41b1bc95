use crate::layout::SheetGeometry;
use crate::types::*;
use serde::{Deserialize, Serialize};

/// One printable sheet layout: paper, grid, margins, gaps and slot split.
///
/// Serialized with camelCase keys, which is the shape stored in the
/// archive metadata document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaperConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    // Paper
    #[serde(default)]
    pub paper_size: PaperSize,
    #[serde(default)]
    pub orientation: Orientation,

    // Grid
    pub cols: usize,
    pub rows: usize,
    pub margins: Margins,
    #[serde(default)]
    pub gaps: Gaps,

    // Slots
    #[serde(default)]
    pub slot_count: SlotCount,
    #[serde(default)]
    pub slot_direction: SlotDirection,
}

impl Default for PaperConfig {
    fn default() -> Self {
        PRESETS[0].to_config()
    }
}

impl PaperConfig {
    /// Look up a built-in preset by id
    pub fn preset(id: &str) -> Option<Self> {
        PRESETS
            .iter()
            .find(|preset| preset.id == id)
            .map(PaperPreset::to_config)
    }

    /// Page width and height for the active orientation
    pub fn page_dimensions_mm(&self) -> (f32, f32) {
        self.paper_size.dimensions_with_orientation(self.orientation)
    }

    pub fn cells_per_page(&self) -> usize {
        self.cols * self.rows
    }

    /// Resolve cell and slot dimensions, rejecting invalid configurations
    pub fn geometry(&self) -> Result<SheetGeometry> {
        SheetGeometry::resolve(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.geometry().map(|_| ())
    }

    /// Replace this configuration with `candidate` if it is valid.
    ///
    /// On failure the current configuration stays in effect.
    pub fn apply(&mut self, candidate: PaperConfig) -> Result<()> {
        if let Err(e) = candidate.validate() {
            log::warn!("Rejected paper configuration: {}", e);
            return Err(e);
        }
        *self = candidate;
        Ok(())
    }

    /// Return a copy turned to `orientation`.
    ///
    /// The grid is rotated by 90°: columns and rows swap, gaps swap, and the
    /// margins follow the page edges they were attached to.
    pub fn with_orientation(&self, orientation: Orientation) -> Self {
        if orientation == self.orientation {
            return self.clone();
        }

        let m = self.margins;
        let margins = match orientation {
            // portrait -> landscape
            Orientation::Landscape => Margins {
                top: m.left,
                right: m.top,
                bottom: m.right,
                left: m.bottom,
            },
            // landscape -> portrait
            Orientation::Portrait => Margins {
                left: m.top,
                top: m.right,
                right: m.bottom,
                bottom: m.left,
            },
        };

        Self {
            orientation,
            cols: self.rows,
            rows: self.cols,
            margins,
            gaps: Gaps::new(self.gaps.y, self.gaps.x),
            ..self.clone()
        }
    }

    /// Load a configuration from a JSON file
    pub async fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let config: PaperConfig = serde_json::from_slice(&bytes)
            .map_err(|e| StickerError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration to a JSON file
    pub async fn save(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| StickerError::Config(format!("Failed to serialize config: {}", e)))?;
        tokio::fs::write(path, json).await?;
        Ok(())
    }
}

/// A built-in sheet layout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperPreset {
    pub id: &'static str,
    pub name: &'static str,
    pub cols: usize,
    pub rows: usize,
    /// top, bottom, left, right
    pub margins: (f32, f32, f32, f32),
    pub slot_count: SlotCount,
}

impl PaperPreset {
    pub fn to_config(&self) -> PaperConfig {
        let (top, bottom, left, right) = self.margins;
        PaperConfig {
            id: Some(self.id.to_string()),
            name: Some(self.name.to_string()),
            paper_size: PaperSize::A4,
            orientation: Orientation::Portrait,
            cols: self.cols,
            rows: self.rows,
            margins: Margins::new(top, bottom, left, right),
            gaps: Gaps::default(),
            slot_count: self.slot_count,
            slot_direction: SlotDirection::Vertical,
        }
    }
}

/// Built-in A4 presets. The first entry is the default layout.
pub const PRESETS: &[PaperPreset] = &[
    PaperPreset {
        id: "6x3",
        name: "6x3 Grid (68x47mm)",
        cols: 3,
        rows: 6,
        margins: (7.5, 7.5, 3.0, 3.0),
        slot_count: SlotCount::Two,
    },
    PaperPreset {
        id: "2x4",
        name: "4x2 Grid (105x74mm)",
        cols: 2,
        rows: 4,
        margins: (0.0, 0.0, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "3x8",
        name: "8x3 Grid (70x36mm)",
        cols: 3,
        rows: 8,
        margins: (4.5, 4.5, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "5x13",
        name: "13x5 Grid (38x21mm)",
        cols: 5,
        rows: 13,
        margins: (12.0, 12.0, 10.0, 10.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "3x8-new",
        name: "8x3 Grid (68x36mm)",
        cols: 3,
        rows: 8,
        margins: (4.5, 4.5, 3.0, 3.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "2x7",
        name: "7x2 Grid (105x42.3mm)",
        cols: 2,
        rows: 7,
        margins: (0.45, 0.45, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "3x7",
        name: "7x3 Grid (70x42.3mm)",
        cols: 3,
        rows: 7,
        margins: (0.45, 0.45, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "4x13",
        name: "13x4 Grid (52.5x21.2mm)",
        cols: 4,
        rows: 13,
        margins: (10.7, 10.7, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "1x1",
        name: "1x1 Full Page (210x297mm)",
        cols: 1,
        rows: 1,
        margins: (0.0, 0.0, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "1x2",
        name: "2x1 Half Page (210x148.5mm)",
        cols: 1,
        rows: 2,
        margins: (0.0, 0.0, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
    PaperPreset {
        id: "2x2",
        name: "2x2 Quarter Page (105x148.5mm)",
        cols: 2,
        rows: 2,
        margins: (0.0, 0.0, 0.0, 0.0),
        slot_count: SlotCount::One,
    },
];
