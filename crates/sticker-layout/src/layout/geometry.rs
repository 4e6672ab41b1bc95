//! Sheet geometry
//!
//! Turns a paper configuration into cell and slot dimensions and
//! millimeter positions. Both renderers place content through this module.

use crate::config::PaperConfig;
use crate::types::*;

use super::{GridPosition, Line, Rect, TargetSize};

/// Resolved dimensions of a sheet layout, in millimeters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SheetGeometry {
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    pub cols: usize,
    pub rows: usize,
    pub margins: Margins,
    pub gaps: Gaps,
    pub slot_count: SlotCount,
    pub slot_direction: SlotDirection,
    pub cell_width_mm: f32,
    pub cell_height_mm: f32,
    pub slot_width_mm: f32,
    pub slot_height_mm: f32,
}

impl SheetGeometry {
    /// Resolve the geometry of `config`.
    ///
    /// Fails with [`StickerError::Config`] when the grid is empty, a margin
    /// or gap is negative, or the resulting cells have no area.
    pub fn resolve(config: &PaperConfig) -> Result<Self> {
        if config.cols == 0 || config.rows == 0 {
            return Err(StickerError::Config(
                "Grid must have at least one column and one row".to_string(),
            ));
        }

        let m = config.margins;
        let spacing = [m.top, m.bottom, m.left, m.right, config.gaps.x, config.gaps.y];
        if spacing.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(StickerError::Config(
                "Margins and gaps must be finite and not negative".to_string(),
            ));
        }

        let (page_width_mm, page_height_mm) = config.page_dimensions_mm();

        let effective_width = page_width_mm - m.left - m.right;
        let effective_height = page_height_mm - m.top - m.bottom;

        let cell_width_mm =
            (effective_width - (config.cols - 1) as f32 * config.gaps.x) / config.cols as f32;
        let cell_height_mm =
            (effective_height - (config.rows - 1) as f32 * config.gaps.y) / config.rows as f32;

        if !(cell_width_mm > 0.0 && cell_height_mm > 0.0) {
            return Err(StickerError::Config(format!(
                "Content exceeds page size: cells would be {:.1} x {:.1} mm",
                cell_width_mm, cell_height_mm
            )));
        }

        let (slot_width_mm, slot_height_mm) = match (config.slot_count, config.slot_direction) {
            (SlotCount::One, _) => (cell_width_mm, cell_height_mm),
            (SlotCount::Two, SlotDirection::Vertical) => (cell_width_mm / 2.0, cell_height_mm),
            (SlotCount::Two, SlotDirection::Horizontal) => (cell_width_mm, cell_height_mm / 2.0),
        };

        Ok(Self {
            page_width_mm,
            page_height_mm,
            cols: config.cols,
            rows: config.rows,
            margins: m,
            gaps: config.gaps,
            slot_count: config.slot_count,
            slot_direction: config.slot_direction,
            cell_width_mm,
            cell_height_mm,
            slot_width_mm,
            slot_height_mm,
        })
    }

    /// Total number of cells on one page
    pub fn cells_per_page(&self) -> usize {
        self.cols * self.rows
    }

    /// Width and height of the rectangle a placement of `target` fills
    pub fn target_dimensions_mm(&self, target: TargetSize) -> (f32, f32) {
        match target {
            TargetSize::Full => (self.cell_width_mm, self.cell_height_mm),
            TargetSize::Half => (self.slot_width_mm, self.slot_height_mm),
        }
    }

    /// Width / height of the target rectangle.
    ///
    /// This is the ratio a crop frame must keep for the crop to land on the
    /// sheet undistorted.
    pub fn aspect_ratio(&self, target: TargetSize) -> f32 {
        let (w, h) = self.target_dimensions_mm(target);
        w / h
    }

    /// Grid position of a page-local cell index (row-major)
    pub fn position_of(&self, index: usize) -> GridPosition {
        GridPosition::new(index / self.cols, index % self.cols)
    }

    /// Bounds of the cell at `pos`
    pub fn cell_rect(&self, pos: GridPosition) -> Rect {
        Rect::new(
            self.margins.left + pos.col as f32 * (self.cell_width_mm + self.gaps.x),
            self.margins.top + pos.row as f32 * (self.cell_height_mm + self.gaps.y),
            self.cell_width_mm,
            self.cell_height_mm,
        )
    }

    /// Bounds of slot 0 or 1 of a split cell at `pos`
    pub fn slot_rect(&self, pos: GridPosition, slot: usize) -> Rect {
        let cell = self.cell_rect(pos);
        let offset = slot as f32;
        match self.slot_direction {
            SlotDirection::Vertical => Rect::new(
                cell.x + offset * self.slot_width_mm,
                cell.y,
                self.slot_width_mm,
                self.slot_height_mm,
            ),
            SlotDirection::Horizontal => Rect::new(
                cell.x,
                cell.y + offset * self.slot_height_mm,
                self.slot_width_mm,
                self.slot_height_mm,
            ),
        }
    }

    /// The boundary between the two slots of a split cell at `pos`
    pub fn cut_line(&self, pos: GridPosition) -> Line {
        let second = self.slot_rect(pos, 1);
        match self.slot_direction {
            SlotDirection::Vertical => {
                Line::new(second.x, second.y, second.x, second.bottom())
            }
            SlotDirection::Horizontal => {
                Line::new(second.x, second.y, second.right(), second.y)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-4;

    fn six_by_three() -> PaperConfig {
        PaperConfig::preset("6x3").unwrap()
    }

    #[test]
    fn test_default_preset_geometry() {
        let g = six_by_three().geometry().unwrap();

        assert_eq!(g.page_width_mm, 210.0);
        assert_eq!(g.page_height_mm, 297.0);
        assert!((g.cell_width_mm - 68.0).abs() < EPS);
        assert!((g.cell_height_mm - 47.0).abs() < EPS);
        assert!((g.slot_width_mm - 34.0).abs() < EPS);
        assert!((g.slot_height_mm - 47.0).abs() < EPS);
        assert_eq!(g.cells_per_page(), 18);
    }

    #[test]
    fn test_gaps_are_subtracted() {
        let mut config = six_by_three();
        config.gaps = Gaps::new(3.0, 1.0);
        let g = config.geometry().unwrap();

        // (204 - 2*3) / 3 and (282 - 5*1) / 6
        assert!((g.cell_width_mm - 66.0).abs() < EPS);
        assert!((g.cell_height_mm - 277.0 / 6.0).abs() < EPS);
    }

    #[test]
    fn test_horizontal_split() {
        let mut config = six_by_three();
        config.slot_direction = SlotDirection::Horizontal;
        let g = config.geometry().unwrap();

        assert!((g.slot_width_mm - 68.0).abs() < EPS);
        assert!((g.slot_height_mm - 23.5).abs() < EPS);
    }

    #[test]
    fn test_single_slot_matches_cell() {
        let g = PaperConfig::preset("3x8").unwrap().geometry().unwrap();
        assert_eq!(g.slot_width_mm, g.cell_width_mm);
        assert_eq!(g.slot_height_mm, g.cell_height_mm);
        assert_eq!(g.aspect_ratio(TargetSize::Full), g.aspect_ratio(TargetSize::Half));
    }

    #[test]
    fn test_landscape_swaps_page() {
        let config = six_by_three().with_orientation(Orientation::Landscape);
        let g = config.geometry().unwrap();
        assert_eq!(g.page_width_mm, 297.0);
        assert_eq!(g.page_height_mm, 210.0);
        assert_eq!(g.cols, 6);
        assert_eq!(g.rows, 3);
    }

    #[test]
    fn test_invalid_configurations() {
        let mut config = six_by_three();
        config.margins.left = 150.0;
        config.margins.right = 60.0;
        assert!(matches!(config.geometry(), Err(StickerError::Config(_))));

        let mut config = six_by_three();
        config.cols = 0;
        assert!(config.geometry().is_err());

        let mut config = six_by_three();
        config.gaps.y = -1.0;
        assert!(config.geometry().is_err());

        let mut config = six_by_three();
        config.gaps.x = 200.0;
        assert!(config.geometry().is_err());
    }

    #[test]
    fn test_aspect_ratio() {
        let g = six_by_three().geometry().unwrap();
        assert!((g.aspect_ratio(TargetSize::Half) - 34.0 / 47.0).abs() < EPS);
        assert!((g.aspect_ratio(TargetSize::Full) - 68.0 / 47.0).abs() < EPS);
    }

    #[test]
    fn test_cell_and_slot_rects() {
        let mut config = six_by_three();
        config.gaps = Gaps::new(2.0, 4.0);
        let g = config.geometry().unwrap();

        let pos = GridPosition::new(1, 2);
        let cell = g.cell_rect(pos);
        assert!((cell.x - (3.0 + 2.0 * (g.cell_width_mm + 2.0))).abs() < EPS);
        assert!((cell.y - (7.5 + g.cell_height_mm + 4.0)).abs() < EPS);

        let right = g.slot_rect(pos, 1);
        assert!((right.x - (cell.x + g.slot_width_mm)).abs() < EPS);
        assert_eq!(right.y, cell.y);

        let cut = g.cut_line(pos);
        assert!(cut.is_vertical());
        assert_eq!(cut.x1, right.x);
        assert!((cut.y2 - cell.bottom()).abs() < EPS);
    }

    #[test]
    fn test_position_of_is_row_major() {
        let g = six_by_three().geometry().unwrap();
        assert_eq!(g.position_of(0), GridPosition::new(0, 0));
        assert_eq!(g.position_of(2), GridPosition::new(0, 2));
        assert_eq!(g.position_of(3), GridPosition::new(1, 0));
        assert_eq!(g.position_of(17), GridPosition::new(5, 2));
    }
}
