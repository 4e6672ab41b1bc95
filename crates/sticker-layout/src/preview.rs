//! Sheet preview
//!
//! Builds the on-screen model of every page (cell and slot rectangles in
//! preview pixels, which unit sits where, where the cut lines run) from the
//! same geometry, packing and pagination the PDF export uses. A page can be
//! rasterized for display or for writing to disk.

use crate::compositor::{CompositeRequest, apply_zoom, composite};
use crate::config::PaperConfig;
use crate::constants::{CUT_LINE_DASH_MM, CUT_LINE_GRAY, PREVIEW_SCALE};
use crate::layout::{
    CompositeKey, GridCell, GridPosition, Line, Placement, Rect, SheetGeometry, pack_cells,
    paginate,
};
use crate::types::*;
use crate::unit::{ImageUnit, UnitId};
use image::{DynamicImage, Rgb, RgbImage};
use std::collections::HashMap;
use std::sync::Arc;

/// Options for building a preview
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewOptions {
    /// Screen pixels per millimeter
    pub px_per_mm: f32,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            px_per_mm: PREVIEW_SCALE,
        }
    }
}

/// Where a slot's pixels come from
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlotSource {
    /// The unit's baked edit, shown as-is
    Baked,
    /// The original with an approximate zoom applied on the fly
    Live { zoom: f32 },
}

/// One populated slot of the preview
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSlot {
    pub placement: Placement,
    /// Bounds in preview pixels
    pub rect: Rect,
    /// Physical size of the target rectangle
    pub width_mm: f32,
    pub height_mm: f32,
    pub fit: FitMode,
    pub background: crate::color::Color,
    pub source: SlotSource,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewCellContent {
    Empty,
    Full(PreviewSlot),
    Split {
        slot1: PreviewSlot,
        slot2: Option<PreviewSlot>,
        /// Boundary between the slots, in preview pixels
        cut_line: Line,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewCell {
    pub position: GridPosition,
    /// Bounds in preview pixels
    pub rect: Rect,
    pub content: PreviewCellContent,
}

impl PreviewCell {
    /// Populated slots in this cell
    pub fn slots(&self) -> impl Iterator<Item = &PreviewSlot> {
        let (first, second) = match &self.content {
            PreviewCellContent::Empty => (None, None),
            PreviewCellContent::Full(slot) => (Some(slot), None),
            PreviewCellContent::Split { slot1, slot2, .. } => (Some(slot1), slot2.as_ref()),
        };
        first.into_iter().chain(second)
    }
}

/// One page of the preview. Always holds `cols × rows` cells; positions past
/// the packed cells are [`PreviewCellContent::Empty`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPage {
    pub index: usize,
    pub width_px: u32,
    pub height_px: u32,
    pub cells: Vec<PreviewCell>,
}

impl PreviewPage {
    /// The populated slot under a point in preview pixels
    pub fn slot_at(&self, x: f32, y: f32) -> Option<&PreviewSlot> {
        self.cells
            .iter()
            .filter(|cell| cell.rect.contains(x, y))
            .flat_map(PreviewCell::slots)
            .find(|slot| slot.rect.contains(x, y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSheet {
    pub geometry: SheetGeometry,
    pub scale: f32,
    pub pages: Vec<PreviewPage>,
}

impl PreviewSheet {
    /// Route a click on `page` at `(x, y)` to the edit entry point.
    ///
    /// Returns `true` when the click hit a populated slot and `on_edit` was
    /// called with its unit id.
    pub fn click<F>(&self, page: usize, x: f32, y: f32, mut on_edit: F) -> bool
    where
        F: FnMut(&UnitId),
    {
        match self.pages.get(page).and_then(|p| p.slot_at(x, y)) {
            Some(slot) => {
                on_edit(&slot.placement.unit_id);
                true
            }
            None => false,
        }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Build the preview model for `units` on sheets described by `config`
pub fn build_preview(
    units: &[ImageUnit],
    config: &PaperConfig,
    options: &PreviewOptions,
) -> Result<PreviewSheet> {
    let geometry = config.geometry()?;
    let scale = options.px_per_mm;
    let pages = paginate(pack_cells(units, config), geometry.cells_per_page());

    let width_px = (geometry.page_width_mm * scale).round() as u32;
    let height_px = (geometry.page_height_mm * scale).round() as u32;

    let pages = pages
        .iter()
        .map(|page| {
            let cells = (0..page.capacity)
                .map(|index| {
                    let position = geometry.position_of(index);
                    let slot = |placement: &Placement, rect: Rect| {
                        preview_slot(units, &geometry, placement, rect, scale)
                    };

                    let content = match page.cell_at(index) {
                        None => PreviewCellContent::Empty,
                        Some(GridCell::Full(p)) => {
                            PreviewCellContent::Full(slot(p, geometry.cell_rect(position)))
                        }
                        Some(GridCell::Split { slot1, slot2 }) => PreviewCellContent::Split {
                            slot1: slot(slot1, geometry.slot_rect(position, 0)),
                            slot2: slot2
                                .as_ref()
                                .map(|p| slot(p, geometry.slot_rect(position, 1))),
                            cut_line: geometry.cut_line(position).scaled(scale),
                        },
                    };

                    PreviewCell {
                        position,
                        rect: geometry.cell_rect(position).scaled(scale),
                        content,
                    }
                })
                .collect();

            PreviewPage {
                index: page.index,
                width_px,
                height_px,
                cells,
            }
        })
        .collect();

    Ok(PreviewSheet {
        geometry,
        scale,
        pages,
    })
}

fn preview_slot(
    units: &[ImageUnit],
    geometry: &SheetGeometry,
    placement: &Placement,
    rect_mm: Rect,
    scale: f32,
) -> PreviewSlot {
    let (width_mm, height_mm) = geometry.target_dimensions_mm(placement.target);
    let unit = units.get(placement.unit_index);

    let (fit, background, source) = match unit {
        Some(unit) if unit.is_edited() => (FitMode::Cover, unit.background, SlotSource::Baked),
        Some(unit) => (
            unit.fit_mode,
            unit.background,
            SlotSource::Live {
                zoom: unit.edit.zoom,
            },
        ),
        None => (FitMode::Cover, Default::default(), SlotSource::Live { zoom: 1.0 }),
    };

    PreviewSlot {
        placement: placement.clone(),
        rect: rect_mm.scaled(scale),
        width_mm,
        height_mm,
        fit,
        background,
        source,
    }
}

/// Draw one preview page to an RGB image.
///
/// Slots whose unit cannot be decoded are left blank and logged.
pub fn rasterize_page(
    sheet: &PreviewSheet,
    page_index: usize,
    units: &[ImageUnit],
) -> Result<RgbImage> {
    let page = sheet.pages.get(page_index).ok_or_else(|| {
        StickerError::Config(format!(
            "Page {} out of range ({} page(s))",
            page_index + 1,
            sheet.pages.len()
        ))
    })?;

    let mut canvas = RgbImage::from_pixel(
        page.width_px.max(1),
        page.height_px.max(1),
        Rgb([255, 255, 255]),
    );
    let mut cache: HashMap<CompositeKey, Option<Arc<RgbImage>>> = HashMap::new();

    for cell in &page.cells {
        for slot in cell.slots() {
            let key = slot.placement.composite_key();
            let raster = cache
                .entry(key)
                .or_insert_with(|| match render_slot(slot, units, sheet.scale) {
                    Ok(raster) => Some(Arc::new(raster)),
                    Err(e) => {
                        log::warn!("Preview of {} failed: {}", slot.placement.unit_id, e);
                        None
                    }
                })
                .clone();

            if let Some(raster) = raster {
                image::imageops::replace(
                    &mut canvas,
                    &*raster,
                    slot.rect.x.round() as i64,
                    slot.rect.y.round() as i64,
                );
            }
        }

        if let PreviewCellContent::Split { cut_line, .. } = &cell.content {
            draw_dashed_line(&mut canvas, cut_line, CUT_LINE_DASH_MM * sheet.scale);
        }
    }

    Ok(canvas)
}

fn render_slot(slot: &PreviewSlot, units: &[ImageUnit], scale: f32) -> Result<RgbImage> {
    let unit = units
        .get(slot.placement.unit_index)
        .filter(|unit| unit.id == slot.placement.unit_id)
        .ok_or_else(|| StickerError::UnknownUnit(slot.placement.unit_id.clone()))?;

    let source: DynamicImage = match (slot.source, unit.edited()) {
        (SlotSource::Baked, Some(baked)) => baked.clone(),
        (SlotSource::Live { zoom }, _) => apply_zoom(&unit.decode_original()?, zoom, slot.background)?,
        (SlotSource::Baked, None) => unit.decode_original()?,
    };

    Ok(composite(
        &source,
        &CompositeRequest {
            width_mm: slot.width_mm,
            height_mm: slot.height_mm,
            scale,
            fit: slot.fit,
            background: slot.background,
        },
    ))
}

fn draw_dashed_line(canvas: &mut RgbImage, line: &Line, dash_px: f32) {
    let gray = (CUT_LINE_GRAY * 255.0).round() as u8;
    let color = Rgb([gray, gray, gray]);
    let dash = dash_px.max(1.0);

    let dx = line.x2 - line.x1;
    let dy = line.y2 - line.y1;
    let length = (dx * dx + dy * dy).sqrt();
    let steps = length.ceil() as u32;

    for step in 0..steps {
        let t = step as f32;
        // Alternate dash and gap of equal length
        if (t / dash) as u32 % 2 == 1 {
            continue;
        }
        let x = (line.x1 + dx * t / length).round() as i64;
        let y = (line.y1 + dy * t / length).round() as i64;
        if x >= 0 && y >= 0 && (x as u32) < canvas.width() && (y as u32) < canvas.height() {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(id: &str, quantity: usize) -> ImageUnit {
        ImageUnit::from_bytes(id, Vec::new())
            .with_id(UnitId::from(id))
            .with_quantity(quantity)
    }

    #[test]
    fn test_empty_list_shows_blank_sheet() {
        let sheet = build_preview(&[], &PaperConfig::default(), &PreviewOptions::default()).unwrap();

        assert_eq!(sheet.page_count(), 1);
        assert_eq!(sheet.pages[0].cells.len(), 18);
        assert!(
            sheet.pages[0]
                .cells
                .iter()
                .all(|c| c.content == PreviewCellContent::Empty)
        );
    }

    #[test]
    fn test_page_size_in_pixels() {
        let sheet = build_preview(&[], &PaperConfig::default(), &PreviewOptions { px_per_mm: 2.0 })
            .unwrap();
        assert_eq!(sheet.pages[0].width_px, 420);
        assert_eq!(sheet.pages[0].height_px, 594);
    }

    #[test]
    fn test_click_reports_unit_in_slot() {
        let units = vec![unit("a", 1), unit("b", 1)];
        let sheet = build_preview(&units, &PaperConfig::default(), &PreviewOptions { px_per_mm: 1.0 })
            .unwrap();

        // First cell starts at (3, 7.5); slots are 34mm wide
        let mut clicked = Vec::new();
        assert!(sheet.click(0, 10.0, 20.0, |id| clicked.push(id.clone())));
        assert!(sheet.click(0, 50.0, 20.0, |id| clicked.push(id.clone())));
        assert_eq!(clicked, vec![UnitId::from("a"), UnitId::from("b")]);

        // Margin, empty cell, missing page
        assert!(!sheet.click(0, 1.0, 1.0, |_| panic!("margin")));
        assert!(!sheet.click(0, 100.0, 20.0, |_| panic!("empty cell")));
        assert!(!sheet.click(3, 10.0, 20.0, |_| panic!("no page")));
    }

    #[test]
    fn test_empty_second_slot_is_not_clickable() {
        let units = vec![unit("a", 1)];
        let sheet = build_preview(&units, &PaperConfig::default(), &PreviewOptions { px_per_mm: 1.0 })
            .unwrap();

        match &sheet.pages[0].cells[0].content {
            PreviewCellContent::Split { slot2, cut_line, .. } => {
                assert!(slot2.is_none());
                assert!(cut_line.is_vertical());
            }
            other => panic!("expected split cell, got {:?}", other),
        }
        assert!(!sheet.click(0, 50.0, 20.0, |_| panic!("empty slot")));
    }

    #[test]
    fn test_rasterize_skips_broken_units() {
        let units = vec![unit("broken", 1)];
        let sheet = build_preview(&units, &PaperConfig::default(), &PreviewOptions { px_per_mm: 1.0 })
            .unwrap();
        let raster = rasterize_page(&sheet, 0, &units).unwrap();

        assert_eq!(raster.dimensions(), (210, 297));
        assert_eq!(raster.get_pixel(10, 20).0, [255, 255, 255]);
        assert!(rasterize_page(&sheet, 1, &units).is_err());
    }
}
