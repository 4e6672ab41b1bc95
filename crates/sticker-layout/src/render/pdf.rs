//! PDF export of sticker sheets
//!
//! Runs the same packing and pagination as the preview, composites every
//! distinct (unit, target size) pair once at print scale, and places the
//! resulting JPEGs at their millimeter positions.

use crate::compositor::composite_unit;
use crate::config::PaperConfig;
use crate::constants::{PDF_JPEG_QUALITY, PRINT_SCALE, mm_to_pt};
use crate::layout::{CompositeKey, GridCell, Placement, Rect, SheetGeometry, pack_cells, paginate};
use crate::types::*;
use crate::unit::{ImageUnit, UnitId};
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::path::Path;

use super::marks::cut_line_ops;

/// Options for PDF export
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfExportOptions {
    /// Pixels per millimeter for composites
    pub scale: f32,
    pub jpeg_quality: u8,
    /// Draw dashed lines between the slots of split cells
    pub cut_lines: bool,
    /// Abort on the first unit that fails to composite instead of leaving
    /// its slots empty
    pub strict: bool,
}

impl Default for PdfExportOptions {
    fn default() -> Self {
        Self {
            scale: PRINT_SCALE,
            jpeg_quality: PDF_JPEG_QUALITY,
            cut_lines: true,
            strict: false,
        }
    }
}

/// A unit whose composite could not be produced
#[derive(Debug, Clone, PartialEq)]
pub struct UnitFailure {
    pub unit_id: UnitId,
    pub display_name: String,
    pub message: String,
}

/// Summary of one export run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportReport {
    pub pages: usize,
    pub cells: usize,
    /// Distinct composites embedded in the document
    pub composites: usize,
    pub failures: Vec<UnitFailure>,
}

impl ExportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Render `units` onto sheets described by `config`.
///
/// Composites run sequentially; the memo table lives for this call only.
pub fn render_pdf(
    units: &[ImageUnit],
    config: &PaperConfig,
    options: &PdfExportOptions,
) -> Result<(Document, ExportReport)> {
    let geometry = config.geometry()?;
    let cells = pack_cells(units, config);
    let cell_count = cells.len();
    let pages = paginate(cells, geometry.cells_per_page());

    let page_width_pt = mm_to_pt(geometry.page_width_mm);
    let page_height_pt = mm_to_pt(geometry.page_height_mm);

    let mut output = Document::with_version("1.7");
    let pages_tree_id = output.new_object_id();
    let mut page_refs = Vec::new();

    let mut sheet = SheetWriter {
        output: &mut output,
        units,
        geometry: &geometry,
        options,
        page_height_pt,
        composites: HashMap::new(),
        failures: Vec::new(),
    };

    for page in &pages {
        let mut content_ops = String::new();
        let mut xobjects = Dictionary::new();

        for (index, cell) in page.cells.iter().enumerate() {
            let pos = geometry.position_of(index);
            match cell {
                GridCell::Full(placement) => {
                    sheet.place(placement, geometry.cell_rect(pos), &mut content_ops, &mut xobjects)?;
                }
                GridCell::Split { slot1, slot2 } => {
                    sheet.place(slot1, geometry.slot_rect(pos, 0), &mut content_ops, &mut xobjects)?;
                    if let Some(slot2) = slot2 {
                        sheet.place(slot2, geometry.slot_rect(pos, 1), &mut content_ops, &mut xobjects)?;
                    }
                    if options.cut_lines {
                        content_ops.push_str(&cut_line_ops(&geometry.cut_line(pos), page_height_pt));
                    }
                }
            }
        }

        let page_id = sheet.add_page(pages_tree_id, page_width_pt, content_ops, xobjects);
        page_refs.push(Object::Reference(page_id));
    }

    let composites = sheet.composites.values().filter(|id| id.is_some()).count();
    let failures = sheet.failures;

    // Create pages tree
    let count = page_refs.len() as i64;
    let pages_dict = Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(page_refs)),
        ("Count", Object::Integer(count)),
    ]);
    output
        .objects
        .insert(pages_tree_id, Object::Dictionary(pages_dict));

    // Create catalog
    let catalog_id = output.add_object(Dictionary::from_iter(vec![
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_tree_id)),
    ]));
    output.trailer.set("Root", catalog_id);

    let report = ExportReport {
        pages: pages.len(),
        cells: cell_count,
        composites,
        failures,
    };

    log::info!(
        "Rendered {} page(s), {} cell(s), {} composite(s), {} failure(s)",
        report.pages,
        report.cells,
        report.composites,
        report.failures.len()
    );

    Ok((output, report))
}

/// Render and write the PDF to `path`.
///
/// Compositing and serialization run on one blocking task.
pub async fn export_pdf(
    units: &[ImageUnit],
    config: &PaperConfig,
    options: &PdfExportOptions,
    path: impl AsRef<Path>,
) -> Result<ExportReport> {
    let path = path.as_ref().to_owned();
    let units = units.to_vec();
    let config = config.clone();
    let options = *options;

    let (bytes, report) = tokio::task::spawn_blocking(move || {
        let (mut doc, report) = render_pdf(&units, &config, &options)?;
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, StickerError>((writer, report))
    })
    .await??;

    tokio::fs::write(&path, bytes).await?;
    log::info!("Saved {}", path.display());
    Ok(report)
}

/// Save a rendered document
pub async fn save_pdf(mut doc: Document, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref().to_owned();
    let bytes = tokio::task::spawn_blocking(move || {
        let mut writer = Vec::new();
        doc.save_to(&mut writer)?;
        Ok::<_, StickerError>(writer)
    })
    .await??;
    tokio::fs::write(&path, bytes).await?;
    Ok(())
}

/// Encode a composite as a JPEG image XObject stream
pub fn image_xobject(image: &RgbImage, quality: u8) -> Result<Stream> {
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(image)?;

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", image.width() as i64);
    dict.set("Height", image.height() as i64);
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

    // Already DCT-compressed
    Ok(Stream::new(dict, bytes).with_compression(false))
}

// =============================================================================
// Helper Functions
// =============================================================================

struct SheetWriter<'a> {
    output: &'a mut Document,
    units: &'a [ImageUnit],
    geometry: &'a SheetGeometry,
    options: &'a PdfExportOptions,
    page_height_pt: f32,
    /// `None` marks a composite that failed; it is not retried
    composites: HashMap<CompositeKey, Option<ObjectId>>,
    failures: Vec<UnitFailure>,
}

impl SheetWriter<'_> {
    /// Place one placement into `rect` (sheet millimeters)
    fn place(
        &mut self,
        placement: &Placement,
        rect: Rect,
        content_ops: &mut String,
        xobjects: &mut Dictionary,
    ) -> Result<()> {
        let Some(xobject_id) = self.composite(placement)? else {
            return Ok(());
        };

        let name = format!("Im{}", xobject_id.0);
        xobjects.set(name.as_bytes(), Object::Reference(xobject_id));

        content_ops.push_str(&format!(
            "q {} 0 0 {} {} {} cm /{} Do Q\n",
            mm_to_pt(rect.width),
            mm_to_pt(rect.height),
            mm_to_pt(rect.x),
            self.page_height_pt - mm_to_pt(rect.bottom()),
            name
        ));
        Ok(())
    }

    fn composite(&mut self, placement: &Placement) -> Result<Option<ObjectId>> {
        let key = placement.composite_key();
        if let Some(cached) = self.composites.get(&key) {
            return Ok(*cached);
        }

        let unit = self
            .units
            .get(placement.unit_index)
            .filter(|unit| unit.id == placement.unit_id)
            .ok_or_else(|| StickerError::UnknownUnit(placement.unit_id.clone()))?;

        let (width_mm, height_mm) = self.geometry.target_dimensions_mm(placement.target);
        let encoded = composite_unit(unit, width_mm, height_mm, self.options.scale)
            .and_then(|raster| image_xobject(&raster, self.options.jpeg_quality));

        let entry = match encoded {
            Ok(stream) => {
                log::debug!("Composited {}", key);
                Some(self.output.add_object(stream))
            }
            Err(e) if !self.options.strict => {
                log::warn!("Skipping {} ({}): {}", unit.display_name, unit.id, e);
                self.failures.push(UnitFailure {
                    unit_id: unit.id.clone(),
                    display_name: unit.display_name.clone(),
                    message: e.to_string(),
                });
                None
            }
            Err(e) => return Err(e),
        };

        self.composites.insert(key, entry);
        Ok(entry)
    }

    fn add_page(
        &mut self,
        parent_pages_id: ObjectId,
        page_width_pt: f32,
        content_ops: String,
        xobjects: Dictionary,
    ) -> ObjectId {
        let mut resources = Dictionary::new();
        resources.set("XObject", Object::Dictionary(xobjects));

        let content_id = self
            .output
            .add_object(Stream::new(Dictionary::new(), content_ops.into_bytes()));

        let mut page_dict = Dictionary::new();
        page_dict.set("Type", Object::Name(b"Page".to_vec()));
        page_dict.set("Parent", Object::Reference(parent_pages_id));
        page_dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page_width_pt),
                Object::Real(self.page_height_pt),
            ]),
        );
        page_dict.set("Contents", Object::Reference(content_id));
        page_dict.set("Resources", Object::Dictionary(resources));

        self.output.add_object(page_dict)
    }
}
