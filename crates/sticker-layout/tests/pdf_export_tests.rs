use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use lopdf::{Document, Object};
use sticker_layout::*;
use tempfile::TempDir;

fn png_unit(id: &str, w: u32, h: u32) -> ImageUnit {
    let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([200, 40, 40])));
    ImageUnit::new(format!("{}.png", id), EncodedImage::from_image(&image).unwrap())
        .with_id(UnitId::from(id))
}

fn fast() -> PdfExportOptions {
    PdfExportOptions {
        scale: 1.0,
        ..PdfExportOptions::default()
    }
}

fn page_content(doc: &Document, page: usize) -> String {
    let page_id = doc.get_pages()[&(page as u32 + 1)];
    String::from_utf8(doc.get_page_content(page_id).unwrap()).unwrap()
}

fn page_xobject_count(doc: &Document, page: usize) -> usize {
    let page_id = doc.get_pages()[&(page as u32 + 1)];
    let page = doc.get_dictionary(page_id).unwrap();
    let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
    resources.get(b"XObject").unwrap().as_dict().unwrap().len()
}

fn placements(content: &str) -> Vec<Vec<f32>> {
    content
        .lines()
        .filter(|l| l.ends_with(" Do Q"))
        .map(|l| {
            l.split_whitespace()
                .filter_map(|t| t.parse::<f32>().ok())
                .collect()
        })
        .collect()
}

#[test]
fn test_one_page_per_sheet() {
    let units = vec![png_unit("a", 40, 30).with_quantity(37)];
    let (doc, report) = render_pdf(&units, &PaperConfig::default(), &fast()).unwrap();

    assert_eq!(report.pages, 2);
    assert_eq!(report.cells, 19);
    assert_eq!(report.composites, 1);
    assert_eq!(doc.get_pages().len(), 2);
}

#[test]
fn test_media_box_matches_page() {
    let config = PaperConfig::default().with_orientation(Orientation::Landscape);
    let (doc, _) = render_pdf(&[], &config, &fast()).unwrap();

    let page_id = doc.get_pages()[&1];
    let media_box = doc
        .get_dictionary(page_id)
        .unwrap()
        .get(b"MediaBox")
        .unwrap()
        .as_array()
        .unwrap()
        .clone();
    let width = media_box[2].as_float().unwrap();
    let height = media_box[3].as_float().unwrap();
    assert!((width - 297.0 * 72.0 / 25.4).abs() < 0.01);
    assert!((height - 210.0 * 72.0 / 25.4).abs() < 0.01);
}

#[test]
fn test_placements_at_millimeter_positions() {
    let mut config = PaperConfig::default();
    config.gaps = Gaps::new(2.0, 3.0);
    let g = config.geometry().unwrap();
    let units = vec![png_unit("a", 40, 30).with_quantity(8)];

    let (doc, _) = render_pdf(&units, &config, &fast()).unwrap();
    let ops = placements(&page_content(&doc, 0));
    assert_eq!(ops.len(), 8);

    let pt = |mm: f32| mm * 72.0 / 25.4;
    let page_h = pt(297.0);

    // Fourth cell is row 1, col 0; its second slot is offset by one slot width
    let slot = &ops[7];
    let x = 3.0 + g.slot_width_mm;
    let y_top = 7.5 + g.cell_height_mm + 3.0;
    assert!((slot[0] - pt(g.slot_width_mm)).abs() < 0.01);
    assert!((slot[3] - pt(g.slot_height_mm)).abs() < 0.01);
    assert!((slot[4] - pt(x)).abs() < 0.01);
    assert!((slot[5] - (page_h - pt(y_top + g.slot_height_mm))).abs() < 0.01);
}

#[test]
fn test_cut_lines_only_for_split_cells() {
    let units = vec![
        png_unit("a", 40, 30).with_quantity(3),
        png_unit("b", 40, 30).with_sticker_size(StickerSize::Full),
    ];
    let (doc, _) = render_pdf(&units, &PaperConfig::default(), &fast()).unwrap();
    let content = page_content(&doc, 0);

    assert_eq!(content.matches(" l S").count(), 2);
    assert_eq!(placements(&content).len(), 4);

    let options = PdfExportOptions {
        cut_lines: false,
        ..fast()
    };
    let (doc, _) = render_pdf(&units, &PaperConfig::default(), &options).unwrap();
    assert_eq!(page_content(&doc, 0).matches(" l S").count(), 0);
}

#[test]
fn test_horizontal_split_stacks_slots() {
    let mut config = PaperConfig::default();
    config.slot_direction = SlotDirection::Horizontal;
    let g = config.geometry().unwrap();
    let units = vec![png_unit("a", 40, 30).with_quantity(2)];

    let (doc, _) = render_pdf(&units, &config, &fast()).unwrap();
    let content = page_content(&doc, 0);
    let ops = placements(&content);
    assert_eq!(ops.len(), 2);

    let pt = |mm: f32| mm * 72.0 / 25.4;
    let page_h = pt(297.0);

    // Both slots span the cell width at the left margin
    for slot in &ops {
        assert!((slot[0] - pt(g.cell_width_mm)).abs() < 0.01);
        assert!((slot[3] - pt(g.slot_height_mm)).abs() < 0.01);
        assert!((slot[4] - pt(3.0)).abs() < 0.01);
    }
    // Second slot sits one slot height lower
    assert!((ops[0][5] - ops[1][5] - pt(g.slot_height_mm)).abs() < 0.01);
    assert!((ops[0][5] - (page_h - pt(7.5 + g.slot_height_mm))).abs() < 0.01);

    let cut: Vec<f32> = content
        .lines()
        .find(|l| l.ends_with(" l S"))
        .unwrap()
        .split_whitespace()
        .filter_map(|t| t.parse::<f32>().ok())
        .collect();
    assert_eq!(cut.len(), 4);
    assert!((cut[1] - cut[3]).abs() < 0.01);
    assert!((cut[0] - pt(3.0)).abs() < 0.01);
    assert!((cut[2] - pt(3.0 + g.cell_width_mm)).abs() < 0.01);
    assert!((cut[1] - (page_h - pt(7.5 + g.slot_height_mm))).abs() < 0.01);
}

#[test]
fn test_composite_reused_across_pages() {
    let units = vec![png_unit("a", 40, 30).with_quantity(40)];
    let (doc, report) = render_pdf(&units, &PaperConfig::default(), &fast()).unwrap();

    assert_eq!(report.composites, 1);
    assert_eq!(page_xobject_count(&doc, 0), 1);
    assert_eq!(page_xobject_count(&doc, 1), 1);

    let images = doc
        .objects
        .values()
        .filter(|o| match o {
            Object::Stream(s) => {
                s.dict.get(b"Subtype").and_then(|v| v.as_name()).ok() == Some(&b"Image"[..])
            }
            _ => false,
        })
        .count();
    assert_eq!(images, 1);
}

#[test]
fn test_failed_unit_leaves_slot_empty() {
    let units = vec![
        png_unit("a", 40, 30),
        ImageUnit::from_bytes("broken.png", b"definitely not a png".to_vec())
            .with_id(UnitId::from("broken"))
            .with_quantity(2),
        png_unit("c", 40, 30),
    ];
    let (doc, report) = render_pdf(&units, &PaperConfig::default(), &fast()).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].display_name, "broken.png");
    assert!(!report.is_complete());
    assert_eq!(placements(&page_content(&doc, 0)).len(), 2);
}

#[test]
fn test_transparent_source_over_background() {
    let transparent = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 0])));
    let unit = ImageUnit::new("clear.png", EncodedImage::from_image(&transparent).unwrap())
        .with_background(Color::rgb(0, 0, 255));

    let raster = compositor::composite_unit(&unit, 20.0, 10.0, 1.0).unwrap();
    assert_eq!(raster.dimensions(), (20, 10));
    assert!(raster.pixels().all(|p| p.0 == [0, 0, 255]));
}

#[tokio::test]
async fn test_export_writes_loadable_pdf() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(constants::DEFAULT_PDF_FILENAME);
    let units = vec![png_unit("a", 60, 40).with_quantity(2)];

    let report = export_pdf(&units, &PaperConfig::default(), &fast(), &path)
        .await
        .unwrap();
    assert_eq!(report.pages, 1);

    let doc = Document::load(&path).unwrap();
    assert_eq!(doc.get_pages().len(), 1);
    assert_eq!(page_xobject_count(&doc, 0), 1);
}

#[tokio::test]
async fn test_save_rendered_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sheet.pdf");

    let (doc, _) = render_pdf(&[], &PaperConfig::default(), &fast()).unwrap();
    save_pdf(doc, &path).await.unwrap();

    let loaded = Document::load(&path).unwrap();
    assert_eq!(loaded.get_pages().len(), 1);
}
