//! Image compositing
//!
//! Every raster that ends up on a sheet goes through [`composite`]: the
//! preview at screen scale and the PDF at print scale. The output is always
//! an opaque RGB image of the requested pixel size.

use crate::color::Color;
use crate::constants::{MAX_RASTER_PIXELS, MAX_ZOOM, MIN_ZOOM};
use crate::types::*;
use crate::unit::{Flip, ImageUnit, PixelRect};
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, RgbImage, RgbaImage};

/// Resampling filter for all resizes. Triangle has no negative lobes, so
/// flat regions stay flat.
const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// What to produce from a source raster
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeRequest {
    /// Physical target width
    pub width_mm: f32,
    /// Physical target height
    pub height_mm: f32,
    /// Pixels per millimeter
    pub scale: f32,
    pub fit: FitMode,
    pub background: Color,
}

impl CompositeRequest {
    /// Output size: `ceil(mm × scale)` per axis, at least one pixel
    pub fn pixel_dimensions(&self) -> (u32, u32) {
        let px = |mm: f32| ((mm * self.scale).ceil() as u32).max(1);
        (px(self.width_mm), px(self.height_mm))
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width_mm / self.height_mm
    }
}

/// Flatten `source` into the target box described by `request`.
pub fn composite(source: &DynamicImage, request: &CompositeRequest) -> RgbImage {
    let (out_w, out_h) = request.pixel_dimensions();
    let mut canvas = RgbaImage::from_pixel(out_w, out_h, request.background.to_rgba());

    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 {
        return DynamicImage::ImageRgba8(canvas).to_rgb8();
    }

    match request.fit {
        FitMode::Cover => {
            let (x, y, w, h) = cover_crop_rect(src_w, src_h, request.aspect_ratio());
            let framed = source
                .crop_imm(x, y, w, h)
                .resize_exact(out_w, out_h, RESIZE_FILTER)
                .to_rgba8();
            imageops::overlay(&mut canvas, &framed, 0, 0);
        }
        FitMode::Contain => {
            let scale = (out_w as f32 / src_w as f32).min(out_h as f32 / src_h as f32);
            let w = ((src_w as f32 * scale).round() as u32).clamp(1, out_w);
            let h = ((src_h as f32 * scale).round() as u32).clamp(1, out_h);
            let fitted = source.resize_exact(w, h, RESIZE_FILTER).to_rgba8();
            imageops::overlay(
                &mut canvas,
                &fitted,
                ((out_w - w) / 2) as i64,
                ((out_h - h) / 2) as i64,
            );
        }
    }

    DynamicImage::ImageRgba8(canvas).to_rgb8()
}

/// Composite `unit` into a `width_mm × height_mm` box at `scale`.
///
/// Uses the baked raster when there is one, otherwise the decoded original
/// with the unit's own fit mode.
pub fn composite_unit(
    unit: &ImageUnit,
    width_mm: f32,
    height_mm: f32,
    scale: f32,
) -> Result<RgbImage> {
    let (source, fit) = unit.resolve_source()?;
    Ok(composite(
        &source,
        &CompositeRequest {
            width_mm,
            height_mm,
            scale,
            fit,
            background: unit.background,
        },
    ))
}

/// The centered region of a `src_w × src_h` raster that has `target_aspect`
/// and loses as little as possible. Returns `(x, y, width, height)`.
pub fn cover_crop_rect(src_w: u32, src_h: u32, target_aspect: f32) -> (u32, u32, u32, u32) {
    let source_aspect = src_w as f32 / src_h as f32;
    if source_aspect > target_aspect {
        let w = ((src_h as f32 * target_aspect).round() as u32).clamp(1, src_w);
        ((src_w - w) / 2, 0, w, src_h)
    } else {
        let h = ((src_w as f32 / target_aspect).round() as u32).clamp(1, src_h);
        (0, (src_h - h) / 2, src_w, h)
    }
}

/// Bounding box of a `width × height` rectangle rotated by `degrees`
pub fn rotated_size(width: f32, height: f32, degrees: f32) -> (f32, f32) {
    let (sin, cos) = degrees.to_radians().sin_cos();
    (
        (cos * width).abs() + (sin * height).abs(),
        (sin * width).abs() + (cos * height).abs(),
    )
}

/// Crop area centered in the rotated original, with `aspect` and framed so
/// that `zoom = 1` is the largest such area that fits.
pub fn centered_crop_area(
    src_w: u32,
    src_h: u32,
    rotation: f32,
    aspect: f32,
    zoom: f32,
) -> PixelRect {
    let (box_w, box_h) = rotated_size(src_w as f32, src_h as f32, rotation);
    let (base_w, base_h) = if box_w / box_h > aspect {
        (box_h * aspect, box_h)
    } else {
        (box_w, box_w / aspect)
    };
    let width = base_w / zoom;
    let height = base_h / zoom;
    PixelRect {
        x: (box_w - width) / 2.0,
        y: (box_h - height) / 2.0,
        width,
        height,
    }
}

/// Reject zoom factors outside the editor's range
pub fn check_zoom(zoom: f32) -> Result<()> {
    if zoom.is_finite() && (MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        Ok(())
    } else {
        Err(StickerError::Config(format!(
            "Zoom {} outside {}..={}",
            zoom, MIN_ZOOM, MAX_ZOOM
        )))
    }
}

/// Reject a crop area the editor could not have produced for a `src_w × src_h`
/// original rotated by `rotation`.
///
/// At the smallest zoom the area may be `1 / MIN_ZOOM` times the rotated
/// bounding box; its pixel count is capped either way.
pub fn check_crop_area(area: PixelRect, src_w: u32, src_h: u32, rotation: f32) -> Result<()> {
    let invalid = |reason: &str| {
        StickerError::Config(format!(
            "Crop area {}x{} at ({}, {}) {}",
            area.width, area.height, area.x, area.y, reason
        ))
    };

    let values = [area.x, area.y, area.width, area.height, rotation];
    if values.iter().any(|v| !v.is_finite()) {
        return Err(invalid("is not finite"));
    }
    if area.width <= 0.0 || area.height <= 0.0 {
        return Err(invalid("is empty"));
    }

    let (box_w, box_h) = rotated_size(src_w as f32, src_h as f32, rotation);
    // One pixel of slack for rounding in the editor
    let max_w = box_w / MIN_ZOOM + 1.0;
    let max_h = box_h / MIN_ZOOM + 1.0;
    if area.width > max_w || area.height > max_h {
        return Err(invalid("exceeds the source"));
    }
    if area.x.abs() > max_w || area.y.abs() > max_h {
        return Err(invalid("lies outside the source"));
    }

    let pixels = area.width.round() as u64 * area.height.round() as u64;
    if pixels > MAX_RASTER_PIXELS {
        return Err(invalid("is too large to bake"));
    }
    Ok(())
}

/// Reproduce the crop editor's output.
///
/// The original is rotated about its center into its bounding box, flipped,
/// and `area` is cut out of that box. Pixels outside the original, and any
/// transparency, show `background`. The area is checked with
/// [`check_crop_area`] first.
pub fn bake_edit(
    source: &DynamicImage,
    area: PixelRect,
    rotation: f32,
    flip: Flip,
    background: Color,
) -> Result<RgbImage> {
    check_crop_area(area, source.width(), source.height(), rotation)?;

    let out_w = (area.width.round() as u32).max(1);
    let out_h = (area.height.round() as u32).max(1);

    let rgba = source.to_rgba8();
    let (src_w, src_h) = (rgba.width() as f32, rgba.height() as f32);
    let (box_w, box_h) = rotated_size(src_w, src_h, rotation);
    let (sin, cos) = rotation.to_radians().sin_cos();
    let fx = if flip.horizontal { -1.0 } else { 1.0 };
    let fy = if flip.vertical { -1.0 } else { 1.0 };
    let bg = background.to_rgb();

    Ok(RgbImage::from_fn(out_w, out_h, |ox, oy| {
        // Offset from the bounding box center
        let dx = area.x + ox as f32 + 0.5 - box_w / 2.0;
        let dy = area.y + oy as f32 + 0.5 - box_h / 2.0;

        // Undo rotation, then flip
        let sx = (cos * dx + sin * dy) * fx + src_w / 2.0;
        let sy = (-sin * dx + cos * dy) * fy + src_h / 2.0;

        if sx < 0.0 || sy < 0.0 || sx >= src_w || sy >= src_h {
            return bg;
        }

        let p = rgba.get_pixel(sx as u32, sy as u32);
        blend_over(p.0, bg.0)
    }))
}

/// Approximate the editor's zoom on an unedited original for live preview.
///
/// Zooming in crops the center; zooming out pads with `background`.
pub fn apply_zoom(source: &DynamicImage, zoom: f32, background: Color) -> Result<DynamicImage> {
    check_zoom(zoom)?;
    if (zoom - 1.0).abs() < f32::EPSILON {
        return Ok(source.clone());
    }

    let (src_w, src_h) = source.dimensions();
    let w = ((src_w as f32 / zoom).round() as u32).max(1);
    let h = ((src_h as f32 / zoom).round() as u32).max(1);

    if w as u64 * h as u64 > MAX_RASTER_PIXELS {
        return Err(StickerError::Config(format!(
            "Zoom {} would need a {}x{} canvas",
            zoom, w, h
        )));
    }

    if zoom > 1.0 {
        Ok(source.crop_imm((src_w - w) / 2, (src_h - h) / 2, w, h))
    } else {
        let mut canvas = RgbaImage::from_pixel(w, h, background.to_rgba());
        imageops::overlay(
            &mut canvas,
            &source.to_rgba8(),
            ((w - src_w) / 2) as i64,
            ((h - src_h) / 2) as i64,
        );
        Ok(DynamicImage::ImageRgba8(canvas))
    }
}

fn blend_over(fg: [u8; 4], bg: [u8; 3]) -> image::Rgb<u8> {
    let alpha = fg[3] as f32 / 255.0;
    let mix = |f: u8, b: u8| (f as f32 * alpha + b as f32 * (1.0 - alpha)).round() as u8;
    image::Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
    const GREEN: Color = Color::rgb(0, 255, 0);

    fn solid(w: u32, h: u32, color: Rgba<u8>) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(w, h, color))
    }

    fn request(width_mm: f32, height_mm: f32, fit: FitMode) -> CompositeRequest {
        CompositeRequest {
            width_mm,
            height_mm,
            scale: 1.0,
            fit,
            background: GREEN,
        }
    }

    #[test]
    fn test_pixel_dimensions_round_up() {
        let r = CompositeRequest {
            scale: 11.8,
            ..request(34.0, 47.0, FitMode::Cover)
        };
        assert_eq!(r.pixel_dimensions(), (402, 555));
    }

    #[test]
    fn test_cover_fills_target() {
        let out = composite(&solid(300, 100, RED), &request(40.0, 60.0, FitMode::Cover));

        assert_eq!(out.dimensions(), (40, 60));
        for p in out.pixels() {
            assert!(p[0] > 250 && p[1] < 5, "background visible: {:?}", p);
        }
    }

    #[test]
    fn test_contain_letterboxes_with_background() {
        let out = composite(&solid(100, 100, RED), &request(40.0, 20.0, FitMode::Contain));

        assert_eq!(out.dimensions(), (40, 20));
        assert_eq!(out.get_pixel(0, 10).0, [0, 255, 0]);
        assert_eq!(out.get_pixel(39, 10).0, [0, 255, 0]);
        assert_eq!(out.get_pixel(20, 10).0, [255, 0, 0]);
    }

    #[test]
    fn test_transparency_shows_background() {
        let out = composite(
            &solid(10, 10, Rgba([0, 0, 0, 0])),
            &request(10.0, 10.0, FitMode::Cover),
        );
        assert!(out.pixels().all(|p| p.0 == [0, 255, 0]));
    }

    #[test]
    fn test_cover_crop_rect_centers() {
        // Wide source into a square: crop width
        assert_eq!(cover_crop_rect(300, 100, 1.0), (100, 0, 100, 100));
        // Tall source into a square: crop height
        assert_eq!(cover_crop_rect(100, 300, 1.0), (0, 100, 100, 100));
    }

    #[test]
    fn test_bake_edit_identity() {
        let source = solid(20, 10, RED);
        let area = PixelRect {
            x: 0.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
        };
        let out = bake_edit(&source, area, 0.0, Flip::default(), GREEN).unwrap();
        assert_eq!(out.dimensions(), (20, 10));
        assert!(out.pixels().all(|p| p.0 == [255, 0, 0]));
    }

    #[test]
    fn test_bake_edit_fills_outside_with_background() {
        let source = solid(10, 10, RED);
        let area = PixelRect {
            x: -5.0,
            y: 0.0,
            width: 20.0,
            height: 10.0,
        };
        let out = bake_edit(&source, area, 0.0, Flip::default(), GREEN).unwrap();
        assert_eq!(out.get_pixel(0, 5).0, [0, 255, 0]);
        assert_eq!(out.get_pixel(10, 5).0, [255, 0, 0]);
        assert_eq!(out.get_pixel(19, 5).0, [0, 255, 0]);
    }

    #[test]
    fn test_bake_edit_rotation_and_flip() {
        // Left half red, right half blue
        let mut img = RgbaImage::from_pixel(20, 10, RED);
        for y in 0..10 {
            for x in 10..20 {
                img.put_pixel(x, y, Rgba([0, 0, 255, 255]));
            }
        }
        let source = DynamicImage::ImageRgba8(img);

        let flipped = bake_edit(
            &source,
            PixelRect {
                x: 0.0,
                y: 0.0,
                width: 20.0,
                height: 10.0,
            },
            0.0,
            Flip {
                horizontal: true,
                vertical: false,
            },
            GREEN,
        )
        .unwrap();
        assert_eq!(flipped.get_pixel(2, 5).0, [0, 0, 255]);
        assert_eq!(flipped.get_pixel(17, 5).0, [255, 0, 0]);

        // 90° clockwise: the red left half ends up on top
        let rotated = bake_edit(
            &source,
            PixelRect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 20.0,
            },
            90.0,
            Flip::default(),
            GREEN,
        )
        .unwrap();
        assert_eq!(rotated.dimensions(), (10, 20));
        assert_eq!(rotated.get_pixel(5, 2).0, [255, 0, 0]);
        assert_eq!(rotated.get_pixel(5, 17).0, [0, 0, 255]);
    }

    #[test]
    fn test_centered_crop_area() {
        let area = centered_crop_area(200, 100, 0.0, 1.0, 1.0);
        assert_eq!((area.x, area.y, area.width, area.height), (50.0, 0.0, 100.0, 100.0));

        let zoomed = centered_crop_area(200, 100, 0.0, 1.0, 2.0);
        assert_eq!(
            (zoomed.x, zoomed.y, zoomed.width, zoomed.height),
            (75.0, 25.0, 50.0, 50.0)
        );
    }

    #[test]
    fn test_apply_zoom() {
        let source = solid(100, 50, RED);
        assert_eq!(apply_zoom(&source, 2.0, GREEN).unwrap().dimensions(), (50, 25));

        let out = apply_zoom(&source, 0.5, GREEN).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (200, 100));
        assert_eq!(out.get_pixel(0, 0).0, [0, 255, 0]);
        assert_eq!(out.get_pixel(100, 50).0, [255, 0, 0]);
    }

    #[test]
    fn test_apply_zoom_rejects_out_of_range() {
        let source = solid(100, 50, RED);
        for zoom in [0.0, 1e-9, -1.0, 11.0, f32::NAN, f32::INFINITY] {
            assert!(
                matches!(apply_zoom(&source, zoom, GREEN), Err(StickerError::Config(_))),
                "zoom {} accepted",
                zoom
            );
        }
        assert!(apply_zoom(&source, MIN_ZOOM, GREEN).is_ok());
    }

    #[test]
    fn test_bake_edit_rejects_oversized_area() {
        let source = solid(20, 10, RED);
        let area = |width: f32, height: f32| PixelRect {
            x: 0.0,
            y: 0.0,
            width,
            height,
        };

        for bad in [area(1e10, 1e10), area(0.0, 10.0), area(f32::NAN, 10.0), area(202.0, 10.0)] {
            assert!(matches!(
                bake_edit(&source, bad, 0.0, Flip::default(), GREEN),
                Err(StickerError::Config(_))
            ));
        }

        // Zoomed all the way out is still allowed
        let out = bake_edit(&source, area(200.0, 100.0), 0.0, Flip::default(), GREEN).unwrap();
        assert_eq!(out.dimensions(), (200, 100));
    }

    #[test]
    fn test_crop_area_pixel_cap() {
        let area = PixelRect {
            x: 0.0,
            y: 0.0,
            width: 10_000.0,
            height: 10_000.0,
        };
        assert!(check_crop_area(area, 8_000, 8_000, 0.0).is_err());
    }
}
