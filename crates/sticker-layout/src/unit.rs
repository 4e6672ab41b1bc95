//! Image units and the ordered list that holds them
//!
//! A unit owns its encoded original and, once edited, the baked raster
//! derived from it. Both sit behind `Arc` so list snapshots share pixels;
//! replacing or removing a unit drops its rasters once no snapshot refers
//! to them any more.

use crate::color::Color;
use crate::compositor::{bake_edit, centered_crop_area, check_zoom};
use crate::layout::{SheetGeometry, target_for};
use crate::types::*;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Opaque identifier of an image unit, stable across reorders
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(String);

impl UnitId {
    /// A fresh random id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for UnitId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encoded image bytes as supplied by the user.
///
/// Decoding is deferred until a composite needs pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Encode a raster as PNG
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let mut bytes = Vec::new();
        image.write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(Self { bytes })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Format detected from the magic bytes
    pub fn format(&self) -> image::ImageResult<ImageFormat> {
        image::guess_format(&self.bytes)
    }

    /// File extension matching the detected format
    pub fn extension(&self) -> Option<&'static str> {
        self.format()
            .ok()
            .and_then(|format| format.extensions_str().first().copied())
    }

    pub fn media_type(&self) -> Option<&'static str> {
        self.format().ok().map(|format| format.to_mime_type())
    }

    pub fn decode(&self) -> image::ImageResult<DynamicImage> {
        image::load_from_memory(&self.bytes)
    }
}

/// Crop offset as reported by the interactive editor
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CropOffset {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flip {
    pub horizontal: bool,
    pub vertical: bool,
}

/// Crop rectangle in the pixel space of the rotated original
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// Editor state describing how the original maps onto the baked raster
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSettings {
    #[serde(default)]
    pub crop: CropOffset,
    #[serde(default = "default_zoom")]
    pub zoom: f32,
    /// Degrees, 0–360
    #[serde(default)]
    pub rotation: f32,
    #[serde(default)]
    pub flip: Flip,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_area: Option<PixelRect>,
}

fn default_zoom() -> f32 {
    1.0
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            crop: CropOffset::default(),
            zoom: default_zoom(),
            rotation: 0.0,
            flip: Flip::default(),
            crop_area: None,
        }
    }
}

/// One user-supplied picture plus its placement parameters
#[derive(Debug, Clone)]
pub struct ImageUnit {
    pub id: UnitId,
    pub display_name: String,
    original: Arc<EncodedImage>,
    edited: Option<Arc<DynamicImage>>,
    pub edit: EditSettings,
    pub background: Color,
    pub fit_mode: FitMode,
    pub sticker_size: StickerSize,
    pub quantity: usize,
}

impl ImageUnit {
    /// A freshly imported unit with default parameters
    pub fn new(display_name: impl Into<String>, original: EncodedImage) -> Self {
        Self {
            id: UnitId::generate(),
            display_name: display_name.into(),
            original: Arc::new(original),
            edited: None,
            edit: EditSettings::default(),
            background: Color::WHITE,
            fit_mode: FitMode::Cover,
            sticker_size: StickerSize::Half,
            quantity: 1,
        }
    }

    pub fn from_bytes(display_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(display_name, EncodedImage::new(bytes))
    }

    pub fn with_id(mut self, id: UnitId) -> Self {
        self.id = id;
        self
    }

    pub fn with_quantity(mut self, quantity: usize) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    pub fn with_sticker_size(mut self, sticker_size: StickerSize) -> Self {
        self.sticker_size = sticker_size;
        self
    }

    pub fn with_fit_mode(mut self, fit_mode: FitMode) -> Self {
        self.fit_mode = fit_mode;
        self
    }

    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    pub fn original(&self) -> &EncodedImage {
        &self.original
    }

    /// The baked raster, if the unit has been edited
    pub fn edited(&self) -> Option<&DynamicImage> {
        self.edited.as_deref()
    }

    pub fn is_edited(&self) -> bool {
        self.edited.is_some()
    }

    /// Decode the original, attributing failures to this unit
    pub fn decode_original(&self) -> Result<DynamicImage> {
        self.original.decode().map_err(|source| StickerError::Decode {
            unit: self.id.clone(),
            source,
        })
    }

    /// The raster to composite and the fit mode to composite it with.
    ///
    /// A baked raster is already framed, so it is always covered.
    pub fn resolve_source(&self) -> Result<(Arc<DynamicImage>, FitMode)> {
        match &self.edited {
            Some(baked) => Ok((Arc::clone(baked), FitMode::Cover)),
            None => Ok((Arc::new(self.decode_original()?), self.fit_mode)),
        }
    }

    /// Bake `settings` into a new raster and return the edited unit.
    ///
    /// The settings must carry a crop area; the previous baked raster is
    /// released with the old unit.
    pub fn apply_edit(&self, settings: EditSettings, background: Color) -> Result<ImageUnit> {
        let area = settings.crop_area.ok_or_else(|| {
            StickerError::Config(format!("Edit for unit {} has no crop area", self.id))
        })?;
        let original = self.decode_original()?;
        let baked = bake_edit(&original, area, settings.rotation, settings.flip, background)?;

        log::debug!(
            "Baked edit for {} ({}x{} px)",
            self.id,
            baked.width(),
            baked.height()
        );

        Ok(ImageUnit {
            edited: Some(Arc::new(DynamicImage::ImageRgb8(baked))),
            edit: settings,
            background,
            ..self.clone()
        })
    }

    /// Drop the baked raster and the edit that produced it
    pub fn clear_edit(&self) -> ImageUnit {
        ImageUnit {
            edited: None,
            edit: EditSettings::default(),
            ..self.clone()
        }
    }

    /// Re-frame the unit around its center at `zoom`, resetting any manual
    /// crop. Rotation and flip are kept.
    pub fn with_zoom(&self, zoom: f32, aspect: f32) -> Result<ImageUnit> {
        check_zoom(zoom)?;
        let original = self.decode_original()?;
        let area = centered_crop_area(
            original.width(),
            original.height(),
            self.edit.rotation,
            aspect,
            zoom,
        );
        let settings = EditSettings {
            crop: CropOffset::default(),
            zoom,
            crop_area: Some(area),
            ..self.edit
        };
        let baked = bake_edit(&original, area, settings.rotation, settings.flip, self.background)?;

        Ok(ImageUnit {
            edited: Some(Arc::new(DynamicImage::ImageRgb8(baked))),
            edit: settings,
            ..self.clone()
        })
    }
}

/// The ordered list of image units.
///
/// Every operation returns a new list; the order is the placement order on
/// the sheet.
#[derive(Debug, Clone, Default)]
pub struct ImageList {
    units: Vec<ImageUnit>,
}

impl ImageList {
    pub fn new(units: Vec<ImageUnit>) -> Self {
        Self { units }
    }

    pub fn as_slice(&self) -> &[ImageUnit] {
        &self.units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageUnit> {
        self.units.iter()
    }

    pub fn get(&self, id: &UnitId) -> Option<&ImageUnit> {
        self.units.iter().find(|unit| &unit.id == id)
    }

    fn index_of(&self, id: &UnitId) -> Result<usize> {
        self.units
            .iter()
            .position(|unit| &unit.id == id)
            .ok_or_else(|| StickerError::UnknownUnit(id.clone()))
    }

    /// Append units at the end
    pub fn with_units(&self, units: impl IntoIterator<Item = ImageUnit>) -> Self {
        let mut next = self.units.clone();
        next.extend(units);
        Self::new(next)
    }

    pub fn without_unit(&self, id: &UnitId) -> Result<Self> {
        let index = self.index_of(id)?;
        let mut next = self.units.clone();
        next.remove(index);
        Ok(Self::new(next))
    }

    pub fn cleared(&self) -> Self {
        Self::default()
    }

    /// Move the unit at `from` so that it ends up at `to`
    pub fn reordered(&self, from: usize, to: usize) -> Result<Self> {
        let len = self.units.len();
        if from >= len || to >= len {
            return Err(StickerError::Config(format!(
                "Cannot move item {} to {} in a list of {}",
                from, to, len
            )));
        }
        let mut next = self.units.clone();
        let unit = next.remove(from);
        next.insert(to, unit);
        Ok(Self::new(next))
    }

    /// Replace the unit `id` with `transform(unit)`
    pub fn updated<F>(&self, id: &UnitId, transform: F) -> Result<Self>
    where
        F: FnOnce(&ImageUnit) -> Result<ImageUnit>,
    {
        let index = self.index_of(id)?;
        let replacement = transform(&self.units[index])?;
        let mut next = self.units.clone();
        next[index] = replacement;
        Ok(Self::new(next))
    }

    /// Replace every unit with `transform(unit)`, keeping the order
    pub fn apply_all<F>(&self, transform: F) -> Self
    where
        F: FnMut(&ImageUnit) -> ImageUnit,
    {
        Self::new(self.units.iter().map(transform).collect())
    }

    pub fn apply_background_all(&self, background: Color) -> Self {
        self.apply_all(|unit| unit.clone().with_background(background))
    }

    pub fn apply_size_all(&self, sticker_size: StickerSize) -> Self {
        self.apply_all(|unit| unit.clone().with_sticker_size(sticker_size))
    }

    /// Re-frame every unit at `zoom`. Units that cannot be decoded are
    /// kept unchanged.
    pub fn apply_zoom_all(&self, zoom: f32, geometry: &SheetGeometry) -> Self {
        self.apply_all(|unit| {
            let target = target_for(unit.sticker_size, geometry.slot_count);
            match unit.with_zoom(zoom, geometry.aspect_ratio(target)) {
                Ok(zoomed) => zoomed,
                Err(e) => {
                    log::warn!("Keeping {} unchanged: {}", unit.display_name, e);
                    unit.clone()
                }
            }
        })
    }

    /// Total number of placements the list contributes
    pub fn placement_count(&self) -> usize {
        self.units.iter().map(|unit| unit.quantity).sum()
    }
}

impl From<Vec<ImageUnit>> for ImageList {
    fn from(units: Vec<ImageUnit>) -> Self {
        Self::new(units)
    }
}
