//! Archive export and import
//!
//! An archive is a ZIP file holding every unit's original image under
//! `stickers/` plus a `metadata.json` document recording the list order,
//! per-unit parameters and edit settings, and the paper configuration.
//! Importing an archive rebuilds the list and re-bakes edits from the
//! originals.

use crate::color::Color;
use crate::config::PaperConfig;
use crate::constants::{ARCHIVE_IMAGE_DIR, ARCHIVE_METADATA_FILE, METADATA_VERSION};
use crate::types::*;
use crate::unit::{EditSettings, ImageUnit, UnitId};
use chrono::{DateTime, Utc};
use image::ImageFormat;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// The `metadata.json` document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub paper_config: Option<PaperConfig>,
    pub items: Vec<ItemMetadata>,
}

/// One unit's entry in the metadata document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    /// 1-based position in the list
    pub order: usize,
    #[serde(default)]
    pub id: Option<UnitId>,
    #[serde(default)]
    pub original_name: Option<String>,
    /// Image file name inside the image folder
    pub filename: String,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    #[serde(default)]
    pub sticker_size: StickerSize,
    #[serde(default)]
    pub fit_mode: FitMode,
    #[serde(default)]
    pub background_color: Color,
    #[serde(default)]
    pub edit_settings: EditSettings,
}

fn default_quantity() -> usize {
    1
}

/// Result of reading an archive
#[derive(Debug, Clone, Default)]
pub struct ImportOutcome {
    /// Units in their recorded order
    pub units: Vec<ImageUnit>,
    /// Paper configuration stored with the archive, if any and valid
    pub paper_config: Option<PaperConfig>,
    /// Problems the user should hear about; settings may be incomplete
    pub warnings: Vec<String>,
    /// `false` when the per-file fallback was used
    pub restored_from_metadata: bool,
}

/// Build an archive of `units` in list order.
///
/// Fails if any original is not in a recognizable image format.
pub fn build_archive(units: &[ImageUnit], config: Option<&PaperConfig>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut items = Vec::with_capacity(units.len());
    for (index, unit) in units.iter().enumerate() {
        let order = index + 1;
        let extension = unit.original().extension().ok_or_else(|| {
            StickerError::Config(format!(
                "Unrecognized image format for {}",
                unit.display_name
            ))
        })?;
        let filename = format!(
            "{:03}-{}.{}",
            order,
            sanitize_file_stem(&unit.display_name),
            extension
        );

        writer.start_file(format!("{}/{}", ARCHIVE_IMAGE_DIR, filename), options)?;
        writer.write_all(unit.original().bytes())?;
        log::debug!("Archived {} as {}", unit.id, filename);

        items.push(ItemMetadata {
            order,
            id: Some(unit.id.clone()),
            original_name: Some(unit.display_name.clone()),
            filename,
            quantity: unit.quantity,
            sticker_size: unit.sticker_size,
            fit_mode: unit.fit_mode,
            background_color: unit.background,
            edit_settings: unit.edit,
        });
    }

    let metadata = ArchiveMetadata {
        version: METADATA_VERSION,
        created_at: Some(Utc::now()),
        paper_config: config.cloned(),
        items,
    };
    writer.start_file(ARCHIVE_METADATA_FILE, options)?;
    serde_json::to_writer_pretty(&mut writer, &metadata)?;

    let bytes = writer.finish()?.into_inner();
    log::info!("Built archive with {} image(s)", units.len());
    Ok(bytes)
}

/// Build an archive and write it to `path`
pub async fn export_archive(
    units: &[ImageUnit],
    config: Option<&PaperConfig>,
    path: impl AsRef<Path>,
) -> Result<()> {
    let path = path.as_ref().to_owned();
    let units = units.to_vec();
    let config = config.cloned();

    let bytes =
        tokio::task::spawn_blocking(move || build_archive(&units, config.as_ref())).await??;
    tokio::fs::write(&path, bytes).await?;
    log::info!("Saved {}", path.display());
    Ok(())
}

/// Rebuild the unit list from archive bytes.
///
/// A missing, legacy or unparsable metadata document falls back to
/// importing every image file with default parameters.
pub fn read_archive(bytes: &[u8]) -> Result<ImportOutcome> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    let mut warnings = Vec::new();

    match read_metadata(&mut archive) {
        Ok(MetadataDocument::Current(metadata))
            if metadata.items.is_empty() && has_image_entries(&archive) =>
        {
            log::warn!("Metadata lists no items but the archive holds images");
            warnings.push(format!(
                "{} lists no stickers; images imported with default settings",
                ARCHIVE_METADATA_FILE
            ));
        }
        Ok(MetadataDocument::Current(metadata)) => {
            return restore_from_metadata(&mut archive, metadata);
        }
        Ok(MetadataDocument::Legacy) => {
            log::info!("Legacy metadata found, importing images with default settings");
            warnings.push(
                "Archive uses an old metadata format; sticker settings were reset".to_string(),
            );
        }
        Ok(MetadataDocument::Missing) => {
            log::info!("No metadata found, importing images with default settings");
        }
        Err(e) => {
            log::warn!("Could not read {}: {}", ARCHIVE_METADATA_FILE, e);
            warnings.push(format!(
                "Could not read {} ({}); settings may be incomplete",
                ARCHIVE_METADATA_FILE, e
            ));
        }
    }

    let units = import_image_files(&mut archive)?;
    Ok(ImportOutcome {
        units,
        paper_config: None,
        warnings,
        restored_from_metadata: false,
    })
}

/// Read and rebuild the archive at `path`
pub async fn import_archive(path: impl AsRef<Path>) -> Result<ImportOutcome> {
    let bytes = tokio::fs::read(path.as_ref()).await?;
    let outcome = tokio::task::spawn_blocking(move || read_archive(&bytes)).await??;
    log::info!(
        "Imported {} image(s) from {}",
        outcome.units.len(),
        path.as_ref().display()
    );
    Ok(outcome)
}

// =============================================================================
// Helper Functions
// =============================================================================

enum MetadataDocument {
    Current(ArchiveMetadata),
    /// A bare item array from before the versioned document
    Legacy,
    Missing,
}

fn read_metadata<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<MetadataDocument> {
    let mut text = String::new();
    match archive.by_name(ARCHIVE_METADATA_FILE) {
        Ok(mut file) => {
            file.read_to_string(&mut text)?;
        }
        Err(ZipError::FileNotFound) => return Ok(MetadataDocument::Missing),
        Err(e) => return Err(e.into()),
    }

    let value: serde_json::Value = serde_json::from_str(&text)?;
    if value.is_array() {
        return Ok(MetadataDocument::Legacy);
    }
    Ok(MetadataDocument::Current(serde_json::from_value(value)?))
}

fn restore_from_metadata<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    metadata: ArchiveMetadata,
) -> Result<ImportOutcome> {
    let mut warnings = Vec::new();

    let paper_config = match metadata.paper_config {
        Some(config) => match config.validate() {
            Ok(()) => Some(config),
            Err(e) => {
                warnings.push(format!("Stored paper configuration ignored: {}", e));
                None
            }
        },
        None => None,
    };

    let mut items = metadata.items;
    items.sort_by_key(|item| item.order);

    let mut seen = HashSet::new();
    let mut units = Vec::with_capacity(items.len());
    for item in items {
        let Some(bytes) = read_image_entry(archive, &item.filename)? else {
            log::warn!("{} listed in metadata but missing, skipped", item.filename);
            continue;
        };

        let id = match item.id {
            Some(id) if seen.insert(id.clone()) => id,
            _ => UnitId::generate(),
        };

        let name = item.original_name.unwrap_or_else(|| item.filename.clone());
        let mut unit = ImageUnit::from_bytes(name, bytes)
            .with_id(id)
            .with_quantity(item.quantity)
            .with_sticker_size(item.sticker_size)
            .with_fit_mode(item.fit_mode)
            .with_background(item.background_color);
        unit.edit = item.edit_settings;

        if unit.edit.crop_area.is_some() {
            match unit.apply_edit(item.edit_settings, item.background_color) {
                Ok(edited) => unit = edited,
                Err(e) => {
                    log::warn!("Could not restore edit of {}: {}", unit.display_name, e);
                    warnings.push(format!(
                        "Edit of {} could not be restored: {}",
                        unit.display_name, e
                    ));
                }
            }
        }

        units.push(unit);
    }

    Ok(ImportOutcome {
        units,
        paper_config,
        warnings,
        restored_from_metadata: true,
    })
}

/// Entry bytes for a metadata filename, looked up inside the image folder
/// first and at the archive root second.
fn read_image_entry<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    filename: &str,
) -> Result<Option<Vec<u8>>> {
    let candidates = [format!("{}/{}", ARCHIVE_IMAGE_DIR, filename), filename.to_string()];
    for name in &candidates {
        match archive.by_name(name) {
            Ok(mut file) => {
                let mut bytes = Vec::with_capacity(file.size() as usize);
                file.read_to_end(&mut bytes)?;
                return Ok(Some(bytes));
            }
            Err(ZipError::FileNotFound) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(None)
}

/// Every image-like file in archive order, with default parameters
fn import_image_files<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<ImageUnit>> {
    let mut units = Vec::new();
    for index in 0..archive.len() {
        let mut file = archive.by_index(index)?;
        let name = file.name().to_string();
        if file.is_dir() || !is_image_entry(&name) {
            log::debug!("Ignoring archive entry {}", name);
            continue;
        }

        let mut bytes = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut bytes)?;

        let display_name = name.rsplit('/').next().unwrap_or(&name).to_string();
        units.push(ImageUnit::from_bytes(display_name, bytes));
    }
    Ok(units)
}

fn has_image_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> bool {
    archive.file_names().any(|name| !name.ends_with('/') && is_image_entry(name))
}

fn is_image_entry(name: &str) -> bool {
    let file_name = name.rsplit('/').next().unwrap_or(name);
    !name.split('/').any(|part| part == "__MACOSX")
        && !file_name.starts_with('.')
        && file_name != ARCHIVE_METADATA_FILE
        && ImageFormat::from_path(file_name).is_ok()
}

/// A file-system safe stem for a display name
fn sanitize_file_stem(display_name: &str) -> String {
    let stem = Path::new(display_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("");
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
