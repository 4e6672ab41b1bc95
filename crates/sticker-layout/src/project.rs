//! Project manifests
//!
//! A project is a JSON file listing image files with their placement
//! parameters and the sheet layout to use. It is the file-based counterpart
//! of the interactive list.

use crate::color::Color;
use crate::config::PaperConfig;
use crate::types::*;
use crate::unit::{EditSettings, ImageList, ImageUnit};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Whether the layout was chosen deliberately. Front ends use this to
    /// decide whether to ask for a layout before the first export.
    #[serde(default)]
    pub configured: bool,
    /// Built-in preset id, used when no explicit paper config is given
    #[serde(default)]
    pub preset: Option<String>,
    #[serde(default)]
    pub paper_config: Option<PaperConfig>,
    /// Turn the resolved layout to this orientation
    #[serde(default)]
    pub orientation: Option<Orientation>,
    #[serde(default)]
    pub items: Vec<ProjectItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectItem {
    /// Image path, relative to the manifest
    pub path: PathBuf,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    #[serde(default)]
    pub sticker_size: StickerSize,
    #[serde(default)]
    pub fit_mode: FitMode,
    #[serde(default)]
    pub background_color: Color,
    #[serde(default)]
    pub edit: Option<EditSettings>,
}

fn default_quantity() -> usize {
    1
}

impl Project {
    /// Load a project manifest from a JSON file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| StickerError::Config(format!("Failed to parse project: {}", e)))
    }

    /// The layout this project asks for, validated
    pub fn paper_config(&self) -> Result<PaperConfig> {
        let config = match (&self.paper_config, &self.preset) {
            (Some(config), _) => config.clone(),
            (None, Some(id)) => PaperConfig::preset(id)
                .ok_or_else(|| StickerError::Config(format!("Unknown preset: {}", id)))?,
            (None, None) => PaperConfig::default(),
        };

        let config = match self.orientation {
            Some(orientation) => config.with_orientation(orientation),
            None => config,
        };
        config.validate()?;
        Ok(config)
    }

    /// Read every listed image and build the unit list.
    ///
    /// Relative paths resolve against `base_dir`. Edits with a crop area are
    /// baked; an edit that cannot be baked is kept unapplied.
    pub async fn load_units(&self, base_dir: impl AsRef<Path>) -> Result<ImageList> {
        let base_dir = base_dir.as_ref();
        let mut units = Vec::with_capacity(self.items.len());

        for item in &self.items {
            let path = base_dir.join(&item.path);
            let bytes = tokio::fs::read(&path).await?;

            let name = item.display_name.clone().unwrap_or_else(|| {
                item.path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| item.path.display().to_string())
            });

            let mut unit = ImageUnit::from_bytes(name, bytes)
                .with_quantity(item.quantity)
                .with_sticker_size(item.sticker_size)
                .with_fit_mode(item.fit_mode)
                .with_background(item.background_color);

            if let Some(edit) = item.edit {
                unit.edit = edit;
                if edit.crop_area.is_some() {
                    match unit.apply_edit(edit, item.background_color) {
                        Ok(edited) => unit = edited,
                        Err(e) => log::warn!("Edit of {} not applied: {}", path.display(), e),
                    }
                }
            }

            log::debug!("Loaded {} as {}", path.display(), unit.id);
            units.push(unit);
        }

        Ok(ImageList::new(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_manifest() {
        let project: Project =
            serde_json::from_str(r#"{"items": [{"path": "a.png"}]}"#).unwrap();

        assert!(!project.configured);
        assert_eq!(project.items[0].quantity, 1);
        assert_eq!(project.paper_config().unwrap(), PaperConfig::default());
    }

    #[test]
    fn test_preset_and_orientation() {
        let project: Project = serde_json::from_str(
            r#"{"configured": true, "preset": "3x8", "orientation": "landscape"}"#,
        )
        .unwrap();
        let config = project.paper_config().unwrap();

        assert_eq!(config.orientation, Orientation::Landscape);
        assert_eq!((config.cols, config.rows), (8, 3));
    }

    #[test]
    fn test_unknown_preset() {
        let project: Project = serde_json::from_str(r#"{"preset": "9x9"}"#).unwrap();
        assert!(matches!(project.paper_config(), Err(StickerError::Config(_))));
    }
}
