pub mod archive;
mod color;
pub mod compositor;
mod config;
pub mod constants;
pub mod layout;
pub mod preview;
mod project;
pub mod render;
mod stats;
mod types;
mod unit;

pub use archive::{
    ArchiveMetadata, ImportOutcome, ItemMetadata, build_archive, export_archive, import_archive,
    read_archive,
};
pub use color::Color;
pub use compositor::{CompositeRequest, apply_zoom, bake_edit, composite};
pub use config::*;
pub use layout::{GridCell, Page, Placement, SheetGeometry, TargetSize, pack_cells, paginate};
pub use preview::{PreviewOptions, PreviewSheet, build_preview, rasterize_page};
pub use project::*;
pub use render::{ExportReport, PdfExportOptions, UnitFailure, export_pdf, render_pdf, save_pdf};
pub use stats::calculate_statistics;
pub use types::*;
pub use unit::*;
