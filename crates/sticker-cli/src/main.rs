mod logger;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::{Path, PathBuf};
use sticker_layout::constants::{DEFAULT_ARCHIVE_FILENAME, DEFAULT_PDF_FILENAME};
use sticker_layout::{
    Color, FitMode, ImageList, ImageUnit, Orientation, PRESETS, PaperConfig, PdfExportOptions,
    PreviewOptions, Project, StickerSize,
};

use logger::CliLogger;

#[derive(Parser)]
#[command(name = "stickers", about = "Sticker sheet layout and export", version)]
struct Cli {
    /// Log per-image details
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log warnings and errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lay out images on sheets and write a PDF
    Pdf {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Output PDF file
        #[arg(short, long, default_value = DEFAULT_PDF_FILENAME)]
        output: PathBuf,

        /// Omit the dashed lines between split slots
        #[arg(long)]
        no_cut_lines: bool,

        /// Fail on the first image that cannot be decoded
        #[arg(long)]
        strict: bool,

        /// Composite resolution in pixels per millimeter
        #[arg(long)]
        scale: Option<f32>,
    },

    /// Package images and their settings into a ZIP archive
    Archive {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Output archive file
        #[arg(short, long, default_value = DEFAULT_ARCHIVE_FILENAME)]
        output: PathBuf,
    },

    /// Read an archive and optionally render it straight to PDF
    Import {
        /// Archive to read
        input: PathBuf,

        /// Render the imported images to this PDF
        #[arg(long)]
        pdf: Option<PathBuf>,

        /// Save the stored paper configuration as JSON
        #[arg(long)]
        save_config: Option<PathBuf>,
    },

    /// Render preview pages as PNG images
    Preview {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        layout: LayoutArgs,

        /// Directory for the page images
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,

        /// Only render this page (1-based)
        #[arg(long)]
        page: Option<usize>,

        /// Preview resolution in pixels per millimeter
        #[arg(long)]
        scale: Option<f32>,
    },

    /// Show how the images pack onto sheets
    Stats {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        layout: LayoutArgs,
    },

    /// List the built-in sheet layouts
    Presets,
}

/// Where the images come from
#[derive(Args)]
struct SourceArgs {
    /// Project manifest (JSON) listing images and their settings
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Image files, appended after any project items
    images: Vec<PathBuf>,

    /// Copies of each image file given on the command line
    #[arg(long, default_value = "1")]
    quantity: usize,

    /// Sticker size for image files given on the command line
    #[arg(long, default_value = "half", value_enum)]
    size: SizeArg,

    /// Fit mode for image files given on the command line
    #[arg(long, default_value = "cover", value_enum)]
    fit: FitArg,

    /// Background color (hex) for image files given on the command line
    #[arg(long, default_value = "#ffffff")]
    background: String,
}

/// Which sheet layout to use
#[derive(Args)]
struct LayoutArgs {
    /// Built-in preset id (see `stickers presets`)
    #[arg(long, conflicts_with = "config")]
    preset: Option<String>,

    /// Paper configuration JSON file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Page orientation
    #[arg(long, value_enum)]
    orientation: Option<OrientationArg>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SizeArg {
    Half,
    Full,
}

#[derive(Clone, Copy, ValueEnum)]
enum FitArg {
    Cover,
    Contain,
}

#[derive(Clone, Copy, ValueEnum)]
enum OrientationArg {
    Portrait,
    Landscape,
}

impl From<SizeArg> for StickerSize {
    fn from(arg: SizeArg) -> Self {
        match arg {
            SizeArg::Half => Self::Half,
            SizeArg::Full => Self::Full,
        }
    }
}

impl From<FitArg> for FitMode {
    fn from(arg: FitArg) -> Self {
        match arg {
            FitArg::Cover => Self::Cover,
            FitArg::Contain => Self::Contain,
        }
    }
}

impl From<OrientationArg> for Orientation {
    fn from(arg: OrientationArg) -> Self {
        match arg {
            OrientationArg::Portrait => Self::Portrait,
            OrientationArg::Landscape => Self::Landscape,
        }
    }
}

/// Images and layout resolved from the command line
struct Job {
    units: ImageList,
    config: PaperConfig,
}

impl Job {
    async fn resolve(source: &SourceArgs, layout: &LayoutArgs) -> Result<Self> {
        let project = match &source.project {
            Some(path) => Some((
                Project::load(path)
                    .await
                    .with_context(|| format!("Failed to load project {}", path.display()))?,
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )),
            None => None,
        };

        let config = resolve_layout(layout, project.as_ref().map(|(p, _)| p)).await?;

        let mut units = match &project {
            Some((project, base_dir)) => project.load_units(base_dir).await?,
            None => ImageList::default(),
        };

        let background: Color = source
            .background
            .parse()
            .with_context(|| format!("Invalid background color {}", source.background))?;
        let mut loose = Vec::with_capacity(source.images.len());
        for path in &source.images {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            loose.push(
                ImageUnit::from_bytes(name, bytes)
                    .with_quantity(source.quantity)
                    .with_sticker_size(source.size.into())
                    .with_fit_mode(source.fit.into())
                    .with_background(background),
            );
        }
        units = units.with_units(loose);

        if units.is_empty() {
            log::warn!("No images given; output will be a blank sheet");
        }
        log::info!(
            "{} image(s), {} placement(s) on {}",
            units.len(),
            units.placement_count(),
            config.name.as_deref().unwrap_or("custom layout")
        );

        Ok(Self { units, config })
    }
}

async fn resolve_layout(layout: &LayoutArgs, project: Option<&Project>) -> Result<PaperConfig> {
    let config = if let Some(path) = &layout.config {
        PaperConfig::load(path)
            .await
            .with_context(|| format!("Failed to load paper config {}", path.display()))?
    } else if let Some(id) = &layout.preset {
        match PaperConfig::preset(id) {
            Some(config) => config,
            None => bail!("Unknown preset '{}'; run `stickers presets` to list them", id),
        }
    } else if let Some(project) = project {
        if !project.configured {
            log::info!("Project layout not configured yet, using its defaults");
        }
        project.paper_config()?
    } else {
        PaperConfig::default()
    };

    let config = match layout.orientation {
        Some(orientation) => config.with_orientation(orientation.into()),
        None => config,
    };
    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Warn
    } else {
        LevelFilter::Info
    };
    let logger = CliLogger::new(500, level);
    logger.clone().init()?;

    match cli.command {
        Commands::Pdf {
            source,
            layout,
            output,
            no_cut_lines,
            strict,
            scale,
        } => {
            let job = Job::resolve(&source, &layout).await?;
            let defaults = PdfExportOptions::default();
            let options = PdfExportOptions {
                scale: scale.unwrap_or(defaults.scale),
                cut_lines: !no_cut_lines,
                strict,
                ..defaults
            };

            let report =
                sticker_layout::export_pdf(job.units.as_slice(), &job.config, &options, &output)
                    .await?;
            println!(
                "Generated {} page(s), {} cell(s) → {}",
                report.pages,
                report.cells,
                output.display()
            );
            for failure in &report.failures {
                println!("  skipped {}: {}", failure.display_name, failure.message);
            }
        }

        Commands::Archive {
            source,
            layout,
            output,
        } => {
            let job = Job::resolve(&source, &layout).await?;
            sticker_layout::export_archive(job.units.as_slice(), Some(&job.config), &output)
                .await?;
            println!("Archived {} image(s) → {}", job.units.len(), output.display());
        }

        Commands::Import {
            input,
            pdf,
            save_config,
        } => {
            let outcome = sticker_layout::import_archive(&input).await?;

            println!("Imported {} image(s):", outcome.units.len());
            for (index, unit) in outcome.units.iter().enumerate() {
                println!(
                    "  {:>3}. {} ×{} ({:?}, {:?}{})",
                    index + 1,
                    unit.display_name,
                    unit.quantity,
                    unit.sticker_size,
                    unit.fit_mode,
                    if unit.is_edited() { ", edited" } else { "" }
                );
            }
            if !outcome.restored_from_metadata {
                println!("No usable metadata: images were imported with default settings");
            }
            for warning in &outcome.warnings {
                println!("  warning: {}", warning);
            }

            let config = outcome.paper_config.clone().unwrap_or_default();
            if let Some(path) = save_config {
                config.save(&path).await?;
                println!("Paper configuration → {}", path.display());
            }
            if let Some(path) = pdf {
                let report = sticker_layout::export_pdf(
                    &outcome.units,
                    &config,
                    &PdfExportOptions::default(),
                    &path,
                )
                .await?;
                println!("Generated {} page(s) → {}", report.pages, path.display());
            }
        }

        Commands::Preview {
            source,
            layout,
            output_dir,
            page,
            scale,
        } => {
            let job = Job::resolve(&source, &layout).await?;
            let options = PreviewOptions {
                px_per_mm: scale.unwrap_or(PreviewOptions::default().px_per_mm),
            };
            let written = write_previews(job, options, output_dir, page).await?;
            for path in written {
                println!("Preview → {}", path.display());
            }
        }

        Commands::Stats { source, layout } => {
            let job = Job::resolve(&source, &layout).await?;
            let stats = sticker_layout::calculate_statistics(job.units.as_slice(), &job.config)?;
            let geometry = job.config.geometry()?;

            println!("Sheet Statistics:");
            println!(
                "  Layout: {} × {} on {} {:?}",
                geometry.cols,
                geometry.rows,
                job.config.paper_size.name(),
                job.config.orientation
            );
            println!(
                "  Cell: {:.1} × {:.1} mm, slot: {:.1} × {:.1} mm",
                geometry.cell_width_mm,
                geometry.cell_height_mm,
                geometry.slot_width_mm,
                geometry.slot_height_mm
            );
            println!("  Images: {}", stats.units);
            println!("  Placements: {}", stats.placements);
            println!(
                "  Cells: {} ({} full, {} split)",
                stats.cells, stats.full_cells, stats.split_cells
            );
            println!("  Empty slots: {}", stats.empty_slots);
            println!("  Pages: {}", stats.pages);
            println!("  Fill: {:.0}%", stats.fill_ratio() * 100.0);
        }

        Commands::Presets => {
            for preset in PRESETS {
                let config = preset.to_config();
                let slots = match config.geometry() {
                    Ok(g) => format!("{:.1} × {:.1} mm", g.cell_width_mm, g.cell_height_mm),
                    Err(e) => format!("invalid: {}", e),
                };
                println!(
                    "  {:<8} {:<32} {} slot(s), cells {}",
                    preset.id,
                    preset.name,
                    preset.slot_count.count(),
                    slots
                );
            }
        }
    }

    let problems = logger.problems();
    if !problems.is_empty() {
        eprintln!("Finished with {} warning(s)", problems.len());
    }

    Ok(())
}

async fn write_previews(
    job: Job,
    options: PreviewOptions,
    output_dir: PathBuf,
    page: Option<usize>,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(&output_dir).await?;

    tokio::task::spawn_blocking(move || -> Result<Vec<PathBuf>> {
        let units = job.units.as_slice();
        let sheet = sticker_layout::build_preview(units, &job.config, &options)?;

        let pages: Vec<usize> = match page {
            Some(0) => bail!("Pages are numbered from 1"),
            Some(n) if n > sheet.page_count() => {
                bail!("Page {} requested, sheet has {}", n, sheet.page_count())
            }
            Some(n) => vec![n - 1],
            None => (0..sheet.page_count()).collect(),
        };

        let mut written = Vec::with_capacity(pages.len());
        for index in pages {
            let raster = sticker_layout::rasterize_page(&sheet, index, units)?;
            let path = output_dir.join(format!("sheet-{:02}.png", index + 1));
            raster
                .save(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            written.push(path);
        }
        Ok(written)
    })
    .await?
}
