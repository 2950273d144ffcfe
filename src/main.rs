use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use quadrat::annotation::parse_points_payload;
use quadrat::export::naming::{file_stem, safe_filename};
use quadrat::export::single::SINGLE_FILE_NAME;
use quadrat::{
    AnnotateRequest, Annotator, BatchExporter, PointsInput, Settings, UploadedImage, export_single,
};

#[derive(Parser)]
#[command(name = "quadrat")]
#[command(about = "Point-sample, classify and annotate quadrat images")]
struct Cli {
    /// JSON settings file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Model store root
    #[arg(long, global = true, env = "QUADRAT_MODELS_DIR", value_name = "DIR")]
    models_dir: Option<PathBuf>,

    /// TrueType font for point labels
    #[arg(long, global = true, value_name = "FILE")]
    font: Option<PathBuf>,

    /// Seed for point sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Annotate one image
    Process {
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Classifier id in the model store
        #[arg(long = "model", value_name = "ID")]
        model_id: String,

        /// Number of random points
        #[arg(short, value_name = "N")]
        n: Option<usize>,

        /// Use these points instead of sampling (JSON array or {"points": [...]})
        #[arg(long, value_name = "FILE")]
        points: Option<PathBuf>,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,

        /// Also write a single-sheet workbook
        #[arg(long)]
        xlsx: bool,
    },

    /// Write a points JSON file as a workbook
    Export {
        #[arg(value_name = "POINTS_JSON")]
        points: PathBuf,

        #[arg(long = "model", value_name = "ID")]
        model_id: String,

        #[arg(short, long, value_name = "FILE", default_value = SINGLE_FILE_NAME)]
        output: PathBuf,
    },

    /// Annotate many images into one zip archive
    Batch {
        #[arg(value_name = "IMAGES", required = true)]
        images: Vec<PathBuf>,

        #[arg(long = "model", value_name = "ID")]
        model_id: String,

        #[arg(short, value_name = "N")]
        n: Option<usize>,

        #[arg(long, value_name = "DIR", default_value = ".")]
        out_dir: PathBuf,
    },

    /// List the model store
    Models,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "quadrat=debug" } else { "quadrat=info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn load_settings(cli: &Cli) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref())
        .with_context(|| format!("Failed to load settings from {:?}", cli.config))?;
    if let Some(dir) = &cli.models_dir {
        settings.models_dir = dir.clone();
    }
    if let Some(font) = &cli.font {
        settings.font_path = Some(font.clone());
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    Ok(settings)
}

fn upload_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn write_file(path: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let settings = load_settings(&cli)?;

    match cli.command {
        Command::Process {
            image,
            model_id,
            n,
            points,
            out_dir,
            xlsx,
        } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read {}", image.display()))?;
            let points = match points {
                Some(path) => {
                    let raw = std::fs::read_to_string(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    PointsInput::Manual(parse_points_payload(&raw)?)
                }
                None => PointsInput::Random(n.unwrap_or(settings.default_points)),
            };

            let annotator = Annotator::from_settings(settings)?.with_verbose(cli.verbose);
            let name = upload_name(&image);
            let request = AnnotateRequest {
                name: &name,
                bytes: &bytes,
                model_id: &model_id,
                points,
            };
            let result = annotator
                .process(request, &mut annotator.rng())
                .with_context(|| format!("Failed to annotate {}", image.display()))?;

            let safe_name = safe_filename(&name);
            let base = file_stem(&safe_name);
            let png_path = out_dir.join(format!("{base} (anotada).png"));
            write_file(&png_path, &result.to_png()?)?;

            let records = result.records();
            let (width, height) = result.image.dimensions();
            let report = json!({
                "points": records,
                "image_size": {"w": width, "h": height},
                "model_id_used": model_id,
            });
            write_file(
                &out_dir.join(format!("{base}.points.json")),
                &serde_json::to_vec_pretty(&report)?,
            )?;
            if xlsx {
                write_file(
                    &out_dir.join(format!("{base}.xlsx")),
                    &export_single(&records, &model_id)?,
                )?;
            }

            println!("Annotated {} points -> {}", records.len(), png_path.display());
        }

        Command::Export {
            points,
            model_id,
            output,
        } => {
            let raw = std::fs::read_to_string(&points)
                .with_context(|| format!("Failed to read {}", points.display()))?;
            let records = parse_points_payload(&raw)?;
            write_file(&output, &export_single(&records, &model_id)?)?;
            println!("Exported {} points -> {}", records.len(), output.display());
        }

        Command::Batch {
            images,
            model_id,
            n,
            out_dir,
        } => {
            let uploads = images
                .iter()
                .map(|path| {
                    let bytes = std::fs::read(path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    Ok(UploadedImage::new(upload_name(path), bytes))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;

            let n = n.unwrap_or(settings.default_points);
            let annotator = Annotator::from_settings(settings)?.with_verbose(cli.verbose);
            let archive = BatchExporter::new(&annotator).export(&uploads, n, &model_id)?;

            let path = out_dir.join(&archive.filename);
            write_file(&path, &archive.bytes)?;
            for name in &archive.skipped {
                println!("  skipped {name}: not a readable image");
            }
            println!(
                "Processed {} of {} images -> {}",
                archive.entries.len(),
                uploads.len(),
                path.display()
            );
        }

        Command::Models => {
            let store = quadrat::ModelStore::new(settings.models_dir.clone());
            let models = store.list()?;
            info!(root = %store.root().display(), count = models.len(), "model store scanned");
            if models.is_empty() {
                println!("No models in {}", store.root().display());
            }
            for model in &models {
                let weights = if model.has_weights { "" } else { "  (no weights)" };
                println!(
                    "{:<24} {:<16} input {}{}",
                    model.id, model.model_name, model.input_size, weights
                );
            }
            println!("{}", settings.class_summary());
        }
    }

    Ok(())
}
