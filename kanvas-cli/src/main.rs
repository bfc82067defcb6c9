//! # Kanvas CLI
//!
//! Headless access to the compositor and to a persisted canvas.
//!
//! ```text
//! kanvas crop photo.png --x 0.25 --y 0.25 --width 0.5 --height 0.5 -o out.png
//! kanvas mask photo.png mask.png -o cutout.png
//! kanvas combine --data-dir ~/.kanvas -o flat.png
//! kanvas info --data-dir ~/.kanvas
//! ```

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use image::RgbaImage;
use kanvas_compositor::{
    apply_mask, combine, encode_png, extract_crop, Layer, SourceLoader,
    DEFAULT_MAX_OUTPUT_PIXELS, DEFAULT_SCALE_CAP,
};
use kanvas_core::{CanvasStore, CropBox, ImageSource, PlacedImage, SourceDocument};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "kanvas")]
#[command(about = "Crop, mask and flatten images on a Kanvas canvas")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Cut a normalized box out of an image at native resolution.
    Crop {
        /// Image path or URL.
        input: String,
        /// Left edge, as a fraction of the width.
        #[arg(long)]
        x: f64,
        /// Top edge, as a fraction of the height.
        #[arg(long)]
        y: f64,
        /// Box width, as a fraction of the width.
        #[arg(long)]
        width: f64,
        /// Box height, as a fraction of the height.
        #[arg(long)]
        height: f64,
        /// Output PNG.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Use the luminance of a mask as the alpha of an image.
    Mask {
        /// Image path or URL.
        original: String,
        /// Mask path or URL; white keeps, black removes.
        mask: String,
        /// Output PNG.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Flatten the images of a saved canvas into one PNG.
    Combine {
        /// Canvas data directory.
        #[arg(long, env = "KANVAS_DATA_DIR")]
        data_dir: PathBuf,
        /// Images to combine (default: all). Repeat for several.
        #[arg(long = "id")]
        ids: Vec<String>,
        /// Upper bound on output pixels per canvas unit.
        #[arg(long, default_value_t = DEFAULT_SCALE_CAP)]
        scale_cap: f64,
        /// Refuse outputs with more pixels than this.
        #[arg(long, default_value_t = DEFAULT_MAX_OUTPUT_PIXELS)]
        max_pixels: u64,
        /// Output PNG.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// List the images of a saved canvas.
    Info {
        /// Canvas data directory.
        #[arg(long, env = "KANVAS_DATA_DIR")]
        data_dir: PathBuf,
        /// Print the raw document as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,kanvas=debug"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    // Use JSON format in production (RUST_LOG_FORMAT=json)
    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    tracing::debug!(command = ?cli.command, "starting");
    let loader = SourceLoader::new();

    match cli.command {
        Command::Crop {
            input,
            x,
            y,
            width,
            height,
            output,
        } => {
            let crop_box = CropBox::new(x, y, width, height)?;
            let source = loader.load(&ImageSource::uri(input)).await?;
            let cropped = extract_crop(&source, &crop_box)?;
            write_png(&output, &cropped).await?;
            println!(
                "{}x{} -> {}",
                cropped.width(),
                cropped.height(),
                output.display()
            );
        }
        Command::Mask {
            original,
            mask,
            output,
        } => {
            let images = loader
                .load_all(&[ImageSource::uri(original), ImageSource::uri(mask)])
                .await?;
            let masked = apply_mask(&images[0], &images[1])?;
            write_png(&output, &masked).await?;
            println!("{}", output.display());
        }
        Command::Combine {
            data_dir,
            ids,
            scale_cap,
            max_pixels,
            output,
        } => {
            let images = saved_images(&data_dir, &ids)?;
            let sources: Vec<ImageSource> = images.iter().map(|img| img.source.clone()).collect();
            let pixels = loader.load_all(&sources).await?;
            let layers: Vec<Layer<'_>> = images
                .iter()
                .zip(&pixels)
                .map(|(img, px)| Layer::new(img, px))
                .collect();
            let combined = combine(&layers, scale_cap, max_pixels)?;
            write_png(&output, &combined.image).await?;
            println!(
                "{} images -> {}x{} at scale {:.2} covering ({:.1}, {:.1}, {:.1}, {:.1}) -> {}",
                layers.len(),
                combined.image.width(),
                combined.image.height(),
                combined.scale,
                combined.bounds.x,
                combined.bounds.y,
                combined.bounds.width,
                combined.bounds.height,
                output.display()
            );
        }
        Command::Info { data_dir, json } => {
            let store = CanvasStore::open(&data_dir)?;
            let Some(doc) = store.document()? else {
                bail!("No saved canvas in {}", data_dir.display());
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!(
                    "{} images, viewport ({:.1}, {:.1}) x{:.2}",
                    doc.images.len(),
                    doc.viewport.x,
                    doc.viewport.y,
                    doc.viewport.scale
                );
                for img in &doc.images {
                    let source = match &img.source {
                        SourceDocument::Uri { uri } => uri.as_str(),
                        SourceDocument::Blob => "<blob>",
                    };
                    let t = &img.transform;
                    println!(
                        "{:>3} {} {:.1},{:.1} {:.1}x{:.1}{} {}",
                        img.z_index,
                        img.id,
                        t.x,
                        t.y,
                        t.width,
                        t.height,
                        if t.crop_box.is_some() { " cropped" } else { "" },
                        source
                    );
                }
            }
        }
    }

    Ok(())
}

/// Load a saved canvas and pick the images to combine, bottom-most first.
fn saved_images(data_dir: &Path, ids: &[String]) -> anyhow::Result<Vec<PlacedImage>> {
    let mut store = CanvasStore::open(data_dir)?;
    let (scene, _) = store
        .load()?
        .with_context(|| format!("No saved canvas in {}", data_dir.display()))?;

    if ids.is_empty() {
        return Ok(scene.images().to_vec());
    }
    for id in ids {
        if !scene.images().iter().any(|img| img.id.to_string() == *id) {
            bail!("No image with id {id}");
        }
    }
    Ok(scene
        .images()
        .iter()
        .filter(|img| ids.contains(&img.id.to_string()))
        .cloned()
        .collect())
}

async fn write_png(path: &Path, image: &RgbaImage) -> anyhow::Result<()> {
    let bytes = encode_png(image)?;
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
