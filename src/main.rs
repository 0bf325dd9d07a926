//! paddle-ocr-core - command-line front end
//!
//! Runs the detection + recognition pipeline on image files and prints
//! JSON results to stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use paddle_ocr_core::config::{load_config, save_config, OcrConfig};
use paddle_ocr_core::vision::{Image, OcrPipeline, OcrResponse, PipelinePool};

/// PaddleOCR-style text detection and recognition
#[derive(Parser, Debug)]
#[command(name = "paddle-ocr-core")]
#[command(version, about = "Detect and recognize text in images with ONNX models")]
struct Args {
    /// Configuration file (TOML, or JSON by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run OCR on one or more images
    Run {
        /// Image files
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Worker pipelines, overrides `[pool] workers`
        #[arg(short, long)]
        workers: Option<usize>,

        /// Print JSON on a single line
        #[arg(long)]
        compact: bool,
    },
    /// Load the models and print their metadata
    Info,
    /// Print the default configuration, or write it to a file
    DefaultConfig {
        /// Output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_or_default_config(args.config.as_deref())?;

    init_logging(&config.logging.level);

    match args.command {
        Command::Run {
            images,
            workers,
            compact,
        } => run(&config, &images, workers, !compact),
        Command::Info => print_info(&config),
        Command::DefaultConfig { output } => default_config(output.as_deref()),
    }
}

/// `RUST_LOG` wins over the configured level
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_or_default_config(path: Option<&Path>) -> Result<OcrConfig> {
    match path {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path)),
        None => Ok(OcrConfig::default()),
    }
}

fn run(config: &OcrConfig, images: &[PathBuf], workers: Option<usize>, pretty: bool) -> Result<()> {
    let workers = workers.unwrap_or(config.pool.workers).clamp(1, images.len().max(1));
    let pool = PipelinePool::new(config, workers).context("Failed to initialize OCR pipelines")?;

    let responses = std::thread::scope(|scope| {
        let handles: Vec<_> = images
            .iter()
            .map(|path| {
                let pool = &pool;
                scope.spawn(move || -> Result<OcrResponse> {
                    let image = Image::open(path)
                        .with_context(|| format!("Failed to open image {:?}", path))?;
                    let results = pool.infer(&image)?;
                    info!("{:?}: {} text regions", path, results.len());
                    Ok(OcrResponse { results })
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(result) => result,
                Err(_) => Err(anyhow::anyhow!("OCR worker panicked")),
            })
            .collect::<Result<Vec<_>>>()
    })?;

    let output = if let [single] = responses.as_slice() {
        serde_json::to_value(single)?
    } else {
        let entries = images
            .iter()
            .zip(&responses)
            .map(|(path, response)| {
                serde_json::json!({
                    "image": path.display().to_string(),
                    "results": response.results,
                })
            })
            .collect();
        serde_json::Value::Array(entries)
    };

    print_json(&output, pretty)
}

fn print_info(config: &OcrConfig) -> Result<()> {
    let pipeline = OcrPipeline::from_config(config).context("Failed to initialize OCR pipeline")?;
    print_json(&serde_json::to_value(pipeline.info())?, true)
}

fn default_config(output: Option<&Path>) -> Result<()> {
    let config = OcrConfig::default();
    match output {
        Some(path) => {
            save_config(&config, path)
                .with_context(|| format!("Failed to write configuration to {:?}", path))?;
            info!("Wrote default configuration to {:?}", path);
        }
        None => println!("{}", toml::to_string_pretty(&config)?),
    }
    Ok(())
}

fn print_json(value: &serde_json::Value, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
