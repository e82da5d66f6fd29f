use anyhow::{Context, Result, bail};
use clap::Parser;
use dual_view_fusion::cli::{Args, Command};
use dual_view_fusion::config::AppConfig;
use dual_view_fusion::fusion::multi_view::MultiViewFusion;
use dual_view_fusion::image_utils::image_io::{
    collect_image_paths, read_image_as_rgb8, resize_rgb8, save_rgb8,
};
use dual_view_fusion::report::DetectionReport;
use dual_view_fusion::services::{InferenceServices, Mode};
use dual_view_fusion::{DetectionSummary, ViewTransform};
use image::RgbImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("failed to load config")?;

    if let Command::Detect {
        confidence,
        iou,
        single_view,
        ..
    } = &args.command
    {
        if let Some(confidence) = confidence {
            config.thresholds.confidence = *confidence;
        }
        if let Some(iou) = iou {
            config.thresholds.iou = *iou;
        }
        if *single_view {
            config.fusion.views = vec![ViewTransform::Identity];
        }
        config.validate()?;
    }

    let renderer = config.renderer()?;
    let mode = match &args.command {
        Command::Detect { .. } => Mode::Detection,
        Command::Classify { .. } => Mode::Classification,
    };
    // Models are loaded once here and shared by every image.
    let services = InferenceServices::load(&config, renderer.clone(), mode);

    match &args.command {
        Command::Detect { source, output, .. } => {
            let fusion = config.fusion(&renderer);
            info!(views = ?fusion.views(), thresholds = ?config.thresholds, "running detection");
            fs::create_dir_all(output)
                .with_context(|| format!("failed to create output directory {:?}", output))?;
            let images = collect_image_paths(source)
                .with_context(|| format!("failed to list images under {:?}", source))?;
            run_batch(&images, |path| {
                detect_file(&services, &fusion, &config, source, path, output)
            })
        }
        Command::Classify { source } => {
            let images = collect_image_paths(source)
                .with_context(|| format!("failed to list images under {:?}", source))?;
            run_batch(&images, |path| classify_file(&services, &config, path))
        }
    }
}

/// Runs `job` on every image, carrying on past failures, and fails if any image failed.
fn run_batch<F>(images: &[PathBuf], mut job: F) -> Result<()>
where
    F: FnMut(&Path) -> Result<()>,
{
    if images.is_empty() {
        bail!("no jpg, jpeg or png images found");
    }
    let mut failures = 0;
    for path in images {
        if let Err(e) = job(path.as_path()) {
            error!(image = ?path, "{:#}", e);
            failures += 1;
        }
    }
    if failures > 0 {
        bail!("{} of {} images failed", failures, images.len());
    }
    Ok(())
}

fn load_input(config: &AppConfig, path: &Path) -> Result<RgbImage> {
    let image = read_image_as_rgb8(path).with_context(|| format!("failed to read {:?}", path))?;
    Ok(match config.preprocess.resize {
        Some([width, height]) => resize_rgb8(&image, width, height),
        None => image,
    })
}

/// Where the fused frame and the report of `path` are written.
///
/// The location of `path` under `source` is mirrored under `output`, and the full file name
/// is kept, so `tom.jpg`, `tom.png` and `a/tom.jpg` never share an output.
fn output_paths(source: &Path, output: &Path, path: &Path) -> (PathBuf, PathBuf) {
    let relative = path
        .strip_prefix(source)
        .ok()
        .filter(|relative| relative.file_name().is_some())
        .or_else(|| path.file_name().map(Path::new))
        .unwrap_or(Path::new("image"));
    let name = relative
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let dir = match relative.parent() {
        Some(parent) => output.join(parent),
        None => output.to_path_buf(),
    };
    (
        dir.join(format!("{}_fused.png", name)),
        dir.join(format!("{}.json", name)),
    )
}

fn detect_file(
    services: &InferenceServices,
    fusion: &MultiViewFusion,
    config: &AppConfig,
    source: &Path,
    path: &Path,
    output: &Path,
) -> Result<()> {
    let image = load_input(config, path)?;
    let outcome = services.detect(fusion, &image, &config.thresholds)?;

    let (annotated_path, report_path) = output_paths(source, output, path);
    if let Some(dir) = annotated_path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create output directory {:?}", dir))?;
    }
    save_rgb8(&outcome.annotated, &annotated_path)
        .with_context(|| format!("failed to write {:?}", annotated_path))?;
    DetectionReport::new(path, &outcome)
        .write_json(&report_path)
        .with_context(|| format!("failed to write {:?}", report_path))?;

    match outcome.summary() {
        DetectionSummary::Detected(_) => info!(
            image = ?path,
            counts = %outcome.detections.label_counts(),
            "{}",
            outcome.summary()
        ),
        DetectionSummary::NoObjects => warn!(image = ?path, "{}", outcome.summary()),
    }
    Ok(())
}

fn classify_file(services: &InferenceServices, config: &AppConfig, path: &Path) -> Result<()> {
    let image = load_input(config, path)?;
    let classification = services.classify(&image)?;
    info!(
        image = ?path,
        label = %classification.label,
        confidence = classification.confidence,
        "classified"
    );
    Ok(())
}
