//! lanefit: run lane detection over a directory of binary road masks.
//!
//! Every file in the input directory is decoded as a single-channel
//! mask, passed through one [`LaneDetector`], and the rendered overlay
//! is written under the same file name to the output directory. A
//! one-line summary per file goes to stdout; with `--diagnostics` the
//! per-stage report follows it.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin lanefit -- [OPTIONS]
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use lanefit_pipeline::{LaneConfig, LaneDetection, LaneDetector, binary};

/// Sliding-window lane detection over a directory of binary masks.
///
/// Finds the left and right lane boundaries in each mask, fills the
/// lane between them, and marks the lane center at the reference row.
#[derive(Parser)]
#[command(name = "lanefit", version)]
struct Cli {
    /// Directory of input masks (PNG, JPEG, BMP, WebP).
    #[arg(long, default_value = "img")]
    input_dir: PathBuf,

    /// Directory for rendered overlays (created if missing).
    #[arg(long, default_value = "LaneLine_img")]
    output_dir: PathBuf,

    /// Number of horizontal search bands.
    #[arg(
        long,
        default_value_t = LaneConfig::DEFAULT_WINDOW_COUNT,
        value_parser = clap::builder::RangedU64ValueParser::<u32>::new().range(1..),
    )]
    window_count: u32,

    /// Half-width of each search window in pixels.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_MARGIN)]
    margin: u32,

    /// A window recenters only when it finds more pixels than this.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_MIN_PIXELS_TO_RECENTER)]
    min_pixels_to_recenter: usize,

    /// A boundary is fitted only when it has more pixels than this.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_MIN_PIXELS_TO_FIT)]
    min_pixels_to_fit: usize,

    /// Horizontal offset used to synthesize a sparse boundary from the
    /// other one.
    #[arg(
        long,
        default_value_t = LaneConfig::DEFAULT_LANE_WIDTH_FALLBACK,
        allow_hyphen_values = true
    )]
    lane_width_fallback: i64,

    /// Columns excluded on each side of the midpoint when picking seeds.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_SEED_BUFFER)]
    seed_buffer: u32,

    /// Widest column at which the center marker is still drawn.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_REFERENCE_WIDTH)]
    reference_width: u32,

    /// Row at which the lane center is measured and marked.
    #[arg(long, default_value_t = LaneConfig::DEFAULT_REFERENCE_ROW)]
    reference_row: u32,

    /// Treat gray levels above this value as foreground.
    ///
    /// Without it every non-zero pixel is foreground.
    #[arg(long)]
    threshold: Option<u8>,

    /// Print per-stage timing and counts for every file.
    #[arg(long)]
    diagnostics: bool,

    /// Print diagnostics as JSON instead of a human-readable report.
    /// Implies `--diagnostics`; per-file summaries move to stderr so
    /// stdout holds only JSON.
    #[arg(long)]
    json: bool,

    /// Full detector config as a JSON string.
    ///
    /// When provided, all other detector parameter flags are ignored.
    /// Missing fields take their defaults.
    #[arg(long)]
    config_json: Option<String>,
}

/// Build a [`LaneConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<LaneConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(LaneConfig {
        window_count: cli.window_count,
        margin: cli.margin,
        min_pixels_to_recenter: cli.min_pixels_to_recenter,
        min_pixels_to_fit: cli.min_pixels_to_fit,
        lane_width_fallback: cli.lane_width_fallback,
        seed_buffer: cli.seed_buffer,
        reference_width: cli.reference_width,
        reference_row: cli.reference_row,
    })
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    log::debug!("config: {config:?}");

    let mut detector = match LaneDetector::new(config) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let inputs = match list_inputs(&cli.input_dir) {
        Ok(paths) => paths,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.input_dir.display());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::create_dir_all(&cli.output_dir) {
        eprintln!("Error creating {}: {e}", cli.output_dir.display());
        return ExitCode::FAILURE;
    }

    log::info!(
        "{} file(s) from {} -> {}",
        inputs.len(),
        cli.input_dir.display(),
        cli.output_dir.display(),
    );

    let mut detected = 0_usize;
    let mut failures = 0_usize;

    for path in &inputs {
        match process_file(&mut detector, &cli, path) {
            Ok(detection) => {
                if detection.success {
                    detected += 1;
                }
            }
            Err(msg) => {
                log::error!("{msg}");
                failures += 1;
            }
        }
    }

    eprintln!(
        "Processed {} file(s): {detected} with lane, {failures} failed",
        inputs.len(),
    );

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// Regular files in `dir`, sorted by path.
fn list_inputs(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Whether stdout carries only JSON diagnostics documents.
const fn stdout_is_json(cli: &Cli) -> bool {
    cli.json
}

/// One-line result for a processed file.
fn summary_line(name: &str, detection: &LaneDetection) -> String {
    if detection.success {
        format!("{name}: lane found, center offset {}", detection.offset)
    } else {
        format!("{name}: lane not detected")
    }
}

/// Detect the lane in one file and write its overlay.
fn process_file(
    detector: &mut LaneDetector,
    cli: &Cli,
    path: &Path,
) -> Result<LaneDetection, String> {
    let Some(file_name) = path.file_name() else {
        return Err(format!("{}: not a file name", path.display()));
    };
    let name = file_name.to_string_lossy();

    let bytes =
        std::fs::read(path).map_err(|e| format!("Error reading {}: {e}", path.display()))?;
    let mask = binary::decode_binary(&bytes).map_err(|e| format!("{name}: {e}"))?;
    let mask = match cli.threshold {
        Some(level) => binary::binarize(&mask, level),
        None => mask,
    };
    log::info!("{name}: {}x{}", mask.width(), mask.height());

    let detection = if cli.diagnostics || cli.json {
        let (detection, diagnostics) = detector.forward_with_diagnostics(&mask);
        if stdout_is_json(cli) {
            let json = serde_json::to_string_pretty(&diagnostics)
                .map_err(|e| format!("{name}: error serializing diagnostics: {e}"))?;
            println!("{json}");
        } else {
            println!("{}", diagnostics.report());
        }
        detection
    } else {
        detector.forward(&mask)
    };

    let summary = summary_line(&name, &detection);
    if !detection.success {
        log::warn!("{summary}");
    }
    if stdout_is_json(cli) {
        eprintln!("{summary}");
    } else {
        println!("{summary}");
    }

    let out_path = cli.output_dir.join(file_name);
    detection
        .overlay
        .save(&out_path)
        .map_err(|e| format!("Error writing {}: {e}", out_path.display()))?;

    Ok(detection)
}
