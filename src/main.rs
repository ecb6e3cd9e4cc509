//! automon CLI: offline detection, data validation and sequence replay

use anyhow::Context;
use automon_cv::{DetectionConfig, Detector, MatchOptions};
use automon_nav::progress::tracing_sink;
use automon_nav::source::Advance;
use automon_nav::{FollowOptions, NavigationConfig, Navigator, ReplaySource, SequenceBook};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

mod scan;

#[derive(Parser, Debug)]
#[command(name = "automon")]
#[command(about = "Locate visual assets in screenshots and replay click sequences")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    detection: DetectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct DetectionArgs {
    /// Detection config (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Template directory, repeatable; overrides the config
    #[arg(long = "assets", global = true)]
    asset_dirs: Vec<PathBuf>,

    /// Asset manifest with regions and thresholds (JSON)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct MatchArgs {
    /// Minimum score; each asset's own threshold when omitted
    #[arg(long)]
    threshold: Option<f32>,

    /// Match on luma instead of color
    #[arg(long)]
    grayscale: bool,
}

impl MatchArgs {
    fn options(&self) -> MatchOptions {
        MatchOptions {
            threshold: self.threshold,
            grayscale: self.grayscale,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print every detection of the given assets as JSON
    Detect {
        screenshot: PathBuf,
        #[arg(required = true)]
        assets: Vec<String>,
        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Print the total number of detections
    Count {
        screenshot: PathBuf,
        #[arg(required = true)]
        assets: Vec<String>,
        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Draw detections onto the canonical frame
    Annotate {
        screenshot: PathBuf,
        #[arg(required = true)]
        assets: Vec<String>,
        #[arg(long, short)]
        output: PathBuf,
        /// Outline each asset's search region
        #[arg(long)]
        regions: bool,
        #[command(flatten)]
        matching: MatchArgs,
    },
    /// Load templates and check sequence and navigation files against them
    Check {
        #[arg(long)]
        sequences: Option<PathBuf>,
        #[arg(long)]
        navigation: Option<PathBuf>,
    },
    /// Follow a named sequence over a directory of recorded frames
    Replay {
        frames: PathBuf,
        sequence: String,
        #[arg(long)]
        sequences: PathBuf,
        #[arg(long)]
        navigation: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        tries: u32,
        /// Per-wait timeout in milliseconds; the navigation config's when omitted
        #[arg(long)]
        timeout_ms: Option<u64>,
        /// Advance frames only on taps and back presses
        #[arg(long)]
        on_input: bool,
    },
}

#[derive(Serialize)]
struct CheckReport {
    templates: usize,
    sequences: Vec<String>,
}

#[derive(Serialize)]
struct ReplayReport {
    sequence: String,
    followed: bool,
    captures: usize,
    events: Vec<automon_nav::InputEvent>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let detector = load_detector(&cli.detection)?;

    match cli.command {
        Commands::Detect {
            screenshot,
            assets,
            matching,
        } => {
            let assets = scan::resolve_assets(&detector, &assets)?;
            let report = scan::scan(&detector, &screenshot, &assets, matching.options())?;
            print_json(&report)
        }
        Commands::Count {
            screenshot,
            assets,
            matching,
        } => {
            let assets = scan::resolve_assets(&detector, &assets)?;
            let report = scan::scan(&detector, &screenshot, &assets, matching.options())?;
            println!("{}", report.count());
            Ok(())
        }
        Commands::Annotate {
            screenshot,
            assets,
            output,
            regions,
            matching,
        } => {
            let assets = scan::resolve_assets(&detector, &assets)?;
            let report = scan::annotate(&detector, &screenshot, &assets, matching.options(), &output, regions)?;
            print_json(&report)
        }
        Commands::Check {
            sequences,
            navigation,
        } => run_check(&detector, sequences.as_deref(), navigation.as_deref()),
        Commands::Replay {
            frames,
            sequence,
            sequences,
            navigation,
            tries,
            timeout_ms,
            on_input,
        } => {
            let advance = if on_input {
                Advance::OnInput
            } else {
                Advance::EveryCapture
            };
            let source = ReplaySource::from_dir(&frames)?.with_advance(advance);
            run_replay(detector, source, &sequence, &sequences, navigation.as_deref(), tries, timeout_ms)
        }
    }
}

fn load_detector(args: &DetectionArgs) -> anyhow::Result<Detector> {
    let mut config = match &args.config {
        Some(path) => DetectionConfig::load(path)?,
        None => DetectionConfig::default(),
    };
    if !args.asset_dirs.is_empty() {
        config.template_dirs = args.asset_dirs.clone();
    }
    if args.manifest.is_some() {
        config.manifest = args.manifest.clone();
    }

    let detector = Detector::from_config(config)?;
    if detector.store().is_empty() {
        tracing::warn!("No templates loaded from {:?}", detector.config().template_dirs);
    }
    Ok(detector)
}

fn load_navigation(path: Option<&Path>) -> anyhow::Result<NavigationConfig> {
    path.map(NavigationConfig::load)
        .transpose()
        .map(Option::unwrap_or_default)
}

fn run_check(detector: &Detector, sequences: Option<&Path>, navigation: Option<&Path>) -> anyhow::Result<()> {
    let names = match sequences {
        Some(path) => {
            let book = SequenceBook::load(path)?;
            let resolved = book.resolve_all(detector.store())?;
            for sequence in &resolved {
                tracing::info!(steps = sequence.len(), "sequence '{}' ok", sequence.name());
            }
            resolved.iter().map(|s| s.name().to_string()).collect()
        }
        None => Vec::new(),
    };

    if let Some(path) = navigation {
        load_navigation(Some(path))?.validate(detector.store())?;
        tracing::info!("navigation config ok");
    }

    print_json(&CheckReport {
        templates: detector.store().len(),
        sequences: names,
    })
}

fn run_replay(
    detector: Detector,
    source: ReplaySource,
    name: &str,
    sequences: &Path,
    navigation: Option<&Path>,
    tries: u32,
    timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    let sequence = SequenceBook::load(sequences)?.sequence(name, detector.store())?;
    let config = load_navigation(navigation)?;
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| config.sequence_timeout());

    let mut navigator = Navigator::new(source, detector, config)?.with_progress(tracing_sink());
    let followed = navigator
        .follow_sequence(&sequence, FollowOptions::new(timeout).max_tries(tries))
        .with_context(|| format!("Replay of '{}' failed", name))?;
    if !followed {
        tracing::warn!("sequence '{}' was not followed", name);
    }

    let source = navigator.into_source();
    print_json(&ReplayReport {
        sequence: name.to_string(),
        followed,
        captures: source.captures(),
        events: source.events().to_vec(),
    })
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
