use clap::{Args, Parser, Subcommand};
use image::{ImageReader, RgbImage};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use harness_inspect::detection::preprocessing::ensure_frame;
use harness_inspect::workflow::Report;
use harness_inspect::{ColorSequence, InspectionConfig, InspectionPipeline, ReplayStream, Session, ThresholdStrategy};

#[derive(Parser)]
#[command(name = "harness-inspect")]
#[command(about = "Check the wire color sequence of harness connectors")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: Options,
}

#[derive(Args)]
struct Options {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file; missing fields keep their defaults
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Use Otsu thresholding instead of a background reference
    #[arg(long, global = true)]
    otsu: bool,

    /// The connector is wider than it is tall
    #[arg(long, global = true)]
    wide: bool,

    /// Largest CIEDE2000 distance at which wire colors match
    #[arg(long, value_name = "DELTA_E", global = true)]
    threshold: Option<f32>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the wire color sequence of a still image
    Inspect {
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Image of the empty background
        #[arg(long, value_name = "IMAGE")]
        background: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
    /// Compare still images against a reference image
    Check {
        /// Image of the reference wire assy
        #[arg(long, value_name = "IMAGE")]
        reference: PathBuf,

        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        #[arg(long, value_name = "IMAGE")]
        background: Option<PathBuf>,

        /// Save annotated frames with the OK/NG badge here
        #[arg(long, value_name = "DIR")]
        annotate_dir: Option<PathBuf>,
    },
    /// Replay still images as a camera and run the interactive workflow
    Watch {
        #[arg(value_name = "IMAGE", required = true)]
        images: Vec<PathBuf>,

        /// Delay between replayed frames
        #[arg(long, default_value_t = 100)]
        interval_ms: u64,
    },
}

fn load_frame(path: &Path) -> anyhow::Result<RgbImage> {
    let img = ImageReader::open(path)?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode image {}: {}", path.display(), e))?;
    Ok(ensure_frame(&img)?)
}

fn load_config(options: &Options) -> anyhow::Result<InspectionConfig> {
    let mut config = match &options.config {
        Some(path) => InspectionConfig::from_json_file(path)?,
        None => InspectionConfig::default(),
    };
    if options.otsu {
        config.threshold_strategy = ThresholdStrategy::Otsu;
    }
    if options.wide {
        config.height_greater_than_width = false;
    }
    if let Some(threshold) = options.threshold {
        config.color_match_threshold = threshold;
    }
    config.validate()?;
    Ok(config)
}

/// Pipeline for still images; without a background, fall back to Otsu.
fn build_pipeline(mut config: InspectionConfig, background: Option<&Path>) -> anyhow::Result<InspectionPipeline> {
    match background {
        Some(path) => {
            let background = load_frame(path)?;
            Ok(InspectionPipeline::new(config).with_background(&background)?)
        }
        None => {
            if config.threshold_strategy == ThresholdStrategy::BackgroundRelative {
                tracing::info!("no background image given, using Otsu thresholding");
                config.threshold_strategy = ThresholdStrategy::Otsu;
            }
            Ok(InspectionPipeline::new(config))
        }
    }
}

fn print_sequence(colors: &ColorSequence) {
    for (i, color) in colors.iter().enumerate() {
        match color {
            Some(color) => {
                let lab = color.to_lab();
                println!("  Wire {}: L={:.1} a={:.1} b={:.1}", i + 1, lab.l, lab.a, lab.b);
            }
            None => println!("  Wire {}: no data", i + 1),
        }
    }
}

fn inspect(config: InspectionConfig, image_path: &Path, background: Option<&Path>, debug_out: Option<PathBuf>) -> anyhow::Result<()> {
    let mut pipeline = build_pipeline(config, background)?;
    if let Some(debug_dir) = debug_out {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let frame = load_frame(image_path)?;
    println!("\n=== Wire Color Sequence ===");
    match pipeline.run(&frame)? {
        Some(inspection) => {
            println!("Total wires detected: {}", inspection.colors.len());
            print_sequence(&inspection.colors);
        }
        None => println!("No connector detected."),
    }
    Ok(())
}

fn check(
    config: InspectionConfig,
    reference: &Path,
    images: &[PathBuf],
    background: Option<&Path>,
    annotate_dir: Option<&Path>,
) -> anyhow::Result<()> {
    let pipeline = build_pipeline(config, background)?;

    let reference = pipeline
        .run(&load_frame(reference)?)?
        .ok_or_else(|| anyhow::anyhow!("No connector detected in reference image"))?
        .colors;
    println!("\n=== Reference ===");
    print_sequence(&reference);

    if let Some(dir) = annotate_dir {
        std::fs::create_dir_all(dir)?;
    }

    println!("\n=== Check Results ===");
    for (i, path) in images.iter().enumerate() {
        match pipeline.check(&load_frame(path)?, &reference)? {
            Some((matched, inspection)) => {
                println!("  {}: {}", path.display(), if matched { "OK" } else { "NG" });
                if let Some(dir) = annotate_dir {
                    inspection.display.save(dir.join(format!("{:02}.png", i + 1)))?;
                }
            }
            None => println!("  {}: no connector", path.display()),
        }
    }
    Ok(())
}

fn watch(config: InspectionConfig, images: &[PathBuf], interval: Duration) -> anyhow::Result<()> {
    let frames = images.iter().map(|p| load_frame(p)).collect::<anyhow::Result<Vec<_>>>()?;
    let mut stream = ReplayStream::new(frames, interval);
    stream.start()?;

    let mut session = Session::new(stream, config);
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    while !session.stage().is_exit() {
        println!("\n[{}] {}", session.stage().name(), session.stage().prompt());
        let Some(line) = lines.next() else {
            break;
        };
        let key = harness_inspect::Key::parse(&line?);

        match session.handle_key(key)? {
            Report::Stage => {}
            Report::NoConnector => println!("No connector detected."),
            Report::ReferenceCaptured(inspection) => {
                println!("Captured {} wires:", inspection.colors.len());
                print_sequence(&inspection.colors);
            }
            Report::Verdict { matched, inspection } => {
                println!("{}", if matched { "OK" } else { "NG" });
                print_sequence(&inspection.colors);
            }
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.options.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args.options)?;

    match args.command {
        Command::Inspect {
            image_path,
            background,
            debug_out,
        } => inspect(config, &image_path, background.as_deref(), debug_out),
        Command::Check {
            reference,
            images,
            background,
            annotate_dir,
        } => check(config, &reference, &images, background.as_deref(), annotate_dir.as_deref()),
        Command::Watch { images, interval_ms } => watch(config, &images, Duration::from_millis(interval_ms)),
    }
}
