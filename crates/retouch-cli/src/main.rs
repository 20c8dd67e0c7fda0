//! retouch - headless photo adjustment renderer
//!
//! Renders a source image with a stored edit (RON adjustments), runs the
//! auto-enhance analyzer, and prints default edit/config files.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "retouch")]
#[command(author, version, about = "Non-destructive photo adjustment renderer")]
#[command(long_about = "
Renders photos through the retouch adjustment pipeline.

Examples:
  retouch print-defaults > edit.ron           # Start an edit file
  retouch render photo.jpg -a edit.ron -o out.jpg
  retouch render photo.jpg -a edit.ron -o preview.png --preview 720x1280
  retouch render photo.jpg -a edit.ron --mask subject.png -o cutout.png
  retouch analyze photo.jpg --variant vivid   # Print an auto-enhanced edit
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Pipeline config (RON)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an image with an adjustment file
    #[command(visible_alias = "r")]
    Render(RenderArgs),

    /// Suggest exposure/contrast for an image
    #[command(visible_alias = "a")]
    Analyze(AnalyzeArgs),

    /// Print default adjustments or config as RON
    #[command(name = "print-defaults")]
    PrintDefaults(PrintDefaultsArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Source image
    input: PathBuf,

    /// Output image
    #[arg(short, long)]
    output: PathBuf,

    /// Adjustments (RON); defaults leave the image unchanged
    #[arg(short, long)]
    adjustments: Option<PathBuf>,

    /// Subject mask image (white = subject) for background effects
    #[arg(short, long)]
    mask: Option<PathBuf>,

    /// Render a preview bounded by WIDTHxHEIGHT instead of full resolution
    #[arg(short, long, value_parser = commands::parse_size)]
    preview: Option<(u32, u32)>,

    /// Ignore the crop rectangle
    #[arg(long)]
    no_crop: bool,

    /// JPEG quality (1-100)
    #[arg(short, long, default_value = "95", value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: u8,

    /// Hide the progress line
    #[arg(long)]
    quiet: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum VariantArg {
    None,
    Balanced,
    Warm,
    Cool,
    Vivid,
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Source image
    input: PathBuf,

    /// Print a full adjustment file for this variant
    #[arg(long, value_enum)]
    variant: Option<VariantArg>,

    /// Layer the variant on top of these adjustments (RON)
    #[arg(short, long, requires = "variant")]
    adjustments: Option<PathBuf>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DefaultsKind {
    Adjustments,
    Config,
}

#[derive(Args)]
struct PrintDefaultsArgs {
    /// Which file to print
    #[arg(value_enum, default_value = "adjustments")]
    kind: DefaultsKind,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => retouch_render::RenderConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => retouch_render::RenderConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }

    match cli.command {
        Commands::Render(args) => commands::render::run(args, config),
        Commands::Analyze(args) => commands::analyze::run(args, config),
        Commands::PrintDefaults(args) => commands::defaults::run(args, &config),
    }
}
