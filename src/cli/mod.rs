//! Command line interface.

pub mod command;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hycom3h::{
    query::{LAT_RANGE, LON_RANGE},
    BoundingBox,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log debug detail
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download HYCOM 3-hourly data
    Download(DownloadArgs),
    /// Print the time coverage of every dataset version
    Coverage {},
    /// Show which dataset versions cover a time or span
    Resolve {
        /// YYYYMMDDHH or YYYYMMDD
        time: String,
        /// Optional end of a span
        end: Option<String>,
    },
    /// Print the request URL for one variable and time
    Url(UrlArgs),
}

/// Region shared by `download` and `url`.
#[derive(Args, Debug, Clone)]
pub struct RegionArgs {
    #[arg(long, default_value_t = LON_RANGE.0, allow_negative_numbers = true)]
    pub lon_min: f64,

    #[arg(long, default_value_t = LON_RANGE.1, allow_negative_numbers = true)]
    pub lon_max: f64,

    #[arg(long, default_value_t = LAT_RANGE.0, allow_negative_numbers = true)]
    pub lat_min: f64,

    #[arg(long, default_value_t = LAT_RANGE.1, allow_negative_numbers = true)]
    pub lat_max: f64,

    /// Depth in metres; wins over --level
    #[arg(long)]
    pub depth: Option<f64>,

    /// Vertical level, 1-40
    #[arg(long)]
    pub level: Option<i32>,
}

impl RegionArgs {
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox::new(self.lon_min, self.lon_max, self.lat_min, self.lat_max)
    }
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Variables: u, v, temp, salt, ssh, u_b, v_b, temp_b, salt_b
    #[arg(required = true, value_delimiter = ',')]
    pub variables: Vec<String>,

    /// Start time, YYYYMMDDHH or YYYYMMDD
    #[arg(short, long)]
    pub start: String,

    /// End time, YYYYMMDDHH or YYYYMMDD
    #[arg(short, long)]
    pub end: Option<String>,

    #[command(flatten)]
    pub region: RegionArgs,

    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Dataset name, e.g. GLBy0.08
    #[arg(long, requires = "dataset_version")]
    pub dataset: Option<String>,

    /// Dataset version, e.g. 93.0
    #[arg(long, requires = "dataset")]
    pub dataset_version: Option<String>,

    /// Parallel downloads, 1-10
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Keep existing files that look complete
    #[arg(long)]
    pub skip_existing: bool,

    /// 3-hour steps per file, 1-8
    #[arg(long, default_value_t = 1)]
    pub steps_per_file: usize,

    /// File with one User-Agent per line
    #[arg(long, env = "HYCOM_USER_AGENTS")]
    pub user_agents: Option<PathBuf>,

    /// File with one proxy (host:port) per line
    #[arg(long, env = "HYCOM_PROXIES")]
    pub proxies: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct UrlArgs {
    pub variable: String,

    /// Time, YYYYMMDDHH or YYYYMMDD
    pub time: String,

    /// End of a span; requests it as one file
    #[arg(short, long)]
    pub end: Option<String>,

    #[command(flatten)]
    pub region: RegionArgs,
}

/// Installs the global subscriber. `RUST_LOG` overrides the flags.
pub fn setup_logging(quiet: bool, verbose: bool) {
    let level = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("hycom3h={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------
