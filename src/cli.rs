use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::region::DEFAULT_THRESHOLD_KM;
use crate::sources::SourceSpec;

#[derive(Parser, Debug)]
#[command(
    name = "quakecat",
    version,
    about = "Seismic event catalogue combiner with gazetteer region attribution"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Combine(CombineArgs),
    Inventory(InventoryArgs),
    Locate(LocateArgs),
    Status(StatusArgs),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum FallbackStrategy {
    None,
    SubstringMatch,
    BoundingBox,
}

impl FallbackStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::SubstringMatch => "substring-match",
            Self::BoundingBox => "bounding-box",
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct CombineArgs {
    /// Agency source directory as AGENCY=DIR; repeat for every agency.
    #[arg(long = "source", required = true)]
    pub sources: Vec<SourceSpec>,

    #[arg(long)]
    pub output: PathBuf,

    #[arg(long)]
    pub gazetteer: Option<PathBuf>,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD_KM)]
    pub threshold_km: f64,

    /// Attribution used when no gazetteer is available.
    #[arg(long, value_enum, default_value_t = FallbackStrategy::None)]
    pub fallback: FallbackStrategy,

    #[arg(long)]
    pub place_table: Option<PathBuf>,

    #[arg(long = "strip-suffix")]
    pub strip_suffixes: Vec<String>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long)]
    pub threads: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct InventoryArgs {
    #[arg(long = "source", required = true)]
    pub sources: Vec<SourceSpec>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    #[arg(long)]
    pub gazetteer: PathBuf,

    #[arg(long)]
    pub country: Option<String>,

    #[arg(long, default_value_t = DEFAULT_THRESHOLD_KM)]
    pub threshold_km: f64,

    #[arg(long = "strip-suffix")]
    pub strip_suffixes: Vec<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long)]
    pub manifest_path: PathBuf,
}
