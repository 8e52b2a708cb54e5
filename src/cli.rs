use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

#[derive(Debug, Parser)]
#[command(
    name = "fieldmap",
    version,
    about = "Offline map package inspection and local tile serving"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level (error|warn|info|debug|trace)
    #[arg(long, default_value = "info")]
    pub log: String,

    /// JSON settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show what a package declares about itself
    Inspect(InspectArgs),
    /// Read a single tile
    Tile(TileArgs),
    /// Serve packages over HTTP on localhost
    Serve(ServeArgs),
    /// List base layers and the offline layers each can draw
    Backends(BackendsArgs),
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    pub input: PathBuf,

    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub output: ReportFormat,

    /// Print the TileJSON document served for this package
    #[arg(long, default_value_t = false)]
    pub tilejson: bool,
}

#[derive(Debug, Args)]
pub struct TileArgs {
    pub input: PathBuf,

    /// Tile address in z/x/y form, row counted from the north
    pub tile: String,

    /// Write the tile bytes to this file
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Gunzip the tile before writing it
    #[arg(long, default_value_t = false)]
    pub decompress: bool,

    /// Summarize the layers of a vector tile
    #[arg(long, default_value_t = false)]
    pub summary: bool,

    #[arg(long)]
    pub layer: Option<String>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Packages or directories of packages
    pub inputs: Vec<PathBuf>,

    #[arg(long)]
    pub port: Option<u16>,
}

#[derive(Debug, Args)]
pub struct BackendsArgs {
    #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
    pub output: ReportFormat,

    /// Directory scanned for offline layers
    #[arg(long)]
    pub layers_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}
