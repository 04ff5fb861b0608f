use std::path::PathBuf;

/// Vessel tile-pyramid CLI (argument schema only)
#[derive(clap::Parser, Debug)]
#[command(name = "vectortile", version, about, propagate_version = true)]
pub struct Cli {
    /// Increase output verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Ingest a source file and build the quadtree's scratch-file topology
    GenerateTree(GenerateTreeArgs),

    /// Walk a saved tree and emit each node's cluster summary and tile file
    GenerateTiles,

    /// Emit the `header`/`workspace` sidecar files for a built tree
    GenerateHeaders,
}

#[derive(clap::Args, Debug)]
pub struct GenerateTreeArgs {
    /// Input CSV file of geolocated event records
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: PathBuf,
}
