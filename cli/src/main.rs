mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{generate_headers, generate_tiles, generate_tree};

pub fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    match &cli.command {
        Commands::GenerateTree(args) => generate_tree::run(&cli, args),
        Commands::GenerateTiles => generate_tiles::run(&cli),
        Commands::GenerateHeaders => generate_headers::run(&cli),
    }
}

fn main() -> anyhow::Result<()> {
    run()
}
