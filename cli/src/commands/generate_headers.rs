use anyhow::{Context, Result};
use vectortile::header;
use vectortile::persistence;

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("[generate-headers] failed to read working directory")?;

    if cli.verbose > 0 {
        eprintln!("[generate-headers] loading tree from {}", cwd.display());
    }

    let tree = persistence::load(&cwd)?;
    header::generate_header(&tree, &cwd)?;
    header::generate_workspace(&tree, &cwd)?;

    if cli.verbose > 0 {
        eprintln!("[generate-headers] header/workspace written under {}", cwd.display());
    }

    Ok(())
}
