use anyhow::{Context, Result};
use vectortile::{driver, persistence};

pub fn run(cli: &crate::cli::Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("[generate-tiles] failed to read working directory")?;

    if cli.verbose > 0 {
        eprintln!("[generate-tiles] loading tree from {}", cwd.display());
    }

    let mut tree = persistence::load(&cwd)?;
    driver::tile(&mut tree, &cwd)?;
    persistence::save(&tree, &cwd)?;

    if cli.verbose > 0 {
        eprintln!("[generate-tiles] tiles written under {}", cwd.display());
    }

    Ok(())
}
