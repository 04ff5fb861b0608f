use anyhow::{Context, Result};
use vectortile::{driver, ingest, persistence, store, Quadtree};

pub fn run(cli: &crate::cli::Cli, args: &crate::cli::GenerateTreeArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("[generate-tree] failed to read working directory")?;

    let filename = args
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.input.to_string_lossy().into_owned());

    let mut tree = Quadtree::new(filename);

    if cli.verbose > 0 {
        eprintln!("[generate-tree] reading {}", args.input.display());
    }

    let mut writer = store::open_writer(&tree.root.source_path(&cwd))
        .context("[generate-tree] failed to open root scratch file")?;
    for record in ingest::read_records(&args.input)? {
        let record = record?;
        writer.write(&record)?;
        tree.root.count += 1;
    }
    writer.close()?;

    if cli.verbose > 0 {
        eprintln!("[generate-tree] {} records loaded, splitting", tree.root.count);
    }

    driver::build(&mut tree, &cwd)?;
    persistence::save(&tree, &cwd)?;

    if cli.verbose > 0 {
        eprintln!("[generate-tree] tree saved to {}", cwd.display());
    }

    Ok(())
}
