//! Splits a single parent scratch file into four child scratch files.

use std::path::Path;

use anyhow::{Context, Result};

use crate::quadtree::QuadtreeNode;
use crate::record::{lon_lat, Record};
use crate::store;

/// Stream-split `parent`'s scratch file into four children, in the fixed
/// NW/NE/SW/SE order of `parent.bounds.children()`. Records without
/// `lat`/`lon` are dropped. Each record goes to the first child whose
/// rectangle contains its point, so the union of child records equals the
/// parent's minus the ones lacking coordinates, with no record counted
/// twice.
///
/// Opens five files at once (one reader, four writers) to stream in a
/// single pass rather than buffering the parent's rows in memory.
pub fn partition(parent: &QuadtreeNode, dir: &Path) -> Result<[QuadtreeNode; 4]> {
    let child_bounds = parent.bounds.children();
    let mut children: [QuadtreeNode; 4] = child_bounds.map(QuadtreeNode::new);

    let mut writers = [
        store::open_writer(&children[0].source_path(dir))?,
        store::open_writer(&children[1].source_path(dir))?,
        store::open_writer(&children[2].source_path(dir))?,
        store::open_writer(&children[3].source_path(dir))?,
    ];

    let reader = store::open_reader::<Record>(&parent.source_path(dir))
        .with_context(|| format!("[partitioner] failed to open parent scratch file for {}", parent.bounds))?;

    for record in reader {
        let record = record?;
        let Some((lon, lat)) = lon_lat(&record) else { continue };
        for (i, bounds) in child_bounds.iter().enumerate() {
            if bounds.contains(lon, lat) {
                writers[i].write(&record)?;
                children[i].count += 1;
                break;
            }
        }
    }

    for writer in writers {
        writer.close()?;
    }

    Ok(children)
}
