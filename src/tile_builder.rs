//! Builds a node's tile and cluster summary file, either directly from raw
//! leaf records or by merging and coarsening its children's cluster
//! summaries. Both paths share `rebin_and_coarsen`, since the merge monoid
//! makes a grid-code re-bin exact regardless of whether the initial
//! clusters came from raw rows or from child summaries.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::bounds::TileBounds;
use crate::cluster_stats::ClusterStats;
use crate::column_map;
use crate::quadtree::{update_cols_by_name, QuadtreeNode};
use crate::record::Record;
use crate::store;
use crate::tile_codec;

/// Re-bin `clusters` by grid code at `node_bounds.zoom_level +
/// clustering_levels`, then coarsen (truncate the grid code by one
/// character and re-merge) until at most `max_count` clusters remain.
/// Deterministic: buckets are kept in a `BTreeMap`, so the result (and
/// therefore the emitted summary/tile files) is reproducible across runs.
fn rebin_and_coarsen(
    clusters: Vec<ClusterStats>,
    node_bounds: TileBounds,
    clustering_levels: u32,
    max_count: u64,
) -> Vec<ClusterStats> {
    let grid_zoom = node_bounds.zoom_level + clustering_levels;

    let mut buckets: BTreeMap<String, ClusterStats> = BTreeMap::new();
    for cluster in clusters {
        // A raw row with no finite attributes at all (everything null) yields
        // an empty cluster; it has nothing to merge or report, so drop it
        // rather than bucketing a row of all-absent attributes.
        if cluster.is_empty() {
            continue;
        }
        // A cluster with no lon/lat (never saw coordinates) can't be placed
        // on the grid; it has nothing to merge spatially, so it is kept
        // under its own unique key rather than dropped.
        let key = match cluster.representative_point() {
            Some((lon, lat)) => TileBounds::from_point(lon, lat, grid_zoom).canonical_string(),
            None => format!("__unplaced_{}", buckets.len()),
        };
        buckets
            .entry(key)
            .and_modify(|existing| existing.merge(&cluster))
            .or_insert(cluster);
    }

    while buckets.len() as u64 > max_count {
        let mut coarser: BTreeMap<String, ClusterStats> = BTreeMap::new();
        for (code, cluster) in buckets {
            let truncated = if code.is_empty() { code } else { code[..code.len() - 1].to_string() };
            coarser
                .entry(truncated)
                .and_modify(|existing| existing.merge(&cluster))
                .or_insert(cluster);
        }
        buckets = coarser;
    }

    buckets.into_values().collect()
}

#[derive(Serialize)]
struct TileHeader<'a> {
    #[serde(rename = "colsByName")]
    cols_by_name: &'a BTreeMap<String, crate::quadtree::Range>,
}

/// Write the cluster summary file (one `to_summary_row()` per cluster) and
/// the tile binary (column-mapped rows, widening `node.cols_by_name`).
fn write_tile(node: &mut QuadtreeNode, dir: &Path, clusters: Vec<ClusterStats>) -> Result<()> {
    let mut summary_writer = store::open_writer(&node.cluster_path(dir))
        .with_context(|| format!("[tile_builder] failed to open cluster summary file for {}", node.bounds))?;
    for cluster in &clusters {
        summary_writer.write(&cluster.to_summary_row())?;
    }
    summary_writer.close()?;

    let mut tile_rows = Vec::with_capacity(clusters.len());
    for cluster in &clusters {
        let raw_row = cluster.to_cluster_row();
        let mapped = column_map::map_row(&raw_row);
        update_cols_by_name(&mut node.cols_by_name, &mapped);
        tile_rows.push(mapped);
    }

    let header = TileHeader { cols_by_name: &node.cols_by_name };
    let bytes = tile_codec::encode(&tile_rows, &header)
        .with_context(|| format!("[tile_builder] failed to encode tile for {}", node.bounds))?;
    std::fs::write(node.tile_path(dir), bytes)
        .with_context(|| format!("[tile_builder] failed to write tile file for {}", node.bounds))?;

    Ok(())
}

/// Leaf path: one one-record cluster per raw row, fed through the same
/// re-bin/coarsen routine interior nodes use (so co-located records at a
/// leaf still collapse into a single cluster).
pub fn build_from_leaf(node: &mut QuadtreeNode, dir: &Path, clustering_levels: u32, max_count: u64) -> Result<()> {
    let rows: Vec<Record> = store::read_all(&node.source_path(dir))
        .with_context(|| format!("[tile_builder] failed to read leaf rows for {}", node.bounds))?;

    let initial: Vec<ClusterStats> = rows.iter().map(ClusterStats::from_record).collect();
    let clusters = rebin_and_coarsen(initial, node.bounds, clustering_levels, max_count);
    write_tile(node, dir, clusters)
}

/// Interior path: collect each child's cluster summaries, re-bin by grid
/// code, coarsen until bounded, then emit.
pub fn build_from_children(
    node: &mut QuadtreeNode,
    children: &[QuadtreeNode; 4],
    dir: &Path,
    clustering_levels: u32,
    max_count: u64,
) -> Result<()> {
    let mut initial = Vec::new();
    for child in children {
        let rows: Vec<BTreeMap<String, f64>> = store::read_all(&child.cluster_path(dir))
            .with_context(|| format!("[tile_builder] failed to read cluster summaries for {}", child.bounds))?;
        for row in rows {
            initial.push(ClusterStats::from_summary_row(&row));
        }
    }

    let clusters = rebin_and_coarsen(initial, node.bounds, clustering_levels, max_count);
    write_tile(node, dir, clusters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Value;

    fn rec(lon: f64, lat: f64, speed: f64) -> Record {
        let mut r = Record::new();
        r.insert("lon".to_string(), Value::Number(lon));
        r.insert("lat".to_string(), Value::Number(lat));
        r.insert("speed".to_string(), Value::Number(speed));
        r
    }

    #[test]
    fn scenario_one_single_leaf_one_cluster() {
        let dir = tempfile::tempdir().unwrap();
        let mut node = QuadtreeNode::new(TileBounds::world());
        node.count = 3;

        let mut writer = store::open_writer(&node.source_path(dir.path())).unwrap();
        for speed in [1.0, 2.0, 3.0] {
            writer.write(&rec(0.0, 0.0, speed)).unwrap();
        }
        writer.close().unwrap();

        build_from_leaf(&mut node, dir.path(), 6, 16_000).unwrap();

        let summaries: Vec<BTreeMap<String, f64>> = store::read_all(&node.cluster_path(dir.path())).unwrap();
        assert_eq!(summaries.len(), 1);
        let cluster = ClusterStats::from_summary_row(&summaries[0]);
        let row = cluster.to_cluster_row();
        assert_eq!(row["speed"], 2.0);
        assert!((row["speed_stddev"] - 0.8164965809).abs() < 1e-9);
    }

    #[test]
    fn coarsening_bounds_cluster_count() {
        // Many distinct nearby points, tight max_count: coarsening must kick in.
        let mut initial = Vec::new();
        for i in 0..50 {
            let lon = -170.0 + i as f64 * 0.001;
            let lat = 10.0;
            initial.push(ClusterStats::from_record(&rec(lon, lat, 1.0)));
        }
        let clusters = rebin_and_coarsen(initial, TileBounds::world(), 6, 4);
        assert!(clusters.len() <= 4);
    }

    #[test]
    fn all_null_record_contributes_no_empty_cluster() {
        let empty_record = Record::new();
        let initial = vec![ClusterStats::from_record(&empty_record), ClusterStats::from_record(&rec(0.0, 0.0, 1.0))];
        let clusters = rebin_and_coarsen(initial, TileBounds::world(), 6, 16_000);
        assert_eq!(clusters.len(), 1);
        assert!(!clusters[0].is_empty());
    }
}
