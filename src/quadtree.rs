//! The quadtree itself: node topology, per-node filenames, and the
//! observed-range tracking (`cols_by_name`) that feeds header emission.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bounds::TileBounds;
use crate::record::Value;

/// The observed `{min, max}` range of one output attribute, widened as
/// mapped cluster rows are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

/// Widen `cols_by_name` with a mapped tile row. Null values are skipped;
/// they never narrow or widen a range.
pub fn update_cols_by_name(cols_by_name: &mut BTreeMap<String, Range>, row: &BTreeMap<String, Value>) {
    for (name, value) in row {
        let Value::Number(v) = *value else { continue };
        cols_by_name
            .entry(name.clone())
            .and_modify(|r| {
                r.min = r.min.min(v);
                r.max = r.max.max(v);
            })
            .or_insert(Range { min: v, max: v });
    }
}

/// A single quadtree node: its spatial bounds, row count, hollowing state,
/// observed attribute ranges, and (if any) its four children.
#[derive(Debug, Clone)]
pub struct QuadtreeNode {
    pub bounds: TileBounds,
    pub count: u64,
    pub hollow: bool,
    pub cols_by_name: BTreeMap<String, Range>,
    pub children: Option<Box<[QuadtreeNode; 4]>>,
}

impl QuadtreeNode {
    pub fn new(bounds: TileBounds) -> Self {
        QuadtreeNode { bounds, count: 0, hollow: false, cols_by_name: BTreeMap::new(), children: None }
    }

    /// `<bounds>-src.msg`, deleted once `hollow`.
    pub fn source_filename(&self) -> String {
        format!("{}-src.msg", self.bounds.canonical_string())
    }

    /// `<bounds>-cluster.msg`, the node's cluster summary stream.
    pub fn cluster_filename(&self) -> String {
        format!("{}-cluster.msg", self.bounds.canonical_string())
    }

    /// `<bounds>-info.msg`, topology and metadata, rewritten on every save.
    pub fn info_filename(&self) -> String {
        format!("{}-info.msg", self.bounds.canonical_string())
    }

    /// `<bbox>`, the opaque tile binary, named by the node's geographic
    /// rectangle rather than its quadkey.
    pub fn tile_filename(&self) -> String {
        self.bounds.bbox().canonical_string()
    }

    pub fn source_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.source_filename())
    }

    pub fn cluster_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.cluster_filename())
    }

    pub fn info_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.info_filename())
    }

    pub fn tile_path(&self, dir: &Path) -> PathBuf {
        dir.join(self.tile_filename())
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_none()
    }
}

/// On-disk shape of `<bounds>-info.msg`.
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeInfo {
    pub bounds: String,
    pub count: u64,
    pub hollow: bool,
    #[serde(rename = "colsByName")]
    pub cols_by_name: BTreeMap<String, Range>,
}

/// The quadtree as a whole: build/tile parameters plus the root node.
#[derive(Debug, Clone)]
pub struct Quadtree {
    pub max_depth: Option<u32>,
    pub max_count: u64,
    pub remove: bool,
    pub clustering_levels: u32,
    pub filename: String,
    pub root: QuadtreeNode,
}

impl Quadtree {
    pub const DEFAULT_MAX_COUNT: u64 = 16_000;
    pub const DEFAULT_CLUSTERING_LEVELS: u32 = 6;

    pub fn new(filename: String) -> Self {
        Quadtree {
            max_depth: None,
            max_count: Self::DEFAULT_MAX_COUNT,
            remove: true,
            clustering_levels: Self::DEFAULT_CLUSTERING_LEVELS,
            filename,
            root: QuadtreeNode::new(TileBounds::world()),
        }
    }

    /// Dataset name derived from the input filename (its stem), used as
    /// `tilesetName` / workspace `title`.
    pub fn name(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.filename.clone())
    }
}

/// On-disk shape of `tree.msg`.
#[derive(Debug, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: Option<u32>,
    pub max_count: u64,
    pub remove: bool,
    pub clustering_levels: u32,
    pub filename: String,
}

impl From<&Quadtree> for TreeParams {
    fn from(tree: &Quadtree) -> Self {
        TreeParams {
            max_depth: tree.max_depth,
            max_count: tree.max_count,
            remove: tree.remove,
            clustering_levels: tree.clustering_levels,
            filename: tree.filename.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_widens_both_bounds() {
        let mut cols = BTreeMap::new();
        let mut row = BTreeMap::new();
        row.insert("latitude".to_string(), Value::Number(5.0));
        update_cols_by_name(&mut cols, &row);
        row.insert("latitude".to_string(), Value::Number(-3.0));
        update_cols_by_name(&mut cols, &row);
        assert_eq!(cols["latitude"], Range { min: -3.0, max: 5.0 });
    }

    #[test]
    fn null_values_do_not_affect_range() {
        let mut cols = BTreeMap::new();
        let mut row = BTreeMap::new();
        row.insert("course".to_string(), Value::Null);
        update_cols_by_name(&mut cols, &row);
        assert!(!cols.contains_key("course"));
    }

    #[test]
    fn name_is_filename_stem() {
        let tree = Quadtree::new("ships.csv".to_string());
        assert_eq!(tree.name(), "ships");
    }
}
