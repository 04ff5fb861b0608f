//! Top-level orchestration: the build phase (recursive partitioning into
//! child scratch files) and the tile phase (post-order tile construction).
//! Kept separate from `partitioner`/`tile_builder` since those modules know
//! nothing about recursion, depth limits, or hollowing: they each handle
//! exactly one node.

use std::path::Path;

use anyhow::{Context, Result};

use crate::partitioner;
use crate::quadtree::{Quadtree, QuadtreeNode};
use crate::tile_builder;

/// Config `build_node` needs, pulled out of `Quadtree` so the recursive
/// descent never needs a shared borrow of the whole tree alongside a
/// mutable borrow of one of its nodes.
#[derive(Clone, Copy)]
struct BuildParams {
    max_depth: Option<u32>,
    max_count: u64,
    remove: bool,
}

/// Recursively partition `node`'s scratch file into children until each
/// leaf is at or below `max_count`, `max_depth` is reached, or a split made
/// no progress (see `should_stop_splitting`).
///
/// `is_root` controls whether the node's own scratch file survives once
/// hollowed: the root is kept unless `params.remove` says otherwise, since
/// deleting it would destroy the only copy of the ingested data when the
/// caller wants to re-run with different parameters.
fn build_node(params: BuildParams, node: &mut QuadtreeNode, dir: &Path, depth: u32, is_root: bool) -> Result<()> {
    let at_max_depth = params.max_depth.is_some_and(|d| depth >= d);
    if node.count <= params.max_count || at_max_depth {
        return Ok(());
    }

    let children = partitioner::partition(node, dir)
        .with_context(|| format!("[driver] failed to partition {}", node.bounds))?;

    if should_stop_splitting(node.count, &children) {
        for child in &children {
            std::fs::remove_file(child.source_path(dir)).with_context(|| {
                format!("[driver] failed to remove orphaned scratch file for {}", child.bounds)
            })?;
        }
        return Ok(());
    }

    node.hollow = true;
    if !is_root || params.remove {
        std::fs::remove_file(node.source_path(dir))
            .with_context(|| format!("[driver] failed to remove hollowed scratch file for {}", node.bounds))?;
    }

    let mut children = children;
    for child in &mut children {
        build_node(params, child, dir, depth + 1, false)?;
    }
    node.children = Some(Box::new(children));

    Ok(())
}

/// A split is degenerate if every row landed in exactly one child and that
/// child's count is unchanged from the parent's: further splitting would
/// recurse forever on a spatial cluster too fine-grained to separate (e.g.
/// thousands of records at the identical coordinate). Treat the node as a
/// leaf instead of looping.
fn should_stop_splitting(parent_count: u64, children: &[QuadtreeNode; 4]) -> bool {
    let populated: Vec<&QuadtreeNode> = children.iter().filter(|c| c.count > 0).collect();
    populated.len() == 1 && populated[0].count == parent_count
}

/// Run the build phase starting at the root.
pub fn build(tree: &mut Quadtree, dir: &Path) -> Result<()> {
    let params = BuildParams { max_depth: tree.max_depth, max_count: tree.max_count, remove: tree.remove };
    build_node(params, &mut tree.root, dir, 0, true)
}

/// Post-order: build every child's tile before this node's, since interior
/// tiles are merges of their children's cluster summaries.
fn tile_node(node: &mut QuadtreeNode, dir: &Path, clustering_levels: u32, max_count: u64) -> Result<()> {
    match &mut node.children {
        None => tile_builder::build_from_leaf(node, dir, clustering_levels, max_count)
            .with_context(|| format!("[driver] failed to build leaf tile for {}", node.bounds)),
        Some(children) => {
            for child in children.iter_mut() {
                tile_node(child, dir, clustering_levels, max_count)?;
            }
            let children = children.as_ref().clone();
            tile_builder::build_from_children(node, &children, dir, clustering_levels, max_count)
                .with_context(|| format!("[driver] failed to build interior tile for {}", node.bounds))
        }
    }
}

/// Run the tile phase starting at the root.
pub fn tile(tree: &mut Quadtree, dir: &Path) -> Result<()> {
    tile_node(&mut tree.root, dir, tree.clustering_levels, tree.max_count)
}
