//! Saves and loads a `Quadtree`'s topology to/from its `tree.msg` and
//! per-node `<bounds>-info.msg` files, so a tree built in one process can be
//! tiled (or re-tiled) in another without re-partitioning.

use std::path::Path;

use anyhow::{Context, Result};

use crate::bounds::TileBounds;
use crate::quadtree::{NodeInfo, Quadtree, QuadtreeNode, TreeParams};
use crate::store;

const TREE_FILENAME: &str = "tree.msg";

/// Write `tree.msg` plus every node's info file, recursing into children.
pub fn save(tree: &Quadtree, dir: &Path) -> Result<()> {
    let params = TreeParams::from(tree);
    let mut writer = store::open_writer(&dir.join(TREE_FILENAME))
        .context("[persistence] failed to open tree.msg for writing")?;
    writer.write(&params)?;
    writer.close()?;

    save_node(&tree.root, dir)
}

fn save_node(node: &QuadtreeNode, dir: &Path) -> Result<()> {
    let info = NodeInfo {
        bounds: node.bounds.canonical_string(),
        count: node.count,
        hollow: node.hollow,
        cols_by_name: node.cols_by_name.clone(),
    };
    let mut writer = store::open_writer(&node.info_path(dir))
        .with_context(|| format!("[persistence] failed to open info file for {}", node.bounds))?;
    writer.write(&info)?;
    writer.close()?;

    if let Some(children) = &node.children {
        for child in children.iter() {
            save_node(child, dir)?;
        }
    }
    Ok(())
}

/// Load a tree's parameters and topology back. Child nodes are discovered
/// by re-deriving their bounds from the parent (the quadtree shape is
/// fully determined by which bounds have an info file on disk) and probing
/// for an info file at each of the four candidate paths; a node with no
/// info file on disk simply isn't part of the tree.
pub fn load(dir: &Path) -> Result<Quadtree> {
    let params: TreeParams = store::read_all(&dir.join(TREE_FILENAME))
        .context("[persistence] failed to read tree.msg")?
        .into_iter()
        .next()
        .context("[persistence] tree.msg contained no parameters")?;

    let root = load_node(TileBounds::world(), dir)?
        .context("[persistence] root info file is missing")?;

    Ok(Quadtree {
        max_depth: params.max_depth,
        max_count: params.max_count,
        remove: params.remove,
        clustering_levels: params.clustering_levels,
        filename: params.filename,
        root,
    })
}

fn load_node(bounds: TileBounds, dir: &Path) -> Result<Option<QuadtreeNode>> {
    let mut node = QuadtreeNode::new(bounds);
    let info_path = node.info_path(dir);
    if !info_path.exists() {
        return Ok(None);
    }

    let info: NodeInfo = store::read_all(&info_path)
        .with_context(|| format!("[persistence] failed to read info file for {bounds}"))?
        .into_iter()
        .next()
        .with_context(|| format!("[persistence] info file for {bounds} contained no record"))?;

    node.count = info.count;
    node.hollow = info.hollow;
    node.cols_by_name = info.cols_by_name;

    let mut loaded_children = Vec::new();
    for child_bounds in bounds.children() {
        match load_node(child_bounds, dir)? {
            Some(child) => loaded_children.push(child),
            None => {
                loaded_children.clear();
                break;
            }
        }
    }
    if loaded_children.len() == 4 {
        let children: [QuadtreeNode; 4] = loaded_children
            .try_into()
            .expect("exactly four children checked above");
        node.children = Some(Box::new(children));
    }

    Ok(Some(node))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver;
    use crate::record::{Record, Value};

    fn rec(lon: f64, lat: f64) -> Record {
        let mut r = Record::new();
        r.insert("lon".to_string(), Value::Number(lon));
        r.insert("lat".to_string(), Value::Number(lat));
        r
    }

    #[test]
    fn round_trips_a_split_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = Quadtree::new("ships.csv".to_string());
        tree.max_count = 2;

        let mut writer = store::open_writer(&tree.root.source_path(dir.path())).unwrap();
        writer.write(&rec(-170.0, 80.0)).unwrap();
        writer.write(&rec(170.0, 80.0)).unwrap();
        writer.write(&rec(-170.0, -80.0)).unwrap();
        writer.close().unwrap();
        tree.root.count = 3;

        driver::build(&mut tree, dir.path()).unwrap();
        save(&tree, dir.path()).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert_eq!(loaded.max_count, 2);
        assert_eq!(loaded.root.count, 3);
        assert!(loaded.root.hollow);
        assert!(!loaded.root.is_leaf());
    }

    #[test]
    fn round_trips_an_unsplit_tree() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = Quadtree::new("ships.csv".to_string());
        tree.root.count = 1;
        save(&tree, dir.path()).unwrap();

        let loaded = load(dir.path()).unwrap();
        assert!(loaded.root.is_leaf());
        assert_eq!(loaded.root.count, 1);
    }
}
