//! Emits the two small JSON sidecar files a tileset ships with: `header`
//! (column ranges and tileset identity) and `workspace` (the fixed
//! map-viewer template, parameterized only by tileset name and the
//! observed datetime range).

use std::path::Path;

use anyhow::{Context, Result};
use chrono::DateTime;
use serde_json::json;

use crate::quadtree::Quadtree;

/// Write `header`: the root's observed column ranges plus tileset identity.
pub fn generate_header(tree: &Quadtree, dir: &Path) -> Result<()> {
    let header = json!({
        "colsByName": tree.root.cols_by_name,
        "seriesTilesets": false,
        "tilesetName": tree.name(),
        "tilesetVersion": "0.0.1",
    });
    let path = dir.join("header");
    std::fs::write(&path, serde_json::to_vec_pretty(&header)?)
        .with_context(|| format!("[header] failed to write {}", path.display()))
}

/// Write `workspace`: the fixed map-viewer template. `title` is the
/// tileset name; `time`/`timeExtent` come from the root's observed
/// `datetime` range (midpoint and one-tenth of the span), matching the
/// viewer's animation scrubber defaults. Everything else in this template
/// is cosmetic and constant across tilesets, so it is reproduced verbatim.
pub fn generate_workspace(tree: &Quadtree, dir: &Path) -> Result<()> {
    let datetime_range = tree.root.cols_by_name.get("datetime");
    let (time, time_extent) = match datetime_range {
        Some(range) => {
            let midpoint_ms = (range.min + range.max) / 2.0;
            let extent_ms = (range.max - range.min) / 10.0;
            let secs = (midpoint_ms / 1000.0).floor() as i64;
            let nanos = (((midpoint_ms / 1000.0) - secs as f64) * 1_000_000_000.0) as u32;
            let formatted = DateTime::from_timestamp(secs, nanos)
                .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
                .unwrap_or_default();
            (formatted, extent_ms)
        }
        None => (String::new(), 0.0),
    };

    let workspace = json!({
        "state": {
            "title": tree.name(),
            "offset": 20,
            "maxoffset": 100,
            "lat": 0.0,
            "lon": 0.0,
            "zoom": 3,
            "time": { "__jsonclass__": ["Date", time] },
            "timeExtent": time_extent,
            "paused": true,
        },
        "map": {
            "animations": [
                {
                    "args": {
                        "title": tree.name(),
                        "visible": true,
                        "source": {
                            "type": "TiledBinFormat",
                            "args": { "url": "./" },
                        },
                        "columns": {
                            "longitude": { "type": "Float32", "hidden": true, "source": { "longitude": 1 } },
                            "latitude": { "type": "Float32", "hidden": true, "source": { "latitude": 1 } },
                            "sigma": { "type": "Float32", "source": { "sigma": 1 }, "min": 0, "max": 1 },
                            "weight": { "type": "Float32", "source": { "speed": 1 }, "min": 0, "max": 1 },
                            "time": { "type": "Float32", "hidden": true, "source": { "datetime": 1 } },
                            "filter": {
                                "type": "Float32",
                                "source": { "_": null, "timerange": -1, "active_category": -1 },
                            },
                            "selected": { "type": "Float32", "hidden": true, "source": { "selected": 1 } },
                            "hover": { "type": "Float32", "hidden": true, "source": { "hover": 1 } },
                        },
                        "selections": {
                            "selected": { "sortcols": ["seriesgroup"] },
                            "hover": { "sortcols": ["seriesgroup"] },
                        },
                    },
                    "type": "ClusterAnimation",
                }
            ],
            "options": {
                "mapTypeId": "roadmap",
                "styles": [
                    { "featureType": "poi", "stylers": [{ "visibility": "off" }] },
                    { "featureType": "administrative", "stylers": [{ "visibility": "simplified" }] },
                    { "featureType": "administrative.country", "stylers": [{ "visibility": "on" }] },
                    { "featureType": "road", "stylers": [{ "visibility": "off" }] },
                    { "featureType": "landscape.natural", "stylers": [{ "visibility": "off" }] },
                ],
            },
        },
    });

    let path = dir.join("workspace");
    std::fs::write(&path, serde_json::to_vec_pretty(&workspace)?)
        .with_context(|| format!("[header] failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quadtree::Range;

    #[test]
    fn header_reports_tileset_name_from_input_filename() {
        let dir = tempfile::tempdir().unwrap();
        let tree = Quadtree::new("ships.csv".to_string());
        generate_header(&tree, dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("header")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["tilesetName"], "ships");
        assert_eq!(parsed["seriesTilesets"], false);
    }

    #[test]
    fn workspace_time_extent_derives_from_datetime_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut tree = Quadtree::new("ships.csv".to_string());
        tree.root.cols_by_name.insert(
            "datetime".to_string(),
            Range { min: 1_000_000.0, max: 11_000_000.0 },
        );
        generate_workspace(&tree, dir.path()).unwrap();

        let contents = std::fs::read_to_string(dir.path().join("workspace")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed["state"]["timeExtent"], 1_000_000.0);
        assert_eq!(parsed["state"]["title"], "ships");
    }

    #[test]
    fn workspace_without_any_datetime_column_still_emits() {
        let dir = tempfile::tempdir().unwrap();
        let tree = Quadtree::new("ships.csv".to_string());
        generate_workspace(&tree, dir.path()).unwrap();
        assert!(dir.path().join("workspace").exists());
    }
}
