//! Quadtree tile bounds: a lat/lon rectangle on a power-of-two world subdivision.

use geo::Rect;
use serde::{Deserialize, Serialize};

/// One of the four children of a `TileBounds`, in the fixed order the
/// partitioner always uses: NW, NE, SW, SE.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quadrant {
    Nw,
    Ne,
    Sw,
    Se,
}

/// A quadtree tile identified by `(zoom_level, x, y)` in an XYZ scheme:
/// `x` counts west to east, `y` counts north to south, both in `[0, 2^zoom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileBounds {
    pub zoom_level: u32,
    pub x: u64,
    pub y: u64,
}

impl TileBounds {
    /// The root tile covering the whole world.
    pub fn world() -> Self {
        TileBounds { zoom_level: 0, x: 0, y: 0 }
    }

    /// Number of tiles per axis at this zoom level (`2^zoom_level`).
    fn tiles_per_axis(&self) -> u64 {
        1u64 << self.zoom_level
    }

    /// Lon/lat corners of this tile, as `(lon_min, lat_min, lon_max, lat_max)`.
    pub fn corners(&self) -> (f64, f64, f64, f64) {
        let n = self.tiles_per_axis() as f64;
        let lon_min = -180.0 + (self.x as f64) * 360.0 / n;
        let lon_max = -180.0 + ((self.x + 1) as f64) * 360.0 / n;
        let lat_max = 90.0 - (self.y as f64) * 180.0 / n;
        let lat_min = 90.0 - ((self.y + 1) as f64) * 180.0 / n;
        (lon_min, lat_min, lon_max, lat_max)
    }

    /// The geographic rectangle this tile covers.
    pub fn bbox(&self) -> BBox {
        let (lon_min, lat_min, lon_max, lat_max) = self.corners();
        BBox {
            rect: Rect::new((lon_min, lat_min), (lon_max, lat_max)),
        }
    }

    /// Does this tile's rectangle contain `(lon, lat)`? Half-open on the low
    /// edge of each axis; closed at the absolute world edge (`lat = 90`,
    /// `lon = 180`) so every point on Earth is claimed by exactly one tile
    /// at every zoom level.
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        let (lon_min, lat_min, lon_max, lat_max) = self.corners();
        let lon_ok = lon >= lon_min && (lon < lon_max || (lon_max >= 180.0 && lon <= 180.0));
        let lat_ok = lat >= lat_min && (lat < lat_max || (lat_max >= 90.0 && lat <= 90.0));
        lon_ok && lat_ok
    }

    /// The four children of this tile, always in NW, NE, SW, SE order.
    pub fn children(&self) -> [TileBounds; 4] {
        let z = self.zoom_level + 1;
        let (x0, y0) = (2 * self.x, 2 * self.y);
        [
            TileBounds { zoom_level: z, x: x0, y: y0 },         // NW
            TileBounds { zoom_level: z, x: x0 + 1, y: y0 },     // NE
            TileBounds { zoom_level: z, x: x0, y: y0 + 1 },     // SW
            TileBounds { zoom_level: z, x: x0 + 1, y: y0 + 1 }, // SE
        ]
    }

    /// The tile containing `(lon, lat)` at the given zoom level.
    pub fn from_point(lon: f64, lat: f64, zoom: u32) -> Self {
        let n = (1u64 << zoom) as f64;
        let x = (((lon + 180.0) / 360.0) * n).floor().clamp(0.0, n - 1.0) as u64;
        let y = ((((90.0 - lat) / 180.0) * n).floor()).clamp(0.0, n - 1.0) as u64;
        TileBounds { zoom_level: zoom, x, y }
    }

    /// Quadkey canonical string: one base-4 digit per zoom level
    /// (`2*y_bit + x_bit`, NW=0 NE=1 SW=2 SE=3). The zoom-0 root has no
    /// digits, so it is special-cased to the literal `"root"` since an
    /// empty string is not a usable filename.
    pub fn canonical_string(&self) -> String {
        if self.zoom_level == 0 {
            return "root".to_string();
        }
        let mut digits = String::with_capacity(self.zoom_level as usize);
        for level in (0..self.zoom_level).rev() {
            let x_bit = (self.x >> level) & 1;
            let y_bit = (self.y >> level) & 1;
            let digit = 2 * y_bit + x_bit;
            digits.push(char::from_digit(digit as u32, 10).expect("digit is 0..=3"));
        }
        digits
    }
}

impl std::fmt::Display for TileBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

/// The geographic rectangle of a `TileBounds`. Kept distinct from
/// `TileBounds` because the filesystem layout names scratch/cluster/info
/// files by the quadkey string but the tile binary itself by the bbox
/// string (see spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    #[serde(with = "rect_serde")]
    rect: Rect<f64>,
}

impl BBox {
    pub fn lon_min(&self) -> f64 { self.rect.min().x }
    pub fn lat_min(&self) -> f64 { self.rect.min().y }
    pub fn lon_max(&self) -> f64 { self.rect.max().x }
    pub fn lat_max(&self) -> f64 { self.rect.max().y }

    /// Filesystem-safe canonical string: fixed 6-decimal corners joined by
    /// underscores, used directly as the tile output filename.
    pub fn canonical_string(&self) -> String {
        format!(
            "{:.6}_{:.6}_{:.6}_{:.6}",
            self.lon_min(),
            self.lat_min(),
            self.lon_max(),
            self.lat_max()
        )
    }
}

impl std::fmt::Display for BBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

mod rect_serde {
    use geo::Rect;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Corners {
        lon_min: f64,
        lat_min: f64,
        lon_max: f64,
        lat_max: f64,
    }

    pub fn serialize<S: Serializer>(rect: &Rect<f64>, s: S) -> Result<S::Ok, S::Error> {
        Corners {
            lon_min: rect.min().x,
            lat_min: rect.min().y,
            lon_max: rect.max().x,
            lat_max: rect.max().y,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Rect<f64>, D::Error> {
        let c = Corners::deserialize(d)?;
        Ok(Rect::new((c.lon_min, c.lat_min), (c.lon_max, c.lat_max)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_has_no_digits() {
        assert_eq!(TileBounds::world().canonical_string(), "root");
    }

    #[test]
    fn children_are_nw_ne_sw_se() {
        let root = TileBounds::world();
        let [nw, ne, sw, se] = root.children();
        assert_eq!(nw.canonical_string(), "0");
        assert_eq!(ne.canonical_string(), "1");
        assert_eq!(sw.canonical_string(), "2");
        assert_eq!(se.canonical_string(), "3");
    }

    #[test]
    fn from_point_prefix_invariant() {
        let lon = 47.3;
        let lat = -12.8;
        for z in 1..16u32 {
            let deep = TileBounds::from_point(lon, lat, z);
            let shallow = TileBounds::from_point(lon, lat, z - 1);
            let deep_str = deep.canonical_string();
            let prefix = &deep_str[..deep_str.len() - 1];
            assert_eq!(prefix, shallow.canonical_string());
        }
    }

    #[test]
    fn contains_is_deterministic_at_world_edges() {
        let root = TileBounds::world();
        let [nw, ne, sw, se] = root.children();
        // lat = 90 is the absolute top edge: must land in NW or NE (the northern children).
        assert!(nw.contains(-170.0, 90.0) || ne.contains(-170.0, 90.0));
        // lon = 180 is the absolute east edge: must land in NE or SE (the eastern children).
        assert!(ne.contains(180.0, 10.0) || se.contains(180.0, 10.0));
        // Exactly one child claims any given interior point.
        let claimants = [nw, ne, sw, se].iter().filter(|b| b.contains(10.0, 10.0)).count();
        assert_eq!(claimants, 1);
    }

    #[test]
    fn bbox_canonical_string_is_filesystem_safe() {
        let bbox = TileBounds::world().bbox();
        let s = bbox.canonical_string();
        assert!(s.chars().all(|c| c.is_ascii_digit() || c == '.' || c == '_' || c == '-'));
    }
}
