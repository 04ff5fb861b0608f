//! Fixed registry of named output-column transforms, evaluated over a
//! cluster's `to_cluster_row()` output. Not a general expression evaluator,
//! just a safe systems-language stand-in for the original's `eval()`-based
//! mini-expressions, per the Design Notes.

use std::collections::BTreeMap;

use crate::record::Value;

/// Reinterpret the 32-bit big-endian IEEE-754 bit pattern of `f` as a
/// signed 32-bit integer (exact byte reinterpretation, not a numeric cast).
pub fn float2bits(f: f32) -> i32 {
    i32::from_be_bytes(f.to_be_bytes())
}

/// Inverse of `float2bits`.
pub fn bits2float(b: i32) -> f32 {
    f32::from_be_bytes(b.to_be_bytes())
}

type ClusterRow = BTreeMap<String, f64>;

/// The recognised mappings: `{datetime, latitude, longitude, course,
/// speed, series, seriesgroup}`, evaluated in this fixed declaration order.
/// Each entry reads only the source row, never a previously-computed
/// output column, so evaluation is isolated and order-independent in
/// effect, even though the order itself is fixed for reproducibility.
const COLUMN_NAMES: [&str; 7] =
    ["datetime", "latitude", "longitude", "course", "speed", "series", "seriesgroup"];

fn eval_column(name: &str, row: &ClusterRow) -> Option<f64> {
    match name {
        "datetime" => row.get("timestamp").copied(),
        "latitude" => row.get("lat").copied(),
        "longitude" => row.get("lon").copied(),
        "course" => row.get("course").copied(),
        "speed" => row.get("speed").copied(),
        "series" => row.get("track").copied(),
        "seriesgroup" => {
            let mmsi = *row.get("mmsi")?;
            if !mmsi.is_finite() || mmsi.fract() != 0.0 || mmsi < i32::MIN as f64 || mmsi > i32::MAX as f64 {
                return None;
            }
            Some(bits2float(mmsi as i32) as f64)
        }
        _ => None,
    }
}

/// Apply the column mapping to a cluster's raw `to_cluster_row()` output.
/// Evaluation failure for any column (missing source attribute, or a
/// `seriesgroup` mean that isn't losslessly an integer) yields
/// `Value::Null` for that column alone; it never aborts the row.
pub fn map_row(cluster_row: &ClusterRow) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    for &name in &COLUMN_NAMES {
        let value = match eval_column(name, cluster_row) {
            Some(v) => Value::Number(v),
            None => Value::Null,
        };
        out.insert(name.to_string(), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_round_trip() {
        for f in [0.0f32, 1.5, -42.25, f32::MAX, f32::MIN_POSITIVE] {
            assert_eq!(bits2float(float2bits(f)), f);
        }
    }

    #[test]
    fn maps_recognised_columns() {
        let mut row = ClusterRow::new();
        row.insert("lat".to_string(), 12.5);
        row.insert("lon".to_string(), -8.25);
        row.insert("speed".to_string(), 3.0);
        row.insert("mmsi".to_string(), 123456789.0);

        let mapped = map_row(&row);
        assert_eq!(mapped["latitude"], Value::Number(12.5));
        assert_eq!(mapped["longitude"], Value::Number(-8.25));
        assert_eq!(mapped["speed"], Value::Number(3.0));
        assert_eq!(mapped["seriesgroup"], Value::Number(bits2float(123456789) as f64));
        // course/series/datetime absent from source row -> null
        assert_eq!(mapped["course"], Value::Null);
        assert_eq!(mapped["series"], Value::Null);
        assert_eq!(mapped["datetime"], Value::Null);
    }

    #[test]
    fn seriesgroup_is_null_when_mmsi_is_not_integral() {
        let mut row = ClusterRow::new();
        row.insert("mmsi".to_string(), 123456789.5); // merged cluster mean, not exact
        let mapped = map_row(&row);
        assert_eq!(mapped["seriesgroup"], Value::Null);
    }
}
