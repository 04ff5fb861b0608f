//! The commutative monoid of per-attribute `(count, sum, sum_squares)`
//! triples that makes interior-node tiles exact merges of their children's,
//! with no need to ever re-read raw rows above the leaves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{Record, Value};

/// Variance more negative than this (floating-point noise from the
/// `sum_squares/count - mean^2` identity) is clamped to zero; beyond it the
/// attribute's stddev is omitted entirely rather than reported as zero.
const VARIANCE_CLAMP_THRESHOLD: f64 = -1.0e-5;

/// An unordered-multiset summary of numeric attributes: `(count, sum,
/// sum_squares)` per attribute name, stored in `BTreeMap`s so summary rows
/// and cluster-row output serialize in a reproducible order across runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    counts: BTreeMap<String, f64>,
    sums: BTreeMap<String, f64>,
    sqr_sums: BTreeMap<String, f64>,
}

impl ClusterStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a one-record cluster directly from a raw record.
    pub fn from_record(record: &Record) -> Self {
        let mut stats = Self::new();
        stats.add_record(record);
        stats
    }

    fn ensure_attr(&mut self, name: &str) {
        self.counts.entry(name.to_string()).or_insert(0.0);
        self.sums.entry(name.to_string()).or_insert(0.0);
        self.sqr_sums.entry(name.to_string()).or_insert(0.0);
    }

    /// Fold a raw record's numeric attributes into this cluster. Non-numeric
    /// (`Value::Null`, non-finite) attributes are skipped, not errored.
    pub fn add_record(&mut self, record: &Record) {
        for (name, value) in record {
            let Some(v) = value.as_finite() else { continue };
            self.ensure_attr(name);
            *self.counts.get_mut(name).unwrap() += 1.0;
            *self.sums.get_mut(name).unwrap() += v;
            *self.sqr_sums.get_mut(name).unwrap() += v * v;
        }
    }

    /// Merge `other` into `self`: union the attribute key set, add shared
    /// keys componentwise. Commutative and associative; identity is
    /// `ClusterStats::new()`.
    pub fn merge(&mut self, other: &ClusterStats) {
        for (name, &count) in &other.counts {
            self.ensure_attr(name);
            *self.counts.get_mut(name).unwrap() += count;
            *self.sums.get_mut(name).unwrap() += other.sums[name];
            *self.sqr_sums.get_mut(name).unwrap() += other.sqr_sums[name];
        }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Mean longitude/latitude of this cluster, used as its representative
    /// point for grid-code re-binning. Returns `None` if this cluster never
    /// saw `lon`/`lat`.
    pub fn representative_point(&self) -> Option<(f64, f64)> {
        let lon = self.sums.get("lon")? / self.counts.get("lon")?;
        let lat = self.sums.get("lat")? / self.counts.get("lat")?;
        Some((lon, lat))
    }

    /// The wire form consumed by parent nodes: `counts__<attr>`,
    /// `sums__<attr>`, `sqr_sums__<attr>`.
    pub fn to_summary_row(&self) -> BTreeMap<String, f64> {
        let mut row = BTreeMap::new();
        for (name, &count) in &self.counts {
            row.insert(format!("counts__{name}"), count);
            row.insert(format!("sums__{name}"), self.sums[name]);
            row.insert(format!("sqr_sums__{name}"), self.sqr_sums[name]);
        }
        row
    }

    /// Parse the wire form back into a `ClusterStats`.
    pub fn from_summary_row(row: &BTreeMap<String, f64>) -> Self {
        let mut stats = Self::new();
        for (key, &value) in row {
            if let Some(name) = key.strip_prefix("counts__") {
                stats.counts.insert(name.to_string(), value);
            } else if let Some(name) = key.strip_prefix("sums__") {
                stats.sums.insert(name.to_string(), value);
            } else if let Some(name) = key.strip_prefix("sqr_sums__") {
                stats.sqr_sums.insert(name.to_string(), value);
            }
        }
        stats
    }

    /// For each attribute, `<attr> = mean` and `<attr>_stddev = sqrt(var)`
    /// under the variance-clamp policy; attributes whose variance is more
    /// negative than the clamp threshold are omitted (not zeroed, not
    /// errored). Only called on non-empty clusters, so division by zero
    /// cannot occur (every retained attribute has `count > 0`).
    pub fn to_cluster_row(&self) -> BTreeMap<String, f64> {
        let mut row = BTreeMap::new();
        for (name, &count) in &self.counts {
            if count <= 0.0 {
                continue;
            }
            let sum = self.sums[name];
            let sqr_sum = self.sqr_sums[name];
            let mean = sum / count;
            let mut var = sqr_sum / count - mean * mean;
            if var < 0.0 {
                if var < VARIANCE_CLAMP_THRESHOLD {
                    row.insert(name.clone(), mean);
                    continue;
                }
                var = 0.0;
            }
            row.insert(name.clone(), mean);
            row.insert(format!("{name}_stddev"), var.sqrt());
        }
        row
    }
}

impl Value {
    #[cfg(test)]
    fn n(v: f64) -> Self {
        Value::Number(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, f64)]) -> Record {
        pairs.iter().map(|&(k, v)| (k.to_string(), Value::n(v))).collect()
    }

    #[test]
    fn add_record_skips_non_finite_and_null() {
        let mut r = record(&[("speed", 3.0)]);
        r.insert("name".to_string(), Value::Null);
        r.insert("bad".to_string(), Value::Number(f64::NAN));

        let stats = ClusterStats::from_record(&r);
        let row = stats.to_cluster_row();
        assert_eq!(row.get("speed"), Some(&3.0));
        assert!(!row.contains_key("name"));
        assert!(!row.contains_key("bad"));
    }

    #[test]
    fn merge_is_commutative_and_associative() {
        let a = ClusterStats::from_record(&record(&[("speed", 1.0)]));
        let b = ClusterStats::from_record(&record(&[("speed", 2.0)]));
        let c = ClusterStats::from_record(&record(&[("speed", 3.0)]));

        let mut ab = a.clone();
        ab.merge(&b);
        let mut ba = b.clone();
        ba.merge(&a);
        assert_eq!(ab.to_summary_row(), ba.to_summary_row());

        let mut ab_c = ab.clone();
        ab_c.merge(&c);
        let mut bc = b.clone();
        bc.merge(&c);
        let mut a_bc = a.clone();
        a_bc.merge(&bc);
        assert_eq!(ab_c.to_summary_row(), a_bc.to_summary_row());
    }

    #[test]
    fn merge_identity() {
        let a = ClusterStats::from_record(&record(&[("speed", 5.0)]));
        let mut merged = a.clone();
        merged.merge(&ClusterStats::new());
        assert_eq!(merged.to_summary_row(), a.to_summary_row());
    }

    #[test]
    fn scenario_three_identical_points() {
        let mut stats = ClusterStats::new();
        for speed in [1.0, 2.0, 3.0] {
            stats.add_record(&record(&[("speed", speed), ("lat", 0.0), ("lon", 0.0)]));
        }
        let row = stats.to_cluster_row();
        assert_eq!(row["speed"], 2.0);
        assert!((row["speed_stddev"] - 0.8164965809).abs() < 1e-9);
    }

    #[test]
    fn summary_row_round_trip() {
        let stats = ClusterStats::from_record(&record(&[("speed", 4.0), ("course", 90.0)]));
        let row = stats.to_summary_row();
        let back = ClusterStats::from_summary_row(&row);
        assert_eq!(stats.to_summary_row(), back.to_summary_row());
    }

    #[test]
    fn negative_variance_beyond_threshold_drops_attribute_not_whole_cluster() {
        let mut stats = ClusterStats::new();
        stats.counts.insert("bad".to_string(), 2.0);
        stats.sums.insert("bad".to_string(), 4.0);
        // sqr_sum engineered so var = sqr_sum/count - mean^2 is very negative
        stats.sqr_sums.insert("bad".to_string(), 0.0);
        stats.counts.insert("good".to_string(), 1.0);
        stats.sums.insert("good".to_string(), 10.0);
        stats.sqr_sums.insert("good".to_string(), 100.0);

        let row = stats.to_cluster_row();
        assert!(!row.contains_key("bad_stddev"));
        assert!(row.contains_key("bad")); // mean still reported
        assert_eq!(row["good"], 10.0);
        assert_eq!(row["good_stddev"], 0.0);
    }
}
