//! NRM intensity distribution: quartiles, empirical CDF and log-spaced bin
//! counts for the histogram plot. Values are handled in mA/m.

use std::io::Write;

use log::warn;

use super::table::{write_table, Table};

/// A/m → mA/m.
pub const MILLI: f64 = 1000.0;

pub const HISTOGRAM_HEADERS: &[&str] = &[
    "Bin_low_(mA/m)",
    "Bin_high_(mA/m)",
    "Count",
    "Cumulative_frequency",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub low: f64,
    pub high: f64,
    pub count: usize,
    /// Fraction of all values `<= high`.
    pub cumulative: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IntensityDistribution {
    /// Sorted values in mA/m.
    pub values: Vec<f64>,
    pub quartiles: [f64; 3],
    pub bins: Vec<Bin>,
}

impl IntensityDistribution {
    /// Build from raw intensities in mA/m. Returns `None` when there is
    /// nothing to place on a log axis.
    pub fn from_values(mut values: Vec<f64>, edges: usize) -> Option<Self> {
        values.retain(|v| v.is_finite() && *v > 0.0);
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        let quartiles = [
            percentile(&values, 25.0),
            percentile(&values, 50.0),
            percentile(&values, 75.0),
        ];
        let edges = log_edges(values[0], values[values.len() - 1], edges);
        let bins = histogram(&values, &edges);
        Some(IntensityDistribution {
            values,
            quartiles,
            bins,
        })
    }

    pub fn min(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }

    pub fn max(&self) -> f64 {
        self.values.last().copied().unwrap_or(f64::NAN)
    }

    /// Distinct values with the fraction of values `<=` each.
    pub fn ecdf(&self) -> Vec<(f64, f64)> {
        let n = self.values.len() as f64;
        let mut out: Vec<(f64, f64)> = Vec::new();
        for (i, v) in self.values.iter().enumerate() {
            let p = (i + 1) as f64 / n;
            match out.last_mut() {
                Some(last) if last.0 == *v => last.1 = p,
                _ => out.push((*v, p)),
            }
        }
        out
    }
}

/// Collect the NRM column of an NRM table in mA/m, skipping unusable values.
pub fn nrm_values(table: &Table) -> Vec<f64> {
    let mut values = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        match row.nrm.trim().parse::<f64>() {
            Ok(v) if v > 0.0 => values.push(v * MILLI),
            Ok(v) => warn!(
                "{}: row {}: NRM {v} cannot go on a log axis; skipping",
                table.path.display(),
                row.row
            ),
            Err(_) => warn!(
                "{}: row {}: non-numeric NRM '{}'; skipping",
                table.path.display(),
                row.row,
                row.nrm
            ),
        }
    }
    values
}

/// Percentile with linear interpolation between closest ranks.
/// `sorted` must be non-empty and ascending.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let rank = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// `count` edges evenly spaced in log10 between `min` and `max`.
pub fn log_edges(min: f64, max: f64, count: usize) -> Vec<f64> {
    let count = count.max(2);
    let (lo, hi) = (min.log10(), max.log10());
    let step = (hi - lo) / (count - 1) as f64;
    let mut edges: Vec<f64> = (0..count).map(|i| 10f64.powf(lo + step * i as f64)).collect();
    // Pin the ends so rounding in powf cannot push min or max out of range.
    edges[0] = min;
    edges[count - 1] = max;
    edges
}

/// Bin sorted values into `[lo, hi)` bins, the last one closed.
fn histogram(sorted: &[f64], edges: &[f64]) -> Vec<Bin> {
    let n = sorted.len() as f64;
    let last = edges.len().saturating_sub(2);
    let mut cumulative = 0usize;
    edges
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let (low, high) = (w[0], w[1]);
            let count = sorted
                .iter()
                .filter(|&&v| v >= low && (v < high || (i == last && v <= high)))
                .count();
            cumulative += count;
            Bin {
                low,
                high,
                count,
                cumulative: cumulative as f64 / n,
            }
        })
        .collect()
}

pub fn write_histogram<W: Write>(writer: W, dist: &IntensityDistribution) -> crate::error::Rs3Result<()> {
    write_table(
        writer,
        HISTOGRAM_HEADERS,
        dist.bins.iter().map(|b| {
            [
                format!("{:?}", b.low),
                format!("{:?}", b.high),
                b.count.to_string(),
                format!("{:?}", b.cumulative),
            ]
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quartiles_interpolate_linearly() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&sorted, 25.0), 1.75);
        assert_eq!(percentile(&sorted, 50.0), 2.5);
        assert_eq!(percentile(&sorted, 75.0), 3.25);
        assert_eq!(percentile(&[5.0], 50.0), 5.0);
    }

    #[test]
    fn ecdf_merges_duplicates() {
        let dist = IntensityDistribution::from_values(vec![3.0, 1.0, 3.0, 2.0], 5).unwrap();
        assert_eq!(dist.ecdf(), vec![(1.0, 0.25), (2.0, 0.5), (3.0, 1.0)]);
        assert_eq!(dist.min(), 1.0);
        assert_eq!(dist.max(), 3.0);
    }

    #[test]
    fn bins_cover_every_value() {
        let values = vec![1.0, 10.0, 100.0, 1000.0, 50.0];
        let dist = IntensityDistribution::from_values(values, 4).unwrap();
        assert_eq!(dist.bins.len(), 3);
        assert_eq!(dist.bins[0].low, 1.0);
        assert_eq!(dist.bins[2].high, 1000.0);
        let total: usize = dist.bins.iter().map(|b| b.count).sum();
        assert_eq!(total, 5);
        assert_eq!(dist.bins[2].cumulative, 1.0);
    }

    #[test]
    fn non_positive_values_are_dropped() {
        assert!(IntensityDistribution::from_values(vec![0.0, -1.0], 10).is_none());
        let dist = IntensityDistribution::from_values(vec![0.0, 2.0], 10).unwrap();
        assert_eq!(dist.values, vec![2.0]);
    }

    #[test]
    fn single_value_gives_one_full_bin() {
        let dist = IntensityDistribution::from_values(vec![4.0], 50).unwrap();
        assert_eq!(dist.bins.iter().map(|b| b.count).sum::<usize>(), 1);
        assert_eq!(dist.quartiles, [4.0, 4.0, 4.0]);
    }
}
