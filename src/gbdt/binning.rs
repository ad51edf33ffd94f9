//! Feature discretization.
//!
//! Each feature is mapped to at most `max_bin` value bins plus one extra bin for
//! missing values (`NaN` or infinite). Bin `i` holds values `v` with
//! `upper_bounds[i - 1] < v <= upper_bounds[i]`; the last bound is `+inf`.
//!
//! Bounds sit halfway between adjacent distinct values. When a feature has more
//! distinct values than bins, bins are cut at equal-count quantiles.

use rayon::prelude::*;

/// Largest supported `max_bin` (bins are stored as `u8`, one slot is the missing bin).
pub const MAX_BIN_LIMIT: usize = 255;

/// Value-to-bin mapping for one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    upper_bounds: Vec<f64>,
}

impl BinMapper {
    /// Fit bin bounds to the observed values of one feature.
    pub fn fit(values: &[f64], max_bin: usize) -> Self {
        let max_bin = max_bin.clamp(1, MAX_BIN_LIMIT);

        let mut finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if finite.is_empty() {
            return Self {
                upper_bounds: vec![f64::INFINITY],
            };
        }
        finite.sort_by(|a, b| a.total_cmp(b));

        let mut distinct: Vec<(f64, usize)> = Vec::new();
        for v in finite {
            match distinct.last_mut() {
                Some((d, count)) if *d == v => *count += 1,
                _ => distinct.push((v, 1)),
            }
        }

        let mut bounds = Vec::with_capacity(max_bin);
        if distinct.len() <= max_bin {
            for w in distinct.windows(2) {
                bounds.push(midpoint(w[0].0, w[1].0));
            }
        } else {
            let total: usize = distinct.iter().map(|(_, c)| c).sum();
            let per_bin = total as f64 / max_bin as f64;
            let mut seen = 0usize;
            for i in 0..distinct.len() - 1 {
                if bounds.len() + 1 >= max_bin {
                    break;
                }
                seen += distinct[i].1;
                if seen as f64 >= per_bin * (bounds.len() + 1) as f64 {
                    bounds.push(midpoint(distinct[i].0, distinct[i + 1].0));
                }
            }
        }
        bounds.push(f64::INFINITY);

        Self { upper_bounds: bounds }
    }

    /// Number of value bins (the missing bin is extra).
    pub fn n_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    pub fn missing_bin(&self) -> u8 {
        self.upper_bounds.len() as u8
    }

    pub fn bin(&self, value: f64) -> u8 {
        if !value.is_finite() {
            return self.missing_bin();
        }
        self.upper_bounds.partition_point(|ub| *ub < value) as u8
    }

    /// Largest value that maps to `bin` (or below).
    pub fn upper_bound(&self, bin: u8) -> f64 {
        self.upper_bounds
            .get(bin as usize)
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

fn midpoint(a: f64, b: f64) -> f64 {
    a + (b - a) / 2.0
}

/// Column-major binned copy of a feature matrix.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    pub n_rows: usize,
    pub mappers: Vec<BinMapper>,
    pub columns: Vec<Vec<u8>>,
}

impl BinnedMatrix {
    /// Bin a row-major matrix of `n_rows x n_features` values.
    pub fn from_row_major(x: &[f64], n_rows: usize, n_features: usize, max_bin: usize) -> Self {
        let (mappers, columns): (Vec<BinMapper>, Vec<Vec<u8>>) = (0..n_features)
            .into_par_iter()
            .map(|f| {
                let values: Vec<f64> = (0..n_rows).map(|r| x[r * n_features + f]).collect();
                let mapper = BinMapper::fit(&values, max_bin);
                let bins = values.iter().map(|&v| mapper.bin(v)).collect();
                (mapper, bins)
            })
            .unzip();

        Self {
            n_rows,
            mappers,
            columns,
        }
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }
}
