//! Gradient-boosted regression trees with a squared-error objective.
//!
//! Training starts from the mean target and adds one shrunken tree per round,
//! each fitted to the current residual gradients (`score - y`, hessian 1).
//! Row bagging and feature sub-sampling are driven by a seeded RNG, so a fixed
//! `seed` reproduces the same model.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::domain::FeatureFrame;
use crate::error::AppError;
use crate::gbdt::binning::{BinnedMatrix, MAX_BIN_LIMIT};
use crate::gbdt::tree::{Tree, TreeConfig, grow_tree};

/// Booster hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub struct GbdtParams {
    /// Number of boosting rounds.
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// Maximum leaves per tree.
    pub num_leaves: usize,
    /// `None` means unlimited depth.
    pub max_depth: Option<usize>,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian_in_leaf: f64,
    pub lambda_l2: f64,
    pub min_gain_to_split: f64,
    pub max_bin: usize,
    /// Fraction of rows drawn (without replacement) for each tree.
    pub bagging_fraction: f64,
    /// Fraction of features considered by each tree.
    pub feature_fraction: f64,
    pub seed: u64,
    /// Worker threads; zero or negative uses every core.
    pub n_jobs: i32,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            num_leaves: 31,
            max_depth: None,
            min_data_in_leaf: 20,
            min_sum_hessian_in_leaf: 1e-3,
            lambda_l2: 0.0,
            min_gain_to_split: 0.0,
            max_bin: 255,
            bagging_fraction: 1.0,
            feature_fraction: 1.0,
            seed: 42,
            n_jobs: -1,
        }
    }
}

impl GbdtParams {
    pub fn validate(&self) -> Result<(), AppError> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(AppError::input("learning_rate must be finite and > 0."));
        }
        if self.num_leaves < 2 {
            return Err(AppError::input("num_leaves must be >= 2."));
        }
        if self.max_depth == Some(0) {
            return Err(AppError::input("max_depth must be >= 1 when set."));
        }
        if !(2..=MAX_BIN_LIMIT).contains(&self.max_bin) {
            return Err(AppError::input(format!("max_bin must be in 2..={MAX_BIN_LIMIT}.")));
        }
        if !(self.lambda_l2.is_finite() && self.lambda_l2 >= 0.0) {
            return Err(AppError::input("lambda_l2 must be finite and >= 0."));
        }
        for (name, v) in [
            ("bagging_fraction", self.bagging_fraction),
            ("feature_fraction", self.feature_fraction),
        ] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(AppError::input(format!("{name} must be in (0, 1].")));
            }
        }
        Ok(())
    }

    fn tree_config(&self) -> TreeConfig {
        TreeConfig {
            num_leaves: self.num_leaves,
            max_depth: self.max_depth,
            min_data_in_leaf: self.min_data_in_leaf,
            min_sum_hessian_in_leaf: self.min_sum_hessian_in_leaf,
            lambda_l2: self.lambda_l2,
            min_gain_to_split: self.min_gain_to_split,
            learning_rate: self.learning_rate,
        }
    }
}

/// Gradient-boosted tree regressor.
#[derive(Debug, Clone)]
pub struct GbdtRegressor {
    params: GbdtParams,
    init_score: f64,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
    split_gain: Vec<f64>,
}

impl GbdtRegressor {
    pub fn new(params: GbdtParams) -> Self {
        Self {
            params,
            init_score: 0.0,
            trees: Vec::new(),
            feature_names: Vec::new(),
            split_gain: Vec::new(),
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn init_score(&self) -> f64 {
        self.init_score
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Train on the feature columns of `frame` against its target.
    pub fn fit_frame(&mut self, frame: &FeatureFrame) -> Result<(), AppError> {
        let x = frame.to_row_major();
        self.fit(&x, frame.feature_names(), &frame.target)
    }

    /// Train on a row-major matrix with one column per name in `feature_names`.
    pub fn fit(&mut self, x: &[f64], feature_names: Vec<String>, y: &[f64]) -> Result<(), AppError> {
        self.params.validate()?;
        let n_rows = y.len();
        let n_features = feature_names.len();
        if n_rows == 0 {
            return Err(AppError::data("Cannot train on an empty training set."));
        }
        if n_features == 0 {
            return Err(AppError::input("Cannot train without feature columns."));
        }
        if x.len() != n_rows * n_features {
            return Err(AppError::input(format!(
                "Feature matrix has {} values, expected {n_rows} rows x {n_features} features.",
                x.len()
            )));
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(AppError::input("Training target contains non-finite values."));
        }

        self.feature_names = feature_names;
        let params = self.params.clone();
        let (init_score, trees, split_gain) =
            with_thread_pool(params.n_jobs, || train(&params, x, n_rows, n_features, y))?;

        self.init_score = init_score;
        self.trees = trees;
        self.split_gain = split_gain;
        info!(
            trees = self.trees.len(),
            init_score = self.init_score,
            "finished boosting"
        );
        Ok(())
    }

    /// Predict the feature columns of `frame`. Column names must match training.
    pub fn predict_frame(&self, frame: &FeatureFrame) -> Result<Vec<f64>, AppError> {
        let names = frame.feature_names();
        if names != self.feature_names {
            return Err(AppError::input(format!(
                "Feature columns {names:?} do not match the training columns {:?}.",
                self.feature_names
            )));
        }
        self.predict(&frame.to_row_major())
    }

    /// Predict a row-major matrix with the training column layout.
    pub fn predict(&self, x: &[f64]) -> Result<Vec<f64>, AppError> {
        let n_features = self.n_features();
        if n_features == 0 {
            return Err(AppError::input("Model has not been trained."));
        }
        if x.len() % n_features != 0 {
            return Err(AppError::input(format!(
                "Feature matrix length {} is not a multiple of {n_features} features.",
                x.len()
            )));
        }

        let preds: Vec<f64> = x
            .par_chunks(n_features)
            .map(|row| self.init_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>())
            .collect();

        if preds.iter().any(|p| !p.is_finite()) {
            return Err(AppError::numeric("Non-finite prediction from the boosted model."));
        }
        Ok(preds)
    }

    /// Total split gain per feature, largest first.
    pub fn feature_importance(&self) -> Vec<(String, f64)> {
        let mut out: Vec<(String, f64)> = self
            .feature_names
            .iter()
            .cloned()
            .zip(self.split_gain.iter().copied())
            .collect();
        out.sort_by(|a, b| b.1.total_cmp(&a.1));
        out
    }
}

fn train(
    params: &GbdtParams,
    x: &[f64],
    n_rows: usize,
    n_features: usize,
    y: &[f64],
) -> (f64, Vec<Tree>, Vec<f64>) {
    let data = BinnedMatrix::from_row_major(x, n_rows, n_features, params.max_bin);
    debug!(
        bins = ?data.mappers.iter().map(|m| m.n_bins()).collect::<Vec<_>>(),
        "binned features"
    );

    let init_score = y.iter().sum::<f64>() / n_rows as f64;
    let mut scores = vec![init_score; n_rows];
    let mut grad = vec![0.0; n_rows];
    let hess = vec![1.0; n_rows];
    let mut split_gain = vec![0.0; n_features];
    let mut trees = Vec::with_capacity(params.n_estimators);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let cfg = params.tree_config();

    for round in 0..params.n_estimators {
        grad.par_iter_mut()
            .zip(scores.par_iter().zip(y.par_iter()))
            .for_each(|(g, (s, t))| *g = s - t);

        let rows = sample_rows(&mut rng, n_rows, params.bagging_fraction);
        let features = sample_features(&mut rng, n_features, params.feature_fraction);
        let bagged = rows.len() < n_rows;
        let grown = grow_tree(&data, &grad, &hess, rows, &features, &cfg);

        if bagged {
            let tree = &grown.tree;
            scores
                .par_iter_mut()
                .enumerate()
                .for_each(|(r, s)| *s += tree.predict_binned(&data, r));
        } else {
            for (rows, value) in &grown.leaf_rows {
                for &r in rows {
                    scores[r as usize] += value;
                }
            }
        }
        for &(f, gain) in &grown.split_gains {
            split_gain[f] += gain;
        }

        let no_split = grown.split_gains.is_empty();
        trees.push(grown.tree);

        if round % 10 == 0 || round + 1 == params.n_estimators {
            let mse = scores.iter().zip(y).map(|(s, t)| (s - t).powi(2)).sum::<f64>() / n_rows as f64;
            debug!(round, train_rmse = mse.sqrt(), "boosting round");
        }
        if no_split {
            debug!(round, "no leaf meets the split requirements; stopping early");
            break;
        }
    }

    (init_score, trees, split_gain)
}

fn sample_rows(rng: &mut StdRng, n_rows: usize, fraction: f64) -> Vec<u32> {
    if fraction >= 1.0 {
        return (0..n_rows as u32).collect();
    }
    let k = ((n_rows as f64 * fraction).round() as usize).clamp(1, n_rows);
    let mut rows: Vec<u32> = sample(rng, n_rows, k).into_iter().map(|i| i as u32).collect();
    rows.sort_unstable();
    rows
}

fn sample_features(rng: &mut StdRng, n_features: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n_features).collect();
    }
    let k = ((n_features as f64 * fraction).round() as usize).clamp(1, n_features);
    let mut features = sample(rng, n_features, k).into_vec();
    features.sort_unstable();
    features
}

/// Run `f` on the global rayon pool (`n_jobs <= 0`) or on a dedicated pool.
fn with_thread_pool<T: Send>(n_jobs: i32, f: impl FnOnce() -> T + Send) -> Result<T, AppError> {
    if n_jobs <= 0 {
        return Ok(f());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(n_jobs as usize)
        .build()
        .map_err(|e| AppError::input(format!("Failed to build a {n_jobs}-thread pool: {e}")))?;
    Ok(pool.install(f))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("f{i}")).collect()
    }

    #[test]
    fn fits_a_two_feature_signal() {
        // y depends on a step in f0 and a ramp in f1; f2 is unrelated.
        let n = 400;
        let mut x = Vec::with_capacity(n * 3);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let f0 = (i % 2) as f64;
            let f1 = ((i / 2) % 10) as f64;
            let f2 = ((i * 7) % 13) as f64;
            x.extend_from_slice(&[f0, f1, f2]);
            y.push(100.0 * f0 + 5.0 * f1);
        }

        let mut model = GbdtRegressor::new(GbdtParams {
            n_estimators: 200,
            min_data_in_leaf: 5,
            ..GbdtParams::default()
        });
        model.fit(&x, names(3), &y).unwrap();
        let pred = model.predict(&x).unwrap();
        let mae = pred.iter().zip(&y).map(|(p, t)| (p - t).abs()).sum::<f64>() / n as f64;
        assert!(mae < 1.0, "mae={mae}");
        assert!(!model.trees().is_empty() && model.trees().len() <= 200);
        assert!(model.trees().iter().all(|t| t.n_leaves() <= 31));
        assert!((model.init_score() - y.iter().sum::<f64>() / n as f64).abs() < 1e-9);

        let importance = model.feature_importance();
        assert_eq!(importance[0].0, "f0");
        assert_eq!(importance[2].0, "f2");
    }

    #[test]
    fn zero_rounds_predicts_the_mean() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 2.0, 3.0, 6.0];
        let mut model = GbdtRegressor::new(GbdtParams {
            n_estimators: 0,
            ..GbdtParams::default()
        });
        model.fit(&x, names(1), &y).unwrap();
        assert!(model.trees().is_empty());
        assert_eq!(model.init_score(), 3.0);
        assert_eq!(model.predict(&[10.0]).unwrap(), vec![3.0]);
    }

    #[test]
    fn same_seed_same_model_with_sampling() {
        let n = 200;
        let x: Vec<f64> = (0..n * 2).map(|i| ((i * 37) % 101) as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| x[2 * i] * 0.5 + x[2 * i + 1]).collect();
        let params = GbdtParams {
            n_estimators: 20,
            bagging_fraction: 0.7,
            feature_fraction: 0.5,
            min_data_in_leaf: 5,
            n_jobs: 2,
            ..GbdtParams::default()
        };

        let mut a = GbdtRegressor::new(params.clone());
        let mut b = GbdtRegressor::new(params);
        a.fit(&x, names(2), &y).unwrap();
        b.fit(&x, names(2), &y).unwrap();
        assert_eq!(a.predict(&x).unwrap(), b.predict(&x).unwrap());
    }

    #[test]
    fn rejects_bad_params_and_shapes() {
        let mut model = GbdtRegressor::new(GbdtParams {
            num_leaves: 1,
            ..GbdtParams::default()
        });
        assert_eq!(model.fit(&[1.0], names(1), &[1.0]).unwrap_err().exit_code(), 2);

        let mut model = GbdtRegressor::new(GbdtParams::default());
        assert!(model.fit(&[1.0, 2.0, 3.0], names(2), &[1.0, 2.0]).is_err());
        assert!(model.predict(&[1.0]).is_err());
    }
}
