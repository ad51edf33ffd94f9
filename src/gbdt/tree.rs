//! Histogram-based regression trees grown leaf-wise.
//!
//! Growth is best-first: at every step the leaf whose best split has the largest
//! gain is split, until `num_leaves` is reached or no leaf has a valid split.
//! Split gain (second-order, L2-regularized):
//!
//! ```text
//! gain = G_L^2 / (H_L + λ) + G_R^2 / (H_R + λ) - G^2 / (H + λ)
//! ```
//!
//! Only the smaller child's histogram is built from rows; the larger child's is
//! the parent's minus the smaller one.

use rayon::prelude::*;

use crate::gbdt::binning::BinnedMatrix;

/// A node in a fitted tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Split {
        feature: usize,
        /// Rows with `bin <= bin` go left.
        bin: u8,
        /// Raw-value equivalent of `bin`: values `<= threshold` go left.
        threshold: f64,
        /// Direction taken by missing values.
        default_left: bool,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted regression tree. Node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    /// Predict one raw (unbinned) row.
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    let v = row[*feature];
                    let go_left = if v.is_finite() { v <= *threshold } else { *default_left };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    /// Predict one row of the training matrix using its bins.
    pub fn predict_binned(&self, data: &BinnedMatrix, row: usize) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    bin,
                    default_left,
                    left,
                    right,
                    ..
                } => {
                    let b = data.columns[*feature][row];
                    let go_left = if b == data.mappers[*feature].missing_bin() {
                        *default_left
                    } else {
                        b <= *bin
                    };
                    idx = if go_left { *left } else { *right };
                }
            }
        }
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }
}

/// Growth limits and regularization for one tree.
#[derive(Debug, Clone)]
pub struct TreeConfig {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_data_in_leaf: usize,
    pub min_sum_hessian_in_leaf: f64,
    pub lambda_l2: f64,
    pub min_gain_to_split: f64,
    /// Shrinkage folded into the leaf values.
    pub learning_rate: f64,
}

/// A grown tree plus what the booster needs to update its state.
#[derive(Debug, Clone)]
pub struct GrownTree {
    pub tree: Tree,
    /// Training rows that landed in each leaf, with the leaf value.
    pub leaf_rows: Vec<(Vec<u32>, f64)>,
    /// `(feature, gain)` for every split made.
    pub split_gains: Vec<(usize, f64)>,
}

#[derive(Debug, Clone, Copy, Default)]
struct BinStat {
    grad: f64,
    hess: f64,
    count: u32,
}

/// Per feature, one `BinStat` per value bin plus the missing bin.
/// Features outside the active set have an empty histogram.
type Histogram = Vec<Vec<BinStat>>;

#[derive(Debug, Clone)]
struct SplitInfo {
    feature: usize,
    bin: u8,
    default_left: bool,
    gain: f64,
    left_grad: f64,
    left_hess: f64,
}

#[derive(Debug)]
struct LeafState {
    node: usize,
    rows: Vec<u32>,
    grad: f64,
    hess: f64,
    depth: usize,
    hist: Histogram,
    best: Option<SplitInfo>,
}

/// Grow one tree on `rows` using only the `features` listed.
pub fn grow_tree(
    data: &BinnedMatrix,
    grad: &[f64],
    hess: &[f64],
    rows: Vec<u32>,
    features: &[usize],
    cfg: &TreeConfig,
) -> GrownTree {
    let mut active = vec![false; data.n_features()];
    for &f in features {
        active[f] = true;
    }

    let (root_grad, root_hess) = sum_grad_hess(&rows, grad, hess);
    let root_hist = build_histogram(data, &rows, grad, hess, &active);
    let mut root = LeafState {
        node: 0,
        rows,
        grad: root_grad,
        hess: root_hess,
        depth: 0,
        hist: root_hist,
        best: None,
    };
    root.best = best_split(&root, cfg, &active);

    let mut nodes = vec![Node::Leaf { value: 0.0 }];
    let mut leaves = vec![root];
    let mut split_gains = Vec::new();

    while leaves.len() < cfg.num_leaves.max(1) {
        // Largest gain wins; ties go to the earliest leaf.
        let mut pick: Option<(usize, f64)> = None;
        for (i, leaf) in leaves.iter().enumerate() {
            if let Some(split) = &leaf.best {
                if pick.is_none_or(|(_, g)| split.gain > g) {
                    pick = Some((i, split.gain));
                }
            }
        }
        let Some((idx, _)) = pick else {
            break;
        };

        let parent = leaves.remove(idx);
        let Some(split) = parent.best.clone() else {
            break;
        };

        let missing_bin = data.mappers[split.feature].missing_bin();
        let column = &data.columns[split.feature];
        let (left_rows, right_rows): (Vec<u32>, Vec<u32>) = parent.rows.iter().partition(|&&r| {
            let b = column[r as usize];
            if b == missing_bin {
                split.default_left
            } else {
                b <= split.bin
            }
        });

        let left_node = nodes.len();
        let right_node = left_node + 1;
        nodes.push(Node::Leaf { value: 0.0 });
        nodes.push(Node::Leaf { value: 0.0 });
        nodes[parent.node] = Node::Split {
            feature: split.feature,
            bin: split.bin,
            threshold: data.mappers[split.feature].upper_bound(split.bin),
            default_left: split.default_left,
            left: left_node,
            right: right_node,
        };
        split_gains.push((split.feature, split.gain));

        let (left_hist, right_hist) = if left_rows.len() <= right_rows.len() {
            let small = build_histogram(data, &left_rows, grad, hess, &active);
            let large = subtract(&parent.hist, &small);
            (small, large)
        } else {
            let small = build_histogram(data, &right_rows, grad, hess, &active);
            let large = subtract(&parent.hist, &small);
            (large, small)
        };

        let depth = parent.depth + 1;
        let mut left = LeafState {
            node: left_node,
            rows: left_rows,
            grad: split.left_grad,
            hess: split.left_hess,
            depth,
            hist: left_hist,
            best: None,
        };
        let mut right = LeafState {
            node: right_node,
            rows: right_rows,
            grad: parent.grad - split.left_grad,
            hess: parent.hess - split.left_hess,
            depth,
            hist: right_hist,
            best: None,
        };
        left.best = best_split(&left, cfg, &active);
        right.best = best_split(&right, cfg, &active);
        leaves.push(left);
        leaves.push(right);
    }

    let mut leaf_rows = Vec::with_capacity(leaves.len());
    for leaf in leaves {
        let value = leaf_value(leaf.grad, leaf.hess, cfg);
        nodes[leaf.node] = Node::Leaf { value };
        leaf_rows.push((leaf.rows, value));
    }

    GrownTree {
        tree: Tree { nodes },
        leaf_rows,
        split_gains,
    }
}

fn leaf_value(grad: f64, hess: f64, cfg: &TreeConfig) -> f64 {
    let denom = hess + cfg.lambda_l2;
    if denom <= 0.0 {
        return 0.0;
    }
    -grad / denom * cfg.learning_rate
}

fn sum_grad_hess(rows: &[u32], grad: &[f64], hess: &[f64]) -> (f64, f64) {
    rows.iter().fold((0.0, 0.0), |(g, h), &r| {
        (g + grad[r as usize], h + hess[r as usize])
    })
}

fn build_histogram(data: &BinnedMatrix, rows: &[u32], grad: &[f64], hess: &[f64], active: &[bool]) -> Histogram {
    (0..data.n_features())
        .into_par_iter()
        .map(|f| {
            if !active[f] {
                return Vec::new();
            }
            let column = &data.columns[f];
            let mut hist = vec![BinStat::default(); data.mappers[f].n_bins() + 1];
            for &r in rows {
                let r = r as usize;
                let slot = &mut hist[column[r] as usize];
                slot.grad += grad[r];
                slot.hess += hess[r];
                slot.count += 1;
            }
            hist
        })
        .collect()
}

fn subtract(parent: &Histogram, child: &Histogram) -> Histogram {
    parent
        .iter()
        .zip(child)
        .map(|(p, c)| {
            p.iter()
                .zip(c)
                .map(|(a, b)| BinStat {
                    grad: a.grad - b.grad,
                    hess: a.hess - b.hess,
                    count: a.count - b.count,
                })
                .collect()
        })
        .collect()
}

fn best_split(leaf: &LeafState, cfg: &TreeConfig, active: &[bool]) -> Option<SplitInfo> {
    if cfg.max_depth.is_some_and(|d| leaf.depth >= d) {
        return None;
    }
    if leaf.rows.len() < 2 * cfg.min_data_in_leaf.max(1) {
        return None;
    }

    let candidates: Vec<Option<SplitInfo>> = (0..leaf.hist.len())
        .into_par_iter()
        .map(|f| {
            if !active[f] {
                return None;
            }
            best_split_for_feature(f, &leaf.hist[f], leaf, cfg)
        })
        .collect();

    // Deterministic: strictly larger gain wins, so ties keep the lowest feature index.
    let mut best: Option<SplitInfo> = None;
    for c in candidates.into_iter().flatten() {
        if best.as_ref().is_none_or(|b| c.gain > b.gain) {
            best = Some(c);
        }
    }
    best
}

fn best_split_for_feature(feature: usize, hist: &[BinStat], leaf: &LeafState, cfg: &TreeConfig) -> Option<SplitInfo> {
    let n_value_bins = hist.len().checked_sub(1)?;
    if n_value_bins < 2 && hist[n_value_bins].count == 0 {
        return None;
    }
    let missing = hist[n_value_bins];
    let total_count = leaf.rows.len();
    let lambda = cfg.lambda_l2;
    let parent_score = score(leaf.grad, leaf.hess, lambda);

    let mut best: Option<SplitInfo> = None;
    for default_left in [false, true] {
        if default_left && missing.count == 0 {
            continue;
        }
        let (mut lg, mut lh, mut lc) = if default_left {
            (missing.grad, missing.hess, missing.count as usize)
        } else {
            (0.0, 0.0, 0usize)
        };

        // With missing values going right, the last value bin is a valid threshold too.
        let last_threshold = if default_left { n_value_bins - 1 } else { n_value_bins };
        for (b, stat) in hist.iter().enumerate().take(last_threshold) {
            lg += stat.grad;
            lh += stat.hess;
            lc += stat.count as usize;

            let rc = total_count - lc;
            let rg = leaf.grad - lg;
            let rh = leaf.hess - lh;
            if lc < cfg.min_data_in_leaf || lh < cfg.min_sum_hessian_in_leaf {
                continue;
            }
            if rc < cfg.min_data_in_leaf || rh < cfg.min_sum_hessian_in_leaf {
                break;
            }

            let gain = score(lg, lh, lambda) + score(rg, rh, lambda) - parent_score;
            if gain > cfg.min_gain_to_split && best.as_ref().is_none_or(|s| gain > s.gain) {
                best = Some(SplitInfo {
                    feature,
                    bin: b as u8,
                    default_left,
                    gain,
                    left_grad: lg,
                    left_hess: lh,
                });
            }
        }
    }
    best
}

fn score(grad: f64, hess: f64, lambda: f64) -> f64 {
    let denom = hess + lambda;
    if denom <= 0.0 { 0.0 } else { grad * grad / denom }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(num_leaves: usize) -> TreeConfig {
        TreeConfig {
            num_leaves,
            max_depth: None,
            min_data_in_leaf: 1,
            min_sum_hessian_in_leaf: 1e-3,
            lambda_l2: 0.0,
            min_gain_to_split: 0.0,
            learning_rate: 1.0,
        }
    }

    /// Gradients for squared loss starting from a zero prediction: `grad = -y`.
    fn grads(y: &[f64]) -> (Vec<f64>, Vec<f64>) {
        (y.iter().map(|v| -v).collect(), vec![1.0; y.len()])
    }

    #[test]
    fn single_split_recovers_a_step() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| if v < 10.0 { 1.0 } else { 5.0 }).collect();
        let data = BinnedMatrix::from_row_major(&x, 20, 1, 255);
        let (g, h) = grads(&y);

        let grown = grow_tree(&data, &g, &h, (0..20).collect(), &[0], &config(2));
        assert_eq!(grown.tree.n_leaves(), 2);
        assert!((grown.tree.predict_row(&[3.0]) - 1.0).abs() < 1e-12);
        assert!((grown.tree.predict_row(&[15.0]) - 5.0).abs() < 1e-12);
        assert!((grown.tree.predict_row(&[9.4]) - 1.0).abs() < 1e-12);
        assert_eq!(grown.split_gains.len(), 1);
    }

    #[test]
    fn missing_values_follow_the_better_side() {
        // Missing rows look like the high group, so they should be routed with it.
        let x = [0.0, 1.0, 2.0, 3.0, f64::NAN, f64::NAN, 10.0, 11.0];
        let y = [0.0, 0.0, 0.0, 0.0, 8.0, 8.0, 8.0, 8.0];
        let data = BinnedMatrix::from_row_major(&x, 8, 1, 255);
        let (g, h) = grads(&y);

        let grown = grow_tree(&data, &g, &h, (0..8).collect(), &[0], &config(2));
        assert!((grown.tree.predict_row(&[f64::NAN]) - 8.0).abs() < 1e-12);
        assert!((grown.tree.predict_row(&[1.0]) - 0.0).abs() < 1e-12);
        for r in 0..8 {
            assert_eq!(grown.tree.predict_binned(&data, r), grown.tree.predict_row(&[x[r]]));
        }
    }

    #[test]
    fn min_data_in_leaf_blocks_small_splits() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y = [0.0, 0.0, 0.0, 0.0, 0.0, 9.0];
        let data = BinnedMatrix::from_row_major(&x, 6, 1, 255);
        let (g, h) = grads(&y);
        let mut cfg = config(4);
        cfg.min_data_in_leaf = 3;

        let grown = grow_tree(&data, &g, &h, (0..6).collect(), &[0], &cfg);
        for (rows, _) in &grown.leaf_rows {
            assert!(rows.len() >= 3);
        }
        let total: usize = grown.leaf_rows.iter().map(|(r, _)| r.len()).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn leaf_wise_growth_respects_num_leaves_and_depth() {
        let x: Vec<f64> = (0..64).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| (v / 8.0).floor()).collect();
        let data = BinnedMatrix::from_row_major(&x, 64, 1, 255);
        let (g, h) = grads(&y);

        let grown = grow_tree(&data, &g, &h, (0..64).collect(), &[0], &config(5));
        assert_eq!(grown.tree.n_leaves(), 5);

        let mut cfg = config(31);
        cfg.max_depth = Some(2);
        let shallow = grow_tree(&data, &g, &h, (0..64).collect(), &[0], &cfg);
        assert!(shallow.tree.n_leaves() <= 4);
    }
}
