/// Offline model training: synthetic flood data and a gradient-boosted tree
/// regressor that writes the artifact `RiskPredictor` loads at startup.
///
/// The synthetic generator draws two regimes, monsoon (40%) and dry, with
/// rainfall, soil moisture and discharge distributions typical of Indian
/// river basins. Labels come from a physics-weighted score plus a little
/// Gaussian noise, so the trained model mostly recovers that formula.
///
/// Trees are grown on quantile-binned features (histogram split search),
/// squared loss, depth-limited, with shrinkage folded into leaf values.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT};
use crate::model::ModelError;
use crate::risk::artifact::{RegressionModel, RegressionTree, TreeEnsemble, TreeNode};

/// WMO codes the generator draws from, uniformly.
pub const WEATHER_CODES: [i64; 16] = [0, 1, 2, 3, 51, 53, 55, 61, 63, 65, 80, 81, 82, 95, 96, 99];

const HEAVY_RAIN_CODES: [i64; 6] = [63, 65, 82, 95, 96, 99];
const LIGHT_RAIN_CODES: [i64; 5] = [53, 55, 61, 80, 81];

const MONSOON_FRACTION: f64 = 0.4;
const LABEL_NOISE_STD: f64 = 0.05;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingConfig {
    pub samples: usize,
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    pub min_samples_leaf: usize,
    /// Candidate split thresholds per feature (quantiles of the training column).
    pub max_bins: usize,
    pub test_fraction: f64,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            samples: 5000,
            seed: 42,
            n_trees: 100,
            max_depth: 3,
            learning_rate: 0.1,
            min_samples_leaf: 5,
            max_bins: 32,
            test_fraction: 0.2,
        }
    }
}

// ---------------------------------------------------------------------------
// Synthetic data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub rows: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<f64>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        }
    }
}

fn exponential(rng: &mut StdRng, scale: f64) -> f64 {
    // 1 - u is in (0, 1], so the log is finite.
    let u: f64 = rng.gen_range(0.0..1.0);
    -scale * (1.0 - u).ln()
}

fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::MIN_POSITIVE..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

fn sample_row(rng: &mut StdRng) -> [f64; FEATURE_COUNT] {
    let monsoon = rng.gen_range(0.0..1.0) < MONSOON_FRACTION;

    let (rainfall_24h, rainfall_7d, soil_moisture, discharge, humidity, temperature) = if monsoon {
        let r24 = exponential(rng, 30.0) + rng.gen_range(5.0..20.0);
        (
            r24,
            r24 * rng.gen_range(3.0..7.0),
            rng.gen_range(0.5..0.95),
            exponential(rng, 200.0) + 50.0,
            rng.gen_range(70.0..98.0),
            rng.gen_range(22.0..35.0),
        )
    } else {
        let r24 = exponential(rng, 5.0);
        (
            r24,
            r24 * rng.gen_range(1.0..4.0),
            rng.gen_range(0.1..0.5),
            exponential(rng, 50.0) + 10.0,
            rng.gen_range(30.0..70.0),
            rng.gen_range(15.0..42.0),
        )
    };

    let max_discharge_7d = discharge * rng.gen_range(1.0..2.5);
    let avg_discharge_7d = discharge * rng.gen_range(0.6..1.0);
    let wind_speed = rng.gen_range(0.0..40.0);
    let weather_code = WEATHER_CODES[rng.gen_range(0..WEATHER_CODES.len())] as f64;

    [
        rainfall_24h,
        rainfall_7d,
        soil_moisture,
        discharge,
        max_discharge_7d,
        avg_discharge_7d,
        humidity,
        temperature,
        wind_speed,
        weather_code,
    ]
}

/// Noise-free flood label for one feature row, in [0, 1].
pub fn flood_label(row: &[f64; FEATURE_COUNT]) -> f64 {
    let [r24, r7, soil, discharge, _, _, humidity, _, _, code] = *row;

    let mut risk = (r24 / 100.0).min(1.0) * 3.0
        + (r7 / 400.0).min(1.0) * 2.0
        + soil * 2.5
        + (discharge / 500.0).min(1.0) * 2.0
        + humidity / 100.0 * 0.5;

    let code = code as i64;
    if HEAVY_RAIN_CODES.contains(&code) {
        risk += 1.5;
    } else if LIGHT_RAIN_CODES.contains(&code) {
        risk += 0.5;
    }

    (risk / 10.0).clamp(0.0, 1.0)
}

/// Deterministic synthetic dataset for `seed`.
pub fn generate_dataset(samples: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut dataset = Dataset::default();

    for _ in 0..samples {
        let row = sample_row(&mut rng);
        let noisy = flood_label(&row) + standard_normal(&mut rng) * LABEL_NOISE_STD;
        dataset.rows.push(row);
        dataset.labels.push(noisy.clamp(0.0, 1.0));
    }

    dataset
}

/// Shuffled split into (train, test).
pub fn train_test_split(dataset: &Dataset, test_fraction: f64, seed: u64) -> (Dataset, Dataset) {
    let mut indices: Vec<usize> = (0..dataset.len()).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let test_len = ((dataset.len() as f64) * test_fraction.clamp(0.0, 1.0)).round() as usize;
    let (test_idx, train_idx) = indices.split_at(test_len);
    (dataset.subset(train_idx), dataset.subset(test_idx))
}

// ---------------------------------------------------------------------------
// Tree growing
// ---------------------------------------------------------------------------

/// Per-feature candidate thresholds and each sample's bin under them.
///
/// With thresholds `t[0] < t[1] < ...`, a sample's bin is the number of
/// thresholds `<= x`, so `x < t[j]` exactly when `bin <= j`.
struct Binned {
    thresholds: Vec<Vec<f64>>,
    bins: Vec<Vec<usize>>,
}

impl Binned {
    fn new(rows: &[[f64; FEATURE_COUNT]], max_bins: usize) -> Self {
        let mut thresholds = Vec::with_capacity(FEATURE_COUNT);
        let mut bins = Vec::with_capacity(FEATURE_COUNT);

        for feature in 0..FEATURE_COUNT {
            let mut column: Vec<f64> = rows.iter().map(|r| r[feature]).collect();
            column.sort_by(f64::total_cmp);

            let mut cuts: Vec<f64> = (1..max_bins)
                .filter_map(|q| column.get(q * column.len() / max_bins).copied())
                .collect();
            cuts.dedup();
            // A cut at the column minimum would send nothing left.
            if let Some(min) = column.first() {
                cuts.retain(|t| t > min);
            }

            bins.push(rows.iter().map(|r| cuts.partition_point(|t| *t <= r[feature])).collect());
            thresholds.push(cuts);
        }

        Binned { thresholds, bins }
    }
}

struct Split {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct TreeGrower<'a> {
    binned: &'a Binned,
    residuals: &'a [f64],
    config: &'a TrainingConfig,
    gains: &'a mut [f64; FEATURE_COUNT],
    nodes: Vec<TreeNode>,
}

impl TreeGrower<'_> {
    fn grow(mut self, indices: Vec<usize>) -> RegressionTree {
        self.build(indices, 0);
        RegressionTree { nodes: self.nodes }
    }

    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: 0.0 });

        let split = if depth < self.config.max_depth {
            self.best_split(&indices)
        } else {
            None
        };

        match split {
            Some(split) => {
                self.gains[split.feature] += split.gain;
                let feature_bins = &self.binned.bins[split.feature];
                let (left, right): (Vec<usize>, Vec<usize>) =
                    indices.into_iter().partition(|&i| feature_bins[i] <= split.bin);

                let left = self.build(left, depth + 1);
                let right = self.build(right, depth + 1);
                self.nodes[id] = TreeNode::Split {
                    feature: split.feature,
                    threshold: self.binned.thresholds[split.feature][split.bin],
                    left,
                    right,
                };
            }
            None => {
                let sum: f64 = indices.iter().map(|&i| self.residuals[i]).sum();
                let mean = if indices.is_empty() { 0.0 } else { sum / indices.len() as f64 };
                self.nodes[id] = TreeNode::Leaf { value: self.config.learning_rate * mean };
            }
        }

        id
    }

    /// Largest squared-error reduction over all features and thresholds.
    fn best_split(&self, indices: &[usize]) -> Option<Split> {
        let min_leaf = self.config.min_samples_leaf.max(1);
        if indices.len() < 2 * min_leaf {
            return None;
        }

        let n = indices.len() as f64;
        let total: f64 = indices.iter().map(|&i| self.residuals[i]).sum();
        let parent_score = total * total / n;

        let mut best: Option<Split> = None;

        for feature in 0..FEATURE_COUNT {
            let cuts = self.binned.thresholds[feature].len();
            if cuts == 0 {
                continue;
            }

            let mut sums = vec![0.0; cuts + 1];
            let mut counts = vec![0usize; cuts + 1];
            for &i in indices {
                let b = self.binned.bins[feature][i];
                sums[b] += self.residuals[i];
                counts[b] += 1;
            }

            let mut left_sum = 0.0;
            let mut left_count = 0usize;
            for bin in 0..cuts {
                left_sum += sums[bin];
                left_count += counts[bin];
                let right_count = indices.len() - left_count;
                if left_count < min_leaf || right_count < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / left_count as f64
                    + right_sum * right_sum / right_count as f64
                    - parent_score;

                if gain > 1e-12 && best.as_ref().is_none_or(|b| gain > b.gain) {
                    best = Some(Split { feature, bin, gain });
                }
            }
        }

        best
    }
}

// ---------------------------------------------------------------------------
// Boosting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub mae: f64,
    pub r2: f64,
}

/// Everything the training run reports besides the model itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingReport {
    pub train_size: usize,
    pub test_size: usize,
    pub metrics: Metrics,
    /// (feature, share of total split gain), highest first.
    pub importances: Vec<(&'static str, f64)>,
}

impl TrainingReport {
    pub fn top_features(&self, n: usize) -> &[(&'static str, f64)] {
        &self.importances[..n.min(self.importances.len())]
    }
}

/// Fits a boosted ensemble to `train`. Returns the ensemble and the raw
/// per-feature split gain.
pub fn fit(train: &Dataset, config: &TrainingConfig) -> Result<(TreeEnsemble, [f64; FEATURE_COUNT]), ModelError> {
    if train.is_empty() {
        return Err(ModelError::Inference("training set is empty".to_string()));
    }

    let base_score = train.labels.iter().sum::<f64>() / train.len() as f64;
    let binned = Binned::new(&train.rows, config.max_bins.max(2));
    let mut predictions = vec![base_score; train.len()];
    let mut gains = [0.0; FEATURE_COUNT];
    let mut trees = Vec::with_capacity(config.n_trees);

    for round in 0..config.n_trees {
        let residuals: Vec<f64> = train
            .labels
            .iter()
            .zip(&predictions)
            .map(|(y, p)| y - p)
            .collect();

        let tree = TreeGrower {
            binned: &binned,
            residuals: &residuals,
            config,
            gains: &mut gains,
            nodes: Vec::new(),
        }
        .grow((0..train.len()).collect());

        for (pred, row) in predictions.iter_mut().zip(&train.rows) {
            *pred += tree.evaluate(row)?;
        }
        trees.push(tree);

        if (round + 1) % 25 == 0 {
            log::debug!("Boosting round {}/{}", round + 1, config.n_trees);
        }
    }

    Ok((TreeEnsemble::new(base_score, trees), gains))
}

/// MAE and R² of clamped model output on `test`.
pub fn evaluate(model: &dyn RegressionModel, test: &Dataset) -> Result<Metrics, ModelError> {
    if test.is_empty() {
        return Ok(Metrics { mae: 0.0, r2: 0.0 });
    }

    let mut abs_error = 0.0;
    let mut ss_res = 0.0;
    let mean = test.labels.iter().sum::<f64>() / test.len() as f64;
    let mut ss_tot = 0.0;

    for (row, y) in test.rows.iter().zip(&test.labels) {
        let p = model.predict(&FeatureVector::from_values(*row))?.clamp(0.0, 1.0);
        abs_error += (y - p).abs();
        ss_res += (y - p).powi(2);
        ss_tot += (y - mean).powi(2);
    }

    Ok(Metrics {
        mae: abs_error / test.len() as f64,
        r2: if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 },
    })
}

fn importances(gains: &[f64; FEATURE_COUNT]) -> Vec<(&'static str, f64)> {
    let total: f64 = gains.iter().sum();
    let mut ranked: Vec<(&'static str, f64)> = FEATURE_LAYOUT
        .iter()
        .zip(gains)
        .map(|(name, g)| (*name, if total > 0.0 { g / total } else { 0.0 }))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked
}

/// Full pipeline: generate, split, fit, evaluate.
pub fn train(config: &TrainingConfig) -> Result<(TreeEnsemble, TrainingReport), ModelError> {
    log::info!("Generating training data ({} samples, seed {})...", config.samples, config.seed);
    let dataset = generate_dataset(config.samples, config.seed);
    let (train_set, test_set) = train_test_split(&dataset, config.test_fraction, config.seed);

    log::info!(
        "Fitting {} trees (depth {}, learning rate {}) on {} rows...",
        config.n_trees,
        config.max_depth,
        config.learning_rate,
        train_set.len()
    );
    let (ensemble, gains) = fit(&train_set, config)?;
    let metrics = evaluate(&ensemble, &test_set)?;

    log::info!("Model performance: MAE {:.4}, R² {:.4}", metrics.mae, metrics.r2);

    let report = TrainingReport {
        train_size: train_set.len(),
        test_size: test_set.len(),
        metrics,
        importances: importances(&gains),
    };
    for (name, share) in report.top_features(5) {
        log::info!("  {}: {:.4}", name, share);
    }

    Ok((ensemble, report))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::artifact::{load_artifact, save_artifact};
    use crate::risk::RiskPredictor;
    use crate::model::ModelProvenance;
    use std::sync::Arc;

    fn small_config() -> TrainingConfig {
        TrainingConfig {
            samples: 1200,
            n_trees: 40,
            learning_rate: 0.3,
            ..TrainingConfig::default()
        }
    }

    // --- labels -------------------------------------------------------------

    #[test]
    fn test_label_dry_calm_is_zero() {
        let row = [0.0; FEATURE_COUNT];
        assert_eq!(flood_label(&row), 0.0);
    }

    #[test]
    fn test_label_weighted_sum() {
        // 0.5*3 + 0 + 0.4*2.5 + 0 + 0.5*0.5 + 0.5 (light rain code) = 3.25
        let row = [50.0, 0.0, 0.4, 0.0, 0.0, 0.0, 50.0, 25.0, 10.0, 53.0];
        assert!((flood_label(&row) - 0.325).abs() < 1e-9);
    }

    #[test]
    fn test_label_saturates_at_one() {
        let row = [500.0, 2000.0, 1.0, 5000.0, 0.0, 0.0, 100.0, 30.0, 0.0, 65.0];
        assert_eq!(flood_label(&row), 1.0);
    }

    // --- data generation ----------------------------------------------------

    #[test]
    fn test_dataset_is_deterministic_for_seed() {
        let a = generate_dataset(200, 42);
        let b = generate_dataset(200, 42);
        let c = generate_dataset(200, 7);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_dataset_values_in_expected_ranges() {
        let data = generate_dataset(1000, 42);
        assert_eq!(data.len(), 1000);
        for (row, y) in data.rows.iter().zip(&data.labels) {
            assert!((0.0..=1.0).contains(y));
            assert!(row[0] >= 0.0);
            assert!((0.1..0.95).contains(&row[2]), "soil {}", row[2]);
            assert!(row[3] >= 10.0);
            assert!(WEATHER_CODES.contains(&(row[9] as i64)));
        }
    }

    #[test]
    fn test_split_sizes() {
        let data = generate_dataset(100, 42);
        let (train, test) = train_test_split(&data, 0.2, 42);
        assert_eq!(train.len(), 80);
        assert_eq!(test.len(), 20);
    }

    // --- tree growing -------------------------------------------------------

    #[test]
    fn test_single_tree_finds_step() {
        let mut data = Dataset::default();
        for i in 0..100 {
            let mut row = [0.0; FEATURE_COUNT];
            row[0] = i as f64;
            row[8] = ((i * 37) % 100) as f64;
            data.rows.push(row);
            data.labels.push(if i < 50 { 0.0 } else { 1.0 });
        }

        let config = TrainingConfig { n_trees: 1, max_depth: 1, learning_rate: 1.0, ..TrainingConfig::default() };
        let (ensemble, gains) = fit(&data, &config).unwrap();

        match &ensemble.trees[0].nodes[0] {
            TreeNode::Split { feature, threshold, .. } => {
                assert_eq!(*feature, 0);
                assert_eq!(*threshold, 50.0);
            }
            other => panic!("expected split at root, got {:?}", other),
        }
        assert!(gains[0] > 0.0);
        assert_eq!(gains[8], 0.0);

        let low = ensemble.predict(&FeatureVector::from_values(data.rows[10])).unwrap();
        let high = ensemble.predict(&FeatureVector::from_values(data.rows[90])).unwrap();
        assert!(low.abs() < 1e-9, "got {}", low);
        assert!((high - 1.0).abs() < 1e-9, "got {}", high);
    }

    #[test]
    fn test_fit_rejects_empty_training_set() {
        assert!(fit(&Dataset::default(), &TrainingConfig::default()).is_err());
    }

    // --- end to end ---------------------------------------------------------

    #[test]
    fn test_trained_model_beats_mean_baseline() {
        let (ensemble, report) = train(&small_config()).unwrap();

        assert_eq!(ensemble.trees.len(), 40);
        assert!(report.metrics.r2 > 0.5, "r2 = {}", report.metrics.r2);

        let data = generate_dataset(small_config().samples, 42);
        let (_, test) = train_test_split(&data, 0.2, 42);
        let mean = test.labels.iter().sum::<f64>() / test.len() as f64;
        let baseline_mae = test.labels.iter().map(|y| (y - mean).abs()).sum::<f64>() / test.len() as f64;
        assert!(report.metrics.mae < baseline_mae);
    }

    #[test]
    fn test_importances_sum_to_one_and_are_sorted() {
        let (_, report) = train(&small_config()).unwrap();
        let total: f64 = report.importances.iter().map(|(_, s)| s).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(report.importances.windows(2).all(|w| w[0].1 >= w[1].1));
        assert_eq!(report.top_features(5).len(), 5);
    }

    #[test]
    fn test_trained_artifact_loads_into_predictor() {
        let config = TrainingConfig { samples: 400, n_trees: 10, ..TrainingConfig::default() };
        let (ensemble, _) = train(&config).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("models").join("flood_model.json");
        save_artifact(&ensemble, &path).unwrap();

        let loaded = load_artifact(&path).unwrap();
        assert_eq!(loaded, ensemble);

        let predictor = RiskPredictor::with_model(Arc::new(loaded));
        let prediction = predictor.predict(&FeatureVector::from_values([0.0; FEATURE_COUNT]));
        assert_eq!(prediction.provenance, ModelProvenance::Trained);
        assert!((0.0..=1.0).contains(&prediction.probability));
    }
}
