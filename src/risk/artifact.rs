/// Trained model artifact: format, loading, and evaluation.
///
/// The offline trainer (`src/bin/train_model.rs`) writes a gradient-boosted
/// regression tree ensemble as JSON:
///
/// ```text
/// {
///   "format": "floodrisk-gbt",
///   "feature_schema_version": 1,
///   "feature_layout_hash": <crc32 of the layout>,
///   "feature_names": ["rainfall_24h", ...],
///   "base_score": 0.41,
///   "trees": [
///     { "nodes": [
///         { "split": { "feature": 0, "threshold": 50.0, "left": 1, "right": 2 } },
///         { "leaf":  { "value": -0.02 } },
///         { "leaf":  { "value": 0.07 } }
///     ] }
///   ]
/// }
/// ```
///
/// Node 0 is the root of each tree; a split sends `x[feature] < threshold`
/// left. The prediction is `base_score` plus the leaf reached in every tree.
/// The output is not clamped here.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::features::{layout_hash, layout_hash_of, FeatureVector, FEATURE_COUNT, FEATURE_LAYOUT, FEATURE_SCHEMA_VERSION};
use crate::model::ModelError;

pub const ARTIFACT_FORMAT: &str = "floodrisk-gbt";

/// Upper bound on tree walk length; deeper walks mean a cyclic tree.
const MAX_WALK: usize = 1024;

// ---------------------------------------------------------------------------
// Model abstraction
// ---------------------------------------------------------------------------

/// A trained regressor that scores a feature vector.
///
/// Implementations are shared read-only across threads once loaded.
pub trait RegressionModel: Send + Sync {
    /// Raw scalar output. Callers clamp it to [0, 1].
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError>;

    /// Short description for logs and the health endpoint.
    fn describe(&self) -> String;
}

// ---------------------------------------------------------------------------
// Tree ensemble
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub nodes: Vec<TreeNode>,
}

impl RegressionTree {
    /// Follows splits from the root to a leaf.
    pub fn evaluate(&self, values: &[f64]) -> Result<f64, ModelError> {
        let mut idx = 0;
        for _ in 0..MAX_WALK {
            match self.nodes.get(idx) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Split { feature, threshold, left, right }) => {
                    let x = values.get(*feature).ok_or_else(|| {
                        ModelError::Inference(format!("split references feature index {}", feature))
                    })?;
                    idx = if *x < *threshold { *left } else { *right };
                }
                None => {
                    return Err(ModelError::Inference(format!(
                        "node index {} out of range ({} nodes)",
                        idx,
                        self.nodes.len()
                    )));
                }
            }
        }
        Err(ModelError::Inference("tree walk did not reach a leaf".to_string()))
    }
}

/// Gradient-boosted regression trees plus the feature layout they expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsemble {
    pub format: String,
    pub feature_schema_version: u8,
    pub feature_layout_hash: u32,
    pub feature_names: Vec<String>,
    pub base_score: f64,
    pub trees: Vec<RegressionTree>,
}

impl TreeEnsemble {
    /// Wraps trained trees with the current layout stamp.
    pub fn new(base_score: f64, trees: Vec<RegressionTree>) -> Self {
        TreeEnsemble {
            format: ARTIFACT_FORMAT.to_string(),
            feature_schema_version: FEATURE_SCHEMA_VERSION,
            feature_layout_hash: layout_hash(),
            feature_names: FEATURE_LAYOUT.iter().map(|s| s.to_string()).collect(),
            base_score,
            trees,
        }
    }

    /// Rejects artifacts trained against a different feature layout.
    pub fn check_schema(&self) -> Result<(), ModelError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ModelError::Parse(format!("unknown artifact format '{}'", self.format)));
        }
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(ModelError::SchemaMismatch {
                expected: format!("{} features", FEATURE_COUNT),
                found: format!("{} features", self.feature_names.len()),
            });
        }
        if self.feature_schema_version != FEATURE_SCHEMA_VERSION {
            return Err(ModelError::SchemaMismatch {
                expected: format!("schema version {}", FEATURE_SCHEMA_VERSION),
                found: format!("schema version {}", self.feature_schema_version),
            });
        }
        let names_hash = layout_hash_of(&self.feature_names);
        if names_hash != layout_hash() || self.feature_layout_hash != layout_hash() {
            return Err(ModelError::SchemaMismatch {
                expected: format!("layout hash {:08x} [{}]", layout_hash(), FEATURE_LAYOUT.join(",")),
                found: format!(
                    "layout hash {:08x} [{}]",
                    self.feature_layout_hash,
                    self.feature_names.join(",")
                ),
            });
        }
        Ok(())
    }
}

impl RegressionModel for TreeEnsemble {
    fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        let values = features.values();
        let mut total = self.base_score;
        for tree in &self.trees {
            total += tree.evaluate(values)?;
        }
        Ok(total)
    }

    fn describe(&self) -> String {
        format!("{} ({} trees)", self.format, self.trees.len())
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

/// Reads and validates a tree ensemble artifact.
///
/// # Errors
/// - `ModelError::NotFound` - nothing at `path`.
/// - `ModelError::Io` - the file exists but could not be read.
/// - `ModelError::Parse` - not a valid artifact document.
/// - `ModelError::SchemaMismatch` - trained against another feature layout.
pub fn load_artifact(path: &Path) -> Result<TreeEnsemble, ModelError> {
    if !path.exists() {
        return Err(ModelError::NotFound(path.display().to_string()));
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| ModelError::Io(format!("{}: {}", path.display(), e)))?;
    let ensemble: TreeEnsemble = serde_json::from_str(&contents)
        .map_err(|e| ModelError::Parse(format!("{}: {}", path.display(), e)))?;
    ensemble.check_schema()?;
    Ok(ensemble)
}

/// Writes an artifact as pretty-printed JSON, creating parent directories.
pub fn save_artifact(ensemble: &TreeEnsemble, path: &Path) -> Result<(), ModelError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|e| ModelError::Io(format!("{}: {}", parent.display(), e)))?;
    }
    let json = serde_json::to_string_pretty(ensemble)
        .map_err(|e| ModelError::Parse(e.to_string()))?;
    fs::write(path, json).map_err(|e| ModelError::Io(format!("{}: {}", path.display(), e)))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
