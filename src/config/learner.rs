//! Learner configuration read by the prediction and partitioning entry points.
//!
//! The structures mirror the fields of the trainer's learner configuration
//! that evaluation depends on. Only validated fields are consumed; the wire
//! format of the trainer is not parsed here. Configurations can be loaded from
//! JSON or TOML files.

use crate::core::error::{BoostedTreesError, Result};
use crate::core::types::{GrowingMode, MultiClassStrategy};
use crate::prediction::averaging::AveragingStrategy;

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Learning rate tuner selected for training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningRateConfig {
    /// Constant learning rate
    Fixed(LearningRateFixedConfig),
    /// Dropout driven learning rate (DART style)
    Dropout(LearningRateDropoutDrivenConfig),
    /// Line search over candidate learning rates
    LineSearch(LearningRateLineSearchConfig),
}

/// Constant learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRateFixedConfig {
    /// Learning rate applied to each new tree
    pub learning_rate: f32,
}

/// Dropout parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningRateDropoutDrivenConfig {
    /// Probability of dropping each eligible tree, in [0, 1]
    pub dropout_probability: f32,
    /// Probability of skipping dropout for a whole call, in [0, 1]
    pub probability_of_skipping_dropout: f32,
    /// Learning rate used by the trainer when adding trees
    pub learning_rate: f32,
}

impl Default for LearningRateDropoutDrivenConfig {
    fn default() -> Self {
        LearningRateDropoutDrivenConfig {
            dropout_probability: 0.0,
            probability_of_skipping_dropout: 0.0,
            learning_rate: 1.0,
        }
    }
}

impl LearningRateDropoutDrivenConfig {
    /// Checks that both probabilities lie in [0, 1].
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.dropout_probability) {
            return Err(BoostedTreesError::invalid_argument(
                "Dropout probability must be in [0,1] range",
            ));
        }
        if !(0.0..=1.0).contains(&self.probability_of_skipping_dropout) {
            return Err(BoostedTreesError::invalid_argument(
                "Probability of skipping dropout must be in [0,1] range",
            ));
        }
        Ok(())
    }
}

/// Line search learning rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRateLineSearchConfig {
    /// Largest learning rate tried
    pub max_learning_rate: f32,
    /// Number of candidate rates between 0 and `max_learning_rate`
    pub num_steps: u32,
}

/// Averaging of the most recent trees.
///
/// At most one of the two fields may be set. Leaving both unset disables
/// averaging.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AveragingConfig {
    /// Average over the last N trees
    pub average_last_n_trees: Option<u32>,
    /// Average over the last fraction of trees, in (0, 1]
    pub average_last_percent_trees: Option<f32>,
}

impl AveragingConfig {
    /// Resolve the configured variant.
    ///
    /// Returns `Ok(None)` when neither variant is set.
    pub fn strategy(&self) -> Result<Option<AveragingStrategy>> {
        match (self.average_last_n_trees, self.average_last_percent_trees) {
            (None, None) => Ok(None),
            (Some(_), Some(_)) => Err(BoostedTreesError::config(
                "Only one of average_last_n_trees and average_last_percent_trees may be set.",
            )),
            (Some(n), None) => {
                if n == 0 {
                    return Err(BoostedTreesError::config(
                        "Average last n trees must be a positive number",
                    ));
                }
                Ok(Some(AveragingStrategy::LastNTrees(n)))
            }
            (None, Some(percent)) => {
                if !(percent > 0.0 && percent <= 1.0) {
                    return Err(BoostedTreesError::config(
                        "Average last percent must be in (0,1] interval.",
                    ));
                }
                Ok(Some(AveragingStrategy::LastPercentTrees(percent)))
            }
        }
    }
}

/// Learner configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of classes (2 for binary classification and regression)
    pub num_classes: u32,
    /// Mapping of classes onto trees
    pub multi_class_strategy: MultiClassStrategy,
    /// Tree growing mode
    pub growing_mode: GrowingMode,
    /// Learning rate tuner
    pub learning_rate_tuner: Option<LearningRateConfig>,
    /// Averaging of the most recent trees
    pub averaging_config: Option<AveragingConfig>,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        LearnerConfig {
            num_classes: 2,
            multi_class_strategy: MultiClassStrategy::TreePerClass,
            growing_mode: GrowingMode::WholeTree,
            learning_rate_tuner: None,
            averaging_config: None,
        }
    }
}

impl LearnerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration parameters
    pub fn validate(&self) -> Result<()> {
        self.check_num_classes()?;
        if let Some(dropout) = self.dropout_config() {
            dropout
                .validate()
                .map_err(|e| BoostedTreesError::config(e.to_string()))?;
        }
        self.averaging_strategy()?;
        Ok(())
    }

    pub(crate) fn check_num_classes(&self) -> Result<()> {
        if self.num_classes < 2 {
            return Err(BoostedTreesError::config("Number of classes must be >=2"));
        }
        Ok(())
    }

    /// Number of slots in each prediction vector.
    ///
    /// One class is implicit when every class gets its own tree.
    pub fn prediction_vector_size(&self) -> usize {
        match self.multi_class_strategy {
            MultiClassStrategy::TreePerClass => self.num_classes.saturating_sub(1) as usize,
            MultiClassStrategy::FullHessian | MultiClassStrategy::DiagonalHessian => {
                self.num_classes as usize
            }
        }
    }

    /// Whether only finalized trees take part in prediction.
    pub fn only_finalized_trees(&self) -> bool {
        self.growing_mode == GrowingMode::WholeTree
    }

    /// Dropout parameters, if the learning rate tuner is dropout driven.
    pub fn dropout_config(&self) -> Option<&LearningRateDropoutDrivenConfig> {
        match self.learning_rate_tuner {
            Some(LearningRateConfig::Dropout(ref dropout)) => Some(dropout),
            _ => None,
        }
    }

    /// Validated averaging strategy, or `None` when averaging is not set.
    pub fn averaging_strategy(&self) -> Result<Option<AveragingStrategy>> {
        match self.averaging_config {
            Some(ref averaging) => averaging.strategy(),
            None => Ok(None),
        }
    }

    /// Parse a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let config: LearnerConfig = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::from_str(&content)?,
            Some("toml") => toml::from_str(&content)?,
            _ => {
                return Err(BoostedTreesError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        config.validate()?;
        log::debug!(
            "Loaded learner config from {}: num_classes={}, growing_mode={}",
            path.display(),
            config.num_classes,
            config.growing_mode
        );
        Ok(config)
    }

    /// Save configuration to a `.json` or `.toml` file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = match path.extension().and_then(|s| s.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("toml") => toml::to_string_pretty(self)
                .map_err(|e| BoostedTreesError::config(format!("Failed to serialize to TOML: {}", e)))?,
            _ => {
                return Err(BoostedTreesError::config(
                    "Unsupported config file format. Use .json or .toml",
                ))
            }
        };

        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn dropout_config(p: f32, skip: f32) -> LearnerConfig {
        LearnerConfig {
            learning_rate_tuner: Some(LearningRateConfig::Dropout(
                LearningRateDropoutDrivenConfig {
                    dropout_probability: p,
                    probability_of_skipping_dropout: skip,
                    learning_rate: 1.0,
                },
            )),
            ..LearnerConfig::default()
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = LearnerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.prediction_vector_size(), 1);
        assert!(config.only_finalized_trees());
        assert!(config.dropout_config().is_none());
    }

    #[test]
    fn test_num_classes_validation() {
        let config = LearnerConfig {
            num_classes: 1,
            ..LearnerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_prediction_vector_size() {
        let mut config = LearnerConfig {
            num_classes: 5,
            ..LearnerConfig::default()
        };
        assert_eq!(config.prediction_vector_size(), 4);
        config.multi_class_strategy = MultiClassStrategy::FullHessian;
        assert_eq!(config.prediction_vector_size(), 5);
        config.multi_class_strategy = MultiClassStrategy::DiagonalHessian;
        assert_eq!(config.prediction_vector_size(), 5);
    }

    #[test]
    fn test_layer_by_layer_includes_growing_tree() {
        let config = LearnerConfig {
            growing_mode: GrowingMode::LayerByLayer,
            ..LearnerConfig::default()
        };
        assert!(!config.only_finalized_trees());
    }

    #[test]
    fn test_dropout_validation() {
        assert!(dropout_config(0.5, 0.0).validate().is_ok());
        assert!(dropout_config(1.5, 0.0).validate().is_err());
        assert!(dropout_config(0.5, -0.1).validate().is_err());
    }

    #[test]
    fn test_averaging_strategy() {
        let averaging = AveragingConfig {
            average_last_n_trees: Some(3),
            average_last_percent_trees: None,
        };
        assert_eq!(averaging.strategy().unwrap(), Some(AveragingStrategy::LastNTrees(3)));

        let averaging = AveragingConfig {
            average_last_n_trees: None,
            average_last_percent_trees: Some(0.5),
        };
        assert_eq!(
            averaging.strategy().unwrap(),
            Some(AveragingStrategy::LastPercentTrees(0.5))
        );

        assert_eq!(AveragingConfig::default().strategy().unwrap(), None);
    }

    #[test]
    fn test_averaging_strategy_errors() {
        let zero = AveragingConfig {
            average_last_n_trees: Some(0),
            average_last_percent_trees: None,
        };
        assert!(zero.strategy().is_err());

        for percent in [0.0, -0.5, 1.01] {
            let bad = AveragingConfig {
                average_last_n_trees: None,
                average_last_percent_trees: Some(percent),
            };
            assert!(bad.strategy().is_err(), "percent {} accepted", percent);
        }

        let both = AveragingConfig {
            average_last_n_trees: Some(2),
            average_last_percent_trees: Some(0.5),
        };
        assert_eq!(both.strategy().unwrap_err().category(), "config");
    }

    #[test]
    fn test_from_json_str() {
        let config = LearnerConfig::from_json_str(
            r#"{
                "num_classes": 3,
                "multi_class_strategy": "diagonal_hessian",
                "growing_mode": "layer_by_layer",
                "learning_rate_tuner": {"dropout": {"dropout_probability": 0.25}},
                "averaging_config": {"average_last_n_trees": 4}
            }"#,
        )
        .unwrap();

        assert_eq!(config.num_classes, 3);
        assert_eq!(config.prediction_vector_size(), 3);
        assert!(!config.only_finalized_trees());
        let dropout = config.dropout_config().unwrap();
        assert_eq!(dropout.dropout_probability, 0.25);
        assert_eq!(dropout.probability_of_skipping_dropout, 0.0);
        assert_eq!(
            config.averaging_strategy().unwrap(),
            Some(AveragingStrategy::LastNTrees(4))
        );
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempdir().unwrap();
        let config = dropout_config(0.3, 0.1);

        for name in ["learner.json", "learner.toml"] {
            let path = dir.path().join(name);
            config.save_to_file(&path).unwrap();
            let loaded = LearnerConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded, config);
        }

        let unsupported = dir.path().join("learner.yaml");
        assert!(config.save_to_file(&unsupported).is_err());
    }
}
