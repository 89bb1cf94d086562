use std::fmt;

use serde::{Deserialize, Serialize};

/// Weighted components of the similarity heuristic. The three weights
/// must sum to 1.0 so the blended score stays in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityWeights {
    pub temporal: f64,
    pub length: f64,
    /// Reserved for a future embedding-based term. The component function
    /// ([`crate::similarity::semantic_affinity`]) currently returns 0.0;
    /// the weight is still validated so enabling it later cannot silently
    /// break the budget.
    pub semantic: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            temporal: 0.6,
            length: 0.2,
            semantic: 0.2,
        }
    }
}

impl SimilarityWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, w) in [
            ("similarity.temporal", self.temporal),
            ("similarity.length", self.length),
            ("similarity.semantic", self.semantic),
        ] {
            if !w.is_finite() || !(0.0..=1.0).contains(&w) {
                return Err(ConfigError {
                    field,
                    reason: format!("weight must be in [0, 1], got {w}"),
                });
            }
        }
        let sum = self.temporal + self.length + self.semantic;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ConfigError {
                field: "similarity",
                reason: format!("weights must sum to 1.0, got {sum}"),
            });
        }
        Ok(())
    }
}

/// Engine tuning. Every field has a serde default so a partial TOML
/// file works; `validate()` is called once after loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Steady-state size of the in-memory working set.
    pub working_set_size: usize,
    /// Members per displayed cluster, focus included.
    pub cluster_size: usize,
    /// How long each cluster stays foregrounded.
    pub cluster_duration_ms: u64,
    /// Background poll interval for new submissions.
    pub polling_interval_ms: u64,
    /// Bound on the new-submission priority queue.
    pub priority_queue_max_size: usize,
    pub similarity: SimilarityWeights,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            working_set_size: 400,
            cluster_size: 20,
            cluster_duration_ms: 8000,
            polling_interval_ms: 5000,
            priority_queue_max_size: 200,
            similarity: SimilarityWeights::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_set_size < 1 {
            return Err(ConfigError {
                field: "working_set_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cluster_size < 1 || self.cluster_size > self.working_set_size {
            return Err(ConfigError {
                field: "cluster_size",
                reason: format!(
                    "must be in 1..={}, got {}",
                    self.working_set_size, self.cluster_size
                ),
            });
        }
        if self.cluster_duration_ms < 250 {
            return Err(ConfigError {
                field: "cluster_duration_ms",
                reason: "must be at least 250".to_string(),
            });
        }
        if self.polling_interval_ms < 250 {
            return Err(ConfigError {
                field: "polling_interval_ms",
                reason: "must be at least 250".to_string(),
            });
        }
        if self.priority_queue_max_size < 1 {
            return Err(ConfigError {
                field: "priority_queue_max_size",
                reason: "must be at least 1".to_string(),
            });
        }
        self.similarity.validate()
    }
}

/// A configuration value is out of range. Names the offending field.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid config: {}: {}", self.field, self.reason)
    }
}

impl std::error::Error for ConfigError {}
