use crate::{
    error::{DashError, DashResult},
    member::ReasonCategory,
    types::Seed,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POPULATION: usize = 500;
pub const DEFAULT_SEED: Seed = 42;

/// Allowed deviation of the reason weight sum from 1.0.
pub const WEIGHT_SUM_EPSILON: f64 = 1e-6;

pub const Z_THRESHOLD_RANGE: (f64, f64) = (-5.0, -1.0);
pub const CHURN_THRESHOLD_RANGE: (f64, f64) = (0.5, 0.9);

/// Half-open float range [lo, hi).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FloatRange {
    pub lo: f64,
    pub hi: f64,
}

/// Half-open integer range [lo, hi).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntRange {
    pub lo: i64,
    pub hi: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std_dev: f64,
}

/// Sampling parameters only. The derivation rules (dead cross ratio,
/// RFM cutoffs, reason z cutoff) are fixed constants in `member` and
/// cannot be set from a config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub population: usize,
    pub seed: Seed,
    pub z_score: NormalParams,
    pub ma_short: FloatRange,
    pub ma_long: FloatRange,
    pub months_active: IntRange,
    pub recency: IntRange,
    pub frequency: IntRange,
    pub monetary: IntRange,
    pub churn_prob: FloatRange,
    /// One weight per `ReasonCategory::ALL` entry, in that order.
    pub reason_weights: Vec<f64>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            population: DEFAULT_POPULATION,
            seed: DEFAULT_SEED,
            z_score: NormalParams {
                mean: 0.0,
                std_dev: 1.5,
            },
            ma_short: FloatRange { lo: 40.0, hi: 90.0 },
            ma_long: FloatRange { lo: 50.0, hi: 95.0 },
            months_active: IntRange { lo: 1, hi: 24 },
            recency: IntRange { lo: 1, hi: 60 },
            frequency: IntRange { lo: 1, hi: 20 },
            monetary: IntRange { lo: 1, hi: 100 },
            churn_prob: FloatRange { lo: 0.0, hi: 1.0 },
            reason_weights: vec![0.25, 0.35, 0.15, 0.15, 0.10],
        }
    }
}

impl GeneratorConfig {
    /// Load from a JSON file. Missing fields keep their defaults;
    /// unknown fields are rejected.
    pub fn load(path: &str) -> DashResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: GeneratorConfig = serde_json::from_str(&content)
            .map_err(|e| DashError::invalid(path, e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Config used by unit and integration tests.
    pub fn default_test() -> Self {
        Self {
            population: 50,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> DashResult<()> {
        if self.population == 0 {
            return Err(DashError::invalid("population", "must be at least 1"));
        }
        if !(self.z_score.std_dev.is_finite() && self.z_score.std_dev > 0.0) {
            return Err(DashError::invalid("z_score.std_dev", "must be positive"));
        }
        check_float_range("ma_short", self.ma_short)?;
        check_float_range("ma_long", self.ma_long)?;
        check_float_range("churn_prob", self.churn_prob)?;
        check_int_range("months_active", self.months_active)?;
        check_int_range("recency", self.recency)?;
        check_int_range("frequency", self.frequency)?;
        check_int_range("monetary", self.monetary)?;
        validate_reason_weights(&self.reason_weights)
    }
}

fn check_float_range(field: &str, r: FloatRange) -> DashResult<()> {
    if !(r.lo.is_finite() && r.hi.is_finite() && r.lo < r.hi) {
        return Err(DashError::invalid(
            field,
            format!("empty range [{}, {})", r.lo, r.hi),
        ));
    }
    Ok(())
}

fn check_int_range(field: &str, r: IntRange) -> DashResult<()> {
    if r.lo >= r.hi {
        return Err(DashError::invalid(
            field,
            format!("empty range [{}, {})", r.lo, r.hi),
        ));
    }
    Ok(())
}

/// Reject reason weight vectors that are not a probability distribution
/// over the five categories.
pub fn validate_reason_weights(weights: &[f64]) -> DashResult<()> {
    if weights.len() != ReasonCategory::ALL.len() {
        return Err(DashError::invalid(
            "reason_weights",
            format!(
                "expected {} weights, got {}",
                ReasonCategory::ALL.len(),
                weights.len()
            ),
        ));
    }
    if let Some(w) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
        return Err(DashError::invalid(
            "reason_weights",
            format!("weight {w} is not a finite non-negative number"),
        ));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
        return Err(DashError::invalid(
            "reason_weights",
            format!("weights sum to {sum}, expected 1.0"),
        ));
    }
    Ok(())
}

/// The two presentation sliders. Deserialization goes through
/// `Thresholds::new`, so out-of-range values never parse.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds")]
pub struct Thresholds {
    pub z_threshold: f64,
    pub churn_threshold: f64,
}

#[derive(Deserialize)]
struct RawThresholds {
    z_threshold: f64,
    churn_threshold: f64,
}

impl TryFrom<RawThresholds> for Thresholds {
    type Error = DashError;

    fn try_from(raw: RawThresholds) -> DashResult<Self> {
        Self::new(raw.z_threshold, raw.churn_threshold)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            z_threshold: -2.0,
            churn_threshold: 0.7,
        }
    }
}

impl Thresholds {
    pub fn new(z_threshold: f64, churn_threshold: f64) -> DashResult<Self> {
        let (z_lo, z_hi) = Z_THRESHOLD_RANGE;
        if !(z_lo..=z_hi).contains(&z_threshold) {
            return Err(DashError::invalid(
                "z_threshold",
                format!("{z_threshold} outside [{z_lo}, {z_hi}]"),
            ));
        }
        let (c_lo, c_hi) = CHURN_THRESHOLD_RANGE;
        if !(c_lo..=c_hi).contains(&churn_threshold) {
            return Err(DashError::invalid(
                "churn_threshold",
                format!("{churn_threshold} outside [{c_lo}, {c_hi}]"),
            ));
        }
        Ok(Self {
            z_threshold,
            churn_threshold,
        })
    }
}
