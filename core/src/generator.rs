//! Synthetic population generation.
//!
//! Generation is a single deterministic pass:
//!   1. Sample every field from its own stream.
//!   2. Derive `dead_cross` and `rfm_segment` from the sampled fields.
//!   3. Attach a drop reason to members at or below the internal
//!      z-score cutoff, with canned detail text where one exists.
//!
//! Same (config, n, seed) always yields the same table.

use crate::{
    config::{validate_reason_weights, GeneratorConfig},
    error::{DashError, DashResult},
    member::{
        is_dead_cross, member_name, rfm_segment, MemberRecord, ReasonCategory,
        REASON_Z_THRESHOLD,
    },
    population::Population,
    rng::{RngBank, StreamSlot},
    types::{MemberId, Seed},
};
use log::{debug, info};

/// The independently sampled fields of one member, before derivation.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberSample {
    pub id: MemberId,
    pub z_score: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub months_active: i64,
    pub recency: i64,
    pub frequency: i64,
    pub monetary: i64,
    pub churn_prob: f64,
    /// Reason drawn for this member; kept only below the z cutoff.
    pub reason_draw: ReasonCategory,
}

/// Turn a sample into a record. The derived fields use only the fixed
/// rules in `member`, never anything from the config.
pub fn derive(sample: MemberSample) -> MemberRecord {
    let reason_category = (sample.z_score <= REASON_Z_THRESHOLD).then_some(sample.reason_draw);
    let reason_detail = reason_category
        .and_then(|c| c.detail())
        .map(str::to_string);

    MemberRecord {
        id: sample.id,
        name: member_name(sample.id),
        z_score: sample.z_score,
        ma_short: sample.ma_short,
        ma_long: sample.ma_long,
        months_active: sample.months_active,
        recency: sample.recency,
        frequency: sample.frequency,
        monetary: sample.monetary,
        churn_prob: sample.churn_prob,
        dead_cross: is_dead_cross(sample.ma_short, sample.ma_long),
        rfm_segment: rfm_segment(sample.recency, sample.frequency),
        reason_category,
        reason_detail,
    }
}

pub struct PopulationGenerator {
    config: GeneratorConfig,
}

impl PopulationGenerator {
    /// Validates the config up front; malformed weight vectors never
    /// reach the sampling loop.
    pub fn new(config: GeneratorConfig) -> DashResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Generate the population described by the config's own size and seed.
    pub fn generate_default(&self) -> DashResult<Population> {
        self.generate(self.config.population, self.config.seed)
    }

    pub fn generate(&self, n: usize, seed: Seed) -> DashResult<Population> {
        if n == 0 {
            return Err(DashError::invalid("n", "population size must be at least 1"));
        }
        if n > MemberId::MAX as usize {
            return Err(DashError::invalid("n", format!("{n} exceeds the id space")));
        }
        validate_reason_weights(&self.config.reason_weights)?;

        info!("Generating population: n={n} seed={seed}");
        let samples = self.sample_rows(n, seed);
        let members: Vec<MemberRecord> = samples.into_iter().map(derive).collect();

        let with_reason = members.iter().filter(|m| m.has_reason()).count();
        let dead_crosses = members.iter().filter(|m| m.dead_cross).count();
        debug!("Derived fields: dead_cross={dead_crosses} with_reason={with_reason}");
        info!("Population ready: {} members, {with_reason} with a drop reason", members.len());

        Ok(Population::new(seed, members))
    }

    /// Each field comes from its own stream, drawn row by row, so the
    /// first k rows depend only on the seed and never on `n`.
    fn sample_rows(&self, n: usize, seed: Seed) -> Vec<MemberSample> {
        let c = &self.config;
        let bank = RngBank::new(seed);
        let mut z_rng = bank.for_slot(StreamSlot::ZScore);
        let mut ma_rng = bank.for_slot(StreamSlot::MovingAverage);
        let mut tenure_rng = bank.for_slot(StreamSlot::Tenure);
        let mut rfm_rng = bank.for_slot(StreamSlot::Rfm);
        let mut churn_rng = bank.for_slot(StreamSlot::Churn);
        let mut reason_rng = bank.for_slot(StreamSlot::Reason);

        (0..n)
            .map(|i| MemberSample {
                id: (i + 1) as MemberId,
                z_score: z_rng.normal(c.z_score.mean, c.z_score.std_dev),
                ma_short: ma_rng.uniform(c.ma_short.lo, c.ma_short.hi),
                ma_long: ma_rng.uniform(c.ma_long.lo, c.ma_long.hi),
                months_active: tenure_rng.int_range(c.months_active.lo, c.months_active.hi),
                recency: rfm_rng.int_range(c.recency.lo, c.recency.hi),
                frequency: rfm_rng.int_range(c.frequency.lo, c.frequency.hi),
                monetary: rfm_rng.int_range(c.monetary.lo, c.monetary.hi),
                churn_prob: churn_rng.uniform(c.churn_prob.lo, c.churn_prob.hi),
                // Drawn for every member and masked later, so the reason
                // stream is independent of the z-score column.
                reason_draw: ReasonCategory::ALL[reason_rng.weighted_index(&c.reason_weights)],
            })
            .collect()
    }
}

/// Generate `n` members from `seed` with the default distributions.
pub fn generate(n: usize, seed: Seed) -> DashResult<Population> {
    PopulationGenerator::new(GeneratorConfig::default())?.generate(n, seed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(z_score: f64, reason_draw: ReasonCategory) -> MemberSample {
        MemberSample {
            id: 1,
            z_score,
            ma_short: 60.0,
            ma_long: 60.0,
            months_active: 3,
            recency: 20,
            frequency: 5,
            monetary: 50,
            churn_prob: 0.3,
            reason_draw,
        }
    }

    #[test]
    fn low_z_always_gets_a_reason() {
        for c in ReasonCategory::ALL {
            let m = derive(sample(-2.0, c));
            assert_eq!(m.reason_category, Some(c));
            assert_eq!(m.reason_detail.is_some(), c.detail().is_some());
        }
    }

    #[test]
    fn cutoff_is_inclusive() {
        let at = derive(sample(-1.5, ReasonCategory::Health));
        assert_eq!(at.reason_category, Some(ReasonCategory::Health));
        let above = derive(sample(-1.49, ReasonCategory::Health));
        assert_eq!(above.reason_category, None);
        assert_eq!(above.reason_detail, None);
    }

    #[test]
    fn zero_population_is_invalid_input() {
        assert!(matches!(
            generate(0, 42),
            Err(DashError::InvalidInput { .. })
        ));
    }

    #[test]
    fn malformed_weights_rejected_before_generation() {
        let config = GeneratorConfig {
            reason_weights: vec![0.3, 0.3, 0.3, 0.3, 0.3],
            ..GeneratorConfig::default()
        };
        assert!(matches!(
            PopulationGenerator::new(config),
            Err(DashError::InvalidInput { .. })
        ));
    }
}
