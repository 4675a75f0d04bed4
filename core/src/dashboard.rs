//! Read-only dashboard views over a generated population.
//!
//! Every view is recomputed on demand from the immutable table and the
//! current `Thresholds`. Nothing here writes back to the population.
//!
//! Views:
//!   - frequency tiers (KPI tiles) and synthetic week-over-week deltas
//!   - z-score anomalies and the reason breakdown among them
//!   - dead-cross list, RFM segment counts, high churn risk list
//!   - survival curve
//!   - watchlist + single member drill-down

use crate::{
    config::Thresholds,
    error::{DashError, DashResult},
    member::{MemberRecord, ReasonCategory, RfmSegment},
    population::Population,
    rng::{RngBank, StreamSlot},
};
use log::warn;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SURVIVAL_MONTHS: u32 = 24;

// ── Public types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrequencyTiers {
    pub total:       usize,
    pub eight_plus:  usize,
    pub four_plus:   usize,
    pub one_plus:    usize,
    pub zero_visits: usize,
}

/// Synthetic change versus last week. Not derived from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KpiDeltas {
    pub eight_plus:  i64,
    pub four_plus:   i64,
    pub zero_visits: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub category: ReasonCategory,
    pub count:    usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SegmentCount {
    pub segment: RfmSegment,
    pub count:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SurvivalPoint {
    pub month:         u32,
    pub survival_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChurnFlag {
    AtRisk,
    Safe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemberDetail {
    pub name:            String,
    pub z_score:         f64,
    pub churn_prob:      f64,
    pub churn_flag:      ChurnFlag,
    pub recency:         i64,
    pub rfm_segment:     RfmSegment,
    pub reason_category: Option<ReasonCategory>,
    pub reason_detail:   Option<String>,
    /// True when the requested name was missing and a default was used.
    pub fell_back:       bool,
}

/// Everything an external UI needs for one render.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardState<'a> {
    pub seed:            u64,
    pub thresholds:      Thresholds,
    pub tiers:           FrequencyTiers,
    pub deltas:          KpiDeltas,
    pub anomalies:       Vec<&'a MemberRecord>,
    pub reason_counts:   Vec<ReasonCount>,
    pub dead_cross:      Vec<&'a MemberRecord>,
    pub segment_counts:  Vec<SegmentCount>,
    pub high_churn_risk: Vec<&'a MemberRecord>,
    pub survival_curve:  Vec<SurvivalPoint>,
    pub watchlist:       Vec<&'a str>,
    pub selected:        MemberDetail,
}

// ── Views ────────────────────────────────────────────────────────────────────

pub struct Dashboard<'a> {
    population: &'a Population,
}

impl<'a> Dashboard<'a> {
    pub fn new(population: &'a Population) -> Self {
        Self { population }
    }

    pub fn frequency_tiers(&self) -> FrequencyTiers {
        let total = self.population.len();
        let at_least = |n: i64| self.population.iter().filter(|m| m.frequency >= n).count();
        let one_plus = at_least(1);
        FrequencyTiers {
            total,
            eight_plus: at_least(8),
            four_plus: at_least(4),
            one_plus,
            zero_visits: total - one_plus,
        }
    }

    pub fn kpi_deltas(&self) -> KpiDeltas {
        let mut rng = RngBank::new(self.population.seed()).for_slot(StreamSlot::KpiDelta);
        KpiDeltas {
            eight_plus: rng.int_range(-10, 10),
            four_plus: rng.int_range(-15, 15),
            zero_visits: rng.int_range(-5, 0),
        }
    }

    /// Members at or below the slider's z threshold, in id order.
    pub fn anomalies(&self, z_threshold: f64) -> Vec<&'a MemberRecord> {
        self.population
            .iter()
            .filter(|m| m.z_score <= z_threshold)
            .collect()
    }

    /// Reason frequency among the z-filtered members, most common first.
    pub fn reason_counts(&self, z_threshold: f64) -> Vec<ReasonCount> {
        let mut counts: BTreeMap<ReasonCategory, usize> = BTreeMap::new();
        for category in self
            .anomalies(z_threshold)
            .into_iter()
            .filter_map(|m| m.reason_category)
        {
            *counts.entry(category).or_default() += 1;
        }
        let mut out: Vec<ReasonCount> = counts
            .into_iter()
            .map(|(category, count)| ReasonCount { category, count })
            .collect();
        // Stable sort keeps category order among ties.
        out.sort_by(|a, b| b.count.cmp(&a.count));
        out
    }

    /// Dead-cross members, weakest short-term average first.
    pub fn dead_cross_members(&self) -> Vec<&'a MemberRecord> {
        let mut out: Vec<&MemberRecord> =
            self.population.iter().filter(|m| m.dead_cross).collect();
        out.sort_by(|a, b| a.ma_short.total_cmp(&b.ma_short));
        out
    }

    pub fn segment_counts(&self) -> Vec<SegmentCount> {
        RfmSegment::ALL
            .iter()
            .map(|&segment| SegmentCount {
                segment,
                count: self
                    .population
                    .iter()
                    .filter(|m| m.rfm_segment == segment)
                    .count(),
            })
            .collect()
    }

    /// Members at or above the churn threshold, highest probability first.
    pub fn high_churn_risk(&self, churn_threshold: f64) -> Vec<&'a MemberRecord> {
        let mut out: Vec<&MemberRecord> = self
            .population
            .iter()
            .filter(|m| m.churn_prob >= churn_threshold)
            .collect();
        out.sort_by(|a, b| b.churn_prob.total_cmp(&a.churn_prob));
        out
    }

    /// Retention by month: roughly 3 points lost per month plus noise.
    pub fn survival_curve(&self) -> Vec<SurvivalPoint> {
        let mut rng = RngBank::new(self.population.seed()).for_slot(StreamSlot::Survival);
        (0..SURVIVAL_MONTHS)
            .map(|i| {
                let noise = rng.int_range(0, 5);
                SurvivalPoint {
                    month: i + 1,
                    survival_rate: 100.0 - (i as f64 * 3.0 + noise as f64),
                }
            })
            .collect()
    }

    /// Names in the union of the z and churn subsets; all names if empty.
    pub fn watchlist(&self, thresholds: &Thresholds) -> Vec<&'a str> {
        let flagged: Vec<&str> = self
            .population
            .iter()
            .filter(|m| {
                m.z_score <= thresholds.z_threshold || m.churn_prob >= thresholds.churn_threshold
            })
            .map(|m| m.name.as_str())
            .collect();
        if flagged.is_empty() {
            self.population.iter().map(|m| m.name.as_str()).collect()
        } else {
            flagged
        }
    }

    /// Drill-down for `name`, falling back to the first watchlist entry
    /// when no name is given or the name is unknown.
    pub fn select(&self, name: Option<&str>, thresholds: &Thresholds) -> DashResult<MemberDetail> {
        if let Some(member) = name.and_then(|n| self.population.get_by_name(n)) {
            return Ok(detail(member, thresholds, false));
        }
        if let Some(n) = name {
            warn!("Member '{n}' not found, falling back to default selection");
        }
        let default_name = self
            .watchlist(thresholds)
            .first()
            .copied()
            .ok_or_else(|| DashError::MemberNotFound {
                name: name.unwrap_or_default().to_string(),
            })?;
        let member = self.population.require(default_name)?;
        Ok(detail(member, thresholds, name.is_some()))
    }

    pub fn state(&self, thresholds: Thresholds, selected: Option<&str>) -> DashResult<DashboardState<'a>> {
        Ok(DashboardState {
            seed: self.population.seed(),
            thresholds,
            tiers: self.frequency_tiers(),
            deltas: self.kpi_deltas(),
            anomalies: self.anomalies(thresholds.z_threshold),
            reason_counts: self.reason_counts(thresholds.z_threshold),
            dead_cross: self.dead_cross_members(),
            segment_counts: self.segment_counts(),
            high_churn_risk: self.high_churn_risk(thresholds.churn_threshold),
            survival_curve: self.survival_curve(),
            watchlist: self.watchlist(&thresholds),
            selected: self.select(selected, &thresholds)?,
        })
    }
}

fn detail(member: &MemberRecord, thresholds: &Thresholds, fell_back: bool) -> MemberDetail {
    let churn_flag = if member.churn_prob > thresholds.churn_threshold {
        ChurnFlag::AtRisk
    } else {
        ChurnFlag::Safe
    };
    MemberDetail {
        name: member.name.clone(),
        z_score: member.z_score,
        churn_prob: member.churn_prob,
        churn_flag,
        recency: member.recency,
        rfm_segment: member.rfm_segment,
        reason_category: member.reason_category,
        reason_detail: member.reason_detail.clone(),
        fell_back,
    }
}
