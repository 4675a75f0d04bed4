//! The member record and its derived fields.
//!
//! `dead_cross` and `rfm_segment` are never sampled: they are always
//! recomputed from the sampled fields through the functions below.

use crate::types::MemberId;
use serde::{Deserialize, Serialize};

/// Short-term average below this fraction of the long-term average
/// counts as a dead cross.
pub const DEAD_CROSS_RATIO: f64 = 0.9;

/// Internal z-score cutoff at or below which a drop reason is recorded.
/// Distinct from the user-facing `Thresholds::z_threshold`.
pub const REASON_Z_THRESHOLD: f64 = -1.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RfmSegment {
    Loyal,
    AtRisk,
    Regular,
}

impl RfmSegment {
    pub const ALL: [RfmSegment; 3] = [Self::Loyal, Self::AtRisk, Self::Regular];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Loyal => "loyal",
            Self::AtRisk => "at_risk",
            Self::Regular => "regular",
        }
    }
}

/// Loyal requires recency strictly below this.
pub const LOYAL_MAX_RECENCY: i64 = 14;
/// Loyal requires frequency strictly above this.
pub const LOYAL_MIN_FREQUENCY: i64 = 10;
/// At-risk requires recency strictly above this.
pub const AT_RISK_MIN_RECENCY: i64 = 30;

/// Rule order: loyal first, then at-risk, else regular.
pub fn rfm_segment(recency: i64, frequency: i64) -> RfmSegment {
    if recency < LOYAL_MAX_RECENCY && frequency > LOYAL_MIN_FREQUENCY {
        RfmSegment::Loyal
    } else if recency > AT_RISK_MIN_RECENCY {
        RfmSegment::AtRisk
    } else {
        RfmSegment::Regular
    }
}

/// Why a member's attendance dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCategory {
    Health,
    Overwork,
    ContentDifficulty,
    PersonalAffairs,
    LostInterest,
}

impl ReasonCategory {
    /// Fixed order; reason weight vectors are indexed by it.
    pub const ALL: [ReasonCategory; 5] = [
        Self::Health,
        Self::Overwork,
        Self::ContentDifficulty,
        Self::PersonalAffairs,
        Self::LostInterest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Health => "health",
            Self::Overwork => "overwork",
            Self::ContentDifficulty => "content_difficulty",
            Self::PersonalAffairs => "personal_affairs",
            Self::LostInterest => "lost_interest",
        }
    }

    /// Canned member comment. Only three categories carry one.
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            Self::Health => Some("Down with the flu and resting at home all week."),
            Self::Overwork => Some("Project deadlines are eating up all my evenings lately."),
            Self::ContentDifficulty => {
                Some("The beginner class suddenly jumped into hard theory and I lost interest.")
            }
            Self::PersonalAffairs | Self::LostInterest => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,
    pub name: String,
    pub z_score: f64,
    pub ma_short: f64,
    pub ma_long: f64,
    pub months_active: i64,
    pub recency: i64,
    pub frequency: i64,
    pub monetary: i64,
    pub churn_prob: f64,
    pub dead_cross: bool,
    pub rfm_segment: RfmSegment,
    pub reason_category: Option<ReasonCategory>,
    pub reason_detail: Option<String>,
}

/// Display name for a member id.
pub fn member_name(id: MemberId) -> String {
    format!("Member_{id}")
}

/// True when the short average sits more than 10% below the long one.
pub fn is_dead_cross(ma_short: f64, ma_long: f64) -> bool {
    ma_short < ma_long * DEAD_CROSS_RATIO
}

impl MemberRecord {
    pub fn has_reason(&self) -> bool {
        self.reason_category.is_some()
    }
}
