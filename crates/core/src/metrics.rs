//! Metric vocabulary and per-entity metric snapshots.
//!
//! The metric set is a closed enum: a rule document referencing a metric
//! name outside this list fails deserialization instead of silently
//! evaluating to nothing.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::EntityId;

/// Known performance metrics.
///
/// Names follow the platform's reporting column names (snake_case in rule
/// documents). Monetary metrics are in account currency; rates are
/// percentages in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricId {
    Spend,
    Impressions,
    Reach,
    Frequency,
    Clicks,
    UniqueClicks,
    Ctr,
    Cpc,
    Cpm,
    Results,
    CostPerResult,
    ResultRate,
    LinkClicks,
    CostPerLinkClick,
    LandingPageViews,
    VideoViews,
    VideoViewRate,
    Purchases,
    CostPerPurchase,
    PurchaseRoas,
    MessagingConversationsStarted,
    CostPerMessagingConversation,
    MessagingReplyRate,
    SdtRate,
    EngagementRate,
}

impl MetricId {
    /// The snake_case name used in rule documents and reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricId::Spend => "spend",
            MetricId::Impressions => "impressions",
            MetricId::Reach => "reach",
            MetricId::Frequency => "frequency",
            MetricId::Clicks => "clicks",
            MetricId::UniqueClicks => "unique_clicks",
            MetricId::Ctr => "ctr",
            MetricId::Cpc => "cpc",
            MetricId::Cpm => "cpm",
            MetricId::Results => "results",
            MetricId::CostPerResult => "cost_per_result",
            MetricId::ResultRate => "result_rate",
            MetricId::LinkClicks => "link_clicks",
            MetricId::CostPerLinkClick => "cost_per_link_click",
            MetricId::LandingPageViews => "landing_page_views",
            MetricId::VideoViews => "video_views",
            MetricId::VideoViewRate => "video_view_rate",
            MetricId::Purchases => "purchases",
            MetricId::CostPerPurchase => "cost_per_purchase",
            MetricId::PurchaseRoas => "purchase_roas",
            MetricId::MessagingConversationsStarted => "messaging_conversations_started",
            MetricId::CostPerMessagingConversation => "cost_per_messaging_conversation",
            MetricId::MessagingReplyRate => "messaging_reply_rate",
            MetricId::SdtRate => "sdt_rate",
            MetricId::EngagementRate => "engagement_rate",
        }
    }
}

impl std::fmt::Display for MetricId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reporting window a snapshot covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeRange {
    Today,
    Yesterday,
    #[serde(rename = "last_3_days")]
    Last3Days,
    #[serde(rename = "last_7_days")]
    Last7Days,
    #[serde(rename = "last_14_days")]
    Last14Days,
    #[serde(rename = "last_30_days")]
    Last30Days,
    Lifetime,
}

impl std::fmt::Display for TimeRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TimeRange::Today => "today",
            TimeRange::Yesterday => "yesterday",
            TimeRange::Last3Days => "last_3_days",
            TimeRange::Last7Days => "last_7_days",
            TimeRange::Last14Days => "last_14_days",
            TimeRange::Last30Days => "last_30_days",
            TimeRange::Lifetime => "lifetime",
        };
        write!(f, "{}", s)
    }
}

/// Point-in-time metric values for one entity over one window.
///
/// Produced by the metrics provider; immutable once handed to an evaluation
/// run. A metric absent from `values` means "not measured", which every
/// condition treats as not met.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSnapshot {
    pub entity_id: EntityId,
    pub time_range: TimeRange,
    pub values: HashMap<MetricId, f64>,
    pub fetched_at: DateTime<Utc>,
}

impl MetricSnapshot {
    /// Create an empty snapshot stamped with the current time.
    pub fn new(entity_id: impl Into<EntityId>, time_range: TimeRange) -> Self {
        Self {
            entity_id: entity_id.into(),
            time_range,
            values: HashMap::new(),
            fetched_at: Utc::now(),
        }
    }

    /// Builder-style value insertion, mainly for tests and fixtures.
    pub fn with_value(mut self, metric: MetricId, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    /// Value for `metric`, or `None` when it was not measured.
    pub fn get(&self, metric: MetricId) -> Option<f64> {
        self.values.get(&metric).copied()
    }

    /// Number of measured metrics.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no metrics were measured.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// ── Tests ───────────────────────────────────────────────────────────
