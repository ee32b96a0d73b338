use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// Canonical metric names produced by the calculator.
pub const ADMIN_HOURS_PER_PATIENT: &str = "admin_hours_per_patient";
pub const PROCESSING_TIME_HOURS: &str = "processing_time_hours";
pub const BILLING_ERROR_RATE: &str = "billing_error_rate";
pub const PATIENTS_PER_WORKER: &str = "patients_per_worker";
pub const COST_PER_PATIENT: &str = "cost_per_patient";

/// A row of numeric observations keyed by field name.
///
/// Records are immutable once the provider hands them out; non-numeric
/// CSV columns are dropped at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, f64>);

impl Record {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.0.get(field).copied()
    }

    pub fn set(&mut self, field: &str, value: f64) {
        self.0.insert(field.to_string(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl<const N: usize> From<[(&str, f64); N]> for Record {
    fn from(pairs: [(&str, f64); N]) -> Self {
        let mut rec = Record::new();
        for (k, v) in pairs {
            rec.set(k, v);
        }
        rec
    }
}

/// A named mapping from dataset category to its records, created once
/// per analysis run and read-only afterward.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    categories: BTreeMap<String, Vec<Record>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, category: &str, records: Vec<Record>) {
        self.categories.insert(category.to_string(), records);
    }

    pub fn category(&self, name: &str) -> Option<&[Record]> {
        self.categories.get(name).map(|v| v.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }
}

/// A flat metric-name → value snapshot, produced twice per run
/// (baseline, then AI-adjusted).
pub type Metrics = BTreeMap<String, f64>;

/// Annual cost savings by channel, in yen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    pub admin_labor_savings: f64,
    pub error_cost_savings: f64,
    pub additional_revenue: f64,
    pub processing_efficiency_savings: f64,
    pub total_annual_savings: f64,
}

/// One year of the ROI projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyRoi {
    pub year: u32,
    pub savings: f64,
    pub costs: f64,
    pub net_benefit: f64,
    pub cumulative_net: f64,
    pub roi_percentage: f64,
}

/// Whether cumulative savings offset the upfront investment within the
/// analysis horizon. Never encodes a year beyond the horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "years", rename_all = "snake_case")]
pub enum PaybackPeriod {
    Reached(u32),
    NotReached,
}

impl PaybackPeriod {
    pub fn years(&self) -> Option<u32> {
        match self {
            PaybackPeriod::Reached(y) => Some(*y),
            PaybackPeriod::NotReached => None,
        }
    }
}

impl std::fmt::Display for PaybackPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaybackPeriod::Reached(y) => write!(f, "{} years", y),
            PaybackPeriod::NotReached => write!(f, "not reached"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiReport {
    pub yearly: Vec<YearlyRoi>,
    pub total_roi_percentage: f64,
    pub payback_period: PaybackPeriod,
    pub total_investment: f64,
    pub net_benefit: f64,
}

/// Headline figures, rounded per the documented policy: trillion-yen
/// amounts to one decimal, percentages to whole points, payback to
/// whole years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub total_annual_savings_trillion_yen: f64,
    pub five_year_roi_percentage: f64,
    pub payback_period_years: Option<u32>,
    pub admin_time_reduction_percentage: f64,
    pub error_reduction_percentage: f64,
    pub throughput_increase_percentage: f64,
}

/// The assembled analysis output, built once and treated as immutable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub baseline_metrics: Metrics,
    pub ai_metrics: Metrics,
    pub savings: SavingsReport,
    pub roi: RoiReport,
    pub summary: Summary,
}

/// Console preview row: baseline vs. AI value for one metric.
#[derive(Debug, Clone, Tabled)]
pub struct MetricComparisonRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Baseline")]
    pub baseline: String,
    #[tabled(rename = "With AI")]
    pub with_ai: String,
    #[tabled(rename = "Change")]
    pub change: String,
}
