use chrono::Weekday;
use serde::{Deserialize, Serialize};

/// Localized weekday labels in calendar order, Monday first.
pub const WEEKDAY_LABELS: [&str; 7] = [
    "Lunes",
    "Martes",
    "Miércoles",
    "Jueves",
    "Viernes",
    "Sábado",
    "Domingo",
];

pub fn weekday_label(day: Weekday) -> &'static str {
    WEEKDAY_LABELS[day.num_days_from_monday() as usize]
}

/// Position of a label in [`WEEKDAY_LABELS`].
pub fn weekday_index(label: &str) -> Option<usize> {
    WEEKDAY_LABELS.iter().position(|l| *l == label)
}

/// Margin-ratio objective classification of a product aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectiveClass {
    Below,
    Equal,
    Above,
    NoData,
}

impl ObjectiveClass {
    pub fn classify(ratio: Option<f64>, target: f64) -> Self {
        match ratio {
            Some(r) if r < target => ObjectiveClass::Below,
            Some(r) if r == target => ObjectiveClass::Equal,
            Some(r) if r > target => ObjectiveClass::Above,
            _ => ObjectiveClass::NoData,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectiveClass::Below => "below",
            ObjectiveClass::Equal => "equal",
            ObjectiveClass::Above => "above",
            ObjectiveClass::NoData => "no-data",
        }
    }
}

/// Correlation of one branch profile against the global profile.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendOutcome {
    /// Absent when fewer than two buckets overlap or a profile is flat.
    pub correlation: Option<f64>,
    pub follows: bool,
}

impl TrendOutcome {
    pub fn from_correlation(correlation: Option<f64>, threshold: f64) -> Self {
        Self {
            correlation,
            follows: correlation.is_some_and(|r| r >= threshold),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BranchTrend {
    pub weekly: TrendOutcome,
    pub monthly: TrendOutcome,
}

/// Values shared by every product row of one (branch, year, month).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub top_margin_product: Option<String>,
    pub top_sales_day_of_month: Option<i32>,
    pub top_sales_weekday: Option<String>,
    pub trend: BranchTrend,
}
