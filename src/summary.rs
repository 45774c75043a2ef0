//! Period-over-period display values for spending cards.

use serde::Serialize;

use crate::spending::SpendingSummary;
use crate::types::{FilterTab, Period};

/// Arrow shown next to the change label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
    None,
}

impl Direction {
    #[must_use]
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Up => "↑",
            Self::Down => "↓",
            Self::None => "",
        }
    }
}

/// Change from the previous period to the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Change {
    pub label: String,
    pub direction: Direction,
}

/// Compare `current` against `previous`.
///
/// A zero baseline has no meaningful percentage: growth from zero is "New",
/// zero to zero is flat.
#[must_use]
pub fn change(previous: f64, current: f64) -> Change {
    if previous == 0.0 {
        return if current > 0.0 {
            Change {
                label: "New".into(),
                direction: Direction::Up,
            }
        } else {
            Change {
                label: "0.00%".into(),
                direction: Direction::None,
            }
        };
    }

    let pct = ((current - previous) / previous).abs() * 100.0;
    let direction = if current > previous {
        Direction::Up
    } else {
        Direction::Down
    };
    Change {
        label: format!("{pct:.2}%"),
        direction,
    }
}

/// Rupee amount with two decimals.
#[must_use]
pub fn format_amount(amount: f64) -> String {
    format!("₹{amount:.2}")
}

/// Card heading, current-window caption, previous-window caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodLabels {
    pub title: &'static str,
    pub current: &'static str,
    pub previous: &'static str,
}

#[must_use]
pub fn labels(period: Period) -> PeriodLabels {
    match period {
        Period::Daily => PeriodLabels {
            title: "Daily Spending",
            current: "today",
            previous: "Yesterday",
        },
        Period::Weekly => PeriodLabels {
            title: "Weekly Spending",
            current: "this week",
            previous: "Last Week",
        },
        Period::Monthly => PeriodLabels {
            title: "Monthly Spending",
            current: "this month",
            previous: "Last Month",
        },
    }
}

/// Chart point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub date: String,
    pub amount: f64,
}

/// Everything needed to draw one summary card.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryCard {
    pub period: Period,
    pub title: &'static str,
    pub caption: &'static str,
    pub total: String,
    pub previous: String,
    pub change: Change,
    /// Only weekly/monthly cards on their own tab get a chart.
    pub series: Option<Vec<Point>>,
}

impl SummaryCard {
    #[must_use]
    pub fn build(period: Period, data: &SpendingSummary, active: FilterTab) -> Self {
        let labels = labels(period);
        let wants_chart = matches!(period, Period::Weekly | Period::Monthly)
            && active != FilterTab::All
            && !data.details.is_empty();
        let series = wants_chart.then(|| {
            data.details
                .iter()
                .map(|d| Point {
                    date: d.date.clone(),
                    amount: d.amount,
                })
                .collect()
        });

        Self {
            period,
            title: labels.title,
            caption: labels.current,
            total: format_amount(data.summary.total),
            previous: format!(
                "{} {}",
                labels.previous,
                format_amount(data.summary.previously)
            ),
            change: change(data.summary.previously, data.summary.total),
            series,
        }
    }
}
