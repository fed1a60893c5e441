//! Subscription billing periods and their display strings.

use serde::{Deserialize, Serialize};

/// Calendar unit a subscription period is expressed in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodUnit {
    Day,
    Week,
    Month,
    Year,
}

impl PeriodUnit {
    /// Day weight used for cost-per-day comparisons.
    ///
    /// Months count as 30 days and years as 365; store fronts bill calendar
    /// periods but plan comparison only needs a stable ratio.
    pub fn days(self) -> u32 {
        match self {
            PeriodUnit::Day => 1,
            PeriodUnit::Week => 7,
            PeriodUnit::Month => 30,
            PeriodUnit::Year => 365,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodUnit::Day => "day",
            PeriodUnit::Week => "week",
            PeriodUnit::Month => "month",
            PeriodUnit::Year => "year",
        }
    }
}

/// `value` × `unit`, e.g. 3 months.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionPeriod {
    pub unit: PeriodUnit,
    pub value: u32,
}

impl SubscriptionPeriod {
    pub fn new(unit: PeriodUnit, value: u32) -> Self {
        Self { unit, value }
    }

    pub fn monthly() -> Self {
        Self::new(PeriodUnit::Month, 1)
    }

    pub fn yearly() -> Self {
        Self::new(PeriodUnit::Year, 1)
    }

    /// Total day weight of the period. A zero `value` is treated as one unit.
    pub fn days(&self) -> u64 {
        u64::from(self.value.max(1)) * u64::from(self.unit.days())
    }

    /// "1 month", "3 months", "2 weeks".
    pub fn label(&self) -> String {
        let n = self.value.max(1);
        if n == 1 {
            format!("1 {}", self.unit.as_str())
        } else {
            format!("{n} {}s", self.unit.as_str())
        }
    }

    /// Unit name for single-unit periods ("month"), full label otherwise.
    pub fn unit_label(&self) -> String {
        if self.value <= 1 {
            self.unit.as_str().to_string()
        } else {
            self.label()
        }
    }

    /// "monthly", "yearly"; multi-unit periods fall back to "every 3 months".
    pub fn adjective(&self) -> String {
        if self.value > 1 {
            return format!("every {}", self.label());
        }
        match self.unit {
            PeriodUnit::Day => "daily",
            PeriodUnit::Week => "weekly",
            PeriodUnit::Month => "monthly",
            PeriodUnit::Year => "yearly",
        }
        .to_string()
    }

    /// Compact suffix for price tags: "/mo", "/yr", "/3 mo".
    pub fn short_suffix(&self) -> String {
        let unit = match self.unit {
            PeriodUnit::Day => "day",
            PeriodUnit::Week => "wk",
            PeriodUnit::Month => "mo",
            PeriodUnit::Year => "yr",
        };
        if self.value <= 1 {
            format!("/{unit}")
        } else {
            format!("/{} {unit}", self.value)
        }
    }
}
