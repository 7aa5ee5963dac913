//! Flat fare schedule.
//!
//! A fare depends only on when the journey starts and who is travelling,
//! never on the itinerary itself.

use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

/// Passenger fare category
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FareCategory {
    #[default]
    Regular,
    Concession,
}

impl FareCategory {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "regular" | "adult" => Some(Self::Regular),
            "concession" => Some(Self::Concession),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Regular => "regular",
            Self::Concession => "concession",
        }
    }
}

/// Pricing period a departure falls in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FarePeriod {
    Peak,
    OffPeak,
}

impl FarePeriod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Peak => "peak",
            Self::OffPeak => "offPeak",
        }
    }
}

/// A priced ticket. Amounts are kept in cents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Fare {
    pub cents: u32,
    pub category: FareCategory,
    pub period: FarePeriod,
}

impl Fare {
    pub fn dollars(&self) -> f64 {
        f64::from(self.cents) / 100.0
    }
}

/// Set of weekdays, one bit per `Weekday::number_from_monday`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeekdayFlags {
    pub(crate) flags: u8,
}

impl WeekdayFlags {
    /// Monday through Friday
    pub const WEEKDAYS: Self = Self { flags: 0b0011_1110 };

    pub fn new() -> Self {
        Self { flags: 0 }
    }

    pub fn set(&mut self, weekday: Weekday) {
        self.flags |= 1 << weekday.number_from_monday();
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        (self.flags & (1 << weekday.number_from_monday())) != 0
    }
}

/// Peak/off-peak fare table.
///
/// The off-peak window is `[off_peak_start, off_peak_end)` on `off_peak_days`.
/// Every other departure is charged at peak.
#[derive(Clone, Debug, PartialEq)]
pub struct FareSchedule {
    pub off_peak_start: NaiveTime,
    pub off_peak_end: NaiveTime,
    pub off_peak_days: WeekdayFlags,
    pub peak_regular_cents: u32,
    pub peak_concession_cents: u32,
    pub off_peak_regular_cents: u32,
    pub off_peak_concession_cents: u32,
}

impl Default for FareSchedule {
    fn default() -> Self {
        Self {
            off_peak_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            off_peak_end: NaiveTime::from_hms_opt(15, 0, 0).unwrap_or_default(),
            off_peak_days: WeekdayFlags::WEEKDAYS,
            peak_regular_cents: 400,
            peak_concession_cents: 200,
            off_peak_regular_cents: 260,
            off_peak_concession_cents: 130,
        }
    }
}

impl FareSchedule {
    pub fn period(&self, time: NaiveTime, weekday: Weekday) -> FarePeriod {
        let in_window = time >= self.off_peak_start && time < self.off_peak_end;
        if in_window && self.off_peak_days.contains(weekday) {
            FarePeriod::OffPeak
        } else {
            FarePeriod::Peak
        }
    }

    pub fn fare(&self, time: NaiveTime, weekday: Weekday, category: FareCategory) -> Fare {
        let period = self.period(time, weekday);
        let cents = match (period, category) {
            (FarePeriod::Peak, FareCategory::Regular) => self.peak_regular_cents,
            (FarePeriod::Peak, FareCategory::Concession) => self.peak_concession_cents,
            (FarePeriod::OffPeak, FareCategory::Regular) => self.off_peak_regular_cents,
            (FarePeriod::OffPeak, FareCategory::Concession) => self.off_peak_concession_cents,
        };

        Fare { cents, category, period }
    }
}
