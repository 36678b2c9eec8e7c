//! Reduction of daily observations to the points each data mode plots.
//!
//! Climatological modes (`Daily Means`, `Monthly Means` and the smoothed
//! variant) fold every year onto the leap year 2000 so the host can draw
//! them on an ordinary date axis.

use std::collections::BTreeMap;

use olicana_cache::DailyRecord;
use olicana_cache::dates::unix_seconds;
use strum::{Display, EnumString};
use time::{Date, Month};

/// Year onto which climatological means are dated.
const CLIMATOLOGY_YEAR: i32 = 2000;

/// Day of the month on which monthly points are dated.
const MID_MONTH: u8 = 15;

/// Width of the rolling mean used by the smoothed mode, in days.
const SMOOTHING_WINDOW: usize = 10;

/// Position of the dated day inside a smoothing window.
const SMOOTHING_CENTRE: usize = 5;

/// How the loaded observations are reduced before plotting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString)]
pub enum DataMode {
    /// Every observed day.
    #[default]
    #[strum(to_string = "Daily")]
    Daily,
    /// Mean of each calendar day across all years.
    #[strum(to_string = "Daily Means")]
    DailyMeans,
    /// Daily means passed through a centred ten-day rolling mean.
    #[strum(to_string = "Daily Means (smoothed)")]
    SmoothedDailyMeans,
    /// Mean of each year and month.
    #[strum(to_string = "Monthly")]
    Monthly,
    /// Mean of each calendar month across all years.
    #[strum(to_string = "Monthly Means")]
    MonthlyMeans,
}

impl DataMode {
    /// Every mode, in the order the form lists them.
    pub const ALL: [Self; 5] = [
        Self::Daily,
        Self::DailyMeans,
        Self::SmoothedDailyMeans,
        Self::Monthly,
        Self::MonthlyMeans,
    ];
}

/// Temperature column of a [`DailyRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Variable {
    /// Daily mean.
    Tmean,
    /// Daily minimum.
    Tmin,
    /// Daily maximum.
    Tmax,
}

impl Variable {
    /// Every variable, in series order.
    pub const ALL: [Self; 3] = [Self::Tmean, Self::Tmin, Self::Tmax];

    /// Human-readable series name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Tmean => "Mean Temp",
            Self::Tmin => "Min Temp",
            Self::Tmax => "Max Temp",
        }
    }

    /// Reads this variable from `record`.
    #[must_use]
    pub const fn read(self, record: &DailyRecord) -> Option<f64> {
        match self {
            Self::Tmean => record.tmean,
            Self::Tmin => record.tmin,
            Self::Tmax => record.tmax,
        }
    }
}

/// Reduces `records` to dated values for `variable` under `mode`.
///
/// Missing values are skipped before any aggregation. The result is sorted
/// by date.
#[must_use]
pub fn points(records: &[DailyRecord], variable: Variable, mode: DataMode) -> Vec<(Date, f64)> {
    let observed = records
        .iter()
        .filter_map(|record| variable.read(record).map(|value| (record.date, value)));
    match mode {
        DataMode::Daily => {
            let mut daily: Vec<_> = observed.collect();
            daily.sort_by_key(|(date, _)| *date);
            daily
        }
        DataMode::DailyMeans => daily_means(observed),
        DataMode::SmoothedDailyMeans => smooth(&daily_means(observed)),
        DataMode::Monthly => grouped_means(observed, |date| {
            mid_month(date.year(), date.month())
        }),
        DataMode::MonthlyMeans => grouped_means(observed, |date| {
            mid_month(CLIMATOLOGY_YEAR, date.month())
        }),
    }
}

/// Converts dated values to `(unix seconds, value)` pairs.
#[must_use]
pub fn timestamped(points: &[(Date, f64)]) -> Vec<(f64, f64)> {
    points
        .iter()
        .map(|(date, value)| (timestamp(*date), *value))
        .collect()
}

#[expect(
    clippy::cast_precision_loss,
    reason = "Unix seconds for calendar dates fit in the f64 mantissa"
)]
fn timestamp(date: Date) -> f64 {
    unix_seconds(date) as f64
}

fn mid_month(year: i32, month: Month) -> Option<Date> {
    Date::from_calendar_date(year, month, MID_MONTH).ok()
}

fn daily_means(observed: impl Iterator<Item = (Date, f64)>) -> Vec<(Date, f64)> {
    grouped_means(observed, |date| {
        Date::from_calendar_date(CLIMATOLOGY_YEAR, date.month(), date.day()).ok()
    })
}

fn grouped_means(
    observed: impl Iterator<Item = (Date, f64)>,
    key: impl Fn(Date) -> Option<Date>,
) -> Vec<(Date, f64)> {
    let mut groups: BTreeMap<Date, Mean> = BTreeMap::new();
    for (date, value) in observed {
        if let Some(bucket) = key(date) {
            groups.entry(bucket).or_default().add(value);
        }
    }
    groups
        .into_iter()
        .filter_map(|(date, mean)| mean.value().map(|value| (date, value)))
        .collect()
}

/// Rolling mean over full windows only; edges without a complete window are
/// dropped.
fn smooth(series: &[(Date, f64)]) -> Vec<(Date, f64)> {
    series
        .windows(SMOOTHING_WINDOW)
        .filter_map(|window| {
            let (date, _) = window.get(SMOOTHING_CENTRE)?;
            let mut mean = Mean::default();
            for (_, value) in window {
                mean.add(*value);
            }
            mean.value().map(|value| (*date, value))
        })
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    #[expect(clippy::float_arithmetic, reason = "temperatures are averaged")]
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count = self.count.saturating_add(1);
    }

    #[expect(clippy::float_arithmetic, reason = "temperatures are averaged")]
    fn value(self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / f64::from(self.count))
    }
}
