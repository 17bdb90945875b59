//! Calendar frequencies and forward-fill resampling

use crate::data::{RawSeries, TimeSeries};
use crate::error::{ForecastError, Result};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Target frequency of a resampled series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frequency {
    /// Monday to Friday
    #[serde(rename = "B")]
    BusinessDay,
    /// Every calendar day
    #[serde(rename = "D")]
    Daily,
    /// Sundays (weeks ending on Sunday)
    #[serde(rename = "W")]
    Weekly,
}

impl Frequency {
    /// Whether `date` is a point of this calendar
    pub fn contains(&self, date: NaiveDate) -> bool {
        match self {
            Frequency::BusinessDay => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
            Frequency::Daily => true,
            Frequency::Weekly => date.weekday() == Weekday::Sun,
        }
    }

    /// First calendar point on or after `date`
    pub fn align(&self, date: NaiveDate) -> NaiveDate {
        let mut current = date;
        while !self.contains(current) {
            current += Duration::days(1);
        }
        current
    }

    /// Calendar point following `date`
    pub fn next(&self, date: NaiveDate) -> NaiveDate {
        self.align(date + Duration::days(1))
    }

    /// Every calendar point in `[start, end]`
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut current = self.align(start);
        while current <= end {
            dates.push(current);
            current = self.next(current);
        }
        dates
    }

    /// The `count` calendar points after `last`
    pub fn dates_after(&self, last: NaiveDate, count: usize) -> Vec<NaiveDate> {
        let mut dates = Vec::with_capacity(count);
        let mut current = last;
        for _ in 0..count {
            current = self.next(current);
            dates.push(current);
        }
        dates
    }

    pub fn code(&self) -> &'static str {
        match self {
            Frequency::BusinessDay => "B",
            Frequency::Daily => "D",
            Frequency::Weekly => "W",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Frequency {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "b" | "business" | "business_day" | "businessday" => Ok(Frequency::BusinessDay),
            "d" | "daily" | "day" => Ok(Frequency::Daily),
            "w" | "weekly" | "week" => Ok(Frequency::Weekly),
            _ => Err(ForecastError::InvalidParameter(format!(
                "Unsupported frequency: {}",
                s
            ))),
        }
    }
}

/// Reindex `raw` onto `frequency` between its first and last date and
/// forward-fill.
///
/// Each calendar point takes the most recent defined observation at or before
/// it, including observations that fall off the calendar (a Saturday quote
/// feeds the following Monday). Leading points with nothing to carry forward
/// are dropped.
pub fn fill_gaps(raw: &RawSeries, frequency: Frequency) -> Result<TimeSeries> {
    let (first, last) = match (raw.dates().first(), raw.dates().last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => {
            return Err(ForecastError::InsufficientData(format!(
                "Series '{}' is empty",
                raw.name()
            )))
        }
    };

    let calendar = frequency.range(first, last);
    let mut dates = Vec::with_capacity(calendar.len());
    let mut values = Vec::with_capacity(calendar.len());

    let mut observations = raw.iter().peekable();
    let mut carried: Option<f64> = None;
    let mut leading_dropped = 0usize;

    for point in calendar {
        while let Some((date, value)) = observations.peek().copied() {
            if date > point {
                break;
            }
            if value.is_some() {
                carried = value;
            }
            observations.next();
        }

        match carried {
            Some(value) => {
                dates.push(point);
                values.push(value);
            }
            None => leading_dropped += 1,
        }
    }

    if dates.is_empty() {
        return Err(ForecastError::InsufficientData(format!(
            "Series '{}' has no defined values on the {} calendar",
            raw.name(),
            frequency
        )));
    }

    debug!(
        series = raw.name(),
        input = raw.len(),
        output = dates.len(),
        leading_dropped,
        frequency = frequency.code(),
        "gap fill complete"
    );

    TimeSeries::new(raw.name(), dates, values)
}

/// Reindex `raw` onto an existing set of dates, forward-filling as
/// [`fill_gaps`] does.
///
/// Used for companion series that must line up point for point with the
/// target. Dates before the first defined observation take that observation.
pub fn reindex_onto(raw: &RawSeries, dates: &[NaiveDate]) -> Result<TimeSeries> {
    let first_defined = raw
        .values()
        .iter()
        .flatten()
        .next()
        .copied()
        .ok_or_else(|| {
            ForecastError::InsufficientData(format!(
                "Series '{}' has no defined values",
                raw.name()
            ))
        })?;

    let mut observations = raw.iter().peekable();
    let mut carried: Option<f64> = None;
    let mut backfilled = 0usize;
    let mut values = Vec::with_capacity(dates.len());

    for point in dates {
        while let Some((date, value)) = observations.peek().copied() {
            if date > *point {
                break;
            }
            if value.is_some() {
                carried = value;
            }
            observations.next();
        }
        values.push(carried.unwrap_or_else(|| {
            backfilled += 1;
            first_defined
        }));
    }

    debug!(
        series = raw.name(),
        points = values.len(),
        backfilled,
        "reindexed onto target dates"
    );

    TimeSeries::new(raw.name(), dates.to_vec(), values)
}

/// Resample an already dense series onto `frequency`
pub fn resample(series: &TimeSeries, frequency: Frequency) -> Result<TimeSeries> {
    fill_gaps(&series.to_raw(), frequency)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_business_day_range_skips_weekends() {
        // 2023-01-06 is a Friday
        let range = Frequency::BusinessDay.range(date(2023, 1, 6), date(2023, 1, 10));
        assert_eq!(range, vec![date(2023, 1, 6), date(2023, 1, 9), date(2023, 1, 10)]);
    }

    #[test]
    fn test_dates_after() {
        let dates = Frequency::BusinessDay.dates_after(date(2023, 1, 6), 2);
        assert_eq!(dates, vec![date(2023, 1, 9), date(2023, 1, 10)]);
        let weekly = Frequency::Weekly.dates_after(date(2023, 1, 1), 1);
        assert_eq!(weekly, vec![date(2023, 1, 8)]);
    }

    #[test]
    fn test_frequency_parsing() {
        assert_eq!("B".parse::<Frequency>().unwrap(), Frequency::BusinessDay);
        assert_eq!("daily".parse::<Frequency>().unwrap(), Frequency::Daily);
        assert!("hourly".parse::<Frequency>().is_err());
    }

    #[test]
    fn test_weekend_quote_feeds_monday() {
        let raw = RawSeries::from_observations(
            "Close",
            vec![
                (date(2023, 1, 6), Some(1.0)),
                (date(2023, 1, 7), Some(2.0)),
                (date(2023, 1, 10), Some(3.0)),
            ],
        );
        let filled = fill_gaps(&raw, Frequency::BusinessDay).unwrap();
        assert_eq!(filled.dates(), &[date(2023, 1, 6), date(2023, 1, 9), date(2023, 1, 10)]);
        assert_eq!(filled.values(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_leading_missing_values_are_dropped() {
        let raw = RawSeries::from_observations(
            "Close",
            vec![
                (date(2023, 1, 2), None),
                (date(2023, 1, 3), None),
                (date(2023, 1, 4), Some(10.0)),
                (date(2023, 1, 5), None),
            ],
        );
        let filled = fill_gaps(&raw, Frequency::BusinessDay).unwrap();
        assert_eq!(filled.dates(), &[date(2023, 1, 4), date(2023, 1, 5)]);
        assert_eq!(filled.values(), &[10.0, 10.0]);
    }

    #[test]
    fn test_reindex_onto_target_dates() {
        let raw = RawSeries::from_observations(
            "Volume",
            vec![
                (date(2023, 1, 2), None),
                (date(2023, 1, 3), Some(5.0)),
                (date(2023, 1, 4), None),
                (date(2023, 1, 7), Some(8.0)),
            ],
        );
        let dates = Frequency::BusinessDay.range(date(2023, 1, 2), date(2023, 1, 10));
        let aligned = reindex_onto(&raw, &dates).unwrap();

        assert_eq!(aligned.dates(), dates.as_slice());
        assert_eq!(aligned.values(), &[5.0, 5.0, 5.0, 5.0, 5.0, 8.0, 8.0]);

        let empty = RawSeries::from_observations("Volume", vec![(date(2023, 1, 2), None)]);
        assert!(reindex_onto(&empty, &dates).is_err());
    }

    #[test]
    fn test_all_missing_fails() {
        let raw = RawSeries::from_observations("Close", vec![(date(2023, 1, 2), None)]);
        assert!(matches!(
            fill_gaps(&raw, Frequency::BusinessDay),
            Err(ForecastError::InsufficientData(_))
        ));
    }
}
