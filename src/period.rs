// 📅 Period Model - calendar months and inclusive month ranges

use crate::error::{ArrError, Result};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// PERIOD
// ============================================================================

/// A calendar month, displayed as `YYYY-MM`.
///
/// Stored as the first day of the month so ordering and arithmetic come from
/// `NaiveDate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period(NaiveDate);

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=9999).contains(&year) {
            return Err(ArrError::InvalidPeriod(format!("{}-{:02}", year, month)));
        }
        NaiveDate::from_ymd_opt(year, month, 1)
            .map(Period)
            .ok_or_else(|| ArrError::InvalidPeriod(format!("{}-{:02}", year, month)))
    }

    /// The month containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Period(date - Days::new(u64::from(date.day0())))
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn first_day(&self) -> NaiveDate {
        self.0
    }

    /// Last calendar day of the month; ARR for a period is measured here.
    pub fn last_day(&self) -> NaiveDate {
        self.0 + Months::new(1) - Days::new(1)
    }

    pub fn next(&self) -> Period {
        Period(self.0 + Months::new(1))
    }

    pub fn prev(&self) -> Period {
        Period(self.0 - Months::new(1))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        Period::of(date) == *self
    }

    /// Every day of the month, in order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let last = self.last_day();
        self.0.iter_days().take_while(move |d| *d <= last)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for Period {
    type Err = ArrError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let invalid = || ArrError::InvalidPeriod(trimmed.to_string());

        let (year, month) = trimmed.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.is_empty() || month.len() > 2 {
            return Err(invalid());
        }
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;

        Period::new(year, month).map_err(|_| invalid())
    }
}

impl Serialize for Period {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Period {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// PERIOD RANGE
// ============================================================================

/// Inclusive range of months, `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodRange {
    start: Period,
    end: Period,
}

impl PeriodRange {
    /// Fails with `InvalidRange` when `end` precedes `start`.
    pub fn new(start: Period, end: Period) -> Result<Self> {
        if end < start {
            return Err(ArrError::InvalidRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(PeriodRange { start, end })
    }

    pub fn single(period: Period) -> Self {
        PeriodRange {
            start: period,
            end: period,
        }
    }

    /// Parse `YYYY-MM` bounds, e.g. from query parameters.
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        PeriodRange::new(start.parse()?, end.parse()?)
    }

    pub fn start(&self) -> Period {
        self.start
    }

    pub fn end(&self) -> Period {
        self.end
    }

    pub fn contains(&self, period: Period) -> bool {
        self.start <= period && period <= self.end
    }

    /// Months in chronological order.
    pub fn months(&self) -> impl Iterator<Item = Period> {
        let end = self.end;
        std::iter::successors(Some(self.start), move |p| {
            let next = p.next();
            (next <= end).then_some(next)
        })
    }

    pub fn len(&self) -> usize {
        let span = (self.end.year() - self.start.year()) * 12
            + self.end.month() as i32
            - self.start.month() as i32;
        span as usize + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The trailing `n` months of this range (the whole range if shorter).
    pub fn last_n(&self, n: usize) -> Self {
        let mut start = self.end;
        for _ in 1..n.min(self.len()) {
            start = start.prev();
        }
        PeriodRange { start, end: self.end }
    }
}

impl fmt::Display for PeriodRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let p: Period = "2024-02".parse().unwrap();
        assert_eq!(p.year(), 2024);
        assert_eq!(p.month(), 2);
        assert_eq!(p.to_string(), "2024-02");

        let single_digit: Period = "2024-3".parse().unwrap();
        assert_eq!(single_digit.to_string(), "2024-03");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("2024".parse::<Period>().is_err());
        assert!("2024-13".parse::<Period>().is_err());
        assert!("24-01".parse::<Period>().is_err());
        assert!("abcd-01".parse::<Period>().is_err());
        assert!("2024-01-15".parse::<Period>().is_err());
    }

    #[test]
    fn test_month_boundaries() {
        let feb_leap: Period = "2024-02".parse().unwrap();
        assert_eq!(feb_leap.first_day(), date(2024, 2, 1));
        assert_eq!(feb_leap.last_day(), date(2024, 2, 29));
        assert_eq!(feb_leap.days().count(), 29);

        let dec: Period = "2023-12".parse().unwrap();
        assert_eq!(dec.last_day(), date(2023, 12, 31));
        assert_eq!(dec.next().to_string(), "2024-01");
        assert_eq!(dec.next().prev(), dec);
    }

    #[test]
    fn test_period_of_date() {
        let p = Period::of(date(2024, 2, 15));
        assert_eq!(p.to_string(), "2024-02");
        assert!(p.contains(date(2024, 2, 29)));
        assert!(!p.contains(date(2024, 3, 1)));
    }

    #[test]
    fn test_range_rejects_reversed_bounds() {
        let err = PeriodRange::parse("2024-03", "2024-01").unwrap_err();
        assert!(matches!(err, ArrError::InvalidRange { .. }));
    }

    #[test]
    fn test_range_months_in_order() {
        let range = PeriodRange::parse("2023-11", "2024-02").unwrap();
        let months: Vec<String> = range.months().map(|p| p.to_string()).collect();
        assert_eq!(months, vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert_eq!(range.len(), 4);
    }

    #[test]
    fn test_range_last_n() {
        let range = PeriodRange::parse("2023-01", "2024-06").unwrap();
        let tail = range.last_n(12);
        assert_eq!(tail.start().to_string(), "2023-07");
        assert_eq!(tail.len(), 12);

        let short = PeriodRange::parse("2024-01", "2024-02").unwrap();
        assert_eq!(short.last_n(12), short);
    }

    #[test]
    fn test_period_serializes_as_string() {
        let p: Period = "2024-01".parse().unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"2024-01\"");
        let back: Period = serde_json::from_str("\"2024-01\"").unwrap();
        assert_eq!(back, p);
    }
}
