use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

/// An inclusive range of calendar dates.
///
/// Both `start` and `end` are part of the range, so a range from
/// `2009-01-01` to `2019-12-31` covers eleven full calendar years.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use rainfall_climatology::DateRange;
///
/// let range = DateRange::new(
///     NaiveDate::from_ymd_opt(2012, 1, 1).unwrap(),
///     NaiveDate::from_ymd_opt(2013, 12, 31).unwrap(),
/// )
/// .unwrap();
/// assert!(range.contains(NaiveDate::from_ymd_opt(2013, 12, 31).unwrap()));
/// assert_eq!(range.years(), 2012..=2013);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a new range, returning `None` if `start` lies after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The eleven-year window (2009 through 2019) the climatology is computed over by default.
    pub fn default_window() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2009, 1, 1).expect("2009-01-01 is a valid date"),
            end: NaiveDate::from_ymd_opt(2019, 12, 31).expect("2019-12-31 is a valid date"),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Calendar years touched by the range.
    pub fn years(&self) -> RangeInclusive<i32> {
        self.start.year()..=self.end.year()
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::default_window()
    }
}

impl Display for DateRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}
