//! Leap-year aware day-of-year arithmetic.
//!
//! Every date except February 29 maps onto a common 365-day calendar so that
//! the same calendar day lines up across leap and non-leap years. The
//! adjustment works on the 0-based relative day: in a leap year anything after
//! relative day 58 (February 28) is shifted down by one. The public day of
//! year is 1-based, `1..=365`.

use chrono::{Datelike, NaiveDate};
use polars::prelude::{col, lit, when, DataType, Expr};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Number of distinct day-of-year values once February 29 is removed.
pub const DAYS_PER_YEAR: u16 = 365;

/// Relative (0-based) day of February 28.
pub const FEB_28_RELATIVE_DAY: u32 = 58;

/// How leap years are recognised.
///
/// `Mod4` treats every year divisible by four as a leap year. It matches the
/// Gregorian calendar for 1901 through 2099 only; century years such as 2100
/// are misclassified. Use `Gregorian` when the analysis window can reach them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LeapRule {
    #[default]
    Mod4,
    Gregorian,
}

impl LeapRule {
    pub fn is_leap_year(self, year: i32) -> bool {
        match self {
            LeapRule::Mod4 => year % 4 == 0,
            LeapRule::Gregorian => (year % 4 == 0 && year % 100 != 0) || year % 400 == 0,
        }
    }

    /// Years in `years` where this rule and the Gregorian calendar disagree.
    pub fn disagreements(self, years: RangeInclusive<i32>) -> Vec<i32> {
        years
            .filter(|&year| self.is_leap_year(year) != LeapRule::Gregorian.is_leap_year(year))
            .collect()
    }

    /// Boolean expression over an integer year column.
    pub(crate) fn leap_year_expr(self, year: Expr) -> Expr {
        let divisible = |year: Expr, by: i32| (year % lit(by)).eq(lit(0));
        match self {
            LeapRule::Mod4 => divisible(year, 4),
            LeapRule::Gregorian => divisible(year.clone(), 4).and(
                divisible(year.clone(), 100)
                    .not()
                    .or(divisible(year, 400)),
            ),
        }
    }
}

impl fmt::Display for LeapRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LeapRule::Mod4 => write!(f, "mod4"),
            LeapRule::Gregorian => write!(f, "gregorian"),
        }
    }
}

impl FromStr for LeapRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mod4" => Ok(LeapRule::Mod4),
            "gregorian" => Ok(LeapRule::Gregorian),
            other => Err(format!(
                "unknown leap rule '{}', expected 'mod4' or 'gregorian'",
                other
            )),
        }
    }
}

pub fn is_leap_year(year: i32, rule: LeapRule) -> bool {
    rule.is_leap_year(year)
}

/// Applies the leap-year shift to a 0-based relative day.
///
/// ```
/// use rainfall_climatology::{adjust_relative_day, LeapRule};
///
/// // March 1st: relative day 60 in 2012, 59 in 2013.
/// assert_eq!(adjust_relative_day(60, 2012, LeapRule::Mod4), 59);
/// assert_eq!(adjust_relative_day(59, 2013, LeapRule::Mod4), 59);
/// ```
pub fn adjust_relative_day(relative_day: u32, year: i32, rule: LeapRule) -> u32 {
    if relative_day > FEB_28_RELATIVE_DAY && rule.is_leap_year(year) {
        relative_day - 1
    } else {
        relative_day
    }
}

/// 1-based day of year on the common 365-day calendar.
///
/// February 29 shares its index with February 28; it is expected to be
/// filtered out before grouping.
pub fn adjusted_day_of_year(date: NaiveDate, rule: LeapRule) -> u16 {
    (adjust_relative_day(date.ordinal0(), date.year(), rule) + 1) as u16
}

/// Lazy counterpart of [`adjusted_day_of_year`] over a date column.
pub(crate) fn day_of_year_expr(date_column: &str, rule: LeapRule) -> Expr {
    let year = col(date_column).dt().year().cast(DataType::Int32);
    let relative = col(date_column).dt().ordinal_day().cast(DataType::Int32) - lit(1);
    let shift = relative
        .clone()
        .gt(lit(FEB_28_RELATIVE_DAY as i32))
        .and(rule.leap_year_expr(year));
    when(shift)
        .then(relative.clone() - lit(1))
        .otherwise(relative)
        + lit(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_mod4_and_gregorian_rules() {
        assert!(LeapRule::Mod4.is_leap_year(2012));
        assert!(!LeapRule::Mod4.is_leap_year(2013));
        assert!(LeapRule::Mod4.is_leap_year(2100));
        assert!(!LeapRule::Gregorian.is_leap_year(2100));
        assert!(LeapRule::Gregorian.is_leap_year(2000));
        assert!(!LeapRule::Gregorian.is_leap_year(1900));
    }

    #[test]
    fn test_rules_agree_inside_default_window() {
        assert!(LeapRule::Mod4.disagreements(2009..=2019).is_empty());
        assert_eq!(LeapRule::Mod4.disagreements(2090..=2110), vec![2100]);
        assert!(LeapRule::Gregorian.disagreements(1800..=2400).is_empty());
    }

    #[test]
    fn test_non_leap_year_is_unadjusted() {
        let mut day = date(2013, 1, 1);
        while day.year() == 2013 {
            assert_eq!(
                adjust_relative_day(day.ordinal0(), 2013, LeapRule::Mod4),
                day.ordinal0()
            );
            assert_eq!(adjusted_day_of_year(day, LeapRule::Mod4) as u32, day.ordinal());
            day = day.succ_opt().unwrap();
        }
    }

    #[test]
    fn test_march_first_aligns_across_leap_years() {
        let leap = adjust_relative_day(date(2012, 3, 1).ordinal0(), 2012, LeapRule::Mod4);
        let common = adjust_relative_day(date(2013, 3, 1).ordinal0(), 2013, LeapRule::Mod4);
        assert_eq!(leap, 59);
        assert_eq!(common, 59);
        assert_eq!(
            adjusted_day_of_year(date(2012, 3, 1), LeapRule::Mod4),
            adjusted_day_of_year(date(2013, 3, 1), LeapRule::Mod4)
        );
        assert_eq!(adjusted_day_of_year(date(2012, 12, 31), LeapRule::Mod4), 365);
        assert_eq!(adjusted_day_of_year(date(2012, 2, 28), LeapRule::Mod4), 59);
    }

    #[test]
    fn test_every_year_covers_one_to_365() {
        for year in 2009..=2019 {
            let mut seen = BTreeSet::new();
            let mut day = date(year, 1, 1);
            while day.year() == year {
                if !(day.month() == 2 && day.day() == 29) {
                    assert!(seen.insert(adjusted_day_of_year(day, LeapRule::Mod4)));
                }
                day = day.succ_opt().unwrap();
            }
            assert_eq!(seen.len(), DAYS_PER_YEAR as usize);
            assert_eq!(seen.first(), Some(&1));
            assert_eq!(seen.last(), Some(&DAYS_PER_YEAR));
        }
    }

    #[test]
    fn test_leap_rule_parsing() {
        assert_eq!("Gregorian".parse::<LeapRule>(), Ok(LeapRule::Gregorian));
        assert_eq!("mod4".parse::<LeapRule>(), Ok(LeapRule::Mod4));
        assert!("julian".parse::<LeapRule>().is_err());
        assert_eq!(LeapRule::Gregorian.to_string(), "gregorian");
    }
}
