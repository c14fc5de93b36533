use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::grid::GridError;

/// The month being displayed. `month` is 0-based (0 = January).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CalendarMonth {
    pub year: i32,
    pub month: u32,
}

impl CalendarMonth {
    pub fn new(year: i32, month: u32) -> Result<Self, GridError> {
        let candidate = Self { year, month };
        candidate.first_day()?;
        Ok(candidate)
    }

    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month0(),
        }
    }

    pub fn current() -> Self {
        Self::containing(Local::now().date_naive())
    }

    /// Years saturate at the `i32` bounds, where [`first_day`](Self::first_day) reports the month as unrepresentable.
    pub fn next(&self) -> Self {
        if self.month >= 11 {
            Self { year: self.year.saturating_add(1), month: 0 }
        } else {
            Self { year: self.year, month: self.month + 1 }
        }
    }

    pub fn previous(&self) -> Self {
        if self.month == 0 {
            Self { year: self.year.saturating_sub(1), month: 11 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    pub fn first_day(&self) -> Result<NaiveDate, GridError> {
        if self.month > 11 {
            return Err(GridError::InvalidArgument(format!(
                "month index {} is outside 0..=11",
                self.month
            )));
        }
        NaiveDate::from_ymd_opt(self.year, self.month + 1, 1).ok_or_else(|| {
            GridError::InvalidArgument(format!("year {} cannot be represented", self.year))
        })
    }

    pub fn last_day(&self) -> Result<NaiveDate, GridError> {
        let first = self.first_day()?;
        let days = self.days_in_month()?;
        first
            .checked_add_days(chrono::Days::new(u64::from(days) - 1))
            .ok_or_else(|| {
                GridError::InvalidArgument(format!("year {} cannot be represented", self.year))
            })
    }

    pub fn days_in_month(&self) -> Result<u32, GridError> {
        let first = self.first_day()?;
        let next_first = self.next().first_day().ok();
        match next_first {
            Some(next) => Ok((next - first).num_days() as u32),
            // December of the last representable year
            None => Ok(31),
        }
    }

    pub fn date_range(&self) -> Result<(NaiveDate, NaiveDate), GridError> {
        Ok((self.first_day()?, self.last_day()?))
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month0() == self.month
    }

    pub fn label(&self) -> String {
        self.first_day()
            .map(|d| d.format("%B %Y").to_string())
            .unwrap_or_else(|_| format!("{}-{:02}", self.year, self.month + 1))
    }
}

impl std::fmt::Display for CalendarMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}/{:02}", self.year, self.month + 1)
    }
}

/// Parses the human form `YYYY/MM` or `YYYY-MM` with a 1-based month.
impl std::str::FromStr for CalendarMonth {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GridError::InvalidArgument(format!("'{}' is not YYYY/MM", s));
        let (year, month) = s
            .trim()
            .split_once(['/', '-'])
            .ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }
        Self::new(year, month - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn december_rolls_over_to_january() {
        let december = CalendarMonth::new(2025, 11).unwrap();

        assert_eq!(december.next(), CalendarMonth { year: 2026, month: 0 });
    }

    #[test]
    fn navigation_at_year_bounds_does_not_overflow() {
        let last = CalendarMonth { year: i32::MAX, month: 11 };
        let first = CalendarMonth { year: i32::MIN, month: 0 };

        assert_eq!(last.next(), CalendarMonth { year: i32::MAX, month: 0 });
        assert_eq!(first.previous(), CalendarMonth { year: i32::MIN, month: 11 });
        assert!(last.next().first_day().is_err());
    }

    #[test]
    fn january_rolls_back_to_december() {
        let january = CalendarMonth::new(2026, 0).unwrap();

        assert_eq!(january.previous(), CalendarMonth { year: 2025, month: 11 });
    }

    #[test]
    fn new_rejects_month_twelve() {
        assert!(matches!(CalendarMonth::new(2025, 12), Err(GridError::InvalidArgument(_))));
    }

    #[test]
    fn containing_uses_zero_based_month() {
        let month = CalendarMonth::containing(date(2025, 11, 21));

        assert_eq!(month, CalendarMonth { year: 2025, month: 10 });
    }

    #[test]
    fn days_in_february() {
        assert_eq!(CalendarMonth::new(2024, 1).unwrap().days_in_month().unwrap(), 29);
        assert_eq!(CalendarMonth::new(2025, 1).unwrap().days_in_month().unwrap(), 28);
        assert_eq!(CalendarMonth::new(2025, 11).unwrap().days_in_month().unwrap(), 31);
    }

    #[test]
    fn date_range_spans_whole_month() {
        let (first, last) = CalendarMonth::new(2025, 10).unwrap().date_range().unwrap();

        assert_eq!(first, date(2025, 11, 1));
        assert_eq!(last, date(2025, 11, 30));
    }

    #[test]
    fn parses_human_month() {
        assert_eq!("2025/11".parse::<CalendarMonth>().unwrap(), CalendarMonth { year: 2025, month: 10 });
        assert_eq!("2025-01".parse::<CalendarMonth>().unwrap(), CalendarMonth { year: 2025, month: 0 });
        assert!("2025/13".parse::<CalendarMonth>().is_err());
        assert!("november".parse::<CalendarMonth>().is_err());
    }

    #[test]
    fn display_is_one_based() {
        assert_eq!(CalendarMonth { year: 2025, month: 10 }.to_string(), "2025/11");
        assert_eq!(CalendarMonth { year: 2025, month: 10 }.label(), "November 2025");
    }

    #[test]
    fn contains_checks_year_and_month() {
        let november = CalendarMonth { year: 2025, month: 10 };

        assert!(november.contains(date(2025, 11, 30)));
        assert!(!november.contains(date(2025, 12, 1)));
        assert!(!november.contains(date(2024, 11, 1)));
    }
}
