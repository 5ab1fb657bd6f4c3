//! Date window for analytics queries

use chrono::{Days, NaiveDate};

use crate::error::{Error, Result};

pub const DEFAULT_DAYS: u32 = 30;
pub const MAX_DAYS: u32 = 365;

/// The last `days` days of mail, ending today
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    days: u32,
}

impl DateWindow {
    pub fn new(days: u32) -> Result<Self> {
        if !(1..=MAX_DAYS).contains(&days) {
            return Err(Error::InvalidRequest(format!(
                "days must be between 1 and {MAX_DAYS}, got {days}"
            )));
        }
        Ok(Self { days })
    }

    /// Window from an optional query parameter
    pub fn from_param(days: Option<u32>) -> Result<Self> {
        Self::new(days.unwrap_or(DEFAULT_DAYS))
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Gmail search query for the window.
    ///
    /// Gmail's `before:` is exclusive, so it points at tomorrow to keep
    /// today's mail in the window.
    pub fn gmail_query(&self, today: NaiveDate) -> String {
        let start = today
            .checked_sub_days(Days::new(self.days as u64))
            .unwrap_or(NaiveDate::MIN);
        let end = today
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);

        format!(
            "after:{} before:{}",
            start.format("%Y/%m/%d"),
            end.format("%Y/%m/%d")
        )
    }
}

impl Default for DateWindow {
    fn default() -> Self {
        Self { days: DEFAULT_DAYS }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_window() {
        assert_eq!(DateWindow::from_param(None).unwrap().days(), 30);
        assert_eq!(DateWindow::default().days(), DEFAULT_DAYS);
    }

    #[test]
    fn test_bounds() {
        assert!(DateWindow::new(0).is_err());
        assert!(DateWindow::new(1).is_ok());
        assert!(DateWindow::new(365).is_ok());
        assert!(matches!(DateWindow::new(366), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_gmail_query() {
        let window = DateWindow::new(30).unwrap();
        assert_eq!(
            window.gmail_query(date(2024, 3, 15)),
            "after:2024/02/14 before:2024/03/16"
        );
    }

    #[test]
    fn test_gmail_query_crosses_year() {
        let window = DateWindow::new(7).unwrap();
        assert_eq!(
            window.gmail_query(date(2024, 1, 3)),
            "after:2023/12/27 before:2024/01/04"
        );
    }
}
