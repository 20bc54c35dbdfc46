use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("history window is empty: start {start} is not before end {end}")]
    Empty {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("history window must cover at least one day")]
    ZeroDays,
    #[error("history window of {days} days reaches past the earliest representable date")]
    TooLarge { days: u32 },
}

/// Closed-open time range `[start, end)` of history to reconcile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl HistoryWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, WindowError> {
        if start >= end {
            return Err(WindowError::Empty { start, end });
        }
        Ok(Self { start, end })
    }

    /// The `days` days leading up to `end`.
    pub fn trailing_days(end: DateTime<Utc>, days: u32) -> Result<Self, WindowError> {
        if days == 0 {
            return Err(WindowError::ZeroDays);
        }
        let start = Duration::try_days(i64::from(days))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(WindowError::TooLarge { days })?;
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn test_trailing_days() {
        let end = at(10 * 86_400);
        let window = HistoryWindow::trailing_days(end, 7).unwrap();
        assert_eq!(window.start(), at(3 * 86_400));
        assert_eq!(window.end(), end);
    }

    #[test]
    fn test_window_is_closed_open() {
        let window = HistoryWindow::new(at(100), at(200)).unwrap();
        assert!(window.contains(at(100)));
        assert!(window.contains(at(199)));
        assert!(!window.contains(at(200)));
        assert!(!window.contains(at(99)));
    }

    #[test]
    fn test_rejects_empty_window() {
        assert!(matches!(
            HistoryWindow::new(at(200), at(200)),
            Err(WindowError::Empty { .. })
        ));
        assert_eq!(HistoryWindow::trailing_days(at(200), 0), Err(WindowError::ZeroDays));
    }

    #[test]
    fn test_huge_day_count_is_an_error() {
        assert_eq!(
            HistoryWindow::trailing_days(Utc::now(), 4_000_000_000),
            Err(WindowError::TooLarge { days: 4_000_000_000 })
        );
    }
}
