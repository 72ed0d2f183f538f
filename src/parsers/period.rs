//! Statement periods and the month-to-year state machine.

use std::sync::OnceLock;

use regex::Regex;

/// Month number for a full or abbreviated English month name ("Sept" too).
pub fn month_number(name: &str) -> Option<u32> {
    let lower = name.trim().trim_end_matches('.').to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    const MONTHS: [&str; 12] = [
        "january", "february", "march", "april", "may", "june", "july", "august", "september",
        "october", "november", "december",
    ];
    MONTHS
        .iter()
        .position(|m| m.starts_with(&lower))
        .map(|i| i as u32 + 1)
}

fn through_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z]+)\s+\d{1,2},\s*(\d{4})\s+through\s+([A-Za-z]+)\s+\d{1,2},\s*(\d{4})")
            .expect("through period pattern")
    })
}

fn dash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([A-Za-z]{3,9})\.?\s+\d{1,2},\s*(\d{4})\s*-\s*([A-Za-z]{3,9})\.?\s+\d{1,2},\s*(\d{4})")
            .expect("dash period pattern")
    })
}

/// The months and years a statement covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementPeriod {
    pub start_month: u32,
    pub start_year: i32,
    pub end_month: u32,
    pub end_year: i32,
}

impl StatementPeriod {
    fn from_captures(caps: &regex::Captures) -> Option<Self> {
        Some(Self {
            start_month: month_number(&caps[1])?,
            start_year: caps[2].parse().ok()?,
            end_month: month_number(&caps[3])?,
            end_year: caps[4].parse().ok()?,
        })
    }

    /// "December 15, 2023 through January 16, 2024"
    pub fn find_through(text: &str) -> Option<Self> {
        through_re()
            .captures_iter(text)
            .find_map(|caps| Self::from_captures(&caps))
    }

    /// "Dec 15, 2023 - Jan 16, 2024"
    pub fn find_dash(text: &str) -> Option<Self> {
        dash_re()
            .captures_iter(text)
            .find_map(|caps| Self::from_captures(&caps))
    }

    /// Year for a bare month inside this period. The start month takes the
    /// start year and the end month the end year; any other month of a
    /// year-crossing period goes to the start year when it falls after the
    /// end month.
    pub fn year_for_month(&self, month: u32) -> i32 {
        if month == self.start_month {
            self.start_year
        } else if month == self.end_month {
            self.end_year
        } else if self.start_year == self.end_year || month > self.end_month {
            self.start_year
        } else {
            self.end_year
        }
    }
}

/// Carries `(current_year, previous_month)` through one pass over a table.
/// A decreasing month means the table crossed into the period's end year.
#[derive(Debug, Clone)]
pub struct YearTracker {
    start_year: i32,
    end_year: i32,
    start_month: Option<u32>,
    current_year: i32,
    previous_month: Option<u32>,
}

impl YearTracker {
    pub fn new(period: StatementPeriod) -> Self {
        Self {
            start_year: period.start_year,
            end_year: period.end_year,
            start_month: Some(period.start_month),
            current_year: period.start_year,
            previous_month: None,
        }
    }

    /// No period found: every month maps to `year`.
    pub fn fixed(year: i32) -> Self {
        Self {
            start_year: year,
            end_year: year,
            start_month: None,
            current_year: year,
            previous_month: None,
        }
    }

    /// Year for the next observed month, advancing state.
    pub fn observe(&mut self, month: u32) -> i32 {
        match self.previous_month {
            None => {
                // A table that opens after the rollover (e.g. a Dec-Jan period
                // whose first row is in January) starts in the end year.
                if let Some(start_month) = self.start_month {
                    if self.end_year > self.start_year && month < start_month {
                        self.current_year = self.end_year;
                    }
                }
            }
            Some(prev) => {
                if month < prev && self.current_year < self.end_year {
                    self.current_year = self.end_year;
                }
            }
        }
        self.previous_month = Some(month);
        self.current_year
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number("Dec"), Some(12));
        assert_eq!(month_number("Sept"), Some(9));
        assert_eq!(month_number("SEP."), Some(9));
        assert_eq!(month_number("Ja"), None);
        assert_eq!(month_number("Foo"), None);
    }

    #[test]
    fn test_find_through() {
        let text = "Account summary\nDecember 15, 2023 through January 16, 2024\n";
        let p = StatementPeriod::find_through(text).unwrap();
        assert_eq!(p.start_month, 12);
        assert_eq!(p.start_year, 2023);
        assert_eq!(p.end_month, 1);
        assert_eq!(p.end_year, 2024);
    }

    #[test]
    fn test_find_dash() {
        let p = StatementPeriod::find_dash("Nov 20, 2024 - Dec 19, 2024  |  30 days").unwrap();
        assert_eq!((p.start_month, p.end_month, p.end_year), (11, 12, 2024));
        assert!(StatementPeriod::find_dash("nothing here").is_none());
    }

    #[test]
    fn test_year_for_month_across_new_year() {
        let p = StatementPeriod::find_dash("Dec 10, 2023 - Jan 09, 2024").unwrap();
        assert_eq!(p.year_for_month(12), 2023);
        assert_eq!(p.year_for_month(1), 2024);
        assert_eq!(p.year_for_month(11), 2023);
    }

    #[test]
    fn test_rollover_mid_block() {
        let period = StatementPeriod::find_through("December 15, 2023 through January 16, 2024").unwrap();
        let mut years = YearTracker::new(period);
        assert_eq!(years.observe(12), 2023);
        assert_eq!(years.observe(12), 2023);
        assert_eq!(years.observe(1), 2024);
        assert_eq!(years.observe(1), 2024);
    }

    #[test]
    fn test_table_opening_after_rollover() {
        let period = StatementPeriod::find_through("December 15, 2023 through January 16, 2024").unwrap();
        let mut years = YearTracker::new(period);
        assert_eq!(years.observe(1), 2024);
    }

    #[test]
    fn test_single_year_period_never_advances() {
        let period = StatementPeriod::find_through("March 1, 2024 through March 31, 2024").unwrap();
        let mut years = YearTracker::new(period);
        assert_eq!(years.observe(3), 2024);
        assert_eq!(years.observe(2), 2024);
    }

    #[test]
    fn test_fixed_tracker() {
        let mut years = YearTracker::fixed(2022);
        assert_eq!(years.observe(12), 2022);
        assert_eq!(years.observe(1), 2022);
    }
}
