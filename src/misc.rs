use std::sync::OnceLock;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::error::{Kind, LedgerError};

/// Converts a `NaiveDate` to a `NaiveDateTime` at midnight (00:00:00).
pub fn to_datetime(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(0, 0, 0).unwrap()
}

static TODAY: OnceLock<NaiveDate> = OnceLock::new();
pub fn today() -> NaiveDate {
    *TODAY.get_or_init(|| Utc::now().date_naive())
}

/// Parses a date of the form `YYYY[-/.]MM[-/.]DD`, normalizing any of the
/// three accepted separators.
pub fn parse_date(raw: &str) -> Result<NaiveDate, LedgerError> {
    let normalized: String = raw.chars().map(|c| if c == '/' || c == '.' { '-' } else { c }).collect();
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .map_err(|e| LedgerError::with_source(Kind::BadDate, format!("`{raw}`"), e))
}

/// A date range checker.
#[derive(Debug)]
pub enum BetweenDate {
    FromTo(NaiveDate, NaiveDate),
    From(NaiveDate),
    To(NaiveDate),
    Always,
}

impl BetweenDate {
    /// Creates a `BetweenDate` from optional `from` and `to` dates.
    ///
    /// # Arguments
    ///
    /// * `from` - Optional start date
    /// * `to` - Optional end date
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use ledger::misc::BetweenDate;
    ///
    /// let from = Some(NaiveDate::from_ymd_opt(2025,1,1).unwrap());
    /// let to   = Some(NaiveDate::from_ymd_opt(2025,12,31).unwrap());
    /// let between = BetweenDate::new(from, to);
    ///
    /// let date = NaiveDate::from_ymd_opt(2025,6,15).unwrap();
    /// assert!(between.check(date));
    /// ```
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        match (from, to) {
            (Some(f), Some(t)) => BetweenDate::FromTo(f, t),
            (Some(f), None) => BetweenDate::From(f),
            (None, Some(t)) => BetweenDate::To(t),
            (None, None) => BetweenDate::Always,
        }
    }

    /// Returns true if `d` is within the range.
    pub fn check(&self, d: NaiveDate) -> bool {
        match self {
            BetweenDate::FromTo(from, to) => d >= *from && d <= *to,
            BetweenDate::From(from) => d >= *from,
            BetweenDate::To(to) => d <= *to,
            BetweenDate::Always => true,
        }
    }

    /// Like [`check`](Self::check), but pads both ends by one hour the way
    /// `--from`/`--to` do, so the boundary day is included regardless of
    /// time-of-day components on either side.
    pub fn check_padded(&self, d: NaiveDate) -> bool {
        let dt = to_datetime(d);
        match self {
            BetweenDate::FromTo(from, to) => {
                dt >= to_datetime(*from) - Duration::hours(1) && dt <= to_datetime(*to) + Duration::hours(1)
            }
            BetweenDate::From(from) => dt >= to_datetime(*from) - Duration::hours(1),
            BetweenDate::To(to) => dt <= to_datetime(*to) + Duration::hours(1),
            BetweenDate::Always => true,
        }
    }
}

/// The first and last day of the calendar month containing `d`.
pub fn month_bounds(d: NaiveDate) -> (NaiveDate, NaiveDate) {
    let first = NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap();
    let last = if d.month() == 12 {
        NaiveDate::from_ymd_opt(d.year() + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(d.year(), d.month() + 1, 1).unwrap()
    } - Duration::days(1);
    (first, last)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_three_separators() {
        let a = parse_date("2024-01-02").unwrap();
        let b = parse_date("2024/01/02").unwrap();
        let c = parse_date("2024.01.02").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn month_bounds_handles_december() {
        let d = NaiveDate::from_ymd_opt(2024, 12, 15).unwrap();
        let (first, last) = month_bounds(d);
        assert_eq!(first, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(last, NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }
}
