//! SLA deadline arithmetic.
//!
//! Business days are Monday through Friday. No holiday calendar is
//! consulted — a lab working around public holidays must pass an explicit
//! deadline at creation instead.

use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Advance `start` by `n` business days, skipping Saturday and Sunday.
///
/// The start date itself is not counted: a Monday plus 5 business days is
/// the following Monday, a Friday plus 1 is the following Monday. With
/// `n == 0` the start date is returned unchanged, even on a weekend.
pub fn add_business_days(start: NaiveDate, n: u32) -> NaiveDate {
    let mut date = start;
    for _ in 0..n {
        date += Duration::days(1);
        while is_weekend(date) {
            date += Duration::days(1);
        }
    }
    date
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn monday_plus_five_is_next_monday() {
        // 2026-08-31 is a Monday.
        assert_eq!(add_business_days(d(2026, 8, 31), 5), d(2026, 9, 7));
    }

    #[test]
    fn friday_plus_one_skips_weekend() {
        // 2026-09-04 is a Friday.
        assert_eq!(add_business_days(d(2026, 9, 4), 1), d(2026, 9, 7));
    }

    #[test]
    fn zero_days_is_identity() {
        let saturday = d(2026, 9, 5);
        assert_eq!(add_business_days(saturday, 0), saturday);
    }

    #[test]
    fn starting_on_weekend_lands_on_weekday() {
        // Saturday + 1 business day = Monday.
        assert_eq!(add_business_days(d(2026, 9, 5), 1), d(2026, 9, 7));
        // Sunday + 2 business days = Tuesday.
        assert_eq!(add_business_days(d(2026, 9, 6), 2), d(2026, 9, 8));
    }

    #[test]
    fn spans_multiple_weeks() {
        // Monday + 10 business days = Monday two weeks later.
        assert_eq!(add_business_days(d(2026, 8, 31), 10), d(2026, 9, 14));
    }

    #[test]
    fn result_is_never_a_weekend_for_positive_n() {
        let mut date = d(2026, 8, 1);
        for _ in 0..60 {
            let due = add_business_days(date, 3);
            assert!(!is_weekend(due), "{due} is a weekend");
            date += Duration::days(1);
        }
    }
}
