use chrono::{Datelike, NaiveDate};

/// Completed years between `date_of_birth` and `today`.
///
/// Returns `None` when the birth date lies in the future.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Option<u32> {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    #[test]
    fn anniversary_counts_the_full_year() {
        assert_eq!(age_on(date(1994, 6, 15), date(2024, 6, 15)), Some(30));
    }

    #[test]
    fn day_before_anniversary_is_one_year_short() {
        assert_eq!(age_on(date(1994, 6, 16), date(2024, 6, 15)), Some(29));
        assert_eq!(age_on(date(1994, 7, 1), date(2024, 6, 15)), Some(29));
    }

    #[test]
    fn leap_day_birthdays_roll_over_after_february() {
        assert_eq!(age_on(date(2000, 2, 29), date(2023, 2, 28)), Some(22));
        assert_eq!(age_on(date(2000, 2, 29), date(2023, 3, 1)), Some(23));
    }

    #[test]
    fn future_birth_dates_have_no_age() {
        assert_eq!(age_on(date(2030, 1, 1), date(2024, 6, 15)), None);
        assert_eq!(age_on(date(2024, 6, 15), date(2024, 6, 15)), Some(0));
    }
}
