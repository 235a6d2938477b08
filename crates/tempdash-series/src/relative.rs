//! Human "time since" strings ("3 minutes ago", "about 2 hours ago").

use chrono::{Datelike, NaiveDateTime};

const MINUTES_IN_DAY: i64 = 1440;
const MINUTES_IN_ALMOST_TWO_DAYS: i64 = 2520;
const MINUTES_IN_MONTH: i64 = 43200;
const MINUTES_IN_TWO_MONTHS: i64 = 86400;

fn plural(count: i64, one: &str, other: &str) -> String {
    if count == 1 {
        one.to_string()
    } else {
        other.replace("{}", &count.to_string())
    }
}

fn round_div(value: i64, divisor: i64) -> i64 {
    (value as f64 / divisor as f64).round() as i64
}

/// Whole calendar months from `earlier` to `later`
fn month_difference(earlier: NaiveDateTime, later: NaiveDateTime) -> i64 {
    let mut months = i64::from(later.year() - earlier.year()) * 12
        + i64::from(later.month()) - i64::from(earlier.month());
    if (later.day(), later.time()) < (earlier.day(), earlier.time()) {
        months -= 1;
    }
    months.max(0)
}

fn distance_words(earlier: NaiveDateTime, later: NaiveDateTime) -> String {
    let seconds = (later - earlier).num_seconds();
    let minutes = round_div(seconds, 60);

    if minutes < 2 {
        return match seconds {
            s if s < 5 => "less than 5 seconds".to_string(),
            s if s < 10 => "less than 10 seconds".to_string(),
            s if s < 20 => "less than 20 seconds".to_string(),
            s if s < 40 => "half a minute".to_string(),
            s if s < 60 => "less than a minute".to_string(),
            _ => "1 minute".to_string(),
        };
    }
    if minutes < 45 {
        return format!("{} minutes", minutes);
    }
    if minutes < 90 {
        return "about 1 hour".to_string();
    }
    if minutes < MINUTES_IN_DAY {
        return plural(round_div(minutes, 60), "about 1 hour", "about {} hours");
    }
    if minutes < MINUTES_IN_ALMOST_TWO_DAYS {
        return "1 day".to_string();
    }
    if minutes < MINUTES_IN_MONTH {
        return plural(round_div(minutes, MINUTES_IN_DAY), "1 day", "{} days");
    }
    if minutes < MINUTES_IN_TWO_MONTHS {
        return plural(round_div(minutes, MINUTES_IN_MONTH), "about 1 month", "about {} months");
    }

    let months = month_difference(earlier, later);
    if months < 12 {
        return plural(round_div(minutes, MINUTES_IN_MONTH), "1 month", "{} months");
    }

    let years = months / 12;
    match months % 12 {
        r if r < 3 => plural(years, "about 1 year", "about {} years"),
        r if r < 9 => plural(years, "over 1 year", "over {} years"),
        _ => plural(years + 1, "almost 1 year", "almost {} years"),
    }
}

/// Distance between `then` and `now` in words, with an "ago"/"in" suffix.
pub fn format_distance(then: NaiveDateTime, now: NaiveDateTime) -> String {
    if then > now {
        format!("in {}", distance_words(now, then))
    } else {
        format!("{} ago", distance_words(then, now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .and_then(|d| d.and_hms_opt(14, 0, 0))
            .unwrap()
    }

    fn ago(d: Duration) -> String {
        format_distance(now() - d, now())
    }

    #[test]
    fn test_seconds_buckets() {
        assert_eq!(ago(Duration::seconds(0)), "less than 5 seconds ago");
        assert_eq!(ago(Duration::seconds(7)), "less than 10 seconds ago");
        assert_eq!(ago(Duration::seconds(15)), "less than 20 seconds ago");
        assert_eq!(ago(Duration::seconds(30)), "half a minute ago");
        assert_eq!(ago(Duration::seconds(50)), "less than a minute ago");
        assert_eq!(ago(Duration::seconds(75)), "1 minute ago");
    }

    #[test]
    fn test_minutes_and_hours() {
        assert_eq!(ago(Duration::minutes(3)), "3 minutes ago");
        assert_eq!(ago(Duration::minutes(44)), "44 minutes ago");
        assert_eq!(ago(Duration::minutes(60)), "about 1 hour ago");
        assert_eq!(ago(Duration::hours(2)), "about 2 hours ago");
        assert_eq!(ago(Duration::hours(23)), "about 23 hours ago");
    }

    #[test]
    fn test_days_and_months() {
        assert_eq!(ago(Duration::hours(30)), "1 day ago");
        assert_eq!(ago(Duration::days(5)), "5 days ago");
        assert_eq!(ago(Duration::days(40)), "about 1 month ago");
        assert_eq!(ago(Duration::days(150)), "5 months ago");
    }

    #[test]
    fn test_years() {
        let then = NaiveDate::from_ymd_opt(2023, 1, 10)
            .and_then(|d| d.and_hms_opt(14, 0, 0))
            .unwrap();
        assert_eq!(format_distance(then, now()), "about 1 year ago");

        let then = NaiveDate::from_ymd_opt(2022, 9, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(format_distance(then, now()), "over 1 year ago");

        let then = NaiveDate::from_ymd_opt(2022, 4, 20)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap();
        assert_eq!(format_distance(then, now()), "almost 2 years ago");
    }

    #[test]
    fn test_future_uses_in_prefix() {
        assert_eq!(format_distance(now() + Duration::minutes(5), now()), "in 5 minutes");
    }
}
