use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

/// Storage format for dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Storage format for times of day.
pub const TIME_FORMAT: &str = "%H:%M";
/// Date and time as entered by tutors and compared in SQL.
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Current wall-clock time at a fixed offset from UTC.
pub fn local_now(utc_offset_hours: i32) -> NaiveDateTime {
    Utc::now().naive_utc() + Duration::hours(i64::from(utc_offset_hours))
}

pub fn today(utc_offset_hours: i32) -> NaiveDate {
    local_now(utc_offset_hours).date()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_date_time(dt: NaiveDateTime) -> String {
    dt.format(DATE_TIME_FORMAT).to_string()
}

/// `2024-03-15`, `15:30` -> `Fri 15.03.2024 15:30`. Falls back to the raw
/// values when the stored strings do not parse.
pub fn format_lesson_time(date: &str, time: &str) -> String {
    match (
        NaiveDate::parse_from_str(date, DATE_FORMAT),
        NaiveTime::parse_from_str(time, TIME_FORMAT),
    ) {
        (Ok(d), Ok(t)) => format!("{} {}", d.format("%a %d.%m.%Y"), t.format(TIME_FORMAT)),
        _ => format!("{date} {time}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_lesson_time_for_humans() {
        assert_eq!(format_lesson_time("2024-03-15", "15:30"), "Fri 15.03.2024 15:30");
    }

    #[test]
    fn keeps_unparseable_values() {
        assert_eq!(format_lesson_time("soon", "later"), "soon later");
    }

    #[test]
    fn local_now_applies_offset() {
        let utc = Utc::now().naive_utc();
        let msk = local_now(3);
        let diff = (msk - utc).num_minutes();
        assert!((179..=181).contains(&diff));
    }
}
