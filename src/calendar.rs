use chrono::{Datelike, Days, NaiveDate, Weekday};

/// Labels for one festival day on the poster: an upper-cased weekday
/// abbreviation and a `"{MON} {dd}"` date string.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DayDate {
    pub weekday: String,
    pub date: String,
}

/// Calendar labels for a festival starting on `reference`, one per day.
///
/// Day `i` (0-indexed) maps to `reference + i` days. The reference date is an
/// explicit parameter so posters are deterministic under test; callers that
/// want the "starting today" behavior pass the current local date.
pub fn festival_dates(reference: NaiveDate, days: u32) -> Vec<DayDate> {
    (0..days)
        .map(|i| {
            let date = reference
                .checked_add_days(Days::new(u64::from(i)))
                .unwrap_or(reference);
            DayDate {
                weekday: weekday_abbrev(date.weekday()).to_string(),
                date: format!("{} {:02}", month_abbrev(date.month0()), date.day()),
            }
        })
        .collect()
}

fn weekday_abbrev(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Sun => "SUN",
        Weekday::Mon => "MON",
        Weekday::Tue => "TUE",
        Weekday::Wed => "WED",
        Weekday::Thu => "THU",
        Weekday::Fri => "FRI",
        Weekday::Sat => "SAT",
    }
}

fn month_abbrev(month0: u32) -> &'static str {
    const MONTHS: [&str; 12] = [
        "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
    ];
    MONTHS[(month0 as usize).min(11)]
}
