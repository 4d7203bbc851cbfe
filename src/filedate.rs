//! Filename date extraction
//!
//! Many camera/phone videos carry their capture date in the filename
//! (`clip_20230715_party.mov`). The pipeline uses that date, at midnight
//! local time, as the authoritative timestamp for the converted file. Pure
//! string-in/date-out so it is testable without any filesystem.

use chrono::{Local, NaiveDate, NaiveDateTime, TimeZone};
use filetime::FileTime;

/// Scan `stem` for the first window of eight consecutive ASCII digits and
/// parse it as a `YYYYMMDD` calendar date at midnight.
///
/// Only the first window is considered; if it is not a valid date the whole
/// lookup gives up rather than hunting for a later run.
pub fn date_from_filename(stem: &str) -> Option<NaiveDateTime> {
    let window = first_digit_window(stem, 8)?;
    let date = NaiveDate::parse_from_str(window, "%Y%m%d").ok()?;
    date.and_hms_opt(0, 0, 0)
}

/// Interpret a naive timestamp in the local timezone and convert it to a
/// `FileTime` for `filetime::set_file_times`.
pub fn to_file_time(ts: NaiveDateTime) -> Option<FileTime> {
    let local = Local.from_local_datetime(&ts).earliest()?;
    Some(FileTime::from_unix_time(local.timestamp(), 0))
}

fn first_digit_window(s: &str, len: usize) -> Option<&str> {
    let bytes = s.as_bytes();
    let mut run_start = 0;
    let mut run_len = 0;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            if run_len == 0 {
                run_start = i;
            }
            run_len += 1;
            if run_len == len {
                return Some(&s[run_start..run_start + len]);
            }
        } else {
            run_len = 0;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    #[test]
    fn test_plain_date_in_name() {
        let ts = date_from_filename("video_20220101").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2022, 1, 1));
        assert_eq!((ts.hour(), ts.minute(), ts.second()), (0, 0, 0));
    }

    #[test]
    fn test_date_embedded_between_words() {
        let ts = date_from_filename("clip_20230715_party").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 7, 15));
    }

    #[test]
    fn test_no_digit_run() {
        assert!(date_from_filename("clip").is_none());
        assert!(date_from_filename("IMG_1234").is_none());
        assert!(date_from_filename("").is_none());
    }

    #[test]
    fn test_longer_run_uses_first_eight_digits() {
        // 2021-03-04 followed by a stray trailing digit
        let ts = date_from_filename("dashcam_202103045").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2021, 3, 4));
    }

    #[test]
    fn test_invalid_calendar_date_gives_up() {
        // First window is 99999999; no fallback to later windows.
        assert!(date_from_filename("x_99999999_20220101").is_none());
        assert!(date_from_filename("take_20221301").is_none()); // month 13
        assert!(date_from_filename("take_20220230").is_none()); // Feb 30
    }

    #[test]
    fn test_split_runs_do_not_combine() {
        // 1234 + 5678 separated by '-' never form one window
        assert!(date_from_filename("a1234-5678b").is_none());
    }

    #[test]
    fn test_to_file_time_is_midnight_local() {
        let ts = date_from_filename("video_20220101").unwrap();
        let ft = to_file_time(ts).unwrap();
        let expected = Local
            .with_ymd_and_hms(2022, 1, 1, 0, 0, 0)
            .earliest()
            .unwrap()
            .timestamp();
        assert_eq!(ft.unix_seconds(), expected);
    }

    proptest! {
        #[test]
        fn prop_names_without_eight_digit_runs_yield_none(s in "[a-zA-Z_\\-]{0,20}") {
            prop_assert!(date_from_filename(&s).is_none());
        }

        #[test]
        fn prop_valid_dates_round_trip(y in 1970u32..2100, m in 1u32..=12, d in 1u32..=28) {
            let name = format!("vid_{:04}{:02}{:02}_x", y, m, d);
            let ts = date_from_filename(&name).unwrap();
            prop_assert_eq!((ts.year() as u32, ts.month(), ts.day()), (y, m, d));
            prop_assert_eq!((ts.hour(), ts.minute(), ts.second()), (0, 0, 0));
        }
    }
}
