use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::LazyLock;

/// `strftime` pattern of a photo file stem.
///
/// Lexicographic order of names in this format equals chronological order.
pub const PHOTO_STEM_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Extension used for newly saved photos.
pub const PHOTO_EXTENSION: &str = "jpg";

/// Extensions recognised as photos when scanning a directory.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

static PHOTO_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{4}-\d{2}-\d{2}_\d{2}-\d{2}-\d{2})\.([A-Za-z]+)$")
        .expect("Invalid photo name regex")
});

/// One saved daily photo, identified by its file name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhotoRecord {
    pub file_name: String,
    pub taken_at: NaiveDateTime,
}

impl PhotoRecord {
    /// Record for a photo taken at `taken_at`.
    pub fn new(taken_at: NaiveDateTime) -> Self {
        Self {
            file_name: format!("{}.{}", taken_at.format(PHOTO_STEM_FORMAT), PHOTO_EXTENSION),
            taken_at,
        }
    }

    /// Parse a `YYYY-MM-DD_HH-MM-SS.<ext>` file name.
    pub fn parse(file_name: &str) -> Option<Self> {
        let captures = PHOTO_NAME_PATTERN.captures(file_name)?;
        if !is_image_file_name(file_name) {
            return None;
        }
        let taken_at = NaiveDateTime::parse_from_str(&captures[1], PHOTO_STEM_FORMAT).ok()?;

        Some(Self {
            file_name: file_name.to_string(),
            taken_at,
        })
    }

    pub fn date(&self) -> NaiveDate {
        self.taken_at.date()
    }
}

/// Whether `file_name` has one of the [`IMAGE_EXTENSIONS`] (case-insensitive).
pub fn is_image_file_name(file_name: &str) -> bool {
    file_name
        .rsplit_once('.')
        .map(|(stem, ext)| {
            !stem.is_empty()
                && IMAGE_EXTENSIONS
                    .iter()
                    .any(|candidate| ext.eq_ignore_ascii_case(candidate))
        })
        .unwrap_or(false)
}

/// File-name prefix shared by every photo taken on `date`.
pub fn day_prefix(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    #[test]
    fn test_new_record_name() {
        let record = PhotoRecord::new(at(2024, 3, 7, 9, 5, 1));
        assert_eq!(record.file_name, "2024-03-07_09-05-01.jpg");
    }

    #[test]
    fn test_parse_round_trips_time() {
        let taken = at(2023, 12, 31, 23, 59, 58);
        let record = PhotoRecord::new(taken);

        let parsed = PhotoRecord::parse(&record.file_name).unwrap();
        assert_eq!(parsed.taken_at, taken);
        assert_eq!(parsed.date(), taken.date());
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        assert!(PhotoRecord::parse("timelapse_20240101_120000.mp4").is_none());
        assert!(PhotoRecord::parse("holiday.jpg").is_none());
        assert!(PhotoRecord::parse("2024-13-01_00-00-00.jpg").is_none());
        assert!(PhotoRecord::parse("2024-01-01_00-00-00.txt").is_none());
    }

    #[test]
    fn test_lexicographic_order_is_chronological() {
        let mut names: Vec<String> = [
            at(2024, 1, 10, 8, 0, 0),
            at(2023, 12, 31, 23, 0, 0),
            at(2024, 1, 2, 7, 30, 0),
            at(2024, 1, 2, 7, 29, 59),
        ]
        .into_iter()
        .map(|t| PhotoRecord::new(t).file_name)
        .collect();
        names.sort();

        let times: Vec<NaiveDateTime> = names
            .iter()
            .map(|name| PhotoRecord::parse(name).unwrap().taken_at)
            .collect();
        let mut sorted_times = times.clone();
        sorted_times.sort();
        assert_eq!(times, sorted_times);
    }

    #[test]
    fn test_is_image_file_name() {
        assert!(is_image_file_name("a.jpg"));
        assert!(is_image_file_name("a.PNG"));
        assert!(is_image_file_name("a.jpeg"));
        assert!(!is_image_file_name("a.mp4"));
        assert!(!is_image_file_name(".jpg"));
        assert!(!is_image_file_name("jpg"));
    }

    #[test]
    fn test_day_prefix() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 9).unwrap();
        assert_eq!(day_prefix(date), "2024-05-09");
        assert!(PhotoRecord::new(at(2024, 5, 9, 12, 0, 0))
            .file_name
            .starts_with(&day_prefix(date)));
    }
}
