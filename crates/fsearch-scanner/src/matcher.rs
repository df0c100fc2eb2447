//! Per-file filter evaluation.
//!
//! The [`FileMatcher`] trait is the seam between the walker and the filter
//! logic. [`FilterMatcher`] is the production implementation: it evaluates a
//! [`ScanFilter`] against a file's name, metadata, and (when asked) contents.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use fsearch_core::{Interval, ScanFilter};
//! use fsearch_scanner::{FileMatcher, FilterMatcher};
//!
//! let matcher = FilterMatcher::new(10 * 1024 * 1024);
//! let filter = ScanFilter::new()
//!     .with_name_pattern("*.log")
//!     .with_size(Interval::at_least(1))
//!     .with_text_content("error");
//!
//! if matcher.matches(Utf8Path::new("/var/log/app.log"), &filter) {
//!     println!("found");
//! }
//! ```

use std::fs::{self, Metadata};

use camino::Utf8Path;
use chrono::{DateTime, Local};
use fsearch_core::ScanFilter;
use tracing::debug;

use crate::text::TextSearch;

/// Decides whether one file satisfies a filter.
///
/// Filters must be [`Send`] and [`Sync`] because a single matcher is shared
/// by every worker of every scan. Implementations never fail: anything that
/// prevents a decision counts as no match.
pub trait FileMatcher: Send + Sync + 'static {
    /// Returns `true` if the file at `path` satisfies every criterion present
    /// in `filter`.
    fn matches(&self, path: &Utf8Path, filter: &ScanFilter) -> bool;
}

/// Evaluates a [`ScanFilter`] against files on disk.
///
/// Criteria are checked cheapest first: the name needs no I/O, size and
/// modification time need one `stat`, and content search reads the file.
/// Metadata follows symlinks, so a link to a regular file is judged by its
/// target.
#[derive(Debug, Clone, Copy)]
pub struct FilterMatcher {
    text: TextSearch,
}

impl FilterMatcher {
    /// Creates a matcher that streams files larger than `stream_threshold`
    /// bytes during text search.
    #[must_use]
    pub const fn new(stream_threshold: u64) -> Self {
        Self {
            text: TextSearch::new(stream_threshold),
        }
    }

    fn matches_metadata(&self, path: &Utf8Path, filter: &ScanFilter, metadata: &Metadata) -> bool {
        let size = metadata.len();
        if filter
            .size_interval
            .as_ref()
            .is_some_and(|bounds| !bounds.contains(&size))
        {
            return false;
        }

        if filter.last_modified_date_interval.is_some()
            || filter.last_modified_time_interval.is_some()
        {
            let modified = match metadata.modified() {
                Ok(time) => DateTime::<Local>::from(time),
                Err(err) => {
                    debug!(path = %path, error = %err, "No modification time available");
                    return false;
                }
            };

            let date = modified.date_naive();
            let time = modified.time();
            let date_ok = filter
                .last_modified_date_interval
                .as_ref()
                .is_none_or(|bounds| bounds.contains(&date));
            let time_ok = filter
                .last_modified_time_interval
                .as_ref()
                .is_none_or(|bounds| bounds.contains(&time));
            if !(date_ok && time_ok) {
                return false;
            }
        }

        filter
            .text_content_pattern
            .as_ref()
            .is_none_or(|pattern| self.text.contains(path, size, pattern.needle()))
    }
}

impl FileMatcher for FilterMatcher {
    fn matches(&self, path: &Utf8Path, filter: &ScanFilter) -> bool {
        if let Some(pattern) = &filter.name_pattern {
            let Some(name) = path.file_name() else {
                return false;
            };
            if !pattern.matches(name) {
                return false;
            }
        }

        let needs_metadata = filter.size_interval.is_some()
            || filter.last_modified_date_interval.is_some()
            || filter.last_modified_time_interval.is_some()
            || filter.text_content_pattern.is_some();
        if !needs_metadata {
            return true;
        }

        match fs::metadata(path) {
            Ok(metadata) => self.matches_metadata(path, filter, &metadata),
            Err(err) => {
                debug!(path = %path, error = %err, "Cannot stat file");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use fsearch_core::Interval;

    use super::*;

    fn fixture(name: &str, contents: &[u8]) -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).unwrap();
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    fn modified_at(path: &Utf8Path) -> DateTime<Local> {
        DateTime::<Local>::from(fs::metadata(path).unwrap().modified().unwrap())
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let (_dir, path) = fixture("anything.bin", b"");
        assert!(FilterMatcher::new(1024).matches(&path, &ScanFilter::new()));
    }

    #[test]
    fn test_name_is_matched_against_base_name() {
        let (_dir, path) = fixture("a.txt", b"Hello world");
        let matcher = FilterMatcher::new(1024);

        assert!(matcher.matches(&path, &ScanFilter::new().with_name_pattern("*.txt")));
        assert!(matcher.matches(&path, &ScanFilter::new().with_name_pattern("a.*")));
        assert!(!matcher.matches(&path, &ScanFilter::new().with_name_pattern("*.log")));

        // The directory part never takes part in matching.
        let parent = path.parent().unwrap().file_name().unwrap().to_owned();
        assert!(!matcher.matches(&path, &ScanFilter::new().with_name_pattern(format!("{parent}*"))));
    }

    #[test]
    fn test_size_bounds_are_inclusive() {
        let matcher = FilterMatcher::new(1024);
        let filter = ScanFilter::new().with_size(Interval::new(Some(5), Some(20)));

        let (_a, ten) = fixture("ten.txt", b"0123456789");
        let (_b, four) = fixture("four.txt", b"0123");
        let (_c, five) = fixture("five.txt", b"01234");
        let (_d, twenty) = fixture("twenty.txt", &[b'x'; 20]);
        let (_e, twenty_one) = fixture("twenty_one.txt", &[b'x'; 21]);

        assert!(matcher.matches(&ten, &filter));
        assert!(!matcher.matches(&four, &filter));
        assert!(matcher.matches(&five, &filter));
        assert!(matcher.matches(&twenty, &filter));
        assert!(!matcher.matches(&twenty_one, &filter));
    }

    #[test]
    fn test_modified_date_bounds() {
        let (_dir, path) = fixture("a.txt", b"x");
        let date = modified_at(&path).date_naive();
        let matcher = FilterMatcher::new(1024);

        let exact = ScanFilter::new().with_modified_date(Interval::new(Some(date), Some(date)));
        assert!(matcher.matches(&path, &exact));

        let tomorrow = date.succ_opt().unwrap();
        let future = ScanFilter::new().with_modified_date(Interval::at_least(tomorrow));
        assert!(!matcher.matches(&path, &future));

        let yesterday = date.pred_opt().unwrap();
        let past = ScanFilter::new().with_modified_date(Interval::at_most(yesterday));
        assert!(!matcher.matches(&path, &past));
    }

    #[test]
    fn test_modified_time_bounds() {
        let (_dir, path) = fixture("a.txt", b"x");
        let time = modified_at(&path).time();
        let matcher = FilterMatcher::new(1024);

        let exact = ScanFilter::new().with_modified_time(Interval::new(Some(time), Some(time)));
        assert!(matcher.matches(&path, &exact));

        let later = time.overflowing_add_signed(chrono::TimeDelta::seconds(1)).0;
        if later > time {
            let after = ScanFilter::new().with_modified_time(Interval::at_least(later));
            assert!(!matcher.matches(&path, &after));
        }
    }

    #[test]
    fn test_text_content() {
        let (_dir, path) = fixture("a.txt", b"Hello world");
        let matcher = FilterMatcher::new(1024);

        let hit = ScanFilter::new().with_name_pattern("*.txt").with_text_content("HELLO");
        let miss = ScanFilter::new().with_name_pattern("*.txt").with_text_content("bye");
        assert!(matcher.matches(&path, &hit));
        assert!(!matcher.matches(&path, &miss));
    }

    #[test]
    fn test_adding_criteria_only_narrows() {
        let (_dir, path) = fixture("a.txt", b"Hello world");
        let matcher = FilterMatcher::new(1024);

        let base = ScanFilter::new().with_name_pattern("*.txt");
        let sized = base.clone().with_size(Interval::at_most(4));
        let texted = base.clone().with_text_content("hello");

        assert!(matcher.matches(&path, &base));
        assert!(!matcher.matches(&path, &sized));
        assert!(matcher.matches(&path, &texted));
        assert!(!matcher.matches(&path, &sized.with_text_content("hello")));
    }

    #[test]
    fn test_missing_file_never_matches_metadata_criteria() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("gone.txt")).unwrap();
        let filter = ScanFilter::new().with_size(Interval::at_least(0));
        assert!(!FilterMatcher::new(1024).matches(&path, &filter));
    }

    #[test]
    fn test_recently_written_file_is_within_today() {
        let (_dir, path) = fixture("a.txt", b"x");
        let now = Local::now();
        let window = Interval::new(
            Some((now - chrono::TimeDelta::days(2)).date_naive()),
            Some((now + chrono::TimeDelta::days(1)).date_naive()),
        );
        assert!(FilterMatcher::new(0).matches(&path, &ScanFilter::new().with_modified_date(window)));
    }
}
