//! Composite scan filter types.
//!
//! A [`ScanFilter`] is the logical AND of up to five optional criteria. The
//! pattern newtypes ([`NamePattern`], [`TextPattern`]) do their preprocessing
//! once at construction so per-file evaluation stays cheap.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// File extensions whose contents may be searched for text.
pub const TEXT_FILE_EXTENSIONS: &[&str] = &[
    "txt",
    "log",
    "csv",
    "json",
    "xml",
    "md",
    "html",
    "css",
    "js",
    "yaml",
    "properties",
    "sql",
    "tsv",
    "ini",
    "sh",
    "bat",
    "py",
    "java",
    "kt",
    "php",
    "rb",
];

/// Returns `true` if `name` ends with a recognized text-file extension.
///
/// The comparison is case-insensitive. Works for both concrete file names and
/// name patterns such as `*.txt`.
///
/// # Examples
///
/// ```
/// use fsearch_core::is_text_file_name;
///
/// assert!(is_text_file_name("notes.TXT"));
/// assert!(is_text_file_name("*.json"));
/// assert!(!is_text_file_name("*.bin"));
/// assert!(!is_text_file_name("txt"));
/// ```
#[must_use]
pub fn is_text_file_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    TEXT_FILE_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// An inclusive interval with optional bounds.
///
/// An absent bound is unbounded on that side.
///
/// # Examples
///
/// ```
/// use fsearch_core::Interval;
///
/// let range = Interval::new(Some(5_u64), Some(20));
/// assert!(range.contains(&5));
/// assert!(range.contains(&20));
/// assert!(!range.contains(&4));
///
/// let open = Interval::<u64>::at_least(100);
/// assert!(open.contains(&u64::MAX));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Interval<T> {
    /// Lower bound (inclusive).
    pub start: Option<T>,
    /// Upper bound (inclusive).
    pub end: Option<T>,
}

impl<T: PartialOrd> Interval<T> {
    /// Creates an interval from optional bounds.
    #[inline]
    #[must_use]
    pub const fn new(start: Option<T>, end: Option<T>) -> Self {
        Self { start, end }
    }

    /// Creates an interval with only a lower bound.
    #[inline]
    #[must_use]
    pub const fn at_least(start: T) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Creates an interval with only an upper bound.
    #[inline]
    #[must_use]
    pub const fn at_most(end: T) -> Self {
        Self {
            start: None,
            end: Some(end),
        }
    }

    /// Returns `true` if `value` lies within both present bounds.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.start.as_ref().is_none_or(|start| value >= start)
            && self.end.as_ref().is_none_or(|end| value <= end)
    }
}

/// A file-name glob where `*` matches any sequence and everything else is
/// literal.
///
/// Matching is case-sensitive and applies to the whole name.
///
/// # Examples
///
/// ```
/// use fsearch_core::NamePattern;
///
/// let pattern = NamePattern::new("log-*.txt");
/// assert!(pattern.matches("log-2024.txt"));
/// assert!(pattern.matches("log-.txt"));
/// assert!(!pattern.matches("log-2024.txt.bak"));
///
/// // `?` and `[` carry no special meaning.
/// assert!(NamePattern::new("a?.md").matches("a?.md"));
/// assert!(!NamePattern::new("a?.md").matches("ab.md"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NamePattern {
    raw: String,
    /// Literal runs between wildcards. Always at least one element.
    segments: Vec<String>,
}

impl NamePattern {
    /// Compiles a pattern.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let segments = raw.split('*').map(str::to_owned).collect();
        Self { raw, segments }
    }

    /// Returns the pattern as written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns `true` if `name` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let Some((first, rest)) = self.segments.split_first() else {
            return name.is_empty();
        };
        let Some((last, middle)) = rest.split_last() else {
            return name == first;
        };

        let Some(mut remaining) = name.strip_prefix(first.as_str()) else {
            return false;
        };
        for literal in middle {
            match remaining.find(literal.as_str()) {
                Some(index) => remaining = &remaining[index + literal.len()..],
                None => return false,
            }
        }
        remaining.ends_with(last.as_str())
    }

    /// Returns `true` if this pattern only selects recognized text files.
    #[inline]
    #[must_use]
    pub fn targets_text_files(&self) -> bool {
        is_text_file_name(&self.raw)
    }
}

impl From<String> for NamePattern {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for NamePattern {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<NamePattern> for String {
    fn from(pattern: NamePattern) -> Self {
        pattern.raw
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// A case-insensitive substring to look for inside text files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct TextPattern {
    raw: String,
    needle: String,
}

impl TextPattern {
    /// Creates a pattern; the search needle is lower-cased once here.
    #[must_use]
    pub fn new(pattern: impl Into<String>) -> Self {
        let raw = pattern.into();
        let needle = raw.to_lowercase();
        Self { raw, needle }
    }

    /// Returns the pattern as written.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the lower-cased needle that lower-cased content is checked
    /// against.
    #[inline]
    #[must_use]
    pub fn needle(&self) -> &str {
        &self.needle
    }
}

impl From<String> for TextPattern {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&str> for TextPattern {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<TextPattern> for String {
    fn from(pattern: TextPattern) -> Self {
        pattern.raw
    }
}

/// Composite filter applied to every regular file a scan visits.
///
/// Absent criteria always match. Field order is fixed, which keeps the
/// serialized form (and therefore the cache key) deterministic.
///
/// # Examples
///
/// ```
/// use fsearch_core::{Interval, ScanFilter};
///
/// let filter = ScanFilter::new()
///     .with_name_pattern("*.log")
///     .with_size(Interval::at_least(1024))
///     .with_text_content("ERROR");
///
/// assert!(filter.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanFilter {
    /// Glob over the file's base name.
    pub name_pattern: Option<NamePattern>,
    /// File size bounds, in bytes.
    pub size_interval: Option<Interval<u64>>,
    /// Local modification date bounds.
    pub last_modified_date_interval: Option<Interval<NaiveDate>>,
    /// Local modification time-of-day bounds.
    pub last_modified_time_interval: Option<Interval<NaiveTime>>,
    /// Case-insensitive substring of the file's contents.
    pub text_content_pattern: Option<TextPattern>,
}

impl ScanFilter {
    /// Creates a filter that matches every file.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name pattern.
    #[must_use]
    pub fn with_name_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.name_pattern = Some(NamePattern::new(pattern));
        self
    }

    /// Sets the size bounds.
    #[must_use]
    pub const fn with_size(mut self, interval: Interval<u64>) -> Self {
        self.size_interval = Some(interval);
        self
    }

    /// Sets the modification date bounds.
    #[must_use]
    pub const fn with_modified_date(mut self, interval: Interval<NaiveDate>) -> Self {
        self.last_modified_date_interval = Some(interval);
        self
    }

    /// Sets the modification time-of-day bounds.
    #[must_use]
    pub const fn with_modified_time(mut self, interval: Interval<NaiveTime>) -> Self {
        self.last_modified_time_interval = Some(interval);
        self
    }

    /// Sets the text content pattern.
    #[must_use]
    pub fn with_text_content(mut self, pattern: impl Into<String>) -> Self {
        self.text_content_pattern = Some(TextPattern::new(pattern));
        self
    }

    /// Returns `true` if no criterion is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name_pattern.is_none()
            && self.size_interval.is_none()
            && self.last_modified_date_interval.is_none()
            && self.last_modified_time_interval.is_none()
            && self.text_content_pattern.is_none()
    }

    /// Checks the filter for internal consistency.
    ///
    /// # Errors
    ///
    /// - [`FilterError::EmptyPattern`] if a pattern is present but empty.
    /// - [`FilterError::InconsistentTextFilter`] if a text pattern is set
    ///   without a name pattern that targets a recognized text extension.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.name_pattern.as_ref().is_some_and(|p| p.as_str().is_empty()) {
            return Err(FilterError::EmptyPattern {
                field: "name pattern",
            });
        }

        let Some(text) = &self.text_content_pattern else {
            return Ok(());
        };
        if text.as_str().is_empty() {
            return Err(FilterError::EmptyPattern {
                field: "text content pattern",
            });
        }

        match &self.name_pattern {
            Some(name) if name.targets_text_files() => Ok(()),
            other => Err(FilterError::InconsistentTextFilter {
                name_pattern: other.as_ref().map(|p| p.as_str().to_owned()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_pattern_literal() {
        let pattern = NamePattern::new("a.txt");
        assert!(pattern.matches("a.txt"));
        assert!(!pattern.matches("ba.txt"));
        assert!(!pattern.matches("A.txt"));
    }

    #[test]
    fn test_name_pattern_wildcards() {
        assert!(NamePattern::new("*").matches(""));
        assert!(NamePattern::new("*").matches("anything"));
        assert!(NamePattern::new("*.txt").matches(".txt"));
        assert!(NamePattern::new("a*b*c").matches("abc"));
        assert!(NamePattern::new("a*b*c").matches("a-b-b-c"));
        assert!(!NamePattern::new("a*b*c").matches("a-c-b"));
        assert!(NamePattern::new("**x").matches("x"));
    }

    #[test]
    fn test_name_pattern_prefix_and_suffix_do_not_overlap() {
        let pattern = NamePattern::new("ab*b");
        assert!(!pattern.matches("ab"));
        assert!(pattern.matches("abb"));
    }

    #[test]
    fn test_name_pattern_regex_characters_are_literal() {
        let pattern = NamePattern::new("report(1).txt");
        assert!(pattern.matches("report(1).txt"));
        assert!(!pattern.matches("report1.txt"));
        assert!(!NamePattern::new("a.c").matches("abc"));
    }

    #[test]
    fn test_interval_bounds_are_inclusive() {
        let range = Interval::new(Some(5_u64), Some(20));
        assert!(!range.contains(&4));
        assert!(range.contains(&5));
        assert!(range.contains(&10));
        assert!(range.contains(&20));
        assert!(!range.contains(&21));

        let unbounded = Interval::<u64>::default();
        assert!(unbounded.contains(&0));
        assert!(Interval::at_most(3_u64).contains(&0));
        assert!(!Interval::at_most(3_u64).contains(&4));
    }

    #[test]
    fn test_text_pattern_needle_is_lowercase() {
        let pattern = TextPattern::new("Hello World");
        assert_eq!(pattern.as_str(), "Hello World");
        assert_eq!(pattern.needle(), "hello world");
    }

    #[test]
    fn test_validate_rejects_text_search_on_non_text_pattern() {
        let filter = ScanFilter::new()
            .with_name_pattern("*.bin")
            .with_text_content("hello");
        assert_eq!(
            filter.validate(),
            Err(FilterError::InconsistentTextFilter {
                name_pattern: Some("*.bin".to_owned())
            })
        );
    }

    #[test]
    fn test_validate_rejects_text_search_without_name_pattern() {
        let filter = ScanFilter::new().with_text_content("hello");
        assert!(matches!(
            filter.validate(),
            Err(FilterError::InconsistentTextFilter { name_pattern: None })
        ));
    }

    #[test]
    fn test_validate_rejects_empty_patterns() {
        assert!(ScanFilter::new().with_name_pattern("").validate().is_err());
        assert!(
            ScanFilter::new()
                .with_name_pattern("*.txt")
                .with_text_content("")
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_validate_accepts_consistent_filters() {
        assert!(ScanFilter::new().validate().is_ok());
        assert!(ScanFilter::new().with_name_pattern("*.bin").validate().is_ok());
        assert!(
            ScanFilter::new()
                .with_name_pattern("server-*.LOG")
                .with_text_content("timeout")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_filter_deserializes_from_plain_strings() {
        let json = r#"{
            "name_pattern": "*.txt",
            "size_interval": {"start": 5, "end": null},
            "last_modified_date_interval": {"start": "2024-01-01", "end": "2024-12-31"},
            "text_content_pattern": "Hello"
        }"#;
        let filter: ScanFilter = serde_json::from_str(json).unwrap();
        assert_eq!(filter.name_pattern, Some(NamePattern::new("*.txt")));
        assert_eq!(filter.size_interval, Some(Interval::at_least(5)));
        assert_eq!(
            filter.text_content_pattern.as_ref().map(TextPattern::needle),
            Some("hello")
        );
        assert!(filter.last_modified_time_interval.is_none());
    }
}
