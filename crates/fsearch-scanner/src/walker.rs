//! Parallel recursive directory traversal.
//!
//! This module provides [`DirectoryWalker`], which descends a directory tree
//! with rayon fork/join: each directory lists its children on the current
//! worker, evaluates its files, then hands its subdirectories to the pool as
//! independent tasks and joins them. Joining lets the waiting worker steal
//! other tasks, so deep or wide trees cannot starve the pool.
//!
//! # Cancellation
//!
//! Cooperative only. The cancellation token is checked when a directory is
//! entered and before each of its entries. A blocking filesystem call that is
//! already in flight runs to completion.
//!
//! # Errors
//!
//! Nothing aborts a traversal. A directory that cannot be listed is treated
//! as empty. Entries that vanish or cannot be inspected mid-listing are
//! skipped, and so are files whose path is not valid UTF-8, since results are
//! reported as strings. Both kinds of skip are counted in [`ScanStats`].
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use fsearch_core::ScanFilter;
//! use fsearch_scanner::{DirectoryWalker, FilterMatcher, PartialResults, ScanStats};
//! use tokio_util::sync::CancellationToken;
//!
//! let matcher = FilterMatcher::new(1024 * 1024);
//! let filter = ScanFilter::new().with_name_pattern("*.md");
//! let cancel = CancellationToken::new();
//! let partial = PartialResults::new();
//! let stats = ScanStats::new();
//!
//! let walker = DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats)
//!     .with_depth_limit(Some(2));
//! let matches = walker.walk(Utf8Path::new("/usr/share/doc"));
//! println!("{} matches", matches.len());
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use fsearch_core::ScanFilter;
use rayon::prelude::*;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::matcher::FileMatcher;
use crate::partial::PartialResults;
use crate::stats::ScanStats;

/// Recursive traversal over one directory tree.
///
/// Borrowing everything keeps the walker itself free to share across rayon
/// tasks. Parallelism comes from whichever pool the caller runs
/// [`walk`](Self::walk) on.
#[derive(Clone, Copy)]
pub struct DirectoryWalker<'a> {
    matcher: &'a dyn FileMatcher,
    filter: &'a ScanFilter,
    depth_limit: Option<u32>,
    cancel: &'a CancellationToken,
    partial: &'a PartialResults,
    stats: &'a ScanStats,
}

impl<'a> DirectoryWalker<'a> {
    /// Creates an unlimited-depth walker.
    ///
    /// # Arguments
    ///
    /// * `matcher` - Decides which files are reported
    /// * `filter` - Criteria handed to `matcher` for every file
    /// * `cancel` - Stops the traversal once cancelled
    /// * `partial` - Receives every match as soon as it is found
    /// * `stats` - Progress counters
    #[must_use]
    pub fn new(
        matcher: &'a dyn FileMatcher,
        filter: &'a ScanFilter,
        cancel: &'a CancellationToken,
        partial: &'a PartialResults,
        stats: &'a ScanStats,
    ) -> Self {
        Self {
            matcher,
            filter,
            depth_limit: None,
            cancel,
            partial,
            stats,
        }
    }

    /// Limits how many directory levels below the root are descended.
    ///
    /// A directory at depth `d` (the root is 0) has its subdirectories
    /// visited only while `d < limit`, so `Some(0)` reports the root's own
    /// files and nothing else. `None` is unlimited.
    #[must_use]
    pub const fn with_depth_limit(mut self, depth_limit: Option<u32>) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    /// Walks the tree under `root` and returns every matched path.
    ///
    /// Returns early if the cancellation token fires. Everything returned was
    /// pushed to the partial buffer before the token fired.
    #[must_use]
    pub fn walk(&self, root: &Utf8Path) -> Vec<String> {
        self.walk_directory(root.as_std_path(), 0)
    }

    fn descends_below(&self, depth: u32) -> bool {
        self.depth_limit.is_none_or(|limit| depth < limit)
    }

    fn walk_directory(&self, dir: &Path, depth: u32) -> Vec<String> {
        if self.cancel.is_cancelled() {
            return Vec::new();
        }

        let entries = match fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) => {
                self.stats.record_unreadable_directory();
                debug!(path = %dir.display(), error = %err, "Skipping unreadable directory");
                return Vec::new();
            }
        };
        self.stats.record_directory();

        let mut matched = Vec::new();
        let mut subdirectories: Vec<PathBuf> = Vec::new();

        for entry in entries {
            if self.cancel.is_cancelled() {
                return matched;
            }

            let Ok(entry) = entry else { continue };
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            let path = entry.path();

            if file_type.is_dir() {
                if self.descends_below(depth) {
                    subdirectories.push(path);
                }
                continue;
            }

            // Symlinks count only when they resolve to a regular file.
            let is_file = file_type.is_file() || (file_type.is_symlink() && path.is_file());
            if !is_file {
                continue;
            }

            let path = match Utf8PathBuf::from_path_buf(path) {
                Ok(path) => path,
                Err(path) => {
                    self.stats.record_skipped_file();
                    debug!(path = %path.display(), "Skipping file with non-UTF-8 path");
                    continue;
                }
            };

            self.stats.record_file();
            if !self.matcher.matches(&path, self.filter) {
                continue;
            }
            // A match that lands after the interruption is not reported.
            if self.cancel.is_cancelled() {
                return matched;
            }
            self.stats.record_match();
            let path = path.into_string();
            self.partial.push(path.clone());
            matched.push(path);
        }

        let nested: Vec<Vec<String>> = subdirectories
            .into_par_iter()
            .map(|subdirectory| self.walk_directory(&subdirectory, depth + 1))
            .collect();
        matched.extend(nested.into_iter().flatten());

        matched
    }
}

impl std::fmt::Debug for DirectoryWalker<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryWalker")
            .field("filter", self.filter)
            .field("depth_limit", &self.depth_limit)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::matcher::FilterMatcher;

    /// Builds:
    ///
    /// ```text
    /// root/
    ///   a.txt
    ///   l1/
    ///     b.txt
    ///     l2/
    ///       c.txt
    ///       l3/
    ///         d.txt
    /// ```
    fn nested_tree() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        fs::create_dir_all(root.join("l1/l2/l3")).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(root.join("l1/b.txt"), "b").unwrap();
        fs::write(root.join("l1/l2/c.txt"), "c").unwrap();
        fs::write(root.join("l1/l2/l3/d.txt"), "d").unwrap();
        (dir, root)
    }

    fn walk(root: &Utf8Path, filter: &ScanFilter, depth_limit: Option<u32>) -> BTreeSet<String> {
        let matcher = FilterMatcher::new(1024);
        let cancel = CancellationToken::new();
        let partial = PartialResults::new();
        let stats = ScanStats::new();
        DirectoryWalker::new(&matcher, filter, &cancel, &partial, &stats)
            .with_depth_limit(depth_limit)
            .walk(root)
            .into_iter()
            .collect()
    }

    fn names(root: &Utf8Path, found: &BTreeSet<String>) -> Vec<String> {
        found
            .iter()
            .map(|p| Utf8Path::new(p).strip_prefix(root).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_depth_zero_reports_only_root_files() {
        let (_dir, root) = nested_tree();
        let found = walk(&root, &ScanFilter::new(), Some(0));
        assert_eq!(names(&root, &found), vec!["a.txt"]);
    }

    #[test]
    fn test_depth_one_descends_one_level() {
        let (_dir, root) = nested_tree();
        let found = walk(&root, &ScanFilter::new(), Some(1));
        assert_eq!(names(&root, &found), vec!["a.txt", "l1/b.txt"]);
    }

    #[test]
    fn test_depth_two_stops_above_third_level() {
        let (_dir, root) = nested_tree();
        let found = walk(&root, &ScanFilter::new(), Some(2));
        assert_eq!(names(&root, &found), vec!["a.txt", "l1/b.txt", "l1/l2/c.txt"]);
    }

    #[test]
    fn test_unlimited_depth_reports_everything() {
        let (_dir, root) = nested_tree();
        let found = walk(&root, &ScanFilter::new(), None);
        assert_eq!(found.len(), 4);
    }

    #[test]
    fn test_name_filter_and_directories_are_not_reported() {
        let (_dir, root) = nested_tree();
        fs::write(root.join("l1/notes.log"), "log").unwrap();

        let found = walk(&root, &ScanFilter::new().with_name_pattern("*.log"), None);
        assert_eq!(names(&root, &found), vec!["l1/notes.log"]);

        let dirs = walk(&root, &ScanFilter::new().with_name_pattern("l*"), None);
        assert!(dirs.is_empty());
    }

    #[test]
    fn test_partial_buffer_and_stats_track_matches() {
        let (_dir, root) = nested_tree();
        let matcher = FilterMatcher::new(1024);
        let filter = ScanFilter::new();
        let cancel = CancellationToken::new();
        let partial = PartialResults::new();
        let stats = ScanStats::new();

        let found = DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats)
            .walk(&root);

        let mut buffered = partial.snapshot();
        let mut returned = found.clone();
        buffered.sort();
        returned.sort();
        assert_eq!(buffered, returned);

        let snap = stats.snapshot();
        assert_eq!(snap.directories_visited, 4);
        assert_eq!(snap.files_examined, 4);
        assert_eq!(snap.files_matched, 4);
    }

    #[test]
    fn test_cancelled_walk_returns_nothing() {
        let (_dir, root) = nested_tree();
        let matcher = FilterMatcher::new(1024);
        let filter = ScanFilter::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let partial = PartialResults::new();
        let stats = ScanStats::new();

        let found = DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats)
            .walk(&root);
        assert!(found.is_empty());
        assert!(partial.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_empty_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().join("missing")).unwrap();
        let matcher = FilterMatcher::new(1024);
        let filter = ScanFilter::new();
        let cancel = CancellationToken::new();
        let partial = PartialResults::new();
        let stats = ScanStats::new();

        let found = DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats)
            .walk(&root);
        assert!(found.is_empty());
        assert_eq!(stats.snapshot().directories_unreadable, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinks() {
        let (_dir, root) = nested_tree();
        std::os::unix::fs::symlink(root.join("a.txt"), root.join("link.txt")).unwrap();
        std::os::unix::fs::symlink(root.join("l1"), root.join("loop")).unwrap();

        let found = walk(&root, &ScanFilter::new(), None);
        let found = names(&root, &found);
        assert!(found.contains(&"link.txt".to_owned()));
        assert!(!found.iter().any(|p| p.starts_with("loop/")));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_file_name_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"junk\xff.bin")), "x").unwrap();
        fs::write(dir.path().join(OsStr::from_bytes(b"odd\xff.txt")), "x").unwrap();

        let matcher = FilterMatcher::new(1024);
        let filter = ScanFilter::new().with_name_pattern("*.txt");
        let cancel = CancellationToken::new();
        let partial = PartialResults::new();
        let stats = ScanStats::new();

        let found = DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats).walk(&root);
        assert_eq!(found, vec![root.join("a.txt").into_string()]);

        let snap = stats.snapshot();
        assert_eq!(snap.files_skipped, 2);
        assert_eq!(snap.files_examined, 1);
    }

    /// Blocks inside `matches` until released, then matches.
    struct BlockingMatcher {
        entered: std::sync::mpsc::SyncSender<()>,
        release: parking_lot::Mutex<std::sync::mpsc::Receiver<()>>,
    }

    impl FileMatcher for BlockingMatcher {
        fn matches(&self, _path: &Utf8Path, _filter: &ScanFilter) -> bool {
            let _ = self.entered.send(());
            let _ = self.release.lock().recv();
            true
        }
    }

    #[test]
    fn test_match_after_interruption_is_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned()).unwrap();
        fs::write(root.join("a.txt"), "a").unwrap();

        let (entered_tx, entered_rx) = std::sync::mpsc::sync_channel(1);
        let (release_tx, release_rx) = std::sync::mpsc::channel();
        let matcher = BlockingMatcher {
            entered: entered_tx,
            release: parking_lot::Mutex::new(release_rx),
        };
        let filter = ScanFilter::new();
        let cancel = CancellationToken::new();
        let partial = PartialResults::new();
        let stats = ScanStats::new();

        let found = std::thread::scope(|scope| {
            let walker = scope.spawn(|| {
                DirectoryWalker::new(&matcher, &filter, &cancel, &partial, &stats).walk(&root)
            });
            entered_rx.recv().unwrap();
            cancel.cancel();
            release_tx.send(()).unwrap();
            walker.join().unwrap()
        });

        assert!(found.is_empty());
        assert!(partial.is_empty());
        assert_eq!(stats.snapshot().files_matched, 0);
    }
}
