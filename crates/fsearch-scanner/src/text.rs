//! Case-insensitive text search inside files.
//!
//! Files at or below the configured threshold are read whole; larger files
//! are streamed line by line so peak memory stays bounded by the longest
//! line.
//!
//! # Limitation
//!
//! In streaming mode each line is checked on its own, so a needle that
//! spans a line break is not found. Whole-file mode would find it. Needles
//! without a newline give the same answer in both modes.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};

use camino::Utf8Path;
use tracing::debug;

/// Strategy selector for text content search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSearch {
    /// Files of at most this many bytes are read whole.
    threshold: u64,
}

impl TextSearch {
    /// Creates a search that streams files larger than `threshold` bytes.
    #[inline]
    #[must_use]
    pub const fn new(threshold: u64) -> Self {
        Self { threshold }
    }

    /// Returns the whole-file threshold in bytes.
    #[inline]
    #[must_use]
    pub const fn threshold(&self) -> u64 {
        self.threshold
    }

    /// Returns `true` if the file contains `needle`, ignoring case.
    ///
    /// `needle` must already be lower-cased. `size` is the file size as
    /// reported by its metadata and only picks the strategy. Any read
    /// failure counts as no match.
    #[must_use]
    pub fn contains(&self, path: &Utf8Path, size: u64, needle: &str) -> bool {
        let outcome = if size <= self.threshold {
            whole_file_contains(path, size, needle)
        } else {
            streaming_contains(path, needle)
        };

        outcome.unwrap_or_else(|err| {
            debug!(path = %path, error = %err, "Treating unreadable file as non-matching");
            false
        })
    }
}

fn whole_file_contains(path: &Utf8Path, size: u64, needle: &str) -> io::Result<bool> {
    let mut file = File::open(path)?;

    let mut buf = Vec::new();
    let hint = usize::try_from(size).map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
    buf.try_reserve_exact(hint)
        .map_err(|_| io::Error::from(io::ErrorKind::OutOfMemory))?;
    file.read_to_end(&mut buf)?;

    Ok(String::from_utf8_lossy(&buf).to_lowercase().contains(needle))
}

fn streaming_contains(path: &Utf8Path, needle: &str) -> io::Result<bool> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = Vec::new();

    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            return Ok(false);
        }
        if String::from_utf8_lossy(&line).to_lowercase().contains(needle) {
            return Ok(true);
        }
    }
}
