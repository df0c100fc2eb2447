//! Append-only buffer of matches found so far.

/// Thread-safe, append-only list of matched paths.
///
/// Walker threads push into it while pollers take snapshots. Neither side
/// takes a lock: a push claims a slot atomically, and a snapshot copies the
/// slots that are already written. Entries are never removed, so every
/// snapshot contains every entry of every earlier snapshot.
#[derive(Debug, Default)]
pub struct PartialResults {
    entries: boxcar::Vec<String>,
}

impl PartialResults {
    /// Creates an empty buffer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one match.
    pub fn push(&self, path: String) {
        self.entries.push(path);
    }

    /// Returns a copy of everything appended so far.
    ///
    /// A push that has claimed its slot but not yet written it is left out.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().map(|(_, path)| path.clone()).collect()
    }

    /// Returns the number of matches appended so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.count()
    }

    /// Returns `true` if nothing has been appended yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
