//! Scan tokens and externally observable scan results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one in-flight scan.
///
/// Valid until the scan's result is cached, the scan is killed, or its
/// context is reclaimed.
///
/// # Examples
///
/// ```
/// use fsearch_core::ScanToken;
///
/// let token = ScanToken::generate();
/// let parsed: ScanToken = token.to_string().parse().unwrap();
/// assert_eq!(token, parsed);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScanToken(Uuid);

impl ScanToken {
    /// Generates a fresh random token.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the underlying UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ScanToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ScanToken {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// How a scan's result came to be.
///
/// Results are cached in one tier per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultTier {
    /// The traversal ran to the end without being interrupted.
    Complete,
    /// The traversal was cancelled before finishing; the result is a subset.
    Interrupted,
}

impl ResultTier {
    /// Returns a short lowercase label, used for cache namespaces and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for ResultTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Externally observable state of a scan.
///
/// `token` is `None` when the answer came straight from the cache and no
/// live scan exists. `result` holds matched absolute paths in no particular
/// order and without duplicates. `completed` is `true` exactly when `tier`
/// is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    /// Token of the live scan, if any.
    pub token: Option<ScanToken>,
    /// Whether `result` is final.
    pub completed: bool,
    /// How a final result came to be. `None` while the scan is running.
    #[serde(default)]
    pub tier: Option<ResultTier>,
    /// Matched file paths.
    pub result: Vec<String>,
}

impl ScanResult {
    /// A still-running scan with the matches found so far.
    #[must_use]
    pub const fn running(token: ScanToken, partial: Vec<String>) -> Self {
        Self {
            token: Some(token),
            completed: false,
            tier: None,
            result: partial,
        }
    }

    /// A finished scan.
    #[must_use]
    pub const fn finished(token: Option<ScanToken>, tier: ResultTier, result: Vec<String>) -> Self {
        Self {
            token,
            completed: true,
            tier: Some(tier),
            result,
        }
    }

    /// Returns `true` if this is a final result of an interrupted traversal
    /// and may therefore be incomplete.
    #[must_use]
    pub const fn is_interrupted(&self) -> bool {
        matches!(self.tier, Some(ResultTier::Interrupted))
    }
}
