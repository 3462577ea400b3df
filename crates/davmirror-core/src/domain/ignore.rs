//! Ignore patterns
//!
//! An [`IgnoreSet`] is compiled once per mapping from shell-style globs and
//! matched against bare entry names (never full paths). The same set is
//! applied independently at every level of the tree, so `*.tmp` excludes
//! `a.tmp` and `sub/b.tmp` alike, and excluded entries are neither
//! transferred, descended into, nor deleted.

use glob::Pattern;
use tracing::trace;

use super::errors::DomainError;

/// Compiled, ordered list of ignore globs
#[derive(Debug, Clone, Default)]
pub struct IgnoreSet {
    patterns: Vec<Pattern>,
}

impl IgnoreSet {
    /// Compiles every pattern; the first invalid one is reported
    ///
    /// # Errors
    /// Returns `DomainError::InvalidPattern` when a glob fails to compile
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, DomainError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                let p = p.as_ref();
                Pattern::new(p).map_err(|e| DomainError::InvalidPattern {
                    pattern: p.to_string(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { patterns })
    }

    /// An ignore set that matches nothing
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if any pattern matches the bare entry name
    pub fn matches(&self, name: &str) -> bool {
        let hit = self.patterns.iter().find(|p| p.matches(name));
        if let Some(pattern) = hit {
            trace!(name, pattern = pattern.as_str(), "Entry ignored");
        }
        hit.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// The source globs, in configuration order
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Pattern::as_str)
    }
}
