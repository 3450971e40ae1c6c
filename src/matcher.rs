//! Glob matching of destination paths.
//! Used for the protected-file list and for paths skipped while walking directory sources.

use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;
use std::path::Path;

use crate::error::Result;

/// A compiled set of glob patterns matched against a relative path and its basename.
///
/// A plain name such as `README.md` therefore matches both `README.md` and
/// `docs/README.md`, while `docs/README.md` only matches that exact relative path.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    globs: GlobSet,
}

impl PathMatcher {
    /// Compiles the given patterns.
    ///
    /// # Errors
    /// * `Error::GlobError` if any pattern is invalid
    pub fn new<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            debug!("Adding pattern '{pattern}'");
            builder.add(Glob::new(pattern)?);
        }
        Ok(Self { globs: builder.build()? })
    }

    pub fn empty() -> Self {
        Self { globs: GlobSet::empty() }
    }

    pub fn is_empty(&self) -> bool {
        self.globs.is_empty()
    }

    pub fn is_match<P: AsRef<Path>>(&self, relative_path: P) -> bool {
        let relative_path = relative_path.as_ref();
        if self.globs.is_match(relative_path) {
            return true;
        }
        relative_path.file_name().is_some_and(|name| self.globs.is_match(name))
    }
}

impl Default for PathMatcher {
    fn default() -> Self {
        Self::empty()
    }
}
