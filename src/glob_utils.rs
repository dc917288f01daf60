//! Glob pattern matching for include/exclude path filtering

use globset::{Glob, GlobSet, GlobSetBuilder};

/// A compiled set of glob patterns
///
/// Patterns that fail to compile are kept as plain substrings, so a typo in a
/// config file narrows matching instead of aborting a run.
#[derive(Debug, Clone)]
pub struct PatternSet {
    globs: GlobSet,
    substrings: Vec<String>,
    len: usize,
}

impl PatternSet {
    pub fn new(patterns: &[String]) -> Self {
        let mut builder = GlobSetBuilder::new();
        let mut substrings = Vec::new();

        for pattern in patterns {
            match Glob::new(pattern) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => {
                    tracing::warn!(
                        "Invalid glob pattern '{}', falling back to substring match: {}",
                        pattern,
                        e
                    );
                    substrings.push(pattern.clone());
                }
            }
        }

        let globs = builder.build().unwrap_or_else(|e| {
            tracing::warn!("Failed to build glob set: {}", e);
            GlobSet::empty()
        });

        Self {
            globs,
            substrings,
            len: patterns.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether `path` (or any trailing run of its components) matches a pattern
    pub fn matches(&self, path: &str) -> bool {
        let path = path.trim_start_matches('/');

        if self.substrings.iter().any(|s| path.contains(s.as_str())) {
            return true;
        }

        if self.globs.is_match(path) {
            return true;
        }

        // "lib/**" should also match "packages/app/lib/x.ts"
        path.match_indices('/')
            .any(|(i, _)| self.globs.is_match(&path[i + 1..]))
    }
}

/// Include/exclude filter applied to repository-relative paths
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: PatternSet,
    exclude: PatternSet,
}

impl PathFilter {
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Self {
        Self {
            include: PatternSet::new(include_patterns),
            exclude: PatternSet::new(exclude_patterns),
        }
    }

    /// A filter that accepts everything
    pub fn allow_all() -> Self {
        Self::new(&[], &[])
    }

    /// Empty include list means everything is included; excludes always win
    pub fn is_allowed(&self, path: &str) -> bool {
        if !self.include.is_empty() && !self.include.matches(path) {
            return false;
        }
        !self.exclude.matches(path)
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::allow_all()
    }
}
