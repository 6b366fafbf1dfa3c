// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Utility functions for the pose trainer

use std::fmt;

/// Failures collected while walking an ordered list of fallback candidates.
///
/// Callers try each candidate in turn, stop at the first success and, when every candidate
/// failed, turn the collected attempts into a single error message.
#[derive(Debug, Default, Clone)]
pub struct FallbackAttempts {
    failures: Vec<String>,
}

impl FallbackAttempts {
    /// Create an empty attempt log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failures: Vec::new(),
        }
    }

    /// Record that `candidate` failed with `reason`.
    pub fn record(&mut self, candidate: impl fmt::Display, reason: impl fmt::Display) {
        self.failures.push(format!("{candidate}: {reason}"));
    }

    /// Number of failed candidates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Check if nothing has failed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Combined message, e.g. "all 2 candidates failed (a: x; b: y)".
    #[must_use]
    pub fn summary(&self) -> String {
        if self.failures.is_empty() {
            return "no candidates to try".to_string();
        }
        format!(
            "all {} {} failed ({})",
            self.failures.len(),
            pluralize_count(self.failures.len(), "candidate"),
            self.failures.join("; ")
        )
    }
}

/// Pluralize an English word: "pose" -> "poses", "match" -> "matches"
#[must_use]
pub fn pluralize(word: &str) -> String {
    if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        format!("{word}es")
    } else {
        format!("{word}s")
    }
}

/// Singular for a count of one, plural otherwise.
#[must_use]
pub fn pluralize_count(count: usize, word: &str) -> String {
    if count == 1 {
        word.to_string()
    } else {
        pluralize(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("pose"), "poses");
        assert_eq!(pluralize("match"), "matches");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize_count(1, "skip"), "skip");
        assert_eq!(pluralize_count(3, "skip"), "skips");
    }

    #[test]
    fn test_fallback_summary() {
        let mut attempts = FallbackAttempts::new();
        assert!(attempts.is_empty());
        assert_eq!(attempts.summary(), "no candidates to try");

        attempts.record("webgl", "no GPU context");
        attempts.record("cpu", "out of memory");
        assert_eq!(attempts.len(), 2);
        assert_eq!(
            attempts.summary(),
            "all 2 candidates failed (webgl: no GPU context; cpu: out of memory)"
        );
    }
}
