//! Per-target lint results.

use crate::{LintMessage, Severity};
use serde::{Deserialize, Serialize};

/// Aggregate result of linting one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    /// Identifier of the linted target
    pub target_id: String,
    /// URL the page was on when the pass finished
    pub url: String,
    /// Unsuppressed messages, in rule execution order
    pub messages: Vec<LintMessage>,
    /// Messages suppressed by an ignore attribute on the element or an ancestor
    pub suppressed_messages: Vec<LintMessage>,
    pub error_count: usize,
    pub warning_count: usize,
    pub info_count: usize,
    /// Part of the serialized shape consumed by formatters; no resolved
    /// severity currently maps to it.
    pub recommend_count: usize,
}

impl LintResult {
    /// Build a result, tallying severity counts from the unsuppressed messages.
    #[must_use]
    pub fn tally(
        target_id: impl Into<String>,
        url: impl Into<String>,
        messages: Vec<LintMessage>,
        suppressed_messages: Vec<LintMessage>,
    ) -> Self {
        let mut error_count = 0;
        let mut warning_count = 0;
        let mut info_count = 0;
        for message in &messages {
            match message.severity {
                Severity::Error => error_count += 1,
                Severity::Warn => warning_count += 1,
                Severity::Info => info_count += 1,
                Severity::Off => {}
            }
        }
        Self {
            target_id: target_id.into(),
            url: url.into(),
            messages,
            suppressed_messages,
            error_count,
            warning_count,
            info_count,
            recommend_count: 0,
        }
    }

    /// Returns true if any unsuppressed message is an error.
    #[must_use]
    pub const fn has_errors(&self) -> bool {
        self.error_count > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementLocation, Violation};

    fn message(rule: &str, severity: Severity) -> LintMessage {
        LintMessage::stamp(
            Violation::new("m", ElementLocation::new("body", "body")),
            rule,
            severity,
        )
    }

    #[test]
    fn test_tally_counts_by_severity() {
        let result = LintResult::tally(
            "t1",
            "https://example.test/",
            vec![
                message("a/x", Severity::Error),
                message("a/y", Severity::Warn),
                message("a/y", Severity::Warn),
                message("a/z", Severity::Info),
            ],
            vec![message("a/x", Severity::Error)],
        );
        assert_eq!(result.error_count, 1);
        assert_eq!(result.warning_count, 2);
        assert_eq!(result.info_count, 1);
        assert_eq!(result.recommend_count, 0);
        assert!(result.has_errors());
    }

    #[test]
    fn test_suppressed_messages_do_not_count() {
        let result = LintResult::tally(
            "t1",
            "about:blank",
            vec![],
            vec![message("a/x", Severity::Error)],
        );
        assert_eq!(result.error_count, 0);
        assert!(!result.has_errors());
        assert_eq!(result.suppressed_messages.len(), 1);
    }
}
