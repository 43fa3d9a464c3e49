//! Violation and message types.

use crate::Severity;
use serde::{Deserialize, Serialize};

/// Durable location descriptor for an element in a rendered page.
///
/// Built from the page side when a violation is reported, so the element can
/// be found again after the reporting script context is gone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementLocation {
    /// Generated stable selector for the element
    pub selector: String,
    /// Lowercase tag name (e.g. `"img"`)
    pub tag_name: String,
    /// The element's `id` attribute, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The element's class list
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
}

impl ElementLocation {
    /// Create a location from a selector and tag name.
    #[must_use]
    pub fn new(selector: impl Into<String>, tag_name: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            tag_name: tag_name.into(),
            id: None,
            classes: Vec::new(),
        }
    }
}

/// A location related to a violation's primary location.
///
/// For example: the other occurrences of a duplicated id, or the element
/// obscuring a hit target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    /// What the related location is (e.g. `"duplicate occurrence"`)
    pub description: String,
    pub location: ElementLocation,
}

/// A single reported defect, before rule id and severity are stamped on.
///
/// This is what rules produce, either through the in-page `report` channel or
/// the host-side passthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// Human-readable message
    pub message: String,
    /// Primary location of the defect
    pub location: ElementLocation,
    /// Optional related locations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl Violation {
    /// Create a violation with no relations.
    #[must_use]
    pub fn new(message: impl Into<String>, location: ElementLocation) -> Self {
        Self {
            message: message.into(),
            location,
            relations: Vec::new(),
        }
    }

    /// Attach a related location.
    #[must_use]
    pub fn with_relation(mut self, description: impl Into<String>, location: ElementLocation) -> Self {
        self.relations.push(Relation {
            description: description.into(),
            location,
        });
        self
    }
}

/// A violation stamped with the canonical rule id and resolved severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintMessage {
    /// Canonical rule id (`namespace/rule-name`)
    pub rule_id: String,
    pub severity: Severity,
    pub message: String,
    pub location: ElementLocation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
}

impl LintMessage {
    /// Stamp a violation with its rule id and severity.
    #[must_use]
    pub fn stamp(violation: Violation, rule_id: impl Into<String>, severity: Severity) -> Self {
        Self {
            rule_id: rule_id.into(),
            severity,
            message: violation.message,
            location: violation.location,
            relations: violation.relations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_carries_violation_fields() {
        let violation = Violation::new("image has no alt text", ElementLocation::new("img:nth-of-type(2)", "img"))
            .with_relation("container", ElementLocation::new("main", "main"));
        let message = LintMessage::stamp(violation, "viewlint/image-alt", Severity::Warn);

        assert_eq!(message.rule_id, "viewlint/image-alt");
        assert_eq!(message.severity, Severity::Warn);
        assert_eq!(message.message, "image has no alt text");
        assert_eq!(message.location.tag_name, "img");
        assert_eq!(message.relations.len(), 1);
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let message = LintMessage::stamp(
            Violation::new("x", ElementLocation::new("#a", "div")),
            "ns/rule",
            Severity::Error,
        );
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["ruleId"], "ns/rule");
        assert_eq!(json["severity"], "error");
        assert_eq!(json["location"]["tagName"], "div");
        assert!(json["location"].get("id").is_none());
    }
}
