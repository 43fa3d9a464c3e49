//! Attribute-based suppression.
//!
//! An element can opt a subtree out of reporting: the suppression attribute
//! holds a space/comma-separated token list, where `all` or `*` suppresses
//! every rule and any other token names a canonical rule id.

use viewlint_driver::{DriverError, Page};
use viewlint_types::{ElementLocation, LintMessage};

/// Attribute tokenized for suppression decisions.
pub const SUPPRESS_ATTR: &str = "data-viewlint-ignore";

fn tokens(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
}

/// Whether the element at `location` (or any ancestor) suppresses `rule_id`.
///
/// An element the reported selector no longer resolves to is not suppressed.
async fn is_suppressed(
    page: &dyn Page,
    location: &ElementLocation,
    rule_id: &str,
) -> Result<bool, DriverError> {
    let Some(element) = page
        .query_selector_all(&location.selector)
        .await?
        .into_iter()
        .next()
    else {
        return Ok(false);
    };

    let mut current = Some(element);
    while let Some(node) = current {
        if let Some(value) = page.get_attribute(&node, SUPPRESS_ATTR).await? {
            if tokens(&value).any(|token| token == "all" || token == "*" || token == rule_id) {
                return Ok(true);
            }
        }
        current = page.parent(&node).await?;
    }
    Ok(false)
}

/// Partition messages into `(kept, suppressed)`.
pub async fn partition(
    page: &dyn Page,
    messages: Vec<LintMessage>,
) -> Result<(Vec<LintMessage>, Vec<LintMessage>), DriverError> {
    let mut kept = Vec::new();
    let mut suppressed = Vec::new();
    for message in messages {
        if is_suppressed(page, &message.location, &message.rule_id).await? {
            tracing::trace!(rule = %message.rule_id, selector = %message.location.selector, "message suppressed");
            suppressed.push(message);
        } else {
            kept.push(message);
        }
    }
    Ok((kept, suppressed))
}
