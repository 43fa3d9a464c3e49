//! Assertion helpers for lint results.
//!
//! Messages are formatted one per line so test failures read well.

/// Format `(rule_id, message)` pairs for assertion output.
pub fn format_messages<T: std::fmt::Debug>(messages: &[T]) -> String {
    if messages.is_empty() {
        return String::from("(no messages)");
    }

    messages
        .iter()
        .enumerate()
        .map(|(i, m)| format!("[{}] {m:?}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_messages_empty() {
        let empty: Vec<String> = vec![];
        assert_eq!(format_messages(&empty), "(no messages)");
    }

    #[test]
    fn test_format_messages_numbers_entries() {
        let formatted = format_messages(&["a", "b"]);
        assert_eq!(formatted, "[1] \"a\"\n[2] \"b\"");
    }
}
