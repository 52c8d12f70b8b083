//! Parsers for power-supply sysfs attributes.
//!
//! These are pure functions that parse single-attribute file contents into
//! typed values. They are designed to be easily testable with string inputs.

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a single integer attribute, e.g. `capacity` or `charge_counter`.
///
/// Sysfs values carry a trailing newline; firmware nodes may carry NULs.
pub fn parse_scalar(content: &str) -> Result<i64, ParseError> {
    let trimmed = content.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    trimmed
        .parse()
        .map_err(|_| ParseError::new(format!("not an integer: {:?}", trimmed)))
}

/// Parses a text attribute, e.g. `status` or `technology`.
///
/// Returns an error for empty content so a truncated read does not become
/// an empty log field.
pub fn parse_text(content: &str) -> Result<String, ParseError> {
    let trimmed = content.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if trimmed.is_empty() {
        return Err(ParseError::new("empty attribute"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scalar_plain() {
        assert_eq!(parse_scalar("85\n").unwrap(), 85);
    }

    #[test]
    fn test_parse_scalar_negative() {
        assert_eq!(parse_scalar("-523000\n").unwrap(), -523000);
    }

    #[test]
    fn test_parse_scalar_nul_terminated() {
        // Firmware device-tree nodes are NUL-terminated
        assert_eq!(parse_scalar("42\0").unwrap(), 42);
    }

    #[test]
    fn test_parse_scalar_garbage() {
        assert!(parse_scalar("unknown\n").is_err());
        assert!(parse_scalar("").is_err());
    }

    #[test]
    fn test_parse_text_multi_word() {
        assert_eq!(parse_text("Not charging\n").unwrap(), "Not charging");
    }

    #[test]
    fn test_parse_text_empty() {
        assert!(parse_text("\n").is_err());
        assert!(parse_text("").is_err());
    }
}
