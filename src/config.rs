//! Flat `key = value` configuration parsing.
//!
//! Blank lines, `#` comments, and stray carriage returns are skipped. A
//! remaining line without `=` is a fatal syntax error. Key recognition
//! is the caller's business: unrecognized keys are non-fatal and simply
//! ignored there.

use crate::error::{Result, ViewerError};

/// Split configuration text into trimmed `(key, value)` pairs.
pub fn parse(text: &str) -> Result<Vec<(String, String)>> {
    let mut entries = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let Some(eq) = line.find('=') else {
            return Err(ViewerError::ConfigSyntax {
                line: index + 1,
                text: line.to_string(),
            });
        };
        let key = line[..eq].trim().to_string();
        let value = line[eq + 1..].trim().to_string();
        entries.push((key, value));
    }
    Ok(entries)
}

/// Format one configuration line with the key padded to a fixed column.
pub fn line(key: &str, value: impl std::fmt::Display) -> String {
    format!("{key:<34}= {value}\n")
}

/// `0`/`1` representation of the boolean display flags.
pub fn flag(value: bool) -> u8 {
    value as u8
}

/// Parse a boolean display flag; any non-zero integer is true.
pub fn parse_flag(value: &str) -> Option<bool> {
    value.parse::<i64>().ok().map(|v| v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_blanks_and_cr_are_skipped() {
        let text = "# comment\n\nviewMix = 0.5\r\n\n# another\n";
        let entries = parse(text).unwrap();
        assert_eq!(entries, vec![("viewMix".to_string(), "0.5".to_string())]);
    }

    #[test]
    fn missing_equals_is_fatal() {
        let err = parse("viewMix 0.5\n").unwrap_err();
        assert!(matches!(err, ViewerError::ConfigSyntax { line: 1, .. }));
    }

    #[test]
    fn values_keep_internal_spaces() {
        let entries = parse("key =  a b \n").unwrap();
        assert_eq!(entries[0].1, "a b");
    }
}
