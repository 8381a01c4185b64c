//! Recovery of row arrays from generation-service replies.
//!
//! Replies are nominally a JSON array of arrays, but models wrap them in
//! markdown fences or lead-in prose. Recovery runs three strategies in order
//! and the first one producing valid JSON wins: the contents of a code fence,
//! the substring from the first `[` to the last `]`, then the raw text.

use serde_json::Value;
use thiserror::Error;

/// Why a reply could not be turned into rows.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplyParseError {
    #[error("reply is empty")]
    Empty,
    #[error("reply is not valid JSON: {0}")]
    NotJson(String),
    #[error("reply JSON is not an array of row arrays")]
    NotAnArray,
    #[error("reply row count mismatch: sent {sent}, got {got}")]
    RowCountMismatch { sent: usize, got: usize },
}

/// Parse a reply into exactly `sent` data rows.
///
/// An echoed header row is tolerated: `sent + 1` rows drop the first one,
/// `sent` rows are taken as-is, anything else is a mismatch. Scalar cells
/// that are not strings (numbers, booleans, null) coerce to strings rather
/// than failing the whole batch.
pub fn parse_row_reply(text: &str, sent: usize) -> Result<Vec<Vec<String>>, ReplyParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ReplyParseError::Empty);
    }

    let value = recover_json(trimmed)?;
    let Value::Array(raw_rows) = value else {
        return Err(ReplyParseError::NotAnArray);
    };

    let mut rows = Vec::with_capacity(raw_rows.len());
    for raw in raw_rows {
        let Value::Array(cells) = raw else {
            return Err(ReplyParseError::NotAnArray);
        };
        rows.push(cells.into_iter().map(coerce_cell).collect::<Vec<String>>());
    }

    if rows.len() == sent + 1 {
        rows.remove(0);
        Ok(rows)
    } else if rows.len() == sent {
        Ok(rows)
    } else {
        Err(ReplyParseError::RowCountMismatch {
            sent,
            got: rows.len(),
        })
    }
}

fn recover_json(text: &str) -> Result<Value, ReplyParseError> {
    let mut last_err = None;
    for candidate in [fenced_block(text), bracket_span(text), Some(text)]
        .into_iter()
        .flatten()
    {
        match serde_json::from_str(candidate) {
            Ok(value) => return Ok(value),
            Err(err) => last_err = Some(err.to_string()),
        }
    }
    Err(ReplyParseError::NotJson(
        last_err.unwrap_or_else(|| "no parse candidates".to_string()),
    ))
}

/// Contents of the first markdown code fence, if any.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip a language tag like `json` on the opening fence line.
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Substring from the first `[` to the last `]`, inclusive.
fn bracket_span(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

fn coerce_cell(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLAIN: &str = r#"[["Name","URL"],["Acme","acme.com"]]"#;

    #[test]
    fn plain_json_with_header() {
        let rows = parse_row_reply(PLAIN, 1).unwrap();
        assert_eq!(rows, vec![vec!["Acme".to_string(), "acme.com".to_string()]]);
    }

    #[test]
    fn fenced_json() {
        let text = format!("Here you go:\n```json\n{PLAIN}\n```\nDone.");
        let rows = parse_row_reply(&text, 1).unwrap();
        assert_eq!(rows[0][1], "acme.com");
    }

    #[test]
    fn prose_wrapped_json_via_bracket_scan() {
        let text = format!("The repaired rows are {PLAIN} as requested.");
        let rows = parse_row_reply(&text, 1).unwrap();
        assert_eq!(rows[0][0], "Acme");
    }

    #[test]
    fn headerless_reply_accepted() {
        let rows = parse_row_reply(r#"[["Acme","acme.com"]]"#, 1).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn row_count_mismatch_rejected() {
        let err = parse_row_reply(PLAIN, 3).unwrap_err();
        assert_eq!(err, ReplyParseError::RowCountMismatch { sent: 3, got: 2 });
    }

    #[test]
    fn scalar_cells_coerce() {
        let rows = parse_row_reply(r#"[["Acme", 42, null, true]]"#, 1).unwrap();
        assert_eq!(rows[0], vec!["Acme", "42", "", "true"]);
    }

    #[test]
    fn junk_is_typed_not_a_panic() {
        assert_eq!(parse_row_reply("", 1), Err(ReplyParseError::Empty));
        assert!(matches!(
            parse_row_reply("no json here", 1),
            Err(ReplyParseError::NotJson(_))
        ));
        assert_eq!(
            parse_row_reply(r#"{"rows": 3}"#, 1),
            Err(ReplyParseError::NotAnArray)
        );
        assert_eq!(
            parse_row_reply(r#"["flat", "array"]"#, 2),
            Err(ReplyParseError::NotAnArray)
        );
        // An object wrapper still surfaces its inner array via bracket scan.
        assert_eq!(
            parse_row_reply(r#"{"rows": []}"#, 1),
            Err(ReplyParseError::RowCountMismatch { sent: 1, got: 0 })
        );
    }
}
