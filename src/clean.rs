//! Normalization of known "not found" placeholders in generation output.
//!
//! Models answer with a stock phrase instead of leaving a cell empty; those
//! phrases must never land in the exported sheet. Matching is exact after
//! trim + lowercase so legitimate text containing one of the phrases is left
//! alone.

/// Placeholder strings the generation service uses when it finds nothing.
const PLACEHOLDERS: &[&str] = &[
    "url_not_found",
    "no official website found",
    "not found",
    "n/a",
    "null",
    "undefined",
    "insufficient information to generate a profile",
];

/// True when the trimmed, lowercased value is exactly a known placeholder.
pub fn is_placeholder(value: &str) -> bool {
    let needle = value.trim().to_lowercase();
    PLACEHOLDERS.contains(&needle.as_str())
}

/// Rewrite a placeholder to the empty string; pass anything else through.
pub fn cleaned(value: &str) -> String {
    if is_placeholder(value) {
        String::new()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_are_blanked() {
        assert_eq!(cleaned("URL_NOT_FOUND"), "");
        assert_eq!(cleaned("  not found  "), "");
        assert_eq!(cleaned("N/A"), "");
        assert_eq!(cleaned("Insufficient information to generate a profile"), "");
    }

    #[test]
    fn substrings_do_not_trigger() {
        assert_eq!(cleaned("notfound.example.com"), "notfound.example.com");
        assert_eq!(
            cleaned("The URL was not found on the first pass"),
            "The URL was not found on the first pass"
        );
    }

    #[test]
    fn cleaning_is_idempotent() {
        for raw in ["null", "example.com", "", "  n/a"] {
            let once = cleaned(raw);
            assert_eq!(cleaned(&once), once);
        }
    }
}
