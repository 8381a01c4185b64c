//! Heuristics for deciding whether a cell already holds a usable website URL.
//!
//! The classifier gates the whole pipeline: rows whose website cell passes are
//! never sent to the generation service, and existing values that pass are
//! never overwritten by AI output.

/// Email providers whose domains never count as an organization website.
///
/// Compared against normalized candidates (scheme, `www.`, and trailing
/// slash stripped, lowercased) and against the domain part of email-shaped
/// values.
const GENERIC_EMAIL_DOMAINS: &[&str] = &[
    "gmail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "aol.com",
    "icloud.com",
    "live.com",
    "msn.com",
    "proton.me",
    "protonmail.com",
    "gmx.com",
    "mail.com",
    "me.com",
    "comcast.net",
    "yandex.com",
];

/// Decide whether a string is plausible as an organization website URL.
///
/// Rules, in order: empty → no; no `.` anywhere → no; email address on a
/// generic provider → no; normalized exact match of a generic provider
/// domain → no; anything else → yes.
pub fn is_plausible_url(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    if !trimmed.contains('.') {
        return false;
    }
    if trimmed.contains('@') {
        if let Some(domain) = email_domain(trimmed) {
            if GENERIC_EMAIL_DOMAINS.contains(&domain.as_str()) {
                return false;
            }
        }
    }
    let normalized = normalize_host(trimmed);
    !GENERIC_EMAIL_DOMAINS.contains(&normalized.as_str())
}

/// Extract the domain part of an email address, lowercased.
///
/// Returns `None` when there is no `@` or nothing follows the last one.
pub fn email_domain(email: &str) -> Option<String> {
    let at = email.rfind('@')?;
    let domain = &email[at + 1..];
    if domain.is_empty() {
        return None;
    }
    Some(domain.to_ascii_lowercase())
}

/// Strip scheme, leading `www.`, and trailing `/`, then lowercase.
fn normalize_host(raw: &str) -> String {
    let mut host = raw;
    for scheme in ["https://", "http://"] {
        if let Some(rest) = host.strip_prefix(scheme) {
            host = rest;
            break;
        }
    }
    if let Some(rest) = host.strip_prefix("www.") {
        host = rest;
    }
    host.trim_end_matches('/').to_ascii_lowercase()
}
