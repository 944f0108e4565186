//! Cross-reference key extraction.
//!
//! The government-stage registry links a submitted draft to the parliamentary
//! registry with a URL like
//! `http://www.sejm.gov.pl/Sejm7.nsf/agent.xsp?symbol=RPL&Id=RM-0610-136-25`.
//! The `Id` parameter is the key the parliamentary registry stores as `rclNum`.

use std::sync::LazyLock;

use regex::Regex;

static CROSS_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Id=(RM-[\d-]+)").expect("valid cross-reference regex"));

/// Pull the cross-reference key (`RM-xxxx-xxx-xx`) out of a URL-shaped string.
///
/// Returns `None` for empty input or when no key is embedded.
pub fn extract_cross_reference(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }
    CROSS_REFERENCE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
