//! Selector and string sanitization.

use once_cell::sync::Lazy;
use regex::Regex;

static INJECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // script-injection vectors
        r"(?i)javascript\s*:",
        r"(?i)\bon\w+\s*=",
        r"(?i)\beval\s*\(",
        r"(?i)\bFunction\s*\(",
        r"(?i)<\s*/?\s*script[^>]*>?",
        // template / double-brace injection
        r"\$\{",
        r"\{\{",
        r"\}\}",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("sanitizer pattern"))
    .collect()
});

/// Strip script-injection vectors and control characters from a selector.
///
/// Runs to a fixpoint so the result is idempotent: removing one occurrence
/// can splice a new one together (`javajavascript:script:`), so a single
/// pass is not enough.
pub fn sanitize_selector(input: &str) -> String {
    let mut current: String = input
        .chars()
        .filter(|ch| !ch.is_control())
        .collect::<String>()
        .trim()
        .to_string();

    loop {
        let mut next = current.clone();
        for pattern in INJECTION_PATTERNS.iter() {
            next = pattern.replace_all(&next, "").into_owned();
        }
        if next == current {
            return current;
        }
        current = next;
    }
}
