//! Redaction of captured candidate output.
//!
//! Console text is attached to results that end up in storage and in front
//! of reviewers, so anything that looks like a credential is masked and the
//! text is capped before it leaves the engine.

use lazy_static::lazy_static;
use regex::Regex;

pub const REDACTED: &str = "[REDACTED]";

/// Upper bound on console text attached to a result
pub const MAX_CONSOLE_BYTES: usize = 64 * 1024;

const TRUNCATION_NOTICE: &str = "\n[output truncated]";

lazy_static! {
    // A word containing a sensitive stem, plus an optional `: value` / `= value`
    static ref SENSITIVE: Regex = Regex::new(
        r"(?i)[a-z0-9_\-]*(password|passwd|secret|token|key)[a-z0-9_\-]*(\s*[:=]\s*\S+)?"
    )
    .expect("redaction pattern must compile");
}

/// Mask credential-looking fragments
pub fn redact(text: &str) -> String {
    SENSITIVE.replace_all(text, REDACTED).into_owned()
}

/// Redact, then cap to `max_bytes` on a char boundary
pub fn sanitize(text: &str, max_bytes: usize) -> String {
    let redacted = redact(text);
    if redacted.len() <= max_bytes {
        return redacted;
    }

    let mut cut = max_bytes;
    while !redacted.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}{}", &redacted[..cut], TRUNCATION_NOTICE)
}

/// Console text as attached to a result: `None` when nothing was printed
pub fn console_output(text: &str) -> Option<String> {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        None
    } else {
        Some(sanitize(trimmed, MAX_CONSOLE_BYTES))
    }
}
