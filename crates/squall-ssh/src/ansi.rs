use once_cell::sync::Lazy;
use regex::Regex;

/// CSI sequences, charset-selection escapes, bell, and the non-printable
/// control range (tab/LF/CR kept).
static ANSI_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9;?]*[a-zA-Z]|\x1b[()][AB012]|\x07|[\x00-\x08\x0B\x0C\x0E-\x1F]")
        .expect("ansi pattern is valid")
});

/// Remove ANSI escape sequences and control characters.
///
/// Applied to every shell read before any prompt scanning or storage.
/// Idempotent: filtering already-filtered text is a no-op.
pub fn filter_ansi(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    ANSI_PATTERN.replace_all(text, "").into_owned()
}
