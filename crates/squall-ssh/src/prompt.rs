//! Prompt detection heuristics.
//!
//! Network CLIs end output with a prompt like `router#`, `user@host>` or
//! `switch(config)#`. These functions scan drained shell output for such a
//! line so it can serve as the expect token for command completion.

use once_cell::sync::Lazy;
use regex::Regex;

/// Characters a prompt line may end with.
pub const PROMPT_ENDINGS: &[char] = &['#', '>', '$', '%', ':', ']', ')'];

static STANDARD_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([A-Za-z0-9\-_.@()]+[#>$%])\s*$").expect("valid pattern"));
static LOOSE_PROMPT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^\r\n]+[#>$%])\s*$").expect("valid pattern"));
static USER_AT_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@]+@([A-Za-z0-9\-_.]+)").expect("valid pattern"));
static HOST_PROMPT_CHAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9\-_.]+)[#>$%:\]]").expect("valid pattern"));
static PARENTHETICAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]+\)").expect("valid pattern"));

/// Scan drained shell output for a prompt.
///
/// Looks at the last five non-empty lines, newest first. Long lines are
/// output, not prompts, and are skipped. A prompt the device echoed several
/// times ("router# router# router#") collapses to its base.
pub fn extract_prompt(buffer: &str) -> Option<String> {
    if buffer.trim().is_empty() {
        return None;
    }

    let lines: Vec<&str> = buffer
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for line in lines.iter().rev().take(5) {
        if line.len() > 60 {
            continue;
        }

        for pattern in [&*STANDARD_PROMPT, &*LOOSE_PROMPT] {
            if let Some(caps) = pattern.captures(line) {
                let prompt = caps[1].trim().to_string();
                return Some(extract_base_prompt(&prompt).unwrap_or(prompt));
            }
        }

        if line.len() < 40 && line.ends_with(PROMPT_ENDINGS) {
            return Some((*line).to_string());
        }
    }

    None
}

/// Collapse a repeated prompt ("router# router#") to its first occurrence.
pub fn extract_base_prompt(text: &str) -> Option<String> {
    for ending in ['#', '>', '$', '%'] {
        if text.contains(ending) {
            let parts: Vec<&str> = text.split(ending).collect();
            if parts.len() > 2 {
                let base = format!("{}{}", parts[0].trim(), ending);
                if base.len() < 40 {
                    return Some(base);
                }
            }
        }
    }
    None
}

/// Extract the device hostname from a detected prompt.
///
/// Handles `user@host:~$` / `user@host>` and plain `host#` forms; config-mode
/// parentheticals (`router(config-if)#`) are stripped first.
pub fn hostname_from_prompt(prompt: &str) -> Option<String> {
    if let Some(caps) = USER_AT_HOST.captures(prompt) {
        return Some(caps[1].to_string());
    }

    let clean = PARENTHETICAL.replace_all(prompt, "");
    HOST_PROMPT_CHAR
        .captures(&clean)
        .map(|caps| caps[1].to_string())
}
