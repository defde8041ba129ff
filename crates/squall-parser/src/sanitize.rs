use crate::trace::ParseTrace;

/// Strip command echo and trailing prompt from raw CLI output.
///
/// Interactive shell sessions include the command echo on the first line(s),
/// the actual output, and the device prompt on the last line. Strict NTC
/// templates reject unrecognized lines like the echo, causing silent parse
/// failures, so both ends are trimmed before any parser sees the text.
///
/// At most three leading lines are considered for echo matching, and at most
/// one trailing short prompt-looking line (ends in a prompt char, under 60
/// chars, does not start with a digit) is removed.
pub fn sanitize_cli_output(
    raw: &str,
    command: Option<&str>,
    mut trace: Option<&mut ParseTrace>,
) -> String {
    if raw.is_empty() {
        return String::new();
    }

    let mut lines: Vec<&str> = raw.lines().collect();
    let mut stripped_top = 0;
    let mut stripped_bottom = 0;

    // Command echo.
    if let Some(command) = command {
        let cmd = command.trim();
        if !cmd.is_empty() {
            for i in 0..lines.len().min(3) {
                let line = lines[i].trim();
                if line.is_empty() {
                    continue;
                }
                if line == cmd || line.ends_with(cmd) || line.contains(cmd) {
                    stripped_top = i + 1;
                    lines.drain(..=i);
                    break;
                }
            }
        }
    }

    // Trailing blanks.
    while lines.last().map_or(false, |l| l.trim().is_empty()) {
        lines.pop();
        stripped_bottom += 1;
    }

    // Trailing prompt.
    if let Some(last) = lines.last() {
        let last = last.trim();
        if !last.is_empty()
            && last.len() < 60
            && last.ends_with(['#', '>', '$', '%', ')'])
            && !last.starts_with(|c: char| c.is_ascii_digit())
        {
            lines.pop();
            stripped_bottom += 1;
        }
    }

    let result = lines.join("\n");
    let total = stripped_top + stripped_bottom;
    if total > 0 {
        if let Some(trace) = trace.as_deref_mut() {
            trace.sanitized(result.len(), total);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    const OUTPUT: &str = "show ip interface brief\n\
Interface                  IP-Address      OK? Method Status                Protocol\n\
Ethernet1/0                172.16.1.2      YES NVRAM  up                    up\n\
\n\
router1#";

    #[test]
    fn strips_echo_and_prompt() {
        let cleaned = sanitize_cli_output(OUTPUT, Some("show ip interface brief"), None);
        assert!(cleaned.starts_with("Interface"));
        assert!(!cleaned.contains("router1#"));
        assert!(cleaned.ends_with("up"));
    }

    #[test]
    fn idempotent() {
        let once = sanitize_cli_output(OUTPUT, Some("show ip interface brief"), None);
        let twice = sanitize_cli_output(&once, Some("show ip interface brief"), None);
        assert_eq!(once, twice);
    }

    #[test]
    fn keeps_digit_leading_last_line() {
        let raw = "Interface Status\n172.16.1.2 up (connected)";
        let cleaned = sanitize_cli_output(raw, None, None);
        // Ends with ')' but starts with a digit, so it is data, not a prompt.
        assert!(cleaned.contains("172.16.1.2"));
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(sanitize_cli_output("", Some("show version"), None), "");
    }

    #[test]
    fn no_command_still_trims_prompt() {
        let raw = "some output\nswitch>";
        assert_eq!(sanitize_cli_output(raw, None, None), "some output");
    }

    #[test]
    fn long_last_line_not_treated_as_prompt() {
        let long = format!("data line\n{}#", "y".repeat(70));
        let cleaned = sanitize_cli_output(&long, None, None);
        assert!(cleaned.contains(&"y".repeat(70)));
    }
}
