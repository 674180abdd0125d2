//! Macro text parsing.
//!
//! A macro is free text, one step per line.  Keywords are matched
//! case-insensitively against the trimmed line:
//!
//! ```text
//! RETURN | ENTER          -> carriage return (0x0D)
//! TAB                     -> 0x09
//! ESCAPE | ESC            -> 0x1B
//! SLEEP=<seconds>         -> pause, e.g. SLEEP=1.5
//! WAITFOR=<text>[,<secs>] -> wait until a sink shows <text> (default 30 s)
//! CTRL+<X>                -> control character, e.g. CTRL+C = 0x03
//! anything else           -> sent as literal text
//! ```
//!
//! Blank lines and malformed `SLEEP=` lines produce no step.

use std::fmt;

use tracing::debug;

/// Timeout used by `WAITFOR=` when none (or an invalid one) is given.
pub const DEFAULT_WAIT_TIMEOUT_SECS: f64 = 30.0;

/// One parsed unit of macro execution.
#[derive(Debug, Clone, PartialEq)]
pub enum MacroStep {
    Text(String),
    ReturnKey,
    TabKey,
    EscapeKey,
    Sleep(f64),
    WaitFor { text: String, timeout_secs: f64 },
    ControlKey(char),
}

impl MacroStep {
    /// Bytes sent to the sinks for this step.
    ///
    /// `Sleep` and `WaitFor` only affect timing and produce no bytes.  A
    /// control key outside `@`..=`_` (after upper-casing) has no control
    /// code and produces no bytes either.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            MacroStep::Text(text) => text.as_bytes().to_vec(),
            MacroStep::ReturnKey => vec![0x0D],
            MacroStep::TabKey => vec![0x09],
            MacroStep::EscapeKey => vec![0x1B],
            MacroStep::ControlKey(c) => {
                let upper = c.to_ascii_uppercase();
                if ('@'..='_').contains(&upper) {
                    vec![upper as u8 - 64]
                } else {
                    Vec::new()
                }
            }
            MacroStep::Sleep(_) | MacroStep::WaitFor { .. } => Vec::new(),
        }
    }

    /// Returns `true` for steps that only control timing.
    pub fn is_control_flow(&self) -> bool {
        matches!(self, MacroStep::Sleep(_) | MacroStep::WaitFor { .. })
    }
}

impl fmt::Display for MacroStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroStep::Text(text) => write!(f, "Text {text:?}"),
            MacroStep::ReturnKey => f.write_str("Return"),
            MacroStep::TabKey => f.write_str("Tab"),
            MacroStep::EscapeKey => f.write_str("Escape"),
            MacroStep::Sleep(secs) => write!(f, "Sleep {secs}s"),
            MacroStep::WaitFor { text, timeout_secs } => {
                write!(f, "Wait for {text:?} (timeout {timeout_secs}s)")
            }
            MacroStep::ControlKey(c) => write!(f, "Ctrl+{}", c.to_ascii_uppercase()),
        }
    }
}

/// Parse a single macro line.  Returns `None` for lines that produce no step.
pub fn parse_step(line: &str) -> Option<MacroStep> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    for (keyword, step) in [
        ("RETURN", MacroStep::ReturnKey),
        ("ENTER", MacroStep::ReturnKey),
        ("TAB", MacroStep::TabKey),
        ("ESCAPE", MacroStep::EscapeKey),
        ("ESC", MacroStep::EscapeKey),
    ] {
        if trimmed.eq_ignore_ascii_case(keyword) {
            return Some(step);
        }
    }

    if let Some(value) = strip_prefix_ignore_case(trimmed, "SLEEP=") {
        return match value.trim().parse::<f64>() {
            Ok(secs) if secs.is_finite() && secs >= 0.0 => Some(MacroStep::Sleep(secs)),
            _ => {
                debug!(line = trimmed, "dropping macro line with invalid sleep value");
                None
            }
        };
    }

    if let Some(value) = strip_prefix_ignore_case(trimmed, "WAITFOR=") {
        return Some(parse_wait_for(value));
    }

    if trimmed.chars().count() == 6 {
        if let Some(rest) = strip_prefix_ignore_case(trimmed, "CTRL+") {
            if let Some(c) = rest.chars().next() {
                return Some(MacroStep::ControlKey(c));
            }
        }
    }

    Some(MacroStep::Text(trimmed.to_string()))
}

/// Parse a whole macro, skipping lines that produce no step.
pub fn parse_macro(content: &str) -> Vec<MacroStep> {
    content.lines().filter_map(parse_step).collect()
}

/// `<text>` or `<text>,<timeout>`.  The timeout is taken from the last
/// comma only if it parses as a non-negative number; otherwise the whole
/// value is the text and the default timeout applies.
fn parse_wait_for(value: &str) -> MacroStep {
    if let Some((text, timeout)) = value.rsplit_once(',') {
        if let Ok(secs) = timeout.trim().parse::<f64>() {
            if secs.is_finite() && secs >= 0.0 {
                return MacroStep::WaitFor {
                    text: text.to_string(),
                    timeout_secs: secs,
                };
            }
        }
    }
    MacroStep::WaitFor {
        text: value.to_string(),
        timeout_secs: DEFAULT_WAIT_TIMEOUT_SECS,
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        s.get(prefix.len()..)
    } else {
        None
    }
}
