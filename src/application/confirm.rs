//! Confirm-then-act gate shared by all mutating commands

use serde::Serialize;
use tracing::warn;

use crate::application::error_ext::JsonResultExt;
use crate::application::{ApplicationError, ApplicationResult};
use crate::infrastructure::traits::Terminal;

pub const MSG_CONTINUE_OR_ABORT: &str = "Enter Y to continue or N to abort ";
pub const MSG_ABORTED: &str = "Operation aborted";

/// Re-indent a JSON document with two spaces, keeping key order.
pub fn format_json(raw: &[u8]) -> ApplicationResult<String> {
    let value: serde_json::Value = serde_json::from_slice(raw).json_context("format JSON")?;
    serde_json::to_string_pretty(&value).json_context("format JSON")
}

/// Serialize `value` as two-space indented JSON.
pub fn to_pretty_json<T: Serialize>(value: &T) -> ApplicationResult<String> {
    serde_json::to_string_pretty(value).json_context("format JSON")
}

/// Print `message` followed by the Y/N prompt and read one answer.
///
/// Returns `true` only for `y` (case-insensitive, surrounding whitespace
/// ignored). Any other answer, EOF, or a read error prints the abort notice
/// and returns `false`.
pub fn confirm(term: &dyn Terminal, message: &str) -> ApplicationResult<bool> {
    term.println(&format!("{}{}", message, MSG_CONTINUE_OR_ABORT))
        .map_err(|e| ApplicationError::operation("write prompt", e))?;

    let accepted = match term.read_line() {
        Ok(answer) => answer.trim().to_lowercase() == "y",
        Err(e) => {
            warn!("error reading from terminal: {}", e);
            false
        }
    };

    if !accepted {
        term.println(MSG_ABORTED)
            .map_err(|e| ApplicationError::operation("write output", e))?;
    }
    Ok(accepted)
}

/// Print a line of command output.
pub fn print_line(term: &dyn Terminal, text: &str) -> ApplicationResult<()> {
    term.println(text)
        .map_err(|e| ApplicationError::operation("write output", e))
}
