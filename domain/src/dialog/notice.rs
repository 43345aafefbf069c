//! User-facing notices emitted around a turn.
//!
//! Notices are HTML formatted; transports that cannot render HTML receive
//! them through the plain-text fallback path.

use crate::mode::chat_mode::ChatMode;

/// Text of the placeholder message that later receives answer edits
pub const PLACEHOLDER: &str = "*****Please Wait*****";

/// Sent once when a running turn is cancelled
pub const CANCELLED: &str = "✅ Canceled";

/// Sent when a message arrives while the previous one is still generating
pub const STILL_ANSWERING: &str =
    "⏳ Please <b>wait</b> for a reply to the previous message\nOr you can /cancel it";

pub fn new_dialog_due_to_timeout(mode: &ChatMode) -> String {
    format!(
        "Starting new dialog due to timeout (<b>{}</b> mode) ✅",
        mode.name
    )
}

pub fn new_dialog(mode: &ChatMode) -> String {
    format!("Starting new dialog (<b>{}</b> mode) ✅", mode.name)
}

/// Notice appended after an answer whose context had to be shortened.
///
/// Returns `None` when nothing was dropped.
pub fn context_trimmed(dropped: usize) -> Option<String> {
    match dropped {
        0 => None,
        1 => Some(
            "✍️ <i>Note:</i> Your current dialog is too long, so your <b>first message</b> was removed from the context.\n Send /new command to start new dialog"
                .to_string(),
        ),
        n => Some(format!(
            "✍️ <i>Note:</i> Your current dialog is too long, so <b>{n} first messages</b> were removed from the context.\n Send /new command to start new dialog"
        )),
    }
}

/// Diagnostic sent to the user when a turn fails.
pub fn turn_failed(reason: &str, details: &str) -> String {
    format!("Something went wrong during completion. Reason: {reason}\n\nDetails: {details}")
}
