//! Boundary checks on inbound messages.
//!
//! A message that fails here is rejected with
//! [`SageError::InvalidRequest`] before it reaches the pipeline; it is never
//! classified, looked up, searched or recorded.

use crate::error::{Result, SageError};

/// Check a text message.
///
/// Rejects:
///   - empty or whitespace-only text
///   - text made only of control characters
///   - text longer than `max_chars` characters
///
/// # Errors
///
/// Returns [`SageError::InvalidRequest`] naming the first failed rule.
pub fn validate_message(message: &str, max_chars: usize) -> Result<()> {
    if message.trim().is_empty() {
        return Err(SageError::invalid("message is empty"));
    }

    if message.chars().all(|c| c.is_control() || c.is_whitespace()) {
        return Err(SageError::invalid("message contains only control characters"));
    }

    let len = message.chars().count();
    if len > max_chars {
        return Err(SageError::invalid(format!(
            "message too long: {len} chars (max: {max_chars})"
        )));
    }

    Ok(())
}

/// Decode a raw payload as UTF-8 text.
///
/// # Errors
///
/// Returns [`SageError::InvalidRequest`] if the bytes are not valid UTF-8.
pub fn decode_message(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| {
        SageError::invalid(format!("message is not UTF-8 text (invalid byte at {})", e.valid_up_to()))
    })
}
