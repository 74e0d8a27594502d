//! Input validation for untrusted chat text

use crate::{Result, YebotError};

/// Longest message the platform delivers
pub const MAX_INPUT_LENGTH: usize = 2000;

/// Validate input string
pub fn validate_input(input: &str, max_length: usize) -> Result<()> {
    let length = input.chars().count();
    if length > max_length {
        return Err(YebotError::validation(format!(
            "Input too long: {} > {}",
            length, max_length
        )));
    }

    if input.contains('\0') {
        return Err(YebotError::validation("Input contains null bytes"));
    }

    // Newlines and tabs are normal in chat messages
    if input
        .chars()
        .any(|ch| ch.is_control() && ch != '\n' && ch != '\t' && ch != '\r')
    {
        return Err(YebotError::validation(
            "Input contains invalid control characters",
        ));
    }

    Ok(())
}
