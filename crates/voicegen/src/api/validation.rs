/// Hard upper bound on job text, in characters. `max_text_chars` in the
/// config may lower it but never raise it.
pub const MAX_TEXT_CHARS: usize = 2000;

/// Why submitted text was refused. Rejected text never reaches the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextRejection {
    Empty,
    TooLong,
}

impl TextRejection {
    /// Value of the `error` query flag on the redirect.
    pub fn as_flag(&self) -> &'static str {
        match self {
            TextRejection::Empty => "empty",
            TextRejection::TooLong => "toolong",
        }
    }

    pub fn redirect_target(&self) -> String {
        format!("/?error={}", self.as_flag())
    }
}

/// Trims `text` and checks it holds 1..=`max_chars` characters, with
/// `max_chars` capped at [`MAX_TEXT_CHARS`].
pub fn validate_text(text: &str, max_chars: usize) -> Result<&str, TextRejection> {
    let max_chars = max_chars.min(MAX_TEXT_CHARS);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TextRejection::Empty);
    }
    if trimmed.chars().count() > max_chars {
        return Err(TextRejection::TooLong);
    }
    Ok(trimmed)
}
