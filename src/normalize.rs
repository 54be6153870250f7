//! Pre-cleaning applied to text before it is sent to the engine.
//!
//! The engine reports offsets against the text it received while spans are
//! cut from the caller's original text, so a normalizer must never change
//! the number of characters.

/// Cleans text before it is written to the engine.
pub trait TextNormalizer: Send + Sync {
    /// Return text of the same character length, safe to send as one line.
    fn normalize(&self, text: &str) -> String;
}

/// Default normalizer: line breaks and other control characters become spaces.
///
/// A raw newline would end the request line early and leave the rest of the
/// text queued as a second request.
#[derive(Debug, Clone, Copy, Default)]
pub struct LineNormalizer;

impl TextNormalizer for LineNormalizer {
    fn normalize(&self, text: &str) -> String {
        text.chars()
            .map(|c| if is_line_breaking(c) { ' ' } else { c })
            .collect()
    }
}

fn is_line_breaking(c: char) -> bool {
    c.is_control() || matches!(c, '\u{2028}' | '\u{2029}')
}
