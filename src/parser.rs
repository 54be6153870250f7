//! Engine response parsing.
//!
//! The engine prints one compact JSON document per request, possibly
//! preceded by log lines. We skip to the start of the document, read exactly
//! one JSON value and flatten its sentences into a single token sequence.

use serde::Deserialize;

use crate::error::{Result, TokenizerError};
use crate::tokens::Token;
use crate::translate::LemmaTranslator;

/// Leading bytes of every engine response document.
pub const PAYLOAD_MARKER: &[u8] = b"{\"sentences\":";

#[derive(Debug, Deserialize)]
struct Payload {
    sentences: Vec<Sentence>,
}

#[derive(Debug, Deserialize)]
struct Sentence {
    #[serde(default)]
    tokens: Vec<RawToken>,
}

/// A token as reported by the engine, before span and lemma processing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RawToken {
    pub word: String,
    #[serde(rename = "characterOffsetBegin")]
    pub begin: usize,
    #[serde(rename = "characterOffsetEnd")]
    pub end: usize,
    #[serde(default)]
    pub pos: Option<String>,
    #[serde(default)]
    pub lemma: Option<String>,
    #[serde(default)]
    pub ner: Option<String>,
}

/// Extract the engine tokens from raw captured output, in document order.
pub fn parse_response(raw: &[u8]) -> Result<Vec<RawToken>> {
    let start = find_marker(raw).ok_or(TokenizerError::MissingPayload)?;

    // Only the first value is read; whatever the engine logged after it is ignored.
    let payload: Payload = serde_json::Deserializer::from_slice(&raw[start..])
        .into_iter::<Payload>()
        .next()
        .ok_or(TokenizerError::MissingPayload)??;

    Ok(payload
        .sentences
        .into_iter()
        .flat_map(|s| s.tokens)
        .collect())
}

fn find_marker(raw: &[u8]) -> Option<usize> {
    raw.windows(PAYLOAD_MARKER.len())
        .position(|window| window == PAYLOAD_MARKER)
}

/// Convert engine tokens into token records against the caller's original text.
///
/// Each token's span text runs from its own begin offset to the next token's
/// begin offset, so trailing whitespace belongs to the token before it. The
/// last token ends at its own end offset.
pub fn build_tokens(
    raw_tokens: &[RawToken],
    text: &str,
    translator: &dyn LemmaTranslator,
) -> Vec<Token> {
    let index = Utf16Index::new(text);

    raw_tokens
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let ws_end = raw_tokens
                .get(i + 1)
                .map(|next| next.begin)
                .unwrap_or(raw.end);

            Token::new(
                convert_bracket(&raw.word),
                index.slice(raw.begin, ws_end),
                (raw.begin, raw.end),
                raw.pos.clone(),
                translator.translate(raw.lemma.as_deref(), raw.pos.as_deref()),
                raw.ner.clone(),
            )
        })
        .collect()
}

/// Map the engine's escaped bracket markers back to literal brackets.
pub fn convert_bracket(word: &str) -> &str {
    match word {
        "-LRB-" => "(",
        "-RRB-" => ")",
        "-LSB-" => "[",
        "-RSB-" => "]",
        "-LCB-" => "{",
        "-RCB-" => "}",
        other => other,
    }
}

/// Byte positions of a string indexed by UTF-16 code unit offset.
///
/// The engine runs on the JVM and counts offsets in UTF-16 units, which
/// differ from char counts for anything outside the BMP.
struct Utf16Index<'a> {
    text: &'a str,
    bytes_at: Vec<usize>,
}

impl<'a> Utf16Index<'a> {
    fn new(text: &'a str) -> Self {
        let mut bytes_at = Vec::with_capacity(text.len() + 1);
        for (byte, c) in text.char_indices() {
            for _ in 0..c.len_utf16() {
                bytes_at.push(byte);
            }
        }
        bytes_at.push(text.len());
        Self { text, bytes_at }
    }

    /// Text between two UTF-16 offsets, clamped to the end of the string.
    fn slice(&self, begin: usize, end: usize) -> &'a str {
        let last = self.bytes_at.len() - 1;
        let begin = self.bytes_at[begin.min(last)];
        let end = self.bytes_at[end.min(last)];
        if begin >= end {
            return "";
        }
        &self.text[begin..end]
    }
}
