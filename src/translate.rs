//! Lemma translation.
//!
//! Chinese lemmas are the surface form itself, which makes them useless as
//! a normalized feature. The translator swaps them for a dictionary gloss,
//! or failing that for the pinyin reading of each character.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, TokenizerError};

/// Key used inside a part-of-speech map for the entry that applies to any tag.
pub const ANY_POS: &str = "*";

/// Translates engine lemmas into the form used downstream.
pub trait LemmaTranslator: Send + Sync {
    /// Translate a lemma given its part-of-speech tag. `None` in, `None` out.
    fn translate(&self, lemma: Option<&str>, pos: Option<&str>) -> Option<String>;
}

/// A dictionary entry: either one gloss, or glosses keyed by part of speech.
///
/// Examples:
/// - `"hello"` - used for every tag
/// - `{"VV": "hit", "*": "do"}` - "hit" for verbs, "do" otherwise
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
enum Entry {
    Plain(String),
    ByPos(HashMap<String, String>),
}

impl Entry {
    fn lookup(&self, pos: Option<&str>) -> Option<&str> {
        match self {
            Entry::Plain(gloss) => Some(gloss.as_str()),
            Entry::ByPos(by_pos) => pos
                .and_then(|p| by_pos.get(p))
                .or_else(|| by_pos.get(ANY_POS))
                .map(String::as_str),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct DictionaryFile {
    #[serde(default)]
    words: HashMap<String, Entry>,
    #[serde(default)]
    pinyin: HashMap<String, String>,
}

/// Dictionary-backed translator with a per-character pinyin fallback.
#[derive(Debug, Default)]
pub struct DictionaryTranslator {
    words: HashMap<String, Entry>,
    pinyin: HashMap<char, String>,
}

impl DictionaryTranslator {
    /// A translator with no entries: every lemma passes through unchanged.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a dictionary asset from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TokenizerError::Dictionary(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let translator = Self::from_json(&contents)?;
        tracing::info!(
            "Loaded lemma dictionary from {} ({} words, {} readings)",
            path.display(),
            translator.words.len(),
            translator.pinyin.len()
        );
        Ok(translator)
    }

    /// Parse a dictionary asset from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let invalid =
            |e: serde_json::Error| TokenizerError::Dictionary(format!("Invalid dictionary: {}", e));
        // Every field is defaulted, so serde would also accept a JSON array.
        let value: serde_json::Value = serde_json::from_str(json).map_err(invalid)?;
        if !value.is_object() {
            return Err(TokenizerError::Dictionary(
                "Invalid dictionary: expected a JSON object".to_string(),
            ));
        }
        let file: DictionaryFile = serde_json::from_value(value).map_err(invalid)?;

        let mut pinyin = HashMap::with_capacity(file.pinyin.len());
        for (key, reading) in file.pinyin {
            let mut chars = key.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => {
                    pinyin.insert(c, reading);
                }
                _ => {
                    return Err(TokenizerError::Dictionary(format!(
                        "Pinyin keys must be single characters, got {:?}",
                        key
                    )))
                }
            }
        }

        Ok(Self {
            words: file.words,
            pinyin,
        })
    }

    /// Pinyin reading of a string; characters without a reading are kept as-is.
    pub fn transliterate(&self, text: &str) -> String {
        text.chars()
            .map(|c| match self.pinyin.get(&c) {
                Some(reading) => reading.clone(),
                None => c.to_string(),
            })
            .collect()
    }
}

impl LemmaTranslator for DictionaryTranslator {
    fn translate(&self, lemma: Option<&str>, pos: Option<&str>) -> Option<String> {
        let lemma = lemma?;
        let gloss = self.words.get(lemma).and_then(|entry| entry.lookup(pos));
        Some(match gloss {
            Some(gloss) => gloss.to_string(),
            None => self.transliterate(lemma),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DictionaryTranslator {
        DictionaryTranslator::from_json(
            r#"{
                "words": {
                    "你好": "hello",
                    "打": {"VV": "hit", "*": "do"},
                    "行": {"VA": "capable"}
                },
                "pinyin": {"北": "bei", "京": "jing", "行": "xing"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_none_lemma() {
        assert_eq!(sample().translate(None, Some("NN")), None);
    }

    #[test]
    fn test_lookup_precedence() {
        let t = sample();
        assert_eq!(t.translate(Some("你好"), Some("IJ")).as_deref(), Some("hello"));
        assert_eq!(t.translate(Some("打"), Some("VV")).as_deref(), Some("hit"));
        assert_eq!(t.translate(Some("打"), Some("NN")).as_deref(), Some("do"));
        assert_eq!(t.translate(Some("打"), None).as_deref(), Some("do"));
        // No matching tag and no wildcard falls through to pinyin
        assert_eq!(t.translate(Some("行"), Some("VV")).as_deref(), Some("xing"));
    }

    #[test]
    fn test_pinyin_fallback() {
        let t = sample();
        assert_eq!(t.translate(Some("北京"), Some("NR")).as_deref(), Some("beijing"));
        assert_eq!(t.translate(Some("北京2"), None).as_deref(), Some("beijing2"));
    }

    #[test]
    fn test_empty_is_identity() {
        let t = DictionaryTranslator::empty();
        assert_eq!(t.translate(Some("北京"), None).as_deref(), Some("北京"));
    }

    #[test]
    fn test_rejects_bad_assets() {
        assert!(DictionaryTranslator::from_json("[]").is_err());
        assert!(DictionaryTranslator::from_json("\"words\"").is_err());
        let err = DictionaryTranslator::from_json(r#"[{"你好": "hello"}, {"北": "bei"}]"#)
            .unwrap_err();
        assert!(err.to_string().contains("expected a JSON object"));
        let err = DictionaryTranslator::from_json(r#"{"pinyin": {"北京": "beijing"}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("single characters"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = DictionaryTranslator::load(Path::new("/nonexistent/zh_dict.json")).unwrap_err();
        assert!(matches!(err, TokenizerError::Dictionary(_)));
    }
}
