//! corenlp-zh - Chinese tokenization through a Stanford CoreNLP process.
//!
//! A [`Tokenizer`] launches the CoreNLP pipeline once, then sends it one
//! line of text per call and turns the JSON response into [`Tokens`]:
//! surface forms, whitespace-inclusive spans, offsets and optional
//! part-of-speech, lemma and entity tags.

// Annotator uses a `from_str` method returning Option, not Result as
// std::str::FromStr requires.
#![allow(clippy::should_implement_trait)]

pub mod annotators;
pub mod config;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod tokenizer;
pub mod tokens;
pub mod translate;

pub use annotators::{Annotator, AnnotatorSet};
pub use config::TokenizerConfig;
pub use engine::{Channel, EngineCommand, ProcessChannel, Session};
pub use error::{Result, TokenizerError};
pub use normalize::{LineNormalizer, TextNormalizer};
pub use tokenizer::Tokenizer;
pub use tokens::{Token, Tokens};
pub use translate::{DictionaryTranslator, LemmaTranslator};
