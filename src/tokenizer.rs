//! Chinese tokenizer backed by a long-running CoreNLP process.

use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::annotators::AnnotatorSet;
use crate::config::TokenizerConfig;
use crate::engine::{Channel, ProcessChannel, Session, PROMPT};
use crate::error::{Result, TokenizerError};
use crate::normalize::{LineNormalizer, TextNormalizer};
use crate::parser;
use crate::tokens::{Token, Tokens, DEFAULT_NON_ENTITY};
use crate::translate::{DictionaryTranslator, LemmaTranslator};

/// Tokenizes text through a CoreNLP session.
///
/// Each call is a full round trip to the engine. Calls take `&mut self`, so
/// one tokenizer serves one caller at a time.
pub struct Tokenizer<C: Channel = ProcessChannel> {
    session: Session<C>,
    annotators: AnnotatorSet,
    normalizer: Box<dyn TextNormalizer>,
    translator: Arc<dyn LemmaTranslator>,
}

impl Tokenizer<ProcessChannel> {
    /// Load the lemma dictionary and launch the engine.
    pub fn new(config: &TokenizerConfig) -> Result<Self> {
        let translator: Arc<dyn LemmaTranslator> = match config.resolved_dictionary() {
            Some(path) => Arc::new(DictionaryTranslator::load(&path)?),
            None => Arc::new(DictionaryTranslator::empty()),
        };
        let session = Session::launch(config)?;

        Ok(Self::with_collaborators(
            session,
            config.annotators.clone(),
            Box::new(LineNormalizer),
            translator,
        ))
    }
}

impl<C: Channel> Tokenizer<C> {
    /// Assemble a tokenizer from an existing session and collaborators.
    pub fn with_collaborators(
        session: Session<C>,
        annotators: AnnotatorSet,
        normalizer: Box<dyn TextNormalizer>,
        translator: Arc<dyn LemmaTranslator>,
    ) -> Self {
        Self {
            session,
            annotators,
            normalizer,
            translator,
        }
    }

    pub fn annotators(&self) -> &AnnotatorSet {
        &self.annotators
    }

    pub fn session(&self) -> &Session<C> {
        &self.session
    }

    /// Tokenize and annotate `text`.
    pub fn tokenize(&mut self, text: &str) -> Result<Tokens> {
        // The prompt is the response terminator; it cannot appear in a request.
        if text.contains(PROMPT) {
            return Err(TokenizerError::PromptInText);
        }

        // "q" makes the engine quit, so answer it here.
        if let Some(tokens) = self.quit_command(text) {
            return Ok(tokens);
        }

        if text.trim().is_empty() {
            return Ok(Tokens::new(Vec::new(), self.annotators.clone()));
        }

        let clean_text = self.normalizer.normalize(text);

        let start = Instant::now();
        let raw = self.session.request(&clean_text)?;
        let raw_tokens = parser::parse_response(&raw)?;
        debug!(
            "Tokenized {} chars into {} tokens in {}ms ({} bytes of output)",
            text.chars().count(),
            raw_tokens.len(),
            start.elapsed().as_millis(),
            raw.len()
        );

        let data = parser::build_tokens(&raw_tokens, text, self.translator.as_ref());
        Ok(Tokens::new(data, self.annotators.clone()))
    }

    /// Synthesize the single-token result for a bare "q".
    fn quit_command(&self, text: &str) -> Option<Tokens> {
        let token = text.trim();
        if token.to_lowercase() != "q" {
            return None;
        }

        let byte_index = text.find(token)?;
        let index = text[..byte_index].chars().count();
        let data = vec![Token::new(
            token,
            &text[byte_index..],
            (index, index + 1),
            Some("NN".to_string()),
            Some("q".to_string()),
            Some(DEFAULT_NON_ENTITY.to_string()),
        )];
        Some(Tokens::new(data, self.annotators.clone()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::annotators::Annotator;
    use crate::engine::session::testing::ScriptedChannel;

    /// Answers like the engine would for text split into single characters.
    fn per_char_engine(line: &str) -> String {
        let tokens: Vec<String> = line
            .chars()
            .enumerate()
            .filter(|(_, c)| !c.is_whitespace())
            .map(|(i, c)| {
                let word = match c {
                    '(' => "-LRB-".to_string(),
                    ')' => "-RRB-".to_string(),
                    other => other.to_string(),
                };
                serde_json::json!({
                    "word": word,
                    "characterOffsetBegin": i,
                    "characterOffsetEnd": i + 1,
                    "pos": "NN",
                    "lemma": c.to_string(),
                    "ner": "O",
                })
                .to_string()
            })
            .collect();
        format!(
            "[main] INFO CoreNLP - annotating\n{{\"sentences\":[{{\"index\":0,\"tokens\":[{}]}}]}}\n",
            tokens.join(",")
        )
    }

    fn tokenizer(channel: ScriptedChannel, annotators: AnnotatorSet) -> Tokenizer<ScriptedChannel> {
        let session = Session::start(channel, Duration::from_secs(1), None).unwrap();
        Tokenizer::with_collaborators(
            session,
            annotators,
            Box::new(LineNormalizer),
            Arc::new(DictionaryTranslator::empty()),
        )
    }

    fn all() -> AnnotatorSet {
        [Annotator::Pos, Annotator::Lemma, Annotator::Ner]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_quit_command_is_local() {
        let mut t = tokenizer(ScriptedChannel::new(), all());
        for text in ["q", "Q", " q "] {
            let tokens = t.tokenize(text).unwrap();
            assert_eq!(tokens.len(), 1);
            let token = tokens.get(0).unwrap();
            assert_eq!(token.text(), text.trim());
            assert_eq!(token.pos(), Some("NN"));
            assert_eq!(token.lemma(), Some("q"));
            assert_eq!(token.ner(), Some("O"));
        }

        let tokens = t.tokenize(" q ").unwrap();
        let token = tokens.get(0).unwrap();
        assert_eq!(token.span(), (1, 2));
        assert_eq!(token.text_with_ws(), "q ");
        assert!(t.session().channel().sent.is_empty());
    }

    #[test]
    fn test_prompt_in_text_is_rejected() {
        let mut t = tokenizer(ScriptedChannel::new(), all());
        let err = t.tokenize("请输入 NLP> 命令").unwrap_err();
        assert!(matches!(err, TokenizerError::PromptInText));
        assert!(t.session().channel().sent.is_empty());
        assert!(t.session().is_ready());
    }

    #[test]
    fn test_round_trip_reconstructs_text() {
        let mut t = tokenizer(ScriptedChannel::with_responder(per_char_engine), all());
        for text in ["你好", "北京 欢迎 你", "他说(再见)", "第一行\n第二行  "] {
            let tokens = t.tokenize(text).unwrap();
            // Whitespace after the last token belongs to no span
            assert_eq!(tokens.concat_spans(), text.trim_end());
        }
        // Line breaks are flattened before sending
        assert_eq!(t.session().channel().sent[3], "第一行 第二行  ");
    }

    #[test]
    fn test_brackets_converted() {
        let mut t = tokenizer(ScriptedChannel::with_responder(per_char_engine), all());
        let tokens = t.tokenize("(好)").unwrap();
        assert_eq!(tokens.words(false), vec!["(", "好", ")"]);
    }

    #[test]
    fn test_idempotent() {
        let mut t = tokenizer(ScriptedChannel::with_responder(per_char_engine), all());
        let first = t.tokenize("今天天气很好").unwrap();
        let second = t.tokenize("今天天气很好").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_nihao_partitions_text() {
        let mut t = tokenizer(ScriptedChannel::with_responder(per_char_engine), all());
        let tokens = t.tokenize("你好").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens.offsets(), vec![(0, 1), (1, 2)]);
        assert_eq!(tokens.untokenize(), "你好");
        assert!(tokens.pos().unwrap().iter().all(Option::is_some));
        assert!(tokens.entities().unwrap().iter().all(Option::is_some));
    }

    #[test]
    fn test_blank_text_not_sent() {
        let mut t = tokenizer(ScriptedChannel::new(), AnnotatorSet::new());
        assert!(t.tokenize("   ").unwrap().is_empty());
        assert!(t.session().channel().sent.is_empty());
    }

    #[test]
    fn test_missing_payload() {
        let mut channel = ScriptedChannel::new();
        channel.push_reply("[main] ERROR something went wrong\n");
        let mut t = tokenizer(channel, AnnotatorSet::new());
        let err = t.tokenize("你好").unwrap_err();
        assert!(matches!(err, TokenizerError::MissingPayload));
    }

    #[test]
    fn test_annotators_carried_to_tokens() {
        let annotators: AnnotatorSet = [Annotator::Pos].into_iter().collect();
        let mut t = tokenizer(ScriptedChannel::with_responder(per_char_engine), annotators);
        let tokens = t.tokenize("好").unwrap();
        assert!(tokens.pos().is_some());
        assert!(tokens.lemmas().is_none());
        assert_eq!(tokens.annotators(), t.annotators());
    }
}
