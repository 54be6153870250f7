//! Token records and the collection returned by the tokenizer.

use serde::Serialize;

use crate::annotators::{Annotator, AnnotatorSet};

/// Entity tag the engine assigns to tokens outside any named entity.
pub const DEFAULT_NON_ENTITY: &str = "O";

/// A single annotated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    text: String,
    text_with_ws: String,
    span: (usize, usize),
    pos: Option<String>,
    lemma: Option<String>,
    ner: Option<String>,
}

impl Token {
    pub fn new(
        text: impl Into<String>,
        text_with_ws: impl Into<String>,
        span: (usize, usize),
        pos: Option<String>,
        lemma: Option<String>,
        ner: Option<String>,
    ) -> Self {
        Self {
            text: text.into(),
            text_with_ws: text_with_ws.into(),
            span,
            pos,
            lemma,
            ner,
        }
    }

    /// Surface form, with bracket markers already converted.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Original text from this token's start up to the next token's start.
    pub fn text_with_ws(&self) -> &str {
        &self.text_with_ws
    }

    /// Engine character offsets `(begin, end)`.
    pub fn span(&self) -> (usize, usize) {
        self.span
    }

    pub fn pos(&self) -> Option<&str> {
        self.pos.as_deref()
    }

    /// Translated lemma.
    pub fn lemma(&self) -> Option<&str> {
        self.lemma.as_deref()
    }

    pub fn ner(&self) -> Option<&str> {
        self.ner.as_deref()
    }
}

/// Ordered tokens for one piece of text plus the annotators that produced them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tokens {
    data: Vec<Token>,
    annotators: AnnotatorSet,
    non_entity: String,
}

impl Tokens {
    pub fn new(data: Vec<Token>, annotators: AnnotatorSet) -> Self {
        Self {
            data,
            annotators,
            non_entity: DEFAULT_NON_ENTITY.to_string(),
        }
    }

    /// Override the tag treated as "not an entity" by [`Tokens::entity_groups`].
    pub fn with_non_entity(mut self, tag: impl Into<String>) -> Self {
        self.non_entity = tag.into();
        self
    }

    pub fn annotators(&self) -> &AnnotatorSet {
        &self.annotators
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.data.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.data.iter()
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.data
    }

    /// A copy of tokens `start..end`, keeping annotators and options.
    ///
    /// Bounds are clamped to the collection.
    pub fn slice(&self, start: usize, end: usize) -> Tokens {
        let end = end.min(self.data.len());
        let start = start.min(end);
        Tokens {
            data: self.data[start..end].to_vec(),
            annotators: self.annotators.clone(),
            non_entity: self.non_entity.clone(),
        }
    }

    /// Reassemble the original text from the whitespace-inclusive spans.
    pub fn untokenize(&self) -> String {
        self.concat_spans().trim().to_string()
    }

    /// Concatenation of every span without trimming.
    ///
    /// For offset-invertible tokenization this equals the input text, minus
    /// anything before the first token.
    pub fn concat_spans(&self) -> String {
        self.data.iter().map(|t| t.text_with_ws.as_str()).collect()
    }

    pub fn words(&self, uncased: bool) -> Vec<String> {
        self.data
            .iter()
            .map(|t| {
                if uncased {
                    t.text.to_lowercase()
                } else {
                    t.text.clone()
                }
            })
            .collect()
    }

    pub fn offsets(&self) -> Vec<(usize, usize)> {
        self.data.iter().map(|t| t.span).collect()
    }

    /// Part-of-speech tags, or `None` if pos was not requested.
    pub fn pos(&self) -> Option<Vec<Option<&str>>> {
        self.project(Annotator::Pos, Token::pos)
    }

    /// Translated lemmas, or `None` if lemma was not requested.
    pub fn lemmas(&self) -> Option<Vec<Option<&str>>> {
        self.project(Annotator::Lemma, Token::lemma)
    }

    /// Entity tags, or `None` if ner was not requested.
    pub fn entities(&self) -> Option<Vec<Option<&str>>> {
        self.project(Annotator::Ner, Token::ner)
    }

    fn project<'a>(
        &'a self,
        annotator: Annotator,
        field: fn(&'a Token) -> Option<&'a str>,
    ) -> Option<Vec<Option<&'a str>>> {
        if !self.annotators.contains(annotator) {
            return None;
        }
        Some(self.data.iter().map(field).collect())
    }

    /// All n-grams of length 1 through `n` as half-open `(start, end)` token ranges.
    ///
    /// `skip` receives the words of each candidate gram; grams for which it
    /// returns true are dropped.
    pub fn ngrams<F>(&self, n: usize, uncased: bool, skip: F) -> Vec<(usize, usize)>
    where
        F: Fn(&[String]) -> bool,
    {
        let words = self.words(uncased);
        let mut grams = Vec::new();
        for start in 0..words.len() {
            let last = (start + n).min(words.len());
            for end in start + 1..=last {
                if !skip(&words[start..end]) {
                    grams.push((start, end));
                }
            }
        }
        grams
    }

    /// Like [`Tokens::ngrams`], with each gram joined into a space-separated string.
    pub fn ngram_strings<F>(&self, n: usize, uncased: bool, skip: F) -> Vec<String>
    where
        F: Fn(&[String]) -> bool,
    {
        let words = self.words(uncased);
        self.ngrams(n, uncased, skip)
            .into_iter()
            .map(|(start, end)| words[start..end].join(" "))
            .collect()
    }

    /// Group consecutive tokens that share an entity tag.
    ///
    /// Returns `(text, tag)` for each run whose tag is not the non-entity tag,
    /// or `None` when ner was not requested.
    pub fn entity_groups(&self) -> Option<Vec<(String, String)>> {
        let entities = self.entities()?;
        let mut groups = Vec::new();
        let mut idx = 0;
        while idx < entities.len() {
            match entities[idx] {
                Some(tag) if tag != self.non_entity => {
                    let start = idx;
                    while idx < entities.len() && entities[idx] == Some(tag) {
                        idx += 1;
                    }
                    groups.push((self.slice(start, idx).untokenize(), tag.to_string()));
                }
                _ => idx += 1,
            }
        }
        Some(groups)
    }
}

impl<'a> IntoIterator for &'a Tokens {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl IntoIterator for Tokens {
    type Item = Token;
    type IntoIter = std::vec::IntoIter<Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}
