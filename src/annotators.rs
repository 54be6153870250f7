//! Annotator selection.
//!
//! Callers request a subset of {pos, lemma, ner}. The engine pipeline is
//! derived from that request because each annotator depends on the ones
//! before it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Annotators a caller can request on top of tokenization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Annotator {
    /// Part-of-speech tagging.
    Pos,
    /// Lemmatization.
    Lemma,
    /// Named-entity recognition.
    Ner,
}

impl Annotator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Annotator::Pos => "pos",
            Annotator::Lemma => "lemma",
            Annotator::Ner => "ner",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pos" => Some(Annotator::Pos),
            "lemma" => Some(Annotator::Lemma),
            "ner" => Some(Annotator::Ner),
            _ => None,
        }
    }
}

impl std::fmt::Display for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The set of annotators a caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotatorSet(BTreeSet<Annotator>);

impl AnnotatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"pos,ner"`.
    ///
    /// Returns the offending name if one is not recognized.
    pub fn parse_list(list: &str) -> Result<Self, String> {
        let mut set = Self::new();
        for name in list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let annotator = Annotator::from_str(name).ok_or_else(|| name.to_string())?;
            set.insert(annotator);
        }
        Ok(set)
    }

    pub fn insert(&mut self, annotator: Annotator) -> bool {
        self.0.insert(annotator)
    }

    pub fn contains(&self, annotator: Annotator) -> bool {
        self.0.contains(&annotator)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Annotator> + '_ {
        self.0.iter().copied()
    }

    /// Engine annotator names, in pipeline order.
    ///
    /// `tokenize` and `ssplit` always run. Requesting a later stage pulls in
    /// every stage it depends on: ner implies lemma and pos, lemma implies pos.
    pub fn pipeline(&self) -> Vec<&'static str> {
        let mut stages = vec!["tokenize", "ssplit"];
        if self.contains(Annotator::Ner) {
            stages.extend(["pos", "lemma", "ner"]);
        } else if self.contains(Annotator::Lemma) {
            stages.extend(["pos", "lemma"]);
        } else if self.contains(Annotator::Pos) {
            stages.push("pos");
        }
        stages
    }
}

impl FromIterator<Annotator> for AnnotatorSet {
    fn from_iter<I: IntoIterator<Item = Annotator>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl std::fmt::Display for AnnotatorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.iter().map(|a| a.as_str()).collect();
        write!(f, "{}", names.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_precedence() {
        let none = AnnotatorSet::new();
        assert_eq!(none.pipeline(), vec!["tokenize", "ssplit"]);

        let pos: AnnotatorSet = [Annotator::Pos].into_iter().collect();
        assert_eq!(pos.pipeline(), vec!["tokenize", "ssplit", "pos"]);

        let lemma: AnnotatorSet = [Annotator::Lemma].into_iter().collect();
        assert_eq!(lemma.pipeline(), vec!["tokenize", "ssplit", "pos", "lemma"]);

        // ner wins regardless of what else is requested
        let ner: AnnotatorSet = [Annotator::Ner, Annotator::Pos].into_iter().collect();
        assert_eq!(
            ner.pipeline(),
            vec!["tokenize", "ssplit", "pos", "lemma", "ner"]
        );
    }

    #[test]
    fn test_parse_list() {
        let set = AnnotatorSet::parse_list("ner, POS,").unwrap();
        assert!(set.contains(Annotator::Ner));
        assert!(set.contains(Annotator::Pos));
        assert!(!set.contains(Annotator::Lemma));
        assert_eq!(set.to_string(), "pos,ner");

        assert_eq!(AnnotatorSet::parse_list("pos,parse"), Err("parse".to_string()));
        assert!(AnnotatorSet::parse_list("").unwrap().is_empty());
    }

    #[test]
    fn test_serde_names() {
        let set: AnnotatorSet = serde_json::from_str(r#"["lemma", "pos"]"#).unwrap();
        assert!(set.contains(Annotator::Lemma));
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["pos","lemma"]"#);
    }
}
