//! Shared helper functions for CLI commands.

use console::style;

use corenlp_zh::{Tokens, TokenizerError};

use super::commands::OutputFormat;

/// Render tokens for one input line.
pub fn format_tokens(tokens: &Tokens, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string(tokens.as_slice())?),
        OutputFormat::Tsv => Ok(format_tsv(tokens)),
    }
}

/// One row per token: text, begin, end, pos, lemma, ner. Missing tags print as `-`.
fn format_tsv(tokens: &Tokens) -> String {
    let mut out = String::new();
    for token in tokens {
        let (begin, end) = token.span();
        out.push_str(&format!(
            "{}\t{}\t{}\t{}\t{}\t{}\n",
            token.text(),
            begin,
            end,
            token.pos().unwrap_or("-"),
            token.lemma().unwrap_or("-"),
            token.ner().unwrap_or("-"),
        ));
    }
    out
}

/// Print a per-line error that does not stop the run.
pub fn report_error(line_no: usize, error: &TokenizerError) {
    eprintln!(
        "{} line {}: {}",
        style("warning:").yellow().bold(),
        line_no,
        error
    );
}
