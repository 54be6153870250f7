//! CLI commands implementation.

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;

use corenlp_zh::{AnnotatorSet, EngineCommand, Tokenizer, TokenizerConfig};

use super::helpers::{format_tokens, report_error};

#[derive(Parser)]
#[command(name = "corenlp-zh")]
#[command(about = "Chinese tokenizer backed by a Stanford CoreNLP process")]
#[command(version)]
pub struct Cli {
    /// Config file (toml, yaml or json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// CoreNLP classpath (overrides config and environment)
    #[arg(long, global = true)]
    classpath: Option<String>,

    /// Java heap size for the engine
    #[arg(long, global = true)]
    memory: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize text given as arguments, or one line at a time from stdin
    Tokenize {
        /// Text to tokenize (reads stdin when omitted)
        text: Vec<String>,
        /// Output format
        #[arg(short, long, value_enum, default_value = "json")]
        format: OutputFormat,
        /// Annotators to run, comma-separated (pos,lemma,ner)
        #[arg(short, long)]
        annotators: Option<String>,
        /// Seconds to wait for each response
        #[arg(long)]
        request_timeout: Option<u64>,
    },

    /// Check that java and the classpath are usable
    Check {
        /// Also launch the engine and tokenize a sample sentence
        #[arg(long)]
        launch: bool,
    },
}

/// How tokens are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON array of tokens per input line
    Json,
    /// One token per row, blank line between inputs
    Tsv,
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match cli.config {
        Some(ref path) => TokenizerConfig::load_from_path(path)
            .await
            .map_err(|e| anyhow::anyhow!(e))?,
        None => TokenizerConfig::load().await,
    };
    if let Some(classpath) = cli.classpath {
        config.classpath = Some(classpath);
    }
    if let Some(memory) = cli.memory {
        config.memory = memory;
    }

    match cli.command {
        Commands::Tokenize {
            text,
            format,
            annotators,
            request_timeout,
        } => {
            if let Some(list) = annotators {
                config.annotators = AnnotatorSet::parse_list(&list)
                    .map_err(|name| anyhow::anyhow!("Unknown annotator: {}", name))?;
            }
            if request_timeout.is_some() {
                config.request_timeout_secs = request_timeout;
            }
            // The tokenizer blocks on the engine; keep it off the async workers.
            tokio::task::spawn_blocking(move || cmd_tokenize(&config, text, format)).await?
        }
        Commands::Check { launch } => {
            tokio::task::spawn_blocking(move || cmd_check(&config, launch)).await?
        }
    }
}

fn cmd_tokenize(
    config: &TokenizerConfig,
    text: Vec<String>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut tokenizer = Tokenizer::new(config)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if !text.is_empty() {
        let tokens = tokenizer.tokenize(&text.join(" "))?;
        writeln!(out, "{}", format_tokens(&tokens, format)?)?;
        return Ok(());
    }

    let stdin = std::io::stdin();
    for (line_no, line) in stdin.lock().lines().enumerate() {
        let line = line?;
        match tokenizer.tokenize(&line) {
            Ok(tokens) => writeln!(out, "{}", format_tokens(&tokens, format)?)?,
            Err(e) if !e.is_fatal() => {
                report_error(line_no + 1, &e);
                // Keep output aligned with input lines
                writeln!(out)?;
            }
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

fn cmd_check(config: &TokenizerConfig, launch: bool) -> anyhow::Result<()> {
    println!("\n{}", style("CoreNLP tokenizer").bold());

    if let Some(ref path) = config.source_path {
        println!("  config:     {}", path.display());
    }

    let command = match EngineCommand::from_config(config) {
        Ok(command) => command,
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
            return Err(e.into());
        }
    };

    match command.locate_java() {
        Ok(java) => println!("  {} java: {}", style("✓").green(), java.display()),
        Err(e) => {
            println!("  {} {}", style("✗").red(), e);
            return Err(e.into());
        }
    }

    if let Some(classpath) = config.resolved_classpath() {
        println!("  {} classpath: {}", style("✓").green(), classpath);
    }
    println!("  annotators: {}", config.annotators.pipeline().join(","));
    println!("  command:    {}", command.command_line());

    match config.resolved_dictionary() {
        Some(path) if path.exists() => {
            println!("  {} dictionary: {}", style("✓").green(), path.display())
        }
        Some(path) => println!(
            "  {} dictionary not found: {}",
            style("!").yellow(),
            path.display()
        ),
        None => println!(
            "  {} no dictionary configured, lemmas pass through",
            style("!").yellow()
        ),
    }

    if launch {
        println!(
            "\n  Launching engine (timeout {}s)...",
            config.startup_timeout().as_secs()
        );
        let started = std::time::Instant::now();
        let mut tokenizer = Tokenizer::new(config)?;
        let tokens = tokenizer.tokenize("你好，世界。")?;
        println!(
            "  {} engine ready in {:.1}s, sample: {}",
            style("✓").green(),
            started.elapsed().as_secs_f64(),
            tokens.words(false).join(" ")
        );
    }

    Ok(())
}
