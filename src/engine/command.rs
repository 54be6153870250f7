//! Engine command line construction.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use crate::config::TokenizerConfig;
use crate::error::{Result, TokenizerError};

/// Main class of the CoreNLP pipeline.
pub const MAIN_CLASS: &str = "edu.stanford.nlp.pipeline.StanfordCoreNLP";

/// Tokenizer options: drop characters the tokenizer cannot handle and keep
/// offsets invertible so spans map back onto the input.
pub const TOKENIZE_OPTIONS: &str = "untokenizable=noneDelete,invertible=true";

/// How the engine process is started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Launcher {
    /// Through `<shell> -c "exec ... 2>&1"`, so diagnostics and responses share one stream.
    Shell(String),
    /// As a direct child; stderr is read separately.
    Direct,
}

/// Fully resolved engine invocation.
#[derive(Debug, Clone)]
pub struct EngineCommand {
    java: String,
    args: Vec<String>,
    launcher: Launcher,
}

impl EngineCommand {
    /// Build the invocation from configuration.
    ///
    /// Fails if no classpath is configured, since the engine cannot start without one.
    pub fn from_config(config: &TokenizerConfig) -> Result<Self> {
        let classpath = config.resolved_classpath().ok_or_else(|| {
            TokenizerError::Startup(
                "No CoreNLP classpath configured (set classpath or CORENLP_CLASSPATH)".to_string(),
            )
        })?;

        let args = vec![
            format!("-mx{}", config.memory),
            "-cp".to_string(),
            classpath,
            MAIN_CLASS.to_string(),
            "-props".to_string(),
            config.properties.clone(),
            "-annotators".to_string(),
            config.annotators.pipeline().join(","),
            "-tokenize.options".to_string(),
            TOKENIZE_OPTIONS.to_string(),
            "-outputFormat".to_string(),
            "json".to_string(),
            "-prettyPrint".to_string(),
            "false".to_string(),
        ];

        let launcher = if config.direct_spawn {
            Launcher::Direct
        } else {
            Launcher::Shell(config.shell.clone())
        };

        Ok(Self {
            java: config.java.clone(),
            args,
            launcher,
        })
    }

    pub fn java(&self) -> &str {
        &self.java
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn launcher(&self) -> &Launcher {
        &self.launcher
    }

    /// Whether engine stderr arrives on the response stream.
    pub fn merges_stderr(&self) -> bool {
        matches!(self.launcher, Launcher::Shell(_))
    }

    /// Locate the java executable.
    pub fn locate_java(&self) -> Result<PathBuf> {
        which::which(&self.java).map_err(|_| {
            TokenizerError::EngineNotFound(format!(
                "'{}' not found (install a Java runtime or set CORENLP_JAVA)",
                self.java
            ))
        })
    }

    /// The engine invocation as a single shell-quoted line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.java.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Build the process command with all three standard streams piped.
    pub fn to_command(&self) -> Command {
        let mut cmd = match &self.launcher {
            Launcher::Shell(shell) => {
                let mut cmd = Command::new(shell);
                cmd.arg("-c")
                    .arg(format!("exec {} 2>&1", self.command_line()));
                cmd
            }
            Launcher::Direct => {
                let mut cmd = Command::new(&self.java);
                cmd.args(&self.args);
                cmd
            }
        };
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

/// Quote an argument for a POSIX shell unless it is plainly safe.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_.,/=:+@%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
