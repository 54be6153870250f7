//! Engine session: one prompt-driven request at a time over a channel.

use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use super::channel::{Channel, ProcessChannel};
use super::command::EngineCommand;
use crate::config::TokenizerConfig;
use crate::error::{Result, TokenizerError};

/// Prompt the engine prints when it is ready for the next line.
pub const PROMPT: &str = "NLP>";

/// Session lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Prompt consumed; the next request can be sent.
    Ready,
    /// A request failed after being written; the stream position is unknown.
    Poisoned,
}

/// A running engine plus the request protocol around it.
pub struct Session<C: Channel = ProcessChannel> {
    channel: C,
    request_timeout: Option<Duration>,
    state: SessionState,
}

impl Session<ProcessChannel> {
    /// Launch the engine described by `config` and wait for its first prompt.
    pub fn launch(config: &TokenizerConfig) -> Result<Self> {
        let command = EngineCommand::from_config(config)?;
        let java = command.locate_java()?;
        info!("Starting CoreNLP with {}", java.display());
        debug!("Engine command: {}", command.command_line());

        let channel = ProcessChannel::spawn(&command)?;
        Self::start(channel, config.startup_timeout(), config.request_timeout())
    }
}

impl<C: Channel> Session<C> {
    /// Wait for the first prompt on an already-open channel.
    ///
    /// Everything printed before the prompt (model loading logs) is discarded.
    pub fn start(
        mut channel: C,
        startup_timeout: Duration,
        request_timeout: Option<Duration>,
    ) -> Result<Self> {
        let start = Instant::now();
        match channel.read_until(PROMPT.as_bytes(), Some(startup_timeout)) {
            Ok(banner) => {
                debug!("Discarded {} bytes of startup output", banner.len());
                info!(
                    "CoreNLP ready in {:.1}s",
                    start.elapsed().as_secs_f64()
                );
            }
            Err(TokenizerError::Timeout(_)) => {
                error!("CoreNLP did not become ready within {:?}", startup_timeout);
                return Err(TokenizerError::Startup(format!(
                    "Engine did not print its prompt within {} seconds",
                    startup_timeout.as_secs()
                )));
            }
            Err(e) => {
                error!("CoreNLP failed to start: {}", e);
                return Err(TokenizerError::Startup(e.to_string()));
            }
        }

        Ok(Self {
            channel,
            request_timeout,
            state: SessionState::Ready,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub fn set_request_timeout(&mut self, timeout: Option<Duration>) {
        self.request_timeout = timeout;
    }

    /// Send one line and return the raw output printed before the next prompt.
    ///
    /// Lines containing the prompt or a line break are rejected before
    /// anything is written. Any failure after writing poisons the session.
    pub fn request(&mut self, line: &str) -> Result<Vec<u8>> {
        if self.state == SessionState::Poisoned {
            return Err(TokenizerError::Poisoned);
        }
        if line.contains(PROMPT) {
            return Err(TokenizerError::PromptInText);
        }
        if line.contains(['\n', '\r']) {
            return Err(TokenizerError::MultiLineRequest);
        }

        let result = self
            .channel
            .send_line(line)
            .and_then(|_| self.channel.read_until(PROMPT.as_bytes(), self.request_timeout));

        if let Err(ref e) = result {
            error!("CoreNLP request failed, session unusable: {}", e);
            self.state = SessionState::Poisoned;
        }
        result
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &C {
        &self.channel
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedChannel;
    use super::*;

    fn session(channel: ScriptedChannel) -> Session<ScriptedChannel> {
        Session::start(channel, Duration::from_secs(1), Some(Duration::from_secs(1))).unwrap()
    }

    #[test]
    fn test_request_returns_output_before_prompt() {
        let mut channel = ScriptedChannel::new();
        channel.push_reply("{\"sentences\":[]}\n");
        let mut session = session(channel);

        let raw = session.request("你好").unwrap();
        assert_eq!(raw, b"{\"sentences\":[]}\n");
        assert_eq!(session.channel().sent, vec!["你好"]);
        assert!(session.is_ready());
    }

    #[test]
    fn test_rejects_prompt_and_newlines_without_sending() {
        let mut session = session(ScriptedChannel::new());

        assert!(matches!(
            session.request("say NLP> now"),
            Err(TokenizerError::PromptInText)
        ));
        assert!(matches!(
            session.request("two\nlines"),
            Err(TokenizerError::MultiLineRequest)
        ));
        assert!(session.channel().sent.is_empty());
        assert!(session.is_ready());
    }

    #[test]
    fn test_timeout_poisons_session() {
        let mut channel = ScriptedChannel::new();
        channel.push_timeout();
        channel.push_reply("{\"sentences\":[]}");
        let mut session = session(channel);

        assert!(matches!(
            session.request("慢"),
            Err(TokenizerError::Timeout(_))
        ));
        assert_eq!(session.state(), SessionState::Poisoned);
        assert!(matches!(
            session.request("再来"),
            Err(TokenizerError::Poisoned)
        ));
        assert_eq!(session.channel().sent.len(), 1);
    }

    #[test]
    fn test_startup_failures() {
        let mut channel = ScriptedChannel::default();
        channel.push_timeout();
        let err = Session::start(channel, Duration::from_secs(60), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("within 60 seconds"));

        let err = Session::start(ScriptedChannel::default(), Duration::from_secs(1), None)
            .err()
            .unwrap();
        assert!(matches!(err, TokenizerError::Startup(_)));
    }
}
