//! Duplex byte channel to the engine process.
//!
//! Output is pumped by a reader thread into an mpsc queue, which lets the
//! caller wait for the prompt with a deadline instead of blocking on a pipe
//! read forever.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::process::{Child, ChildStdin};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::command::EngineCommand;
use crate::error::{Result, TokenizerError};

/// Bytes of trailing output included in "engine exited" errors.
const EXIT_CONTEXT_BYTES: usize = 2048;

/// A line-oriented request channel terminated by a prompt.
pub trait Channel {
    /// Write one line followed by a newline.
    fn send_line(&mut self, line: &str) -> Result<()>;

    /// Read until `prompt` appears and return everything before it.
    ///
    /// The prompt itself is consumed. `None` waits indefinitely.
    fn read_until(&mut self, prompt: &[u8], timeout: Option<Duration>) -> Result<Vec<u8>>;
}

/// Channel backed by a spawned engine process.
pub struct ProcessChannel {
    child: Child,
    stdin: Option<ChildStdin>,
    output: Receiver<Vec<u8>>,
    pending: Vec<u8>,
    /// Bytes of `pending` already searched for the prompt.
    scanned: usize,
}

impl ProcessChannel {
    /// Spawn the engine and start its reader threads.
    pub fn spawn(command: &EngineCommand) -> Result<Self> {
        let mut child = command.to_command().spawn().map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                TokenizerError::EngineNotFound(format!("Failed to launch engine: {}", e))
            } else {
                TokenizerError::Io(e)
            }
        })?;
        debug!("Engine process started (pid {})", child.id());

        let stdin = child.stdin.take();
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TokenizerError::Startup("Engine stdout not captured".to_string()))?;

        let (tx, output) = mpsc::channel();
        thread::Builder::new()
            .name("corenlp-stdout".to_string())
            .spawn(move || {
                let mut stdout = stdout;
                let mut buf = [0u8; 8192];
                loop {
                    match stdout.read(&mut buf) {
                        Ok(0) => break,
                        Ok(n) => {
                            if tx.send(buf[..n].to_vec()).is_err() {
                                break;
                            }
                        }
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
            })?;

        if let Some(stderr) = child.stderr.take() {
            thread::Builder::new()
                .name("corenlp-stderr".to_string())
                .spawn(move || {
                    let reader = BufReader::new(stderr);
                    for line in reader.lines().map_while(std::result::Result::ok) {
                        log_engine_line(&line);
                    }
                })?;
        }

        Ok(Self {
            child,
            stdin,
            output,
            pending: Vec::new(),
            scanned: 0,
        })
    }

    /// Pull the next chunk of output, honoring an optional deadline.
    fn next_chunk(&mut self, deadline: Option<Instant>, timeout: Option<Duration>) -> Result<Vec<u8>> {
        match deadline {
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match self.output.recv_timeout(remaining) {
                    Ok(chunk) => Ok(chunk),
                    Err(RecvTimeoutError::Timeout) => {
                        Err(TokenizerError::Timeout(timeout.unwrap_or(remaining)))
                    }
                    Err(RecvTimeoutError::Disconnected) => Err(self.exited()),
                }
            }
            None => match self.output.recv() {
                Ok(chunk) => Ok(chunk),
                Err(_) => Err(self.exited()),
            },
        }
    }

    /// Describe an engine that closed its output.
    fn exited(&mut self) -> TokenizerError {
        let status = match self.child.try_wait() {
            Ok(Some(status)) => status.to_string(),
            _ => "output closed".to_string(),
        };
        let tail_start = self.pending.len().saturating_sub(EXIT_CONTEXT_BYTES);
        let tail = String::from_utf8_lossy(&self.pending[tail_start..]);
        let tail = tail.trim();
        if tail.is_empty() {
            TokenizerError::EngineExited(status)
        } else {
            TokenizerError::EngineExited(format!("{}: {}", status, tail))
        }
    }

    /// Kill the engine and reap it.
    pub fn shutdown(&mut self) {
        self.stdin = None;
        if let Ok(None) = self.child.try_wait() {
            debug!("Shutting down engine process (pid {})", self.child.id());
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

impl Channel for ProcessChannel {
    fn send_line(&mut self, line: &str) -> Result<()> {
        let stdin = self.stdin.as_mut().ok_or(TokenizerError::Poisoned)?;
        let written = stdin
            .write_all(line.as_bytes())
            .and_then(|_| stdin.write_all(b"\n"))
            .and_then(|_| stdin.flush());
        match written {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::BrokenPipe => Err(self.exited()),
            Err(e) => Err(TokenizerError::Io(e)),
        }
    }

    fn read_until(&mut self, prompt: &[u8], timeout: Option<Duration>) -> Result<Vec<u8>> {
        let deadline = timeout.map(|t| Instant::now() + t);
        loop {
            if let Some(pos) = find(&self.pending, prompt, self.scanned) {
                let response: Vec<u8> = self.pending.drain(..pos).collect();
                self.pending.drain(..prompt.len());
                self.scanned = 0;
                return Ok(response);
            }
            // A prompt may straddle the chunk boundary.
            self.scanned = self.pending.len().saturating_sub(prompt.len().saturating_sub(1));

            let chunk = self.next_chunk(deadline, timeout)?;
            self.pending.extend_from_slice(&chunk);
        }
    }
}

impl Drop for ProcessChannel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Position of `needle` in `haystack`, starting the search at `from`.
fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack[from.min(haystack.len())..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

/// Forward an engine diagnostic line to tracing at a matching level.
fn log_engine_line(line: &str) {
    if line.contains("WARN") || line.contains("ERROR") || line.contains("Exception") {
        warn!("CoreNLP: {}", line);
    } else {
        debug!("CoreNLP: {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find() {
        assert_eq!(find(b"abc NLP> ", b"NLP>", 0), Some(4));
        assert_eq!(find(b"abc NLP> ", b"NLP>", 2), Some(4));
        assert_eq!(find(b"abc NLP> ", b"NLP>", 5), None);
        assert_eq!(find(b"NL", b"NLP>", 0), None);
        assert_eq!(find(b"NLP>", b"NLP>", 10), None);
    }
}
