//! CoreNLP engine process management.
//!
//! - `command`: builds the engine invocation from configuration
//! - `channel`: duplex byte stream to the running process
//! - `session`: prompt-delimited request/response protocol

pub mod channel;
pub mod command;
pub mod session;

pub use channel::{Channel, ProcessChannel};
pub use command::{EngineCommand, Launcher};
pub use session::{Session, SessionState, PROMPT};
