//! DUT console sessions.
//!
//! The menu-driven HAL test binary runs on the DUT; everything the harness
//! knows about it comes through a console session. The [`MenuSession`]
//! trait captures the whole contract: select a named menu item under a
//! named suite, answer its interactive prompts in order, and get the raw
//! text the binary printed back. The session also keeps every byte the DUT
//! ever printed in an append-only transcript that can be re-read at any
//! time.
//!
//! Two implementations exist:
//! - [`ShellSession`]: drives the real binary in a child process (directly,
//!   or through `ssh` for a remote DUT).
//! - [`mock::MockDut`]: an in-process stand-in for host-side development and
//!   the harness's own tests.

pub mod mock;
mod shell;

pub use shell::{find_dut_console, list_console_ports, SessionSettings, ShellSession};

use std::fmt;
use std::io;

/// One expected interactive prompt and the answer to feed it.
///
/// Prompts are answered strictly in order; the sequence must correspond 1:1
/// to the prompts the menu item actually raises. A missing or unexpected
/// prompt is a session error, not a silent misalignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptAnswer {
    /// Text the DUT prints when waiting for this input.
    pub prompt: String,
    /// Line to send back.
    pub answer: String,
}

impl PromptAnswer {
    pub fn new(prompt: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            answer: answer.into(),
        }
    }
}

/// A console session to the DUT's menu binary.
pub trait MenuSession {
    /// Select `item` under `suite`, answering each prompt in order, and
    /// return the raw text response for that selection.
    fn select(
        &mut self,
        suite: &str,
        item: &str,
        prompts: &[PromptAnswer],
    ) -> Result<String, SessionError>;

    /// Snapshot of the full console transcript so far.
    ///
    /// Non-destructive: the buffer is append-only and repeated reads will
    /// re-observe earlier output.
    fn read_transcript(&mut self) -> Result<String, SessionError>;
}

/// Errors from driving the console session.
#[derive(Debug)]
pub enum SessionError {
    /// Failed to start the session process.
    Spawn(io::Error),
    /// I/O failure on the session's stdio.
    Io(io::Error),
    /// The menu finished a selection while prompts were still unanswered.
    PromptMismatch { expected: String },
    /// No output progress within the prompt timeout.
    Timeout { secs: u64 },
    /// The session process ended early.
    Closed,
    /// A selection produced more output than the session is willing to
    /// buffer.
    OutputOverflow { bytes: usize },
    /// The requested menu item is not known to the session.
    UnknownMenuItem { suite: String, item: String },
    /// The session settings are unusable (empty command, empty marker, ...).
    InvalidSettings(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to start session process: {}", e),
            Self::Io(e) => write!(f, "session I/O error: {}", e),
            Self::PromptMismatch { expected } => {
                write!(f, "menu returned without raising prompt '{}'", expected)
            }
            Self::Timeout { secs } => write!(f, "no session output within {} seconds", secs),
            Self::Closed => write!(f, "session process ended unexpectedly"),
            Self::OutputOverflow { bytes } => {
                write!(f, "selection output exceeded {} bytes", bytes)
            }
            Self::UnknownMenuItem { suite, item } => {
                write!(f, "unknown menu item '{}' in suite '{}'", item, suite)
            }
            Self::InvalidSettings(msg) => write!(f, "invalid session settings: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) | Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
