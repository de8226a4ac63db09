//! Console session over a child process.
//!
//! Runs the DUT's menu binary in a child process with piped stdio. For a
//! remote DUT the configured command is typically an `ssh` invocation; for
//! a serially attached one it is a terminal client on a discovered console
//! port. The transport itself is opaque: the session only writes selection
//! lines and reads the byte stream back.
//!
//! The menu contract this session drives is line-oriented: the binary prints
//! a selection marker when it is ready for input, accepts the suite name and
//! the test name each on its own line, raises interactive prompts (printed
//! without a trailing newline) that are answered by a single line, and
//! re-prints the selection marker when the test completes. An empty input
//! line just re-prints the marker, which is how [`ShellSession::read_transcript`]
//! drains callback output that arrived between selections.

use super::{MenuSession, PromptAnswer, SessionError};
use serde::Deserialize;
use std::io::{BufReader, Read, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{Duration, Instant};

/// Hard cap on the output buffered for a single selection.
const MAX_RESPONSE_BYTES: usize = 512 * 1024;

/// How the session process is started and driven.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    /// Command line to start the menu binary, e.g.
    /// `["ssh", "root@dut", "/opt/hal-test/run.sh"]`.
    pub command: Vec<String>,
    /// Text the menu prints when ready for a selection.
    #[serde(default = "default_ready_marker")]
    pub ready_marker: String,
    /// Lines sent to shut the menu down cleanly.
    #[serde(default = "default_quit_sequence")]
    pub quit_sequence: Vec<String>,
    /// Max seconds to wait for the next prompt or selection marker.
    #[serde(default = "default_prompt_timeout_secs")]
    pub prompt_timeout_secs: u64,
    /// Settle time before a transcript read, giving asynchronous callback
    /// lines a chance to land.
    #[serde(default = "default_callback_settle_ms")]
    pub callback_settle_ms: u64,
}

fn default_ready_marker() -> String {
    "Select Option:".to_string()
}

fn default_quit_sequence() -> Vec<String> {
    vec!["q".to_string(), "q".to_string()]
}

fn default_prompt_timeout_secs() -> u64 {
    30
}

fn default_callback_settle_ms() -> u64 {
    500
}

impl SessionSettings {
    /// Settings for a locally runnable menu command.
    pub fn local(command: Vec<String>) -> Self {
        Self {
            command,
            ready_marker: default_ready_marker(),
            quit_sequence: default_quit_sequence(),
            prompt_timeout_secs: default_prompt_timeout_secs(),
            callback_settle_ms: default_callback_settle_ms(),
        }
    }

    fn validate(&self) -> Result<(), SessionError> {
        if self.command.is_empty() {
            return Err(SessionError::InvalidSettings(
                "session command is empty".to_string(),
            ));
        }
        if self.ready_marker.is_empty() {
            return Err(SessionError::InvalidSettings(
                "ready marker is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// RAII guard to ensure the session child process is always cleaned up.
struct ProcessGuard(Child);

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

/// A [`MenuSession`] over a child process.
pub struct ShellSession {
    settings: SessionSettings,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    transcript: String,
    // Keep the guard last so stdio handles close before the kill/wait.
    _guard: ProcessGuard,
}

impl ShellSession {
    /// Start the menu binary and wait for its first selection marker.
    pub fn spawn(settings: SessionSettings) -> Result<Self, SessionError> {
        settings.validate()?;

        let (program, args) = match settings.command.split_first() {
            Some(split) => split,
            None => {
                return Err(SessionError::InvalidSettings(
                    "session command is empty".to_string(),
                ))
            }
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(SessionError::Spawn)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SessionError::Spawn(other_io_error("no stdin pipe")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SessionError::Spawn(other_io_error("no stdout pipe")))?;

        let mut session = Self {
            settings,
            stdin,
            reader: BufReader::new(stdout),
            transcript: String::new(),
            _guard: ProcessGuard(child),
        };

        // Consume the boot banner up to the first marker.
        session.pump(&[])?;
        Ok(session)
    }

    /// Send the quit sequence and let the process exit.
    ///
    /// Errors while quitting are ignored; the process guard kills the child
    /// on drop regardless.
    pub fn close(&mut self) {
        let quit_sequence = self.settings.quit_sequence.clone();
        for line in quit_sequence {
            if self.send_line(&line).is_err() {
                break;
            }
        }
    }

    fn send_line(&mut self, line: &str) -> Result<(), SessionError> {
        writeln!(self.stdin, "{}", line).map_err(SessionError::Io)?;
        self.stdin.flush().map_err(SessionError::Io)
    }

    /// Read output until the selection marker reappears, answering the given
    /// prompts in order as they show up.
    ///
    /// Prompts are matched as suffixes of the output so far, since the menu
    /// prints them without a trailing newline and then blocks for input.
    /// Everything read is appended to the transcript.
    ///
    /// The timeout is checked between reads, so a child that stops printing
    /// entirely can overrun it slightly; the process guard still reclaims
    /// the child on drop.
    fn pump(&mut self, prompts: &[PromptAnswer]) -> Result<String, SessionError> {
        for prompt in prompts {
            if prompt.prompt.is_empty() {
                return Err(SessionError::InvalidSettings(
                    "empty prompt text".to_string(),
                ));
            }
        }

        let start = Instant::now();
        let timeout = Duration::from_secs(self.settings.prompt_timeout_secs);
        let mut out = String::new();
        let mut pending = prompts.iter();
        let mut next_prompt = pending.next();
        let mut byte = [0u8; 1];

        let result = loop {
            if start.elapsed() > timeout {
                break Err(SessionError::Timeout {
                    secs: self.settings.prompt_timeout_secs,
                });
            }
            if out.len() > MAX_RESPONSE_BYTES {
                break Err(SessionError::OutputOverflow {
                    bytes: MAX_RESPONSE_BYTES,
                });
            }

            match self.reader.read(&mut byte) {
                Ok(0) => break Err(SessionError::Closed),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => break Err(SessionError::Io(e)),
            }

            // Menu output is ASCII; anything else is kept as-is and simply
            // won't match a prompt or marker.
            if byte[0] == b'\r' {
                continue;
            }
            out.push(char::from(byte[0]));

            if let Some(prompt) = next_prompt {
                if out.ends_with(prompt.prompt.as_str()) {
                    let answer = prompt.answer.clone();
                    if let Err(e) = self.send_line(&answer) {
                        break Err(e);
                    }
                    out.push('\n');
                    next_prompt = pending.next();
                    continue;
                }
            }

            if out.trim_end_matches('\n').ends_with(self.settings.ready_marker.as_str()) {
                if let Some(prompt) = next_prompt {
                    break Err(SessionError::PromptMismatch {
                        expected: prompt.prompt.clone(),
                    });
                }
                break Ok(());
            }
        };

        self.transcript.push_str(&out);
        result.map(|()| out)
    }
}

impl MenuSession for ShellSession {
    fn select(
        &mut self,
        suite: &str,
        item: &str,
        prompts: &[PromptAnswer],
    ) -> Result<String, SessionError> {
        log::debug!("selecting '{}' / '{}'", suite, item);
        self.send_line(suite)?;
        self.send_line(item)?;
        self.pump(prompts)
    }

    fn read_transcript(&mut self) -> Result<String, SessionError> {
        // Give asynchronous callback lines a moment to arrive, then poke the
        // menu with an empty line and read up to the re-printed marker so
        // anything queued in the pipe lands in the transcript.
        std::thread::sleep(Duration::from_millis(self.settings.callback_settle_ms));
        self.send_line("")?;
        self.pump(&[])?;
        Ok(self.transcript.clone())
    }
}

impl Drop for ShellSession {
    fn drop(&mut self) {
        self.close();
    }
}

fn other_io_error(msg: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, msg)
}

/// Find a likely DUT console port by scanning common device patterns.
///
/// Returns the first match, or `None` if nothing is attached.
pub fn find_dut_console() -> Option<String> {
    let patterns = [
        "/dev/ttyUSB*",
        "/dev/ttyACM*",
        "/dev/cu.usbserial-*",
        "/dev/cu.SLAB_USBtoUART*",
    ];

    for pattern in patterns {
        if let Ok(paths) = glob::glob(pattern) {
            if let Some(path) = paths.flatten().next() {
                return Some(path.to_string_lossy().to_string());
            }
        }
    }

    None
}

/// List candidate console ports for diagnostics.
pub fn list_console_ports() -> Vec<String> {
    let mut ports = Vec::new();

    for pattern in ["/dev/ttyUSB*", "/dev/ttyACM*", "/dev/cu.*"] {
        if let Ok(paths) = glob::glob(pattern) {
            ports.extend(paths.flatten().map(|p| p.to_string_lossy().to_string()));
        }
    }

    ports
}

#[cfg(test)]
mod tests {
    use super::*;

    // A small shell script standing in for the menu binary: prints the
    // selection marker, reads suite/item lines, raises one prompt for the
    // add-logical-address item, and re-prints the marker after each
    // selection. An empty line just re-prints the marker.
    const FAKE_MENU: &str = r#"
echo 'Select Option:'
while read suite; do
  if [ -z "$suite" ]; then
    echo 'Select Option:'
    continue
  fi
  read item
  if [ "$item" = "Add Logical Address" ]; then
    printf 'Enter Logical Address:'
    read answer
    echo ''
    echo "Result HdmiCecAddLogicalAddress (IN:handle:[0x1], IN:logicalAddress:[$answer]) HDMI_CEC_STATUS[HDMI_CEC_IO_SUCCESS]"
  else
    echo 'Result HdmiCecOpen(OUT:handle:[0x1]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS]'
  fi
  echo 'Select Option:'
done
"#;

    fn fake_menu_settings() -> SessionSettings {
        let mut settings = SessionSettings::local(vec![
            "sh".to_string(),
            "-c".to_string(),
            FAKE_MENU.to_string(),
        ]);
        settings.prompt_timeout_secs = 5;
        settings.callback_settle_ms = 0;
        settings
    }

    #[test]
    fn test_select_without_prompts() {
        let mut session = ShellSession::spawn(fake_menu_settings()).unwrap();
        let response = session
            .select("L3 HDMICEC Sink Functions", "Init HDMI CEC", &[])
            .unwrap();
        assert!(response.contains("Result HdmiCecOpen"));
    }

    #[test]
    fn test_select_answers_prompt() {
        let mut session = ShellSession::spawn(fake_menu_settings()).unwrap();
        let response = session
            .select(
                "L3 HDMICEC Sink Functions",
                "Add Logical Address",
                &[PromptAnswer::new("Enter Logical Address:", "0")],
            )
            .unwrap();
        assert!(response.contains("IN:logicalAddress:[0]"));
    }

    #[test]
    fn test_unraised_prompt_fails_fast() {
        let mut session = ShellSession::spawn(fake_menu_settings()).unwrap();
        let result = session.select(
            "L3 HDMICEC Sink Functions",
            "Init HDMI CEC",
            &[PromptAnswer::new("Enter Databyte", "0x00")],
        );
        assert!(matches!(
            result,
            Err(SessionError::PromptMismatch { expected }) if expected == "Enter Databyte"
        ));
    }

    #[test]
    fn test_transcript_accumulates() {
        let mut session = ShellSession::spawn(fake_menu_settings()).unwrap();
        session
            .select("L3 HDMICEC Sink Functions", "Init HDMI CEC", &[])
            .unwrap();
        let transcript = session.read_transcript().unwrap();
        assert!(transcript.contains("Result HdmiCecOpen"));

        // Append-only: a second read still sees the earlier output.
        session
            .select("L3 HDMICEC Sink Functions", "Close HDMI CEC", &[])
            .unwrap();
        let longer = session.read_transcript().unwrap();
        assert!(longer.starts_with(&transcript[..transcript.len() / 2]));
        assert!(longer.len() >= transcript.len());
    }

    #[test]
    fn test_empty_command_rejected() {
        let result = ShellSession::spawn(SessionSettings::local(Vec::new()));
        assert!(matches!(result, Err(SessionError::InvalidSettings(_))));
    }
}
