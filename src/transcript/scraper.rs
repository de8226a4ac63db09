//! Callback-line scraper.
//!
//! Two fixed line grammars cover the callback log:
//!
//! ```text
//! Received Opcode: [0x82] [Active Source] Initiator: [4], Destination: [0] Data: [40:82:20:00]
//! Sent Response Opcode: [0x84] [Report Physical Address] Initiator: [0], Destination: [f] Data: [0f:84:20:00:00]
//! ```
//!
//! The data field holds the raw frame bytes (address byte, opcode byte, then
//! the operands) as colon-separated hex, normalized here to `"0xHH"` tokens.
//! Classification is by line prefix, so a line can match at most one grammar.

use crate::cec::normalize_byte_token;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Which grammar a transcript line matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A CEC message the DUT received.
    Received,
    /// A response frame the DUT sent back.
    Response,
}

/// One parsed callback line. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CecEvent {
    /// Opcode token as logged, e.g. `"0x82"`.
    pub opcode: String,
    /// Command name as logged, e.g. `"Active Source"`.
    pub description: String,
    /// Initiator logical address nibble, e.g. `"4"`.
    pub initiator: String,
    /// Destination logical address nibble, e.g. `"0"`.
    pub destination: String,
    /// Raw frame bytes as `"0xHH"` tokens, order preserved.
    pub data: Vec<String>,
}

/// The two ordered event sequences scraped from a transcript snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CallbackReport {
    /// Messages the DUT received, oldest first.
    pub received: Vec<CecEvent>,
    /// Responses the DUT sent, oldest first.
    pub response: Vec<CecEvent>,
}

impl CallbackReport {
    /// True when no line of either kind was found.
    pub fn is_empty(&self) -> bool {
        self.received.is_empty() && self.response.is_empty()
    }
}

static RECEIVED_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Received Opcode: \[(?P<opcode>[^\]]+)\] \[(?P<description>[^\]]+)\] Initiator: \[(?P<initiator>[^\]]+)\], Destination: \[(?P<destination>[^\]]+)\] Data: \[(?P<data>[^\]]*)\]",
    )
    .expect("invalid received-line grammar")
});

static RESPONSE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Sent Response Opcode: \[(?P<opcode>[^\]]+)\] \[(?P<description>[^\]]+)\] Initiator: \[(?P<initiator>[^\]]+)\], Destination: \[(?P<destination>[^\]]+)\] Data: \[(?P<data>[^\]]*)\]",
    )
    .expect("invalid response-line grammar")
});

/// Grammar table. New log formats get a new entry here, not a new code path.
fn grammars() -> [(&'static Regex, EventKind); 2] {
    [
        (&RECEIVED_LINE, EventKind::Received),
        (&RESPONSE_LINE, EventKind::Response),
    ]
}

/// Scrape a transcript snapshot into its callback events.
///
/// Pure function of the text: unmatched lines are ignored, malformed input
/// never errors, and an empty transcript yields an empty report.
pub fn scrape(transcript: &str) -> CallbackReport {
    let mut report = CallbackReport::default();

    for (pattern, kind) in grammars() {
        for caps in pattern.captures_iter(transcript) {
            let event = CecEvent {
                opcode: caps["opcode"].to_string(),
                description: caps["description"].to_string(),
                initiator: caps["initiator"].to_string(),
                destination: caps["destination"].to_string(),
                data: split_data_field(&caps["data"]),
            };
            match kind {
                EventKind::Received => report.received.push(event),
                EventKind::Response => report.response.push(event),
            }
        }
    }

    report
}

/// Split a colon-separated hex data field into normalized byte tokens.
fn split_data_field(field: &str) -> Vec<String> {
    if field.trim().is_empty() {
        return Vec::new();
    }
    field.split(':').map(normalize_byte_token).collect()
}
