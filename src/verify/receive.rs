//! Received-message verification.

use crate::cec::{byte_token, normalize_byte_token, LogicalAddress, Opcode, PhysicalAddress};
use crate::transcript::{CallbackReport, CecEvent};

/// Frame bytes logged ahead of the operands in a callback data field: the
/// address byte and the opcode byte. Payload comparison starts after them.
pub const FRAME_HEADER_BYTES: usize = 2;

/// An expected received message: initiator, destination, opcode, and an
/// optional operand payload.
///
/// Matching scans the `received` sequence of a [`CallbackReport`]; the
/// report may contain stale events from earlier reads of the append-only
/// transcript, so any one matching candidate is sufficient.
#[derive(Debug, Clone)]
pub struct ReceiveExpectation {
    initiator: String,
    destination: String,
    opcode: String,
    payload: Option<Vec<String>>,
    header_len: usize,
}

impl ReceiveExpectation {
    /// Expectation on the address triple alone.
    pub fn new(initiator: LogicalAddress, destination: LogicalAddress, opcode: Opcode) -> Self {
        Self {
            initiator: initiator.to_string(),
            destination: destination.to_string(),
            opcode: opcode.token(),
            payload: None,
            header_len: FRAME_HEADER_BYTES,
        }
    }

    /// Require the operand payload to match, byte for byte.
    ///
    /// Tokens are normalized, so `"20"`, `"0x20"`, and `"0X20"` are equal.
    pub fn with_payload<S: AsRef<str>>(mut self, payload: &[S]) -> Self {
        self.payload = Some(
            payload
                .iter()
                .map(|token| normalize_byte_token(token.as_ref()))
                .collect(),
        );
        self
    }

    /// Require the operand payload to match the given byte values.
    pub fn with_payload_bytes(mut self, payload: &[u8]) -> Self {
        self.payload = Some(payload.iter().map(|&b| byte_token(b)).collect());
        self
    }

    /// Override how many leading frame bytes the data field carries before
    /// the operands.
    pub fn with_header_len(mut self, header_len: usize) -> Self {
        self.header_len = header_len;
        self
    }

    /// Overwrite the first two expected payload bytes with the DUT's
    /// physical-address bytes.
    ///
    /// Some opcodes (Active Source, Report Physical Address) carry the
    /// sender's physical address in their leading operands; that value is
    /// only known per run, so the payload table holds placeholders and the
    /// real bytes are substituted here before comparison. A missing or short
    /// payload is extended to hold both bytes.
    pub fn embed_physical_address(mut self, address: PhysicalAddress) -> Self {
        let tokens = address.byte_tokens();
        let payload = self.payload.get_or_insert_with(Vec::new);
        while payload.len() < tokens.len() {
            payload.push(String::new());
        }
        payload[..tokens.len()].clone_from_slice(&tokens);
        self
    }

    /// True if at least one received event satisfies the expectation.
    ///
    /// No candidate is a failure, not an error.
    pub fn matches(&self, report: &CallbackReport) -> bool {
        report.received.iter().any(|event| self.candidate_matches(event))
    }

    fn candidate_matches(&self, event: &CecEvent) -> bool {
        if normalize_nibble(&event.initiator) != self.initiator
            || normalize_nibble(&event.destination) != self.destination
            || normalize_byte_token(&event.opcode) != self.opcode
        {
            return false;
        }

        let Some(expected) = &self.payload else {
            return true;
        };

        // Zip-shortest: trailing extra bytes on either side are tolerated,
        // only a positional mismatch fails the candidate.
        let operands = event.data.iter().skip(self.header_len);
        operands
            .zip(expected.iter())
            .all(|(seen, wanted)| seen == wanted)
    }
}

fn normalize_nibble(nibble: &str) -> String {
    nibble.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::scrape;

    fn peer(n: u8) -> LogicalAddress {
        LogicalAddress::new(n).unwrap()
    }

    fn report_with_data(data: &str) -> CallbackReport {
        scrape(&format!(
            "Received Opcode: [0x82] [Active Source] Initiator: [4], Destination: [0] Data: [{}]",
            data
        ))
    }

    #[test]
    fn test_triple_and_payload_match() {
        let report = report_with_data("40:82:20:00");
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x20", "0x00"]);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_one_differing_byte_fails() {
        let report = report_with_data("40:82:20:01");
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x20", "0x00"]);
        assert!(!expectation.matches(&report));
    }

    #[test]
    fn test_no_matching_triple_fails() {
        let report = report_with_data("40:82:20:00");
        let wrong_initiator =
            ReceiveExpectation::new(peer(8), LogicalAddress::TV, Opcode::ACTIVE_SOURCE);
        assert!(!wrong_initiator.matches(&report));

        let wrong_opcode = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::STANDBY);
        assert!(!wrong_opcode.matches(&report));
    }

    #[test]
    fn test_missing_payload_checks_triple_only() {
        let report = report_with_data("40:82:ff:ff");
        let expectation =
            ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_comparison_is_zip_shortest() {
        // Candidate has extra trailing bytes beyond the expected payload.
        let report = report_with_data("40:82:20:00:aa:bb");
        let short = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x20", "0x00"]);
        assert!(short.matches(&report));

        // Expected payload longer than the candidate's data is tolerated too.
        let long = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x20", "0x00", "0xaa", "0xbb", "0xcc"]);
        assert!(long.matches(&report_with_data("40:82:20:00:aa")));
    }

    #[test]
    fn test_frame_header_bytes_are_skipped() {
        // 40 (address byte) and 82 (opcode byte) must not take part in the
        // payload comparison.
        let report = report_with_data("40:82:20:00");
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x40", "0x82"]);
        assert!(!expectation.matches(&report));
    }

    #[test]
    fn test_header_len_is_configurable() {
        let report = report_with_data("20:00");
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_header_len(0)
            .with_payload(&["0x20", "0x00"]);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_embed_physical_address_overwrites_placeholders() {
        let report = report_with_data("40:82:21:43:00");
        let address = PhysicalAddress::parse("2.1.4.3").unwrap();
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0xff", "0xff", "0x00"])
            .embed_physical_address(address);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_embed_physical_address_without_payload() {
        let report = report_with_data("40:82:21:43");
        let address = PhysicalAddress::parse("2.1.4.3").unwrap();
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .embed_physical_address(address);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_stale_duplicates_are_tolerated() {
        let line = "Received Opcode: [0x82] [Active Source] Initiator: [4], Destination: [0] Data: [40:82:20:00]\n";
        let report = scrape(&format!("{}{}", line, line));
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload(&["0x20", "0x00"]);
        assert!(expectation.matches(&report));
    }

    #[test]
    fn test_payload_bytes_builder() {
        let report = report_with_data("40:82:20:00");
        let expectation = ReceiveExpectation::new(peer(4), LogicalAddress::TV, Opcode::ACTIVE_SOURCE)
            .with_payload_bytes(&[0x20, 0x00]);
        assert!(expectation.matches(&report));
    }
}
