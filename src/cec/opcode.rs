//! CEC opcodes and the command name table.

use std::fmt;

/// A CEC command opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opcode(u8);

/// Opcode, command name, and expected operand length.
///
/// Mirrors the command table the DUT's menu binary uses when it names
/// received opcodes in its log lines.
const COMMAND_TABLE: &[(u8, &str, usize)] = &[
    (0x00, "Feature Abort", 2),
    (0x04, "Image View On", 0),
    (0x05, "Tuner Step Increment", 0),
    (0x06, "Tuner Step Decrement", 0),
    (0x07, "Tuner Device Status", 8),
    (0x08, "Give Tuner Device Status", 0),
    (0x09, "Record On", 8),
    (0x0A, "Record Status", 8),
    (0x0B, "Record Off", 0),
    (0x0D, "Text View On", 0),
    (0x0F, "Record TV Screen", 0),
    (0x1A, "Give Deck Status", 0),
    (0x1B, "Deck Status", 1),
    (0x32, "Set Menu Language", 3),
    (0x33, "Clear Analog Timer", 0),
    (0x34, "Set Analog Timer", 8),
    (0x35, "Timer Status", 3),
    (0x36, "Standby", 0),
    (0x41, "Play", 0),
    (0x42, "Deck Control", 1),
    (0x43, "Timer Cleared Status", 1),
    (0x44, "User Control Pressed", 1),
    (0x45, "User Control Released", 0),
    (0x46, "Give OSD Name", 0),
    (0x47, "Set OSD Name", 14),
    (0x64, "Set OSD String", 14),
    (0x67, "Set Timer Program Title", 14),
    (0x70, "System Audio Mode Request", 2),
    (0x71, "Give Audio Status", 0),
    (0x72, "Set System Audio Mode", 1),
    (0x7A, "Report Audio Status", 1),
    (0x7D, "Give System Audio Mode Status", 0),
    (0x7E, "System Audio Mode Status", 1),
    (0x80, "Routing Change", 4),
    (0x81, "Routing Information", 2),
    (0x82, "Active Source", 2),
    (0x83, "Give Physical Address", 0),
    (0x84, "Report Physical Address", 3),
    (0x85, "Request Active Source", 0),
    (0x86, "Set Stream Path", 2),
    (0x87, "Device Vendor ID", 3),
    (0x89, "Vendor Command", 14),
    (0x8A, "Vendor Remote Button Down", 1),
    (0x8B, "Vendor Remote Button Up", 0),
    (0x8C, "Give Device Vendor ID", 0),
    (0x8D, "Menu Request", 1),
    (0x8E, "Menu Status", 1),
    (0x8F, "Give Device Power Status", 0),
    (0x90, "Report Power Status", 1),
    (0x91, "Get Menu Language", 0),
    (0x92, "Select Analog Service", 4),
    (0x93, "Select Digital Service", 4),
    (0x97, "Set Digital Timer", 6),
    (0x99, "Clear Digital Timer", 0),
    (0x9A, "Set Audio Rate", 1),
    (0x9D, "Inactive Source", 2),
    (0x9E, "CEC Version", 1),
    (0x9F, "Get CEC Version", 0),
    (0xA0, "Vendor Command With ID", 17),
    (0xA1, "Clear External Timer", 0),
    (0xA2, "Set External Timer", 9),
    (0xA7, "Request Current Latency", 2),
    (0xA8, "Report Current Latency", 5),
    (0xC0, "Initiate ARC", 0),
    (0xC1, "Report ARC Initiated", 0),
    (0xC2, "Report ARC Terminated", 0),
    (0xC3, "Request ARC Initiation", 0),
    (0xC4, "Request ARC Termination", 0),
    (0xC5, "Terminate ARC", 0),
    (0xFF, "Abort", 0),
];

impl Opcode {
    pub const STANDBY: Opcode = Opcode(0x36);
    pub const ACTIVE_SOURCE: Opcode = Opcode(0x82);
    pub const GIVE_PHYSICAL_ADDRESS: Opcode = Opcode(0x83);
    pub const REPORT_PHYSICAL_ADDRESS: Opcode = Opcode(0x84);
    pub const GIVE_DEVICE_POWER_STATUS: Opcode = Opcode(0x8F);
    pub const REPORT_POWER_STATUS: Opcode = Opcode(0x90);
    pub const GET_CEC_VERSION: Opcode = Opcode(0x9F);
    pub const CEC_VERSION: Opcode = Opcode(0x9E);

    /// Create an opcode from its byte value.
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    /// Parse a hex opcode token (`"0x82"` or `"82"`).
    pub fn parse(s: &str) -> Option<Self> {
        super::parse_byte_token(s).map(Self)
    }

    /// The opcode byte value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// The lowercase `"0xHH"` token form.
    pub fn token(self) -> String {
        super::byte_token(self.0)
    }

    /// Command name as logged by the DUT, if the opcode is in the table.
    pub fn name(self) -> Option<&'static str> {
        COMMAND_TABLE
            .iter()
            .find(|(op, _, _)| *op == self.0)
            .map(|(_, name, _)| *name)
    }

    /// Expected operand byte count for the opcode, if known.
    pub fn operand_len(self) -> Option<usize> {
        COMMAND_TABLE
            .iter()
            .find(|(op, _, _)| *op == self.0)
            .map(|(_, _, len)| *len)
    }
}

// Display and token() must stay identical; both feed string comparisons
// against transcript fields.
impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_opcode_names() {
        assert_eq!(Opcode::STANDBY.name(), Some("Standby"));
        assert_eq!(Opcode::ACTIVE_SOURCE.name(), Some("Active Source"));
        assert_eq!(Opcode::new(0x02).name(), None);
    }

    #[test]
    fn test_operand_lengths() {
        assert_eq!(Opcode::STANDBY.operand_len(), Some(0));
        assert_eq!(Opcode::ACTIVE_SOURCE.operand_len(), Some(2));
        assert_eq!(Opcode::REPORT_PHYSICAL_ADDRESS.operand_len(), Some(3));
    }

    #[test]
    fn test_parse_and_token() {
        assert_eq!(Opcode::parse("0x82"), Some(Opcode::ACTIVE_SOURCE));
        assert_eq!(Opcode::parse("82"), Some(Opcode::ACTIVE_SOURCE));
        assert_eq!(Opcode::parse("nope"), None);
        assert_eq!(Opcode::ACTIVE_SOURCE.token(), "0x82");
        assert_eq!(Opcode::ACTIVE_SOURCE.to_string(), "0x82");
    }
}
