//! Device test profiles.
//!
//! A profile is static configuration, pure lookup: what kind of device the
//! DUT is, which menu suite drives it, how to reach its console and the bus
//! adapter, and the per-case command tables. Profiles are JSON files loaded
//! through serde and validated once at load time, so a bad opcode or an
//! oversized payload fails the run before any session is opened.

use crate::cec::{parse_byte_token, LogicalAddress, Opcode};
use crate::session::SessionSettings;
use crate::adapter::AdapterSettings;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// Most operands a CEC frame can carry (16 blocks minus header and opcode).
pub const MAX_OPERANDS: usize = 14;

/// What role the DUT plays on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Sink,
    Source,
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sink => write!(f, "sink"),
            Self::Source => write!(f, "source"),
        }
    }
}

/// Whether a command is addressed to one device or to everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Direct,
    Broadcast,
}

impl MessageType {
    pub fn is_broadcast(self) -> bool {
        matches!(self, Self::Broadcast)
    }
}

/// A response the DUT is expected to send back for a command.
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseSpec {
    /// Response opcode token, e.g. `"0x84"`.
    pub command: String,
    #[serde(default)]
    pub payload: Vec<String>,
    #[serde(default, rename = "type")]
    pub message_type: MessageType,
    /// The leading payload bytes carry the DUT's physical address and are
    /// substituted per run.
    #[serde(default)]
    pub embeds_physical_address: bool,
}

/// One entry of a case's command table.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Opcode token, e.g. `"0x36"`.
    pub command: String,
    #[serde(default)]
    pub payload: Vec<String>,
    #[serde(default, rename = "type")]
    pub message_type: MessageType,
    #[serde(default)]
    pub embeds_physical_address: bool,
    #[serde(default)]
    pub response: Option<ResponseSpec>,
}

impl CommandSpec {
    /// The parsed opcode. Guaranteed to succeed on a validated profile.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::parse(&self.command)
    }

    /// The payload as byte values. Guaranteed on a validated profile.
    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        parse_payload(&self.payload)
    }
}

impl ResponseSpec {
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::parse(&self.command)
    }

    pub fn payload_bytes(&self) -> Option<Vec<u8>> {
        parse_payload(&self.payload)
    }
}

fn parse_payload(tokens: &[String]) -> Option<Vec<u8>> {
    tokens.iter().map(|t| parse_byte_token(t)).collect()
}

/// The full test profile for one DUT.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceProfile {
    pub device_type: DeviceType,
    /// Logical address the DUT claims during the run.
    pub logical_address: u8,
    /// Number of HDMI ports on the DUT.
    #[serde(default = "default_port_count")]
    pub port_count: u8,
    /// Menu suite driving the HAL test binary.
    #[serde(default = "default_test_suite")]
    pub test_suite: String,
    /// Console session settings; absent when only mock runs are intended.
    #[serde(default)]
    pub session: Option<SessionSettings>,
    /// Bus adapter settings.
    #[serde(default)]
    pub adapter: Option<AdapterSettings>,
    /// Command tables, keyed by conformance case name.
    #[serde(default)]
    pub commands: BTreeMap<String, Vec<CommandSpec>>,
}

fn default_port_count() -> u8 {
    1
}

fn default_test_suite() -> String {
    "L3 HDMICEC Sink Functions".to_string()
}

impl DeviceProfile {
    /// Load and validate a profile from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(ProfileError::Io)?;
        let profile: Self = serde_json::from_str(&text).map_err(ProfileError::Json)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if LogicalAddress::new(self.logical_address).is_none() {
            return Err(ProfileError::Invalid(format!(
                "logical address {} does not fit in a nibble",
                self.logical_address
            )));
        }
        if self.port_count == 0 {
            return Err(ProfileError::Invalid("port count is zero".to_string()));
        }

        for (case, commands) in &self.commands {
            if commands.is_empty() {
                return Err(ProfileError::Invalid(format!(
                    "empty command table for case '{}'",
                    case
                )));
            }
            for spec in commands {
                validate_command(case, &spec.command, &spec.payload)?;
                if let Some(response) = &spec.response {
                    validate_command(case, &response.command, &response.payload)?;
                }
            }
        }

        Ok(())
    }

    /// The DUT's configured logical address.
    pub fn dut_address(&self) -> LogicalAddress {
        // Validated at load; fall back to the TV address rather than panic.
        LogicalAddress::new(self.logical_address).unwrap_or(LogicalAddress::TV)
    }

    /// The command table for a case; missing tables are empty.
    pub fn commands_for(&self, case: &str) -> &[CommandSpec] {
        self.commands
            .get(case)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// A self-contained sink profile for mock runs and demos.
    pub fn demo_sink() -> Self {
        let text = r#"{
            "device_type": "sink",
            "logical_address": 0,
            "port_count": 2,
            "commands": {
                "transmit_commands": [
                    { "command": "0x36" },
                    { "command": "0x04" }
                ],
                "receive_commands": [
                    { "command": "0x36" },
                    {
                        "command": "0x82",
                        "type": "broadcast",
                        "payload": ["0x20", "0x00"]
                    },
                    {
                        "command": "0x83",
                        "response": {
                            "command": "0x84",
                            "type": "broadcast",
                            "payload": ["0xff", "0xff", "0x00"],
                            "embeds_physical_address": true
                        }
                    }
                ],
                "standby_ack": [
                    { "command": "0x36" }
                ]
            }
        }"#;
        serde_json::from_str(text).expect("demo profile must parse")
    }
}

fn validate_command(case: &str, command: &str, payload: &[String]) -> Result<(), ProfileError> {
    if Opcode::parse(command).is_none() {
        return Err(ProfileError::Invalid(format!(
            "case '{}': unparseable opcode '{}'",
            case, command
        )));
    }
    if payload.len() > MAX_OPERANDS {
        return Err(ProfileError::Invalid(format!(
            "case '{}': payload of {} exceeds {} operands",
            case,
            command,
            MAX_OPERANDS
        )));
    }
    for token in payload {
        if parse_byte_token(token).is_none() {
            return Err(ProfileError::Invalid(format!(
                "case '{}': unparseable payload byte '{}'",
                case, token
            )));
        }
    }
    Ok(())
}

/// Errors loading or validating a profile.
#[derive(Debug)]
pub enum ProfileError {
    Io(io::Error),
    Json(serde_json::Error),
    Invalid(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read profile: {}", e),
            Self::Json(e) => write!(f, "failed to parse profile: {}", e),
            Self::Invalid(msg) => write!(f, "invalid profile: {}", msg),
        }
    }
}

impl std::error::Error for ProfileError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            Self::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_profile_is_valid() {
        let profile = DeviceProfile::demo_sink();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.device_type, DeviceType::Sink);
        assert_eq!(profile.dut_address(), LogicalAddress::TV);
        assert_eq!(profile.commands_for("transmit_commands").len(), 2);
        assert!(profile.commands_for("missing_case").is_empty());
    }

    #[test]
    fn test_command_spec_accessors() {
        let profile = DeviceProfile::demo_sink();
        let commands = profile.commands_for("receive_commands");
        let active_source = &commands[1];
        assert_eq!(active_source.opcode(), Some(Opcode::ACTIVE_SOURCE));
        assert_eq!(active_source.payload_bytes(), Some(vec![0x20, 0x00]));
        assert!(active_source.message_type.is_broadcast());

        let give_physical = &commands[2];
        let response = give_physical.response.as_ref().unwrap();
        assert_eq!(response.opcode(), Some(Opcode::REPORT_PHYSICAL_ADDRESS));
        assert!(response.embeds_physical_address);
    }

    #[test]
    fn test_unparseable_opcode_rejected() {
        let text = r#"{
            "device_type": "sink",
            "logical_address": 0,
            "commands": { "transmit_commands": [ { "command": "banana" } ] }
        }"#;
        let profile: DeviceProfile = serde_json::from_str(text).unwrap();
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_oversized_payload_rejected() {
        let payload: Vec<String> = (0..15).map(|i| format!("0x{:02x}", i)).collect();
        let err = validate_command("x", "0x36", &payload);
        assert!(matches!(err, Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_out_of_range_logical_address_rejected() {
        let text = r#"{ "device_type": "sink", "logical_address": 16 }"#;
        let profile: DeviceProfile = serde_json::from_str(text).unwrap();
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_unknown_device_type_fails_parse() {
        let text = r#"{ "device_type": "toaster", "logical_address": 0 }"#;
        assert!(serde_json::from_str::<DeviceProfile>(text).is_err());
    }

    #[test]
    fn test_empty_command_table_rejected() {
        let text = r#"{
            "device_type": "sink",
            "logical_address": 0,
            "commands": { "transmit_commands": [] }
        }"#;
        let profile: DeviceProfile = serde_json::from_str(text).unwrap();
        assert!(matches!(profile.validate(), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn test_session_settings_parse() {
        let text = r#"{
            "device_type": "sink",
            "logical_address": 0,
            "session": {
                "command": ["ssh", "root@dut", "/opt/hal-test/run.sh"],
                "prompt_timeout_secs": 60
            },
            "adapter": { "port": "/dev/ttyACM0" }
        }"#;
        let profile: DeviceProfile = serde_json::from_str(text).unwrap();
        profile.validate().unwrap();
        let session = profile.session.unwrap();
        assert_eq!(session.command.len(), 3);
        assert_eq!(session.prompt_timeout_secs, 60);
        assert_eq!(session.ready_marker, "Select Option:");
        let adapter = profile.adapter.unwrap();
        assert_eq!(adapter.port.as_deref(), Some("/dev/ttyACM0"));
        assert_eq!(adapter.logical_address, 4);
    }
}
