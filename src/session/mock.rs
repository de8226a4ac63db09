//! In-process DUT stand-in.
//!
//! [`MockDut`] emulates the menu binary of a sink device well enough to run
//! every conformance case on the host: it honors the same menu items and
//! prompt sequences, writes the same result and callback lines, and shares a
//! [`SharedMedium`] with the mock bus controller so traffic injected from
//! the adapter side shows up in the DUT's transcript and vice versa.

use super::{MenuSession, PromptAnswer, SessionError};
use crate::cec::{LogicalAddress, Opcode, PhysicalAddress};
use std::sync::{Arc, Mutex, PoisonError};

/// One frame observed on the emulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFrame {
    pub initiator: LogicalAddress,
    pub destination: LogicalAddress,
    pub opcode: Opcode,
    pub payload: Vec<u8>,
}

#[derive(Default)]
struct MediumState {
    transcript: String,
    frames: Vec<BusFrame>,
}

/// The emulated bus plus the DUT's console, shared between the mock session
/// and the mock bus controller.
///
/// The transcript is append-only, like the real session's buffer.
#[derive(Clone, Default)]
pub struct SharedMedium(Arc<Mutex<MediumState>>);

impl SharedMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one line to the DUT console transcript.
    pub fn append_line(&self, line: &str) {
        let mut state = self.lock();
        state.transcript.push_str(line);
        state.transcript.push('\n');
    }

    /// Record a frame as seen on the bus.
    pub fn push_frame(&self, frame: BusFrame) {
        self.lock().frames.push(frame);
    }

    /// Snapshot of the console transcript.
    pub fn transcript(&self) -> String {
        self.lock().transcript.clone()
    }

    /// Snapshot of all frames observed so far.
    pub fn frames(&self) -> Vec<BusFrame> {
        self.lock().frames.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MediumState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Menu prompts the emulated binary raises, matching the real one.
const PROMPT_LOGICAL_ADDRESS: &str = "Enter Logical Address:";
const PROMPT_DESTINATION: &str = "Enter a valid Destination Logical Address:";
const PROMPT_COMMAND: &str = "Enter CEC Command (in hex):";
const PROMPT_DATABYTE: &str = "Enter Databyte";

/// An emulated sink DUT behind the [`MenuSession`] trait.
pub struct MockDut {
    suite: String,
    physical_address: PhysicalAddress,
    logical_address: Option<LogicalAddress>,
    medium: SharedMedium,
}

impl MockDut {
    /// A sink device at the root of the HDMI topology.
    pub fn sink(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            physical_address: PhysicalAddress::ROOT,
            logical_address: None,
            medium: SharedMedium::new(),
        }
    }

    /// Handle to the shared bus/console medium, for linking a mock bus
    /// controller to this DUT.
    pub fn medium(&self) -> SharedMedium {
        self.medium.clone()
    }

    /// The emulated device's physical address.
    pub fn physical_address(&self) -> PhysicalAddress {
        self.physical_address
    }

    fn reply(&self, line: String) -> Result<String, SessionError> {
        self.medium.append_line(&line);
        Ok(line)
    }

    /// Check that the raised prompts line up 1:1 with the supplied answers.
    fn expect_prompts(
        prompts: &[PromptAnswer],
        expected: &[&str],
    ) -> Result<(), SessionError> {
        for (index, want) in expected.iter().enumerate() {
            match prompts.get(index) {
                Some(given) if given.prompt == *want => {}
                _ => {
                    return Err(SessionError::PromptMismatch {
                        expected: (*want).to_string(),
                    })
                }
            }
        }
        if prompts.len() > expected.len() {
            return Err(SessionError::PromptMismatch {
                expected: prompts[expected.len()].prompt.clone(),
            });
        }
        Ok(())
    }

    fn transmit(&mut self, prompts: &[PromptAnswer]) -> Result<String, SessionError> {
        if prompts.len() < 2 {
            return Err(SessionError::PromptMismatch {
                expected: PROMPT_DESTINATION.to_string(),
            });
        }
        let mut expected = vec![PROMPT_DESTINATION, PROMPT_COMMAND];
        expected.extend(std::iter::repeat(PROMPT_DATABYTE).take(prompts.len() - 2));
        Self::expect_prompts(prompts, &expected)?;

        let destination = LogicalAddress::parse(&prompts[0].answer);
        let opcode = Opcode::parse(&prompts[1].answer);
        let payload: Option<Vec<u8>> = prompts[2..]
            .iter()
            .map(|p| crate::cec::parse_byte_token(&p.answer))
            .collect();

        let (Some(destination), Some(opcode), Some(payload)) = (destination, opcode, payload)
        else {
            return self.reply(
                "Result HdmiCecTx(IN:handle:[0x1], OUT:result:[HDMI_CEC_IO_INVALID_ARGUMENT]) \
                 HDMI_CEC_STATUS:[HDMI_CEC_IO_INVALID_ARGUMENT]"
                    .to_string(),
            );
        };

        self.medium.push_frame(BusFrame {
            initiator: self.logical_address.unwrap_or(LogicalAddress::TV),
            destination,
            opcode,
            payload,
        });

        // Everything on the emulated bus acknowledges unicast frames;
        // broadcasts are never acknowledged, as on a real bus.
        let result = if destination.is_broadcast() {
            "HDMI_CEC_IO_SENT_BUT_NOT_ACKD"
        } else {
            "HDMI_CEC_IO_SENT_AND_ACKD"
        };
        self.reply(format!(
            "Result HdmiCecTx(IN:handle:[0x1], IN:buf:[0x100], IN:len:[{}], OUT:result:[{}]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS]",
            prompts.len(),
            result
        ))
    }
}

impl MenuSession for MockDut {
    fn select(
        &mut self,
        suite: &str,
        item: &str,
        prompts: &[PromptAnswer],
    ) -> Result<String, SessionError> {
        if suite != self.suite {
            return Err(SessionError::UnknownMenuItem {
                suite: suite.to_string(),
                item: item.to_string(),
            });
        }

        match item {
            "Init HDMI CEC" => {
                Self::expect_prompts(prompts, &[])?;
                self.reply(
                    "Result HdmiCecOpen(OUT:handle:[0x1]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS]"
                        .to_string(),
                )
            }
            "Close HDMI CEC" => {
                Self::expect_prompts(prompts, &[])?;
                self.logical_address = None;
                self.reply(
                    "Result HdmiCecClose(IN:handle:[0x1]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS]"
                        .to_string(),
                )
            }
            "Add Logical Address" => {
                Self::expect_prompts(prompts, &[PROMPT_LOGICAL_ADDRESS])?;
                self.logical_address = LogicalAddress::parse(&prompts[0].answer);
                self.reply(format!(
                    "Result HdmiCecAddLogicalAddress (IN:handle:[0x1], IN:logicalAddress:[{}]) HDMI_CEC_STATUS[HDMI_CEC_IO_SUCCESS]",
                    prompts[0].answer
                ))
            }
            "Remove Logical Address" => {
                Self::expect_prompts(prompts, &[])?;
                self.logical_address = None;
                self.reply(
                    "Result HdmiCecRemoveLogicalAddress(IN:handle:[0x1], IN:logicalAddress:[0]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS])"
                        .to_string(),
                )
            }
            "Get Logical Address" => {
                Self::expect_prompts(prompts, &[])?;
                let address = self
                    .logical_address
                    .unwrap_or(LogicalAddress::BROADCAST);
                self.reply(format!(
                    "Result HdmiCecGetLogicalAddress(IN:handle:[0x1], OUT:logicalAddress:[{}]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS])",
                    address
                ))
            }
            // The menu binary registers the item with this spelling.
            "Get Phyiscal Address" => {
                Self::expect_prompts(prompts, &[])?;
                self.reply(format!(
                    "Result HdmiCecGetPhysicalAddress(IN:handle:[0x1], OUT:physicalAddress:[{}]) HDMI_CEC_STATUS:[HDMI_CEC_IO_SUCCESS]",
                    self.physical_address
                ))
            }
            "Transmit CEC Command" => self.transmit(prompts),
            _ => Err(SessionError::UnknownMenuItem {
                suite: suite.to_string(),
                item: item.to_string(),
            }),
        }
    }

    fn read_transcript(&mut self) -> Result<String, SessionError> {
        Ok(self.medium.transcript())
    }
}

/// Render a payload as the colon-separated hex of a callback data field.
pub fn data_field(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Render a whole frame (address byte, opcode, operands) as a data field.
pub fn frame_data_field(
    initiator: LogicalAddress,
    destination: LogicalAddress,
    opcode: Opcode,
    payload: &[u8],
) -> String {
    let mut bytes = vec![
        (initiator.value() << 4) | destination.value(),
        opcode.value(),
    ];
    bytes.extend_from_slice(payload);
    data_field(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{extract_physical_address, extract_tx_status, TxStatus};

    const SUITE: &str = "L3 HDMICEC Sink Functions";

    fn dut() -> MockDut {
        MockDut::sink(SUITE)
    }

    #[test]
    fn test_init_and_close() {
        let mut dut = dut();
        let response = dut.select(SUITE, "Init HDMI CEC", &[]).unwrap();
        assert!(response.contains("Result HdmiCecOpen"));
        let response = dut.select(SUITE, "Close HDMI CEC", &[]).unwrap();
        assert!(response.contains("Result HdmiCecClose"));
    }

    #[test]
    fn test_add_then_get_logical_address() {
        let mut dut = dut();
        dut.select(
            SUITE,
            "Add Logical Address",
            &[PromptAnswer::new(PROMPT_LOGICAL_ADDRESS, "0")],
        )
        .unwrap();
        let response = dut.select(SUITE, "Get Logical Address", &[]).unwrap();
        assert!(response.contains("OUT:logicalAddress:[0]"));
    }

    #[test]
    fn test_logical_address_unset_reports_broadcast() {
        let mut dut = dut();
        let response = dut.select(SUITE, "Get Logical Address", &[]).unwrap();
        assert!(response.contains("OUT:logicalAddress:[f]"));
    }

    #[test]
    fn test_physical_address_reported() {
        let mut dut = dut();
        let response = dut.select(SUITE, "Get Phyiscal Address", &[]).unwrap();
        assert_eq!(
            extract_physical_address(&response),
            Some(dut.physical_address())
        );
    }

    #[test]
    fn test_transmit_ack_semantics() {
        let mut dut = dut();
        let unicast = dut
            .select(
                SUITE,
                "Transmit CEC Command",
                &[
                    PromptAnswer::new(PROMPT_DESTINATION, "4"),
                    PromptAnswer::new(PROMPT_COMMAND, "0x36"),
                ],
            )
            .unwrap();
        assert_eq!(extract_tx_status(&unicast), Some(TxStatus::SentAndAcked));

        let broadcast = dut
            .select(
                SUITE,
                "Transmit CEC Command",
                &[
                    PromptAnswer::new(PROMPT_DESTINATION, "f"),
                    PromptAnswer::new(PROMPT_COMMAND, "0x85"),
                ],
            )
            .unwrap();
        assert_eq!(
            extract_tx_status(&broadcast),
            Some(TxStatus::SentButNotAcked)
        );
    }

    #[test]
    fn test_transmit_records_bus_frame() {
        let mut dut = dut();
        dut.select(
            SUITE,
            "Add Logical Address",
            &[PromptAnswer::new(PROMPT_LOGICAL_ADDRESS, "0")],
        )
        .unwrap();
        dut.select(
            SUITE,
            "Transmit CEC Command",
            &[
                PromptAnswer::new(PROMPT_DESTINATION, "4"),
                PromptAnswer::new(PROMPT_COMMAND, "0x36"),
                PromptAnswer::new(PROMPT_DATABYTE, "0x01"),
            ],
        )
        .unwrap();

        let frames = dut.medium().frames();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].opcode, Opcode::STANDBY);
        assert_eq!(frames[0].destination, LogicalAddress::new(4).unwrap());
        assert_eq!(frames[0].payload, vec![0x01]);
    }

    #[test]
    fn test_wrong_prompt_sequence_rejected() {
        let mut dut = dut();
        let result = dut.select(
            SUITE,
            "Add Logical Address",
            &[PromptAnswer::new("Enter Databyte", "0")],
        );
        assert!(matches!(result, Err(SessionError::PromptMismatch { .. })));
    }

    #[test]
    fn test_unknown_item_rejected() {
        let mut dut = dut();
        let result = dut.select(SUITE, "Format Flash", &[]);
        assert!(matches!(result, Err(SessionError::UnknownMenuItem { .. })));
    }

    #[test]
    fn test_unknown_suite_rejected() {
        let mut dut = dut();
        let result = dut.select("Some Other Suite", "Init HDMI CEC", &[]);
        assert!(matches!(result, Err(SessionError::UnknownMenuItem { .. })));
    }

    #[test]
    fn test_data_field_rendering() {
        assert_eq!(data_field(&[0x40, 0x82, 0x20, 0x00]), "40:82:20:00");
        let field = frame_data_field(
            LogicalAddress::new(4).unwrap(),
            LogicalAddress::TV,
            Opcode::ACTIVE_SOURCE,
            &[0x20, 0x00],
        );
        assert_eq!(field, "40:82:20:00");
    }

    #[test]
    fn test_transcript_is_append_only() {
        let mut dut = dut();
        dut.select(SUITE, "Init HDMI CEC", &[]).unwrap();
        let first = dut.read_transcript().unwrap();
        dut.select(SUITE, "Get Logical Address", &[]).unwrap();
        let second = dut.read_transcript().unwrap();
        assert!(second.starts_with(&first));
    }
}
