//! Inject every configured command from the adapter toward the DUT, verify
//! each one lands in the DUT's callback report, and cross-check any expected
//! response frame on the bus.

use crate::cec::LogicalAddress;
use crate::harness::{CaseContext, CaseResult};
use crate::verify::ReceiveExpectation;
use cec_hal_conformance_macros::cec_test;

#[cec_test]
fn receive_commands(cx: &mut CaseContext) -> CaseResult {
    let dut = cx.profile.dut_address();
    cx.hal.add_logical_address(dut)?;

    let source = cx.bus.adapter_address()?;
    // Known per run, not from the profile; opcodes that embed the sender's
    // physical address are verified against this value.
    let physical = cx.hal.physical_address()?;

    for spec in cx.commands_for("receive_commands") {
        let opcode = spec
            .opcode()
            .ok_or("unparseable opcode in command table")?;
        let payload = spec
            .payload_bytes()
            .ok_or("unparseable payload in command table")?;
        let destination = if spec.message_type.is_broadcast() {
            LogicalAddress::BROADCAST
        } else {
            dut
        };

        let description = format!(
            "HdmiCecRx Initiator: {} Destination: {} Opcode: {}",
            source, destination, opcode
        );
        cx.step_start(&description);

        cx.bus.send_message(source, destination, opcode, &payload)?;
        let report = cx.hal.read_callback_report()?;

        let mut expectation = ReceiveExpectation::new(source, destination, opcode);
        if !spec.payload.is_empty() {
            expectation = expectation.with_payload(&spec.payload);
        }
        let received = if spec.embeds_physical_address {
            match physical {
                Some(address) => expectation.embed_physical_address(address).matches(&report),
                // Address unknown: the expected payload cannot be formed.
                None => false,
            }
        } else {
            expectation.matches(&report)
        };
        cx.step_result(received, &description);

        let Some(response) = &spec.response else {
            continue;
        };
        let response_opcode = response
            .opcode()
            .ok_or("unparseable response opcode in command table")?;
        let mut response_payload = response
            .payload_bytes()
            .ok_or("unparseable response payload in command table")?;
        let response_destination = if response.message_type.is_broadcast() {
            LogicalAddress::BROADCAST
        } else {
            source
        };

        let description = format!(
            "Response Initiator: {} Destination: {} Opcode: {}",
            dut, response_destination, response_opcode
        );
        cx.step_start(&description);

        if response.embeds_physical_address {
            match physical {
                Some(address) => address.apply_to_payload(&mut response_payload),
                None => {
                    cx.step_result(false, &description);
                    continue;
                }
            }
        }
        let sent = cx.bus.check_transmit_status(
            dut,
            response_destination,
            response_opcode,
            &response_payload,
        )?;
        cx.step_result(sent, &description);
    }

    cx.hal.remove_logical_address()?;
    cx.finish()
}
