//! Transmit every configured command from the DUT to every peer on the bus
//! and verify the link-layer acknowledgments.

use crate::harness::{CaseContext, CaseResult};
use crate::verify::evaluate_transmit_response;
use cec_hal_conformance_macros::cec_test;

#[cec_test]
fn transmit_commands(cx: &mut CaseContext) -> CaseResult {
    let source = cx.profile.dut_address();
    cx.hal.add_logical_address(source)?;

    let devices = cx.bus.list_devices()?;
    let commands = cx.commands_for("transmit_commands");

    for device in devices.iter().filter(|d| d.logical_address.is_peer()) {
        let destination = device.logical_address;

        for spec in &commands {
            let opcode = spec
                .opcode()
                .ok_or("unparseable opcode in command table")?;
            let payload = spec
                .payload_bytes()
                .ok_or("unparseable payload in command table")?;

            let description = format!(
                "HdmiCecTx Source: {} Destination: {} Opcode: {} Payload: {:?}",
                source, destination, opcode, spec.payload
            );
            cx.step_start(&description);

            let response = cx.hal.transmit(destination, opcode, &payload)?;
            let acked = evaluate_transmit_response(&response, destination);
            let on_bus = cx
                .bus
                .check_transmit_status(source, destination, opcode, &payload)?;

            cx.step_result(acked && on_bus, &description);
        }
    }

    cx.hal.remove_logical_address()?;
    cx.finish()
}
