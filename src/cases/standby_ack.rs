//! Transmit a single Standby to the adapter and validate the ack from both
//! ends: the HAL's reported transmit status and the adapter's own receipt.

use crate::cec::Opcode;
use crate::harness::{CaseContext, CaseResult};
use crate::verify::evaluate_transmit_response;
use cec_hal_conformance_macros::cec_test;

#[cec_test]
fn standby_ack(cx: &mut CaseContext) -> CaseResult {
    let source = cx.profile.dut_address();
    cx.hal.add_logical_address(source)?;

    let destination = cx.bus.adapter_address()?;

    let commands = cx.commands_for("standby_ack");
    let mut table: Vec<(Opcode, Vec<u8>)> = Vec::new();
    for spec in &commands {
        let opcode = spec
            .opcode()
            .ok_or("unparseable opcode in command table")?;
        let payload = spec
            .payload_bytes()
            .ok_or("unparseable payload in command table")?;
        table.push((opcode, payload));
    }
    if table.is_empty() {
        table.push((Opcode::STANDBY, Vec::new()));
    }

    for (opcode, payload) in &table {
        let description = format!(
            "HdmiCecTx Source: {} Destination: {} Opcode: {}",
            source, destination, opcode
        );
        cx.step_start(&description);

        let response = cx.hal.transmit(destination, *opcode, payload)?;
        let acked = evaluate_transmit_response(&response, destination);
        let received = cx
            .bus
            .check_message_received(source, destination, *opcode, payload)?;

        cx.step_result(acked && received, &description);
    }

    cx.hal.remove_logical_address()?;
    cx.finish()
}
