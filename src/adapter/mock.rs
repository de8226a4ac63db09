//! Emulated bus controller.
//!
//! [`MockBus`] shares a [`SharedMedium`] with a [`MockDut`]: messages sent
//! from the adapter side land in the DUT's transcript as `Received` lines,
//! and scripted auto-responses land as `Sent Response` lines plus bus
//! frames, the way a real sink's driver answers query opcodes on its own.

use super::{AdapterError, CecBusController, CecDeviceInfo};
use crate::cec::{LogicalAddress, Opcode, PhysicalAddress};
use crate::session::mock::{frame_data_field, BusFrame, MockDut, SharedMedium};
use std::collections::HashMap;

/// A scripted auto-response to one trigger opcode.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub opcode: Opcode,
    pub broadcast: bool,
    pub payload: Vec<u8>,
    /// Replace the first two payload bytes with the DUT's physical address.
    pub embeds_physical_address: bool,
}

/// [`CecBusController`] over the emulated bus.
pub struct MockBus {
    medium: SharedMedium,
    dut_physical_address: PhysicalAddress,
    adapter: CecDeviceInfo,
    devices: Vec<CecDeviceInfo>,
    responses: HashMap<u8, MockResponse>,
}

impl MockBus {
    /// Build a bus linked to the given DUT, populated with the adapter and
    /// one extra peer, and loaded with the auto-responses a sink device
    /// gives to the standard query opcodes.
    pub fn linked(dut: &MockDut) -> Self {
        let adapter = CecDeviceInfo {
            logical_address: LogicalAddress::new(4).unwrap_or(LogicalAddress::BROADCAST),
            physical_address: PhysicalAddress::parse("2.0.0.0"),
            osd_name: "CECTester".to_string(),
            vendor: "Pulse Eight".to_string(),
            power_status: "on".to_string(),
        };
        let recorder = CecDeviceInfo {
            logical_address: LogicalAddress::new(1).unwrap_or(LogicalAddress::BROADCAST),
            physical_address: PhysicalAddress::parse("1.0.0.0"),
            osd_name: "Recorder 1".to_string(),
            vendor: "Unknown".to_string(),
            power_status: "standby".to_string(),
        };

        let mut responses = HashMap::new();
        responses.insert(
            Opcode::GIVE_PHYSICAL_ADDRESS.value(),
            MockResponse {
                opcode: Opcode::REPORT_PHYSICAL_ADDRESS,
                broadcast: true,
                // Address placeholder bytes plus the device-type operand.
                payload: vec![0xFF, 0xFF, 0x00],
                embeds_physical_address: true,
            },
        );
        responses.insert(
            Opcode::GIVE_DEVICE_POWER_STATUS.value(),
            MockResponse {
                opcode: Opcode::REPORT_POWER_STATUS,
                broadcast: false,
                payload: vec![0x00],
                embeds_physical_address: false,
            },
        );
        responses.insert(
            Opcode::GET_CEC_VERSION.value(),
            MockResponse {
                opcode: Opcode::CEC_VERSION,
                broadcast: false,
                payload: vec![0x05],
                embeds_physical_address: false,
            },
        );

        Self {
            medium: dut.medium(),
            dut_physical_address: dut.physical_address(),
            devices: vec![recorder, adapter.clone()],
            adapter,
            responses,
        }
    }

    /// Add or replace an auto-response for a trigger opcode.
    pub fn with_response(mut self, trigger: Opcode, response: MockResponse) -> Self {
        self.responses.insert(trigger.value(), response);
        self
    }

    fn auto_respond(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        trigger: Opcode,
    ) {
        let Some(response) = self.responses.get(&trigger.value()).cloned() else {
            return;
        };

        // The addressed device answers; a broadcast query is answered by
        // the sink at the root.
        let responder = if destination.is_broadcast() {
            LogicalAddress::TV
        } else {
            destination
        };
        let response_destination = if response.broadcast {
            LogicalAddress::BROADCAST
        } else {
            initiator
        };

        let mut payload = response.payload.clone();
        if response.embeds_physical_address {
            self.dut_physical_address.apply_to_payload(&mut payload);
        }

        self.medium.push_frame(BusFrame {
            initiator: responder,
            destination: response_destination,
            opcode: response.opcode,
            payload: payload.clone(),
        });
        self.medium.append_line(&format!(
            "Sent Response Opcode: [{}] [{}] Initiator: [{}], Destination: [{}] Data: [{}]",
            response.opcode,
            response.opcode.name().unwrap_or("Unknown"),
            responder,
            response_destination,
            frame_data_field(responder, response_destination, response.opcode, &payload),
        ));
    }
}

impl CecBusController for MockBus {
    fn list_devices(&mut self) -> Result<Vec<CecDeviceInfo>, AdapterError> {
        Ok(self.devices.clone())
    }

    fn adapter_address(&mut self) -> Result<LogicalAddress, AdapterError> {
        Ok(self.adapter.logical_address)
    }

    fn send_message(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        self.medium.push_frame(BusFrame {
            initiator,
            destination,
            opcode,
            payload: payload.to_vec(),
        });
        self.medium.append_line(&format!(
            "Received Opcode: [{}] [{}] Initiator: [{}], Destination: [{}] Data: [{}]",
            opcode,
            opcode.name().unwrap_or("Unknown"),
            initiator,
            destination,
            frame_data_field(initiator, destination, opcode, payload),
        ));

        self.auto_respond(initiator, destination, opcode);
        Ok(())
    }

    fn check_transmit_status(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError> {
        Ok(self.medium.frames().iter().any(|frame| {
            frame.initiator == initiator
                && frame.destination == destination
                && frame.opcode == opcode
                && frame.payload == payload
        }))
    }

    fn check_message_received(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError> {
        if destination != self.adapter.logical_address && !destination.is_broadcast() {
            return Ok(false);
        }
        self.check_transmit_status(initiator, destination, opcode, payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::scrape;

    const SUITE: &str = "L3 HDMICEC Sink Functions";

    fn linked() -> (MockDut, MockBus) {
        let dut = MockDut::sink(SUITE);
        let bus = MockBus::linked(&dut);
        (dut, bus)
    }

    #[test]
    fn test_send_message_lands_in_transcript() {
        let (dut, mut bus) = linked();
        let adapter = bus.adapter_address().unwrap();
        bus.send_message(adapter, LogicalAddress::TV, Opcode::STANDBY, &[])
            .unwrap();

        let report = scrape(&dut.medium().transcript());
        assert_eq!(report.received.len(), 1);
        assert_eq!(report.received[0].opcode, "0x36");
        assert_eq!(report.received[0].initiator, "4");
        assert_eq!(report.received[0].destination, "0");
        assert_eq!(report.received[0].data, vec!["0x40", "0x36"]);
    }

    #[test]
    fn test_query_triggers_auto_response() {
        let (dut, mut bus) = linked();
        let adapter = bus.adapter_address().unwrap();
        bus.send_message(
            adapter,
            LogicalAddress::TV,
            Opcode::GIVE_PHYSICAL_ADDRESS,
            &[],
        )
        .unwrap();

        let report = scrape(&dut.medium().transcript());
        assert_eq!(report.response.len(), 1);
        assert_eq!(report.response[0].opcode, "0x84");
        assert_eq!(report.response[0].destination, "f");
        // Physical address bytes substituted into the placeholder payload.
        assert_eq!(
            report.response[0].data,
            vec!["0x0f", "0x84", "0x00", "0x00", "0x00"]
        );
    }

    #[test]
    fn test_check_transmit_status_finds_response_frame() {
        let (_dut, mut bus) = linked();
        let adapter = bus.adapter_address().unwrap();
        bus.send_message(
            adapter,
            LogicalAddress::TV,
            Opcode::GIVE_PHYSICAL_ADDRESS,
            &[],
        )
        .unwrap();

        let found = bus
            .check_transmit_status(
                LogicalAddress::TV,
                LogicalAddress::BROADCAST,
                Opcode::REPORT_PHYSICAL_ADDRESS,
                &[0x00, 0x00, 0x00],
            )
            .unwrap();
        assert!(found);

        let missing = bus
            .check_transmit_status(
                LogicalAddress::TV,
                LogicalAddress::BROADCAST,
                Opcode::REPORT_PHYSICAL_ADDRESS,
                &[0x20, 0x00, 0x00],
            )
            .unwrap();
        assert!(!missing);
    }

    #[test]
    fn test_check_message_received_requires_adapter_destination() {
        let (_dut, mut bus) = linked();
        let adapter = bus.adapter_address().unwrap();
        let recorder = LogicalAddress::new(1).unwrap();

        bus.send_message(adapter, recorder, Opcode::STANDBY, &[]).unwrap();

        // Frame addressed to another peer: on the bus, but not received by
        // the adapter.
        assert!(bus
            .check_transmit_status(adapter, recorder, Opcode::STANDBY, &[])
            .unwrap());
        assert!(!bus
            .check_message_received(adapter, recorder, Opcode::STANDBY, &[])
            .unwrap());
    }

    #[test]
    fn test_list_devices_includes_adapter_and_peer() {
        let (_dut, mut bus) = linked();
        let devices = bus.list_devices().unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices
            .iter()
            .any(|d| d.logical_address == LogicalAddress::new(4).unwrap()));
    }
}
