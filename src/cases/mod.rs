//! Conformance cases, one file per case.
//!
//! Each case is a `#[cec_test]` function driving the DUT through the menu
//! client and cross-checking from the bus adapter's vantage point. The case
//! name doubles as the key into the profile's command tables.

mod receive_commands;
mod standby_ack;
mod transmit_commands;

#[cfg(test)]
mod tests {
    use crate::adapter::{MockBus, MockResponse};
    use crate::cec::Opcode;
    use crate::hal::HdmiCecHal;
    use crate::harness::{find_case, CaseContext};
    use crate::profile::DeviceProfile;
    use crate::session::mock::MockDut;

    fn mock_context() -> CaseContext {
        let profile = DeviceProfile::demo_sink();
        let dut = MockDut::sink(&profile.test_suite);
        let bus = MockBus::linked(&dut);
        let hal = HdmiCecHal::open(Box::new(dut), &profile.test_suite).unwrap();
        CaseContext::new(hal, Box::new(bus), profile)
    }

    #[test]
    fn test_transmit_commands_passes_on_mock() {
        let entry = find_case("transmit_commands").unwrap();
        let mut cx = mock_context();
        (entry.run)(&mut cx).unwrap();
        assert!(cx.steps().failed == 0 && cx.steps().passed > 0);
    }

    #[test]
    fn test_receive_commands_passes_on_mock() {
        let entry = find_case("receive_commands").unwrap();
        let mut cx = mock_context();
        (entry.run)(&mut cx).unwrap();
        // One step per command plus one per expected response.
        assert_eq!(cx.steps().started, 4);
        assert_eq!(cx.steps().failed, 0);
    }

    #[test]
    fn test_standby_ack_passes_on_mock() {
        let entry = find_case("standby_ack").unwrap();
        let mut cx = mock_context();
        (entry.run)(&mut cx).unwrap();
        assert_eq!(cx.steps().failed, 0);
    }

    #[test]
    fn test_receive_commands_fails_when_response_is_wrong() {
        let profile = DeviceProfile::demo_sink();
        let dut = MockDut::sink(&profile.test_suite);
        // A DUT that answers the physical-address query with the wrong
        // opcode must fail the response verification step.
        let bus = MockBus::linked(&dut).with_response(
            Opcode::GIVE_PHYSICAL_ADDRESS,
            MockResponse {
                opcode: Opcode::CEC_VERSION,
                broadcast: true,
                payload: vec![0x05],
                embeds_physical_address: false,
            },
        );
        let hal = HdmiCecHal::open(Box::new(dut), &profile.test_suite).unwrap();
        let mut cx = CaseContext::new(hal, Box::new(bus), profile);

        let entry = find_case("receive_commands").unwrap();
        assert!((entry.run)(&mut cx).is_err());
        assert_eq!(cx.steps().failed, 1);
    }
}
