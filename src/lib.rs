//! HDMI-CEC HAL conformance harness.
//!
//! Host-side test suite for the HDMI-CEC hardware abstraction layer of a
//! device under test. The DUT runs a menu-driven HAL test binary; this crate
//! drives that menu over a console session, scrapes the callback transcript,
//! and verifies transmit/receive semantics from two vantage points: the
//! HAL's own result lines and an independent CEC bus adapter.
//!
//! Everything down to the session transport is swappable: [`MockDut`] and
//! [`MockBus`] emulate the DUT and the bus for host-only runs, so the whole
//! conformance suite can execute without hardware attached.
//!
//! [`MockDut`]: session::mock::MockDut
//! [`MockBus`]: adapter::MockBus

// Allow the crate to reference itself by name (needed for proc-macro generated code)
extern crate self as cec_hal_conformance;

pub mod adapter;
pub mod cases;
pub mod cec;
pub mod hal;
pub mod harness;
pub mod profile;
pub mod session;
pub mod testing;
pub mod transcript;
pub mod verify;

// Re-export commonly used items
pub use cec::{LogicalAddress, Opcode, PhysicalAddress};
pub use hal::HdmiCecHal;
pub use profile::{DeviceProfile, DeviceType};
pub use session::{MenuSession, PromptAnswer};
pub use testing::TestRunner;
pub use transcript::{scrape, CallbackReport, CecEvent};
pub use verify::{evaluate_transmit_response, ReceiveExpectation};
