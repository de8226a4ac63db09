//! CEC bus controller on the test-adapter side.
//!
//! The adapter sits on the same bus as the DUT and gives the harness an
//! independent vantage point: it injects messages toward the DUT and
//! observes what the DUT actually puts on the wire. The [`CecBusController`]
//! trait is the whole contract; [`cec_client::CecClientAdapter`] drives a
//! real libCEC command-line client, and [`mock::MockBus`] emulates the bus
//! for host runs.

pub mod cec_client;
pub mod mock;

pub use cec_client::CecClientAdapter;
pub use mock::{MockBus, MockResponse};

use crate::cec::{LogicalAddress, Opcode, PhysicalAddress};
use serde::Deserialize;
use std::fmt;
use std::io;

/// A device visible on the CEC bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CecDeviceInfo {
    pub logical_address: LogicalAddress,
    /// `None` when the device did not report a parseable address.
    pub physical_address: Option<PhysicalAddress>,
    pub osd_name: String,
    pub vendor: String,
    pub power_status: String,
}

/// The adapter-side view of the bus.
pub trait CecBusController {
    /// Devices currently visible on the bus. Callers iterating peers must
    /// skip the TV and broadcast addresses themselves.
    fn list_devices(&mut self) -> Result<Vec<CecDeviceInfo>, AdapterError>;

    /// The adapter's own logical address on the bus.
    fn adapter_address(&mut self) -> Result<LogicalAddress, AdapterError>;

    /// Put a message on the bus from the adapter.
    fn send_message(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<(), AdapterError>;

    /// Whether a frame with exactly this shape has been observed on the bus.
    ///
    /// Used to cross-check transmits the DUT claims to have made. A missing
    /// frame is `Ok(false)`, not an error.
    fn check_transmit_status(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError>;

    /// Whether the adapter itself received a frame with this shape
    /// (addressed to it, or broadcast).
    fn check_message_received(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError>;
}

/// How the adapter client is started and addressed.
#[derive(Debug, Clone, Deserialize)]
pub struct AdapterSettings {
    /// Adapter client binary.
    #[serde(default = "default_command")]
    pub command: String,
    /// Adapter device port, e.g. `/dev/ttyACM0`. `None` lets the client
    /// autodetect.
    #[serde(default)]
    pub port: Option<String>,
    /// Seconds to wait for bus traffic when checking for a frame.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// The logical address the adapter claims on the bus.
    #[serde(default = "default_logical_address")]
    pub logical_address: u8,
}

fn default_command() -> String {
    "cec-client".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_logical_address() -> u8 {
    4
}

impl Default for AdapterSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            port: None,
            timeout_secs: default_timeout_secs(),
            logical_address: default_logical_address(),
        }
    }
}

/// Render a frame the way the adapter client writes and logs it:
/// colon-separated lowercase hex, address byte first.
pub fn frame_tokens(
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
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Errors from driving the adapter client.
#[derive(Debug)]
pub enum AdapterError {
    /// Failed to start the adapter client.
    Spawn(io::Error),
    /// I/O failure talking to the client.
    Io(io::Error),
    /// The client process ended early.
    Closed,
    /// The requested address does not fit on the bus.
    InvalidAddress(u8),
}

impl fmt::Display for AdapterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(e) => write!(f, "failed to start adapter client: {}", e),
            Self::Io(e) => write!(f, "adapter I/O error: {}", e),
            Self::Closed => write!(f, "adapter client ended unexpectedly"),
            Self::InvalidAddress(v) => write!(f, "invalid logical address value {}", v),
        }
    }
}

impl std::error::Error for AdapterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn(e) | Self::Io(e) => Some(e),
            _ => None,
        }
    }
}
