//! HAL result-line extraction.
//!
//! Every HAL call the menu binary makes is echoed to the console in a fixed
//! `Result <Api>(...) HDMI_CEC_STATUS:[...]` shape. These extractors pull
//! the fields the harness cares about out of a raw menu response. A response
//! that does not contain the expected line yields `None`; nothing here
//! errors.

use crate::cec::{LogicalAddress, PhysicalAddress};
use regex::Regex;
use std::sync::LazyLock;

/// Link-layer outcome of a transmit call, as reported by the HAL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxStatus {
    /// Frame was sent and acknowledged by the destination.
    SentAndAcked,
    /// Frame was sent but no acknowledgment was seen.
    SentButNotAcked,
    /// Any other reported token (failures, unknown states).
    Other(String),
}

impl TxStatus {
    /// Classify a status token from a result line.
    ///
    /// Tokens are logged with the HAL's enum prefix
    /// (`HDMI_CEC_IO_SENT_AND_ACKD`); the bare suffix is accepted too.
    pub fn from_token(token: &str) -> Self {
        let trimmed = token.trim();
        let bare = trimmed.strip_prefix("HDMI_CEC_IO_").unwrap_or(trimmed);
        match bare {
            "SENT_AND_ACKD" => Self::SentAndAcked,
            "SENT_BUT_NOT_ACKD" => Self::SentButNotAcked,
            _ => Self::Other(trimmed.to_string()),
        }
    }
}

static TX_RESULT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Result HdmiCecTx\([^)]*OUT:result:\[(?P<result>[^\]]+)\]\).*HDMI_CEC_STATUS:\[(?P<status>[^\]]+)\]",
    )
    .expect("invalid transmit result grammar")
});

static LOGICAL_ADDRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Result HdmiCecGetLogicalAddress\([^)]*OUT:logicalAddress:\[(?P<address>[0-9A-Fa-f]+)\]\)",
    )
    .expect("invalid logical address grammar")
});

static PHYSICAL_ADDRESS_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Result HdmiCecGetPhysicalAddress\([^)]*OUT:physicalAddress:\[(?P<address>[0-9A-Fa-f](?:\.[0-9A-Fa-f]){3})\]\)",
    )
    .expect("invalid physical address grammar")
});

/// Extract the transmit outcome from a transmit menu response.
///
/// The ack state rides in the `OUT:result` token; the trailing
/// `HDMI_CEC_STATUS` is the API status of the call itself and does not carry
/// ack information, so it is only required to be present.
pub fn extract_tx_status(response: &str) -> Option<TxStatus> {
    TX_RESULT_LINE
        .captures(response)
        .map(|caps| TxStatus::from_token(&caps["result"]))
}

/// Extract the DUT's logical address from a get-logical-address response.
pub fn extract_logical_address(response: &str) -> Option<LogicalAddress> {
    LOGICAL_ADDRESS_LINE
        .captures(response)
        .and_then(|caps| LogicalAddress::parse(&caps["address"]))
}

/// Extract the DUT's physical address from a get-physical-address response.
///
/// `None` means "address unknown" and must not be treated as 0.0.0.0.
pub fn extract_physical_address(response: &str) -> Option<PhysicalAddress> {
    PHYSICAL_ADDRESS_LINE
        .captures(response)
        .and_then(|caps| PhysicalAddress::parse(&caps["address"]))
}
