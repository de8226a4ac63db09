//! Transmit outcome classification.

use crate::cec::LogicalAddress;
use crate::transcript::{extract_tx_status, TxStatus};

/// Decide whether a reported transmit status is the correct one for the
/// destination type.
///
/// Broadcast frames are never acknowledged at the link layer, so a broadcast
/// transmit succeeds exactly when the HAL reports `SENT_BUT_NOT_ACKD`; a
/// unicast transmit succeeds exactly when it reports `SENT_AND_ACKD`. Any
/// other status fails.
pub fn ack_matches_destination(status: &TxStatus, broadcast: bool) -> bool {
    match status {
        TxStatus::SentAndAcked => !broadcast,
        TxStatus::SentButNotAcked => broadcast,
        TxStatus::Other(_) => false,
    }
}

/// Evaluate the raw response text of a transmit menu call.
///
/// Returns false when the response contains no parseable result line.
pub fn evaluate_transmit_response(response: &str, destination: LogicalAddress) -> bool {
    match extract_tx_status(response) {
        Some(status) => ack_matches_destination(&status, destination.is_broadcast()),
        None => false,
    }
}
