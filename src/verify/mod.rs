//! Transmit and receive verification rules.
//!
//! Everything here is a pure function of its inputs: a mismatch is a `false`
//! result, never an error, and callers fold step outcomes together with
//! logical AND to produce one pass/fail per test.

mod receive;
mod transmit;

pub use receive::{ReceiveExpectation, FRAME_HEADER_BYTES};
pub use transmit::{ack_matches_destination, evaluate_transmit_response};
