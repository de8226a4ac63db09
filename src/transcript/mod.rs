//! Session transcript parsing.
//!
//! The DUT's menu binary logs every CEC callback and HAL call result to the
//! console. The session keeps that output as an append-only buffer; this
//! module turns snapshots of it into structured events.
//!
//! Parsing never fails: lines that match no known grammar are skipped, and
//! an empty or garbage transcript simply produces empty results. Repeated
//! scrapes of the same text give identical output, which matters because the
//! buffer is never cleared between reads and earlier events will be seen
//! again.

mod scraper;
mod status;

pub use scraper::{scrape, CallbackReport, CecEvent, EventKind};
pub use status::{
    extract_logical_address, extract_physical_address, extract_tx_status, TxStatus,
};
