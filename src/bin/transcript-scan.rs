//! Scrape a saved DUT transcript and dump the parsed events as JSON.
//!
//! Debugging aid for the callback-line grammars: feed it a transcript file
//! (or pipe one to stdin) and it prints the `Received` and `Sent Response`
//! events the harness would see, plus any HAL transmit result lines.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin transcript-scan -- session.log
//! ssh root@dut cat /tmp/hal-test.log | cargo run --bin transcript-scan
//! ```

use cec_hal_conformance::transcript::{extract_tx_status, scrape};
use std::io::Read;
use std::process::exit;

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let transcript = match args.next().as_deref() {
        Some("--help") => {
            println!("Usage: transcript-scan [FILE]");
            println!();
            println!("Scrapes a DUT console transcript (FILE, or stdin when omitted)");
            println!("and prints the parsed callback events as JSON.");
            return Ok(());
        }
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            text
        }
    };

    let report = scrape(&transcript);
    log::info!(
        "{} received, {} response events",
        report.received.len(),
        report.response.len()
    );
    println!("{}", serde_json::to_string_pretty(&report)?);

    for line in transcript.lines() {
        if let Some(status) = extract_tx_status(line) {
            eprintln!("transmit result: {:?}", status);
        }
    }

    Ok(())
}
