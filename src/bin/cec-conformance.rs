//! HDMI-CEC HAL conformance runner.
//!
//! Loads a device profile, opens a console session to the DUT's menu binary
//! (or an in-process mock with `--mock`), runs the registered conformance
//! cases, and reports results in TAP format on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Run the full suite against a real DUT
//! cargo run --bin cec-conformance -- --profile profiles/sink.json
//!
//! # Host-only run against the emulated DUT and bus
//! cargo run --bin cec-conformance -- --mock
//!
//! # Run one case, with step logs
//! RUST_LOG=info cargo run --bin cec-conformance -- --mock --case receive_commands
//! ```

use cec_hal_conformance::adapter::{CecClientAdapter, MockBus};
use cec_hal_conformance::harness::{registered_cases, CaseContext, CaseEntry};
use cec_hal_conformance::profile::DeviceProfile;
use cec_hal_conformance::session::mock::MockDut;
use cec_hal_conformance::session::{find_dut_console, list_console_ports, ShellSession};
use cec_hal_conformance::testing::TestRunner;
use cec_hal_conformance::HdmiCecHal;
use std::path::PathBuf;
use std::process::exit;

struct Options {
    profile: Option<PathBuf>,
    mock: bool,
    list: bool,
    cases: Vec<String>,
}

fn main() {
    env_logger::init();

    let options = match parse_args() {
        Ok(options) => options,
        Err(message) => {
            eprintln!("Error: {}", message);
            eprintln!("Run with --help for usage.");
            exit(2);
        }
    };

    if options.list {
        for entry in registered_cases() {
            match entry.device_type {
                Some(device_type) => println!("{} ({} only)", entry.name, device_type),
                None => println!("{}", entry.name),
            }
        }
        return;
    }

    match run(&options) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            exit(2);
        }
    }
}

fn parse_args() -> Result<Options, String> {
    let mut options = Options {
        profile: None,
        mock: false,
        list: false,
        cases: Vec::new(),
    };

    let args: Vec<String> = std::env::args().collect();
    let mut iter = args[1..].iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--profile" | "-p" => {
                let path = iter.next().ok_or("--profile expects a path")?;
                options.profile = Some(PathBuf::from(path));
            }
            "--case" | "-c" => {
                let name = iter.next().ok_or("--case expects a case name")?;
                options.cases.push(name.clone());
            }
            "--mock" => options.mock = true,
            "--list" | "-l" => options.list = true,
            "--help" => {
                println!("HDMI-CEC HAL conformance runner");
                println!();
                println!("Usage:");
                println!("  {} [OPTIONS]", args[0]);
                println!();
                println!("Options:");
                println!("  --profile, -p <path>  Device profile JSON");
                println!("  --mock                Run against the in-process mock DUT and bus");
                println!("  --case, -c <name>     Run one case (repeatable); default is all");
                println!("  --list, -l            List registered cases and exit");
                println!("  --help                Show this help");
                exit(0);
            }
            other => return Err(format!("unknown option '{}'", other)),
        }
    }

    Ok(options)
}

fn run(options: &Options) -> Result<bool, Box<dyn std::error::Error>> {
    let profile = match &options.profile {
        Some(path) => DeviceProfile::load(path)?,
        None if options.mock => DeviceProfile::demo_sink(),
        None => return Err("a device profile is required (use --profile, or --mock)".into()),
    };

    let cases = select_cases(&options.cases)?;

    let mut runner = TestRunner::new();
    runner.print_header(cases.len());
    TestRunner::comment(&format!(
        "DUT: {} at logical address {}",
        profile.device_type,
        profile.dut_address()
    ));

    for entry in cases {
        if !entry.applies_to(profile.device_type) {
            runner.skip(
                entry.name,
                &format!("not applicable to a {} DUT", profile.device_type),
            );
            continue;
        }

        // Each case gets a freshly opened session and HAL so a misbehaving
        // DUT cannot leak state into the next case.
        runner.run(entry.name, || {
            let mut cx = build_context(&profile, options.mock)?;
            let result = (entry.run)(&mut cx);
            cx.hal.close()?;
            result
        });
    }

    Ok(runner.finish())
}

fn select_cases(names: &[String]) -> Result<Vec<&'static CaseEntry>, Box<dyn std::error::Error>> {
    let registered = registered_cases();
    if names.is_empty() {
        return Ok(registered);
    }

    let mut selected = Vec::new();
    for name in names {
        let entry = registered
            .iter()
            .find(|entry| entry.name == name.as_str())
            .ok_or_else(|| format!("unknown case '{}' (see --list)", name))?;
        selected.push(*entry);
    }
    Ok(selected)
}

fn build_context(
    profile: &DeviceProfile,
    mock: bool,
) -> Result<CaseContext, Box<dyn std::error::Error + Send + Sync>> {
    if mock {
        let dut = MockDut::sink(&profile.test_suite);
        let bus = MockBus::linked(&dut);
        let hal = HdmiCecHal::open(Box::new(dut), &profile.test_suite)?;
        return Ok(CaseContext::new(hal, Box::new(bus), profile.clone()));
    }

    let mut settings = profile
        .session
        .clone()
        .ok_or("profile has no session settings; add one or use --mock")?;
    // A "{port}" placeholder in the session command is filled with the first
    // console port found on this host, for serially attached DUTs.
    if let Some(slot) = settings.command.iter_mut().find(|arg| arg.as_str() == "{port}") {
        match find_dut_console() {
            Some(port) => *slot = port,
            None => {
                let ports = list_console_ports();
                let known = if ports.is_empty() {
                    "none".to_string()
                } else {
                    ports.join(", ")
                };
                return Err(format!("no DUT console port found (candidates: {})", known).into());
            }
        }
    }
    let session = ShellSession::spawn(settings)?;
    let adapter = CecClientAdapter::new(profile.adapter.clone().unwrap_or_default());
    let hal = HdmiCecHal::open(Box::new(session), &profile.test_suite)?;
    Ok(CaseContext::new(hal, Box::new(adapter), profile.clone()))
}
