//! Bus controller over the libCEC command-line client.
//!
//! Runs `cec-client` as a long-lived interactive child: commands (`scan`,
//! `tx ...`) go to its stdin, and everything it prints, including the
//! `TRAFFIC` log lines for every frame on the bus, is collected through a
//! reader thread into an append-only traffic log. Frame checks scan that
//! log; like the DUT transcript, it is never cleared, and re-checks may
//! re-observe earlier frames.

use super::{
    frame_tokens, AdapterError, AdapterSettings, CecBusController, CecDeviceInfo,
};
use crate::cec::{LogicalAddress, Opcode, PhysicalAddress};
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc;
use std::time::{Duration, Instant};

/// RAII guard to ensure the client process is always cleaned up.
struct ProcessGuard(Child);

impl Drop for ProcessGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

struct Monitor {
    stdin: ChildStdin,
    lines: mpsc::Receiver<String>,
    _guard: ProcessGuard,
}

impl Monitor {
    /// Pull whatever lines arrive within the window.
    ///
    /// Returns early with `Closed` only if the client exited before any
    /// output was seen; a quiet bus is just an empty batch.
    fn drain(&mut self, window: Duration) -> Result<Vec<String>, AdapterError> {
        let deadline = Instant::now() + window;
        let mut batch = Vec::new();

        loop {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            match self.lines.recv_timeout(deadline - now) {
                Ok(line) => batch.push(line),
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    if batch.is_empty() {
                        return Err(AdapterError::Closed);
                    }
                    break;
                }
            }
        }

        Ok(batch)
    }
}

/// [`CecBusController`] over a `cec-client` child process.
pub struct CecClientAdapter {
    settings: AdapterSettings,
    monitor: Option<Monitor>,
    traffic: Vec<String>,
}

impl CecClientAdapter {
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            monitor: None,
            traffic: Vec::new(),
        }
    }

    fn ensure_monitor(&mut self) -> Result<&mut Monitor, AdapterError> {
        if self.monitor.is_none() {
            let mut command = Command::new(&self.settings.command);
            // -d 8 keeps TRAFFIC lines in the output.
            command.args(["-d", "8"]);
            if let Some(port) = &self.settings.port {
                command.arg(port);
            }
            let mut child = command
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::null())
                .spawn()
                .map_err(AdapterError::Spawn)?;

            let stdin = child
                .stdin
                .take()
                .ok_or_else(|| AdapterError::Spawn(no_pipe("stdin")))?;
            let stdout = child
                .stdout
                .take()
                .ok_or_else(|| AdapterError::Spawn(no_pipe("stdout")))?;

            let (sender, receiver) = mpsc::channel();
            std::thread::spawn(move || {
                let reader = BufReader::new(stdout);
                for line in reader.lines().map_while(Result::ok) {
                    if sender.send(line).is_err() {
                        break;
                    }
                }
            });

            self.monitor = Some(Monitor {
                stdin,
                lines: receiver,
                _guard: ProcessGuard(child),
            });
        }

        match self.monitor.as_mut() {
            Some(monitor) => Ok(monitor),
            None => Err(AdapterError::Closed),
        }
    }

    fn command(&mut self, line: &str) -> Result<(), AdapterError> {
        let monitor = self.ensure_monitor()?;
        writeln!(monitor.stdin, "{}", line).map_err(AdapterError::Io)?;
        monitor.stdin.flush().map_err(AdapterError::Io)
    }

    /// Collect bus output for the configured window into the traffic log.
    fn collect_traffic(&mut self) -> Result<(), AdapterError> {
        let window = Duration::from_secs(self.settings.timeout_secs);
        let batch = self.ensure_monitor()?.drain(window)?;
        self.traffic.extend(batch);
        Ok(())
    }

    fn frame_observed(&self, frame: &str, incoming_only: bool) -> bool {
        self.traffic.iter().any(|line| {
            if !line.contains("TRAFFIC") || !line.contains(frame) {
                return false;
            }
            if incoming_only {
                line.contains(">>")
            } else {
                true
            }
        })
    }
}

impl CecBusController for CecClientAdapter {
    fn list_devices(&mut self) -> Result<Vec<CecDeviceInfo>, AdapterError> {
        self.command("scan")?;
        let window = Duration::from_secs(self.settings.timeout_secs);
        let batch = self.ensure_monitor()?.drain(window)?;
        let text = batch.join("\n");
        self.traffic.extend(batch);
        Ok(parse_scan(&text))
    }

    fn adapter_address(&mut self) -> Result<LogicalAddress, AdapterError> {
        LogicalAddress::new(self.settings.logical_address)
            .ok_or(AdapterError::InvalidAddress(self.settings.logical_address))
    }

    fn send_message(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<(), AdapterError> {
        let frame = frame_tokens(initiator, destination, opcode, payload);
        log::debug!("adapter tx {}", frame);
        self.command(&format!("tx {}", frame))?;
        // Collect the resulting traffic (including any immediate response
        // from the DUT) into the log.
        self.collect_traffic()
    }

    fn check_transmit_status(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError> {
        self.collect_traffic()?;
        let frame = frame_tokens(initiator, destination, opcode, payload);
        Ok(self.frame_observed(&frame, false))
    }

    fn check_message_received(
        &mut self,
        initiator: LogicalAddress,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<bool, AdapterError> {
        self.collect_traffic()?;
        let frame = frame_tokens(initiator, destination, opcode, payload);
        Ok(self.frame_observed(&frame, true))
    }
}

fn no_pipe(which: &str) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::Other,
        format!("no {} pipe on adapter client", which),
    )
}

/// Parse `cec-client` scan output into device entries.
///
/// Blocks look like:
///
/// ```text
/// device #4: Playback 1
/// address:       2.0.0.0
/// active source: no
/// vendor:        Sony
/// osd string:    PS3
/// power status:  on
/// ```
fn parse_scan(text: &str) -> Vec<CecDeviceInfo> {
    let mut devices = Vec::new();
    let mut current: Option<CecDeviceInfo> = None;

    for line in text.lines() {
        let line = line.trim();

        if let Some(rest) = line.strip_prefix("device #") {
            if let Some(device) = current.take() {
                devices.push(device);
            }
            let number = rest.split(':').next().unwrap_or("").trim();
            if let Some(address) = number
                .parse::<u8>()
                .ok()
                .and_then(LogicalAddress::new)
            {
                current = Some(CecDeviceInfo {
                    logical_address: address,
                    physical_address: None,
                    osd_name: String::new(),
                    vendor: String::new(),
                    power_status: String::new(),
                });
            }
            continue;
        }

        let Some(device) = current.as_mut() else {
            continue;
        };
        if let Some(value) = line.strip_prefix("address:") {
            device.physical_address = PhysicalAddress::parse(value.trim());
        } else if let Some(value) = line.strip_prefix("vendor:") {
            device.vendor = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("osd string:") {
            device.osd_name = value.trim().to_string();
        } else if let Some(value) = line.strip_prefix("power status:") {
            device.power_status = value.trim().to_string();
        }
    }

    if let Some(device) = current.take() {
        devices.push(device);
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCAN_OUTPUT: &str = "\
requesting CEC bus information ...
CEC bus information
===================
device #0: TV
address:       0.0.0.0
active source: no
vendor:        Samsung
osd string:    TV
CEC version:   1.4
power status:  on
language:      eng

device #4: Playback 1
address:       2.0.0.0
active source: yes
vendor:        Pulse Eight
osd string:    CECTester
CEC version:   1.4
power status:  on
language:      eng

currently active source: Playback 1 (4)
";

    #[test]
    fn test_parse_scan_blocks() {
        let devices = parse_scan(SCAN_OUTPUT);
        assert_eq!(devices.len(), 2);

        assert_eq!(devices[0].logical_address, LogicalAddress::TV);
        assert_eq!(devices[0].physical_address, Some(PhysicalAddress::ROOT));
        assert_eq!(devices[0].osd_name, "TV");
        assert_eq!(devices[0].power_status, "on");

        assert_eq!(devices[1].logical_address, LogicalAddress::new(4).unwrap());
        assert_eq!(
            devices[1].physical_address,
            PhysicalAddress::parse("2.0.0.0")
        );
        assert_eq!(devices[1].vendor, "Pulse Eight");
    }

    #[test]
    fn test_parse_scan_empty() {
        assert!(parse_scan("").is_empty());
        assert!(parse_scan("no devices here").is_empty());
    }

    #[test]
    fn test_parse_scan_unparseable_address_is_none() {
        let devices = parse_scan("device #4: Playback 1\naddress: unknown\n");
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].physical_address, None);
    }

    #[test]
    fn test_frame_observed_direction_filter() {
        let mut adapter = CecClientAdapter::new(AdapterSettings::default());
        adapter.traffic = vec![
            "TRAFFIC: [  140]\t>> 05:36".to_string(),
            "TRAFFIC: [  150]\t<< 40:82:20:00".to_string(),
        ];
        assert!(adapter.frame_observed("05:36", true));
        assert!(adapter.frame_observed("40:82:20:00", false));
        assert!(!adapter.frame_observed("40:82:20:00", true));
        assert!(!adapter.frame_observed("ff:ff", false));
    }
}
