//! Typed client for the DUT's HDMI-CEC test menu.
//!
//! Wraps a [`MenuSession`] with the menu items and prompt sequences the HAL
//! test binary exposes, and parses the interesting values out of the raw
//! responses. Opening the client initializes the HAL on the DUT; the HAL is
//! closed again on every exit path, either through [`HdmiCecHal::close`] or
//! the drop fallback.

use crate::cec::{LogicalAddress, Opcode, PhysicalAddress};
use crate::session::{MenuSession, PromptAnswer, SessionError};
use crate::transcript::{
    self, extract_logical_address, extract_physical_address, CallbackReport,
};

/// Menu items registered by the HAL test binary.
mod items {
    pub const INIT: &str = "Init HDMI CEC";
    pub const CLOSE: &str = "Close HDMI CEC";
    pub const ADD_LOGICAL_ADDRESS: &str = "Add Logical Address";
    pub const REMOVE_LOGICAL_ADDRESS: &str = "Remove Logical Address";
    pub const GET_LOGICAL_ADDRESS: &str = "Get Logical Address";
    // The binary registers the item with this spelling.
    pub const GET_PHYSICAL_ADDRESS: &str = "Get Phyiscal Address";
    pub const TRANSMIT: &str = "Transmit CEC Command";
}

/// Interactive prompts raised by the menu items.
mod prompts {
    pub const LOGICAL_ADDRESS: &str = "Enter Logical Address:";
    pub const DESTINATION: &str = "Enter a valid Destination Logical Address:";
    pub const COMMAND: &str = "Enter CEC Command (in hex):";
    pub const DATABYTE: &str = "Enter Databyte";
}

/// Scoped HDMI-CEC HAL client.
pub struct HdmiCecHal {
    session: Box<dyn MenuSession>,
    suite: String,
    open: bool,
}

impl HdmiCecHal {
    /// Initialize the HAL through the menu and return the client.
    pub fn open(
        session: Box<dyn MenuSession>,
        suite: impl Into<String>,
    ) -> Result<Self, SessionError> {
        let mut hal = Self {
            session,
            suite: suite.into(),
            open: false,
        };
        hal.session.select(&hal.suite, items::INIT, &[])?;
        hal.open = true;
        Ok(hal)
    }

    /// Close the HAL on the DUT. Safe to call more than once.
    pub fn close(&mut self) -> Result<(), SessionError> {
        if self.open {
            self.session.select(&self.suite, items::CLOSE, &[])?;
            self.open = false;
        }
        Ok(())
    }

    /// Claim a logical address for the DUT.
    pub fn add_logical_address(
        &mut self,
        address: LogicalAddress,
    ) -> Result<String, SessionError> {
        self.session.select(
            &self.suite,
            items::ADD_LOGICAL_ADDRESS,
            &[PromptAnswer::new(
                prompts::LOGICAL_ADDRESS,
                address.to_string(),
            )],
        )
    }

    /// Release the DUT's logical address.
    pub fn remove_logical_address(&mut self) -> Result<String, SessionError> {
        self.session
            .select(&self.suite, items::REMOVE_LOGICAL_ADDRESS, &[])
    }

    /// The DUT's current logical address, or `None` if the response carried
    /// no parseable address.
    pub fn logical_address(&mut self) -> Result<Option<LogicalAddress>, SessionError> {
        let response = self
            .session
            .select(&self.suite, items::GET_LOGICAL_ADDRESS, &[])?;
        Ok(extract_logical_address(&response))
    }

    /// The DUT's physical address, or `None` when it is unknown.
    ///
    /// `None` must not be treated as address 0.0.0.0.
    pub fn physical_address(&mut self) -> Result<Option<PhysicalAddress>, SessionError> {
        let response = self
            .session
            .select(&self.suite, items::GET_PHYSICAL_ADDRESS, &[])?;
        Ok(extract_physical_address(&response))
    }

    /// Transmit a CEC command from the DUT and return the raw menu response.
    ///
    /// The response text carries the HAL's transmit result line; feed it to
    /// [`crate::verify::evaluate_transmit_response`] to classify the ack.
    pub fn transmit(
        &mut self,
        destination: LogicalAddress,
        opcode: Opcode,
        payload: &[u8],
    ) -> Result<String, SessionError> {
        let mut answers = vec![
            PromptAnswer::new(prompts::DESTINATION, destination.to_string()),
            PromptAnswer::new(prompts::COMMAND, opcode.token()),
        ];
        for &byte in payload {
            answers.push(PromptAnswer::new(
                prompts::DATABYTE,
                crate::cec::byte_token(byte),
            ));
        }
        self.session.select(&self.suite, items::TRANSMIT, &answers)
    }

    /// Scrape the session transcript into its callback events.
    pub fn read_callback_report(&mut self) -> Result<CallbackReport, SessionError> {
        let snapshot = self.session.read_transcript()?;
        Ok(transcript::scrape(&snapshot))
    }
}

impl Drop for HdmiCecHal {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.close() {
                log::warn!("failed to close HDMI CEC HAL on drop: {}", e);
            }
        }
    }
}
