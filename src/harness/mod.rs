//! Conformance case registry and execution context.
//!
//! Cases are free functions taking a [`CaseContext`] and returning a
//! [`CaseResult`], registered at link time through the `#[cec_test]`
//! attribute (see the `cec-hal-conformance-macros` crate). The runner binary
//! looks them up here, builds a fresh context per case, and reports through
//! [`crate::testing::TestRunner`].
//!
//! Inside a case, every protocol check is a *step*: started with
//! [`CaseContext::step_start`], resolved with [`CaseContext::step_result`].
//! A failed step never aborts the case; the outcomes are ANDed together and
//! surfaced once at the end through [`CaseContext::finish`].

use crate::adapter::CecBusController;
use crate::hal::HdmiCecHal;
use crate::profile::{CommandSpec, DeviceProfile, DeviceType};
use std::fmt;

pub use crate::testing::CaseResult;

/// Everything a conformance case needs: the menu client, the bus adapter,
/// the profile, and the step tally.
pub struct CaseContext {
    pub hal: HdmiCecHal,
    pub bus: Box<dyn CecBusController>,
    pub profile: DeviceProfile,
    steps: StepLog,
}

impl CaseContext {
    pub fn new(
        hal: HdmiCecHal,
        bus: Box<dyn CecBusController>,
        profile: DeviceProfile,
    ) -> Self {
        Self {
            hal,
            bus,
            profile,
            steps: StepLog::default(),
        }
    }

    /// The command table for the named case, cloned so the context stays
    /// free to be borrowed mutably while iterating.
    pub fn commands_for(&self, case: &str) -> Vec<CommandSpec> {
        self.profile.commands_for(case).to_vec()
    }

    /// Announce a verification step.
    pub fn step_start(&mut self, description: impl fmt::Display) {
        self.steps.started += 1;
        log::info!("Step start: {}", description);
    }

    /// Record a step outcome and pass it through for aggregation.
    pub fn step_result(&mut self, passed: bool, description: impl fmt::Display) -> bool {
        if passed {
            self.steps.passed += 1;
            log::info!("Step result: PASS: {}", description);
        } else {
            self.steps.failed += 1;
            log::error!("Step result: FAIL: {}", description);
        }
        passed
    }

    /// Fold the recorded steps into the case verdict.
    pub fn finish(&self) -> CaseResult {
        let steps = &self.steps;
        if steps.failed == 0 {
            Ok(())
        } else {
            Err(Box::new(StepsFailed {
                failed: steps.failed,
                total: steps.started,
            }))
        }
    }

    /// Step counters, for inspection.
    pub fn steps(&self) -> &StepLog {
        &self.steps
    }
}

/// Running tally of verification steps within one case.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StepLog {
    pub started: usize,
    pub passed: usize,
    pub failed: usize,
}

/// Error carrying the aggregated step verdict of a failed case.
#[derive(Debug)]
pub struct StepsFailed {
    pub failed: usize,
    pub total: usize,
}

impl fmt::Display for StepsFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} verification steps failed", self.failed, self.total)
    }
}

impl std::error::Error for StepsFailed {}

/// A registered conformance case.
pub struct CaseEntry {
    /// Case name, also the key into the profile's command tables.
    pub name: &'static str,
    /// Restrict the case to one device type, or `None` for both.
    pub device_type: Option<DeviceType>,
    /// The case function.
    pub run: fn(&mut CaseContext) -> CaseResult,
}

impl CaseEntry {
    pub const fn new(
        name: &'static str,
        device_type: Option<DeviceType>,
        run: fn(&mut CaseContext) -> CaseResult,
    ) -> Self {
        Self {
            name,
            device_type,
            run,
        }
    }

    /// Whether the case applies to the given DUT type.
    pub fn applies_to(&self, device_type: DeviceType) -> bool {
        self.device_type.is_none() || self.device_type == Some(device_type)
    }
}

inventory::collect!(CaseEntry);

/// All registered cases, sorted by name for a stable run order.
pub fn registered_cases() -> Vec<&'static CaseEntry> {
    let mut cases: Vec<&'static CaseEntry> = inventory::iter::<CaseEntry>.into_iter().collect();
    cases.sort_by_key(|entry| entry.name);
    cases
}

/// Look up a registered case by name.
pub fn find_case(name: &str) -> Option<&'static CaseEntry> {
    inventory::iter::<CaseEntry>
        .into_iter()
        .find(|entry| entry.name == name)
}
