//! TAP (Test Anything Protocol) result reporting.
//!
//! Conformance results go to stdout in TAP format so any standard TAP
//! consumer (CI parsers, `prove`, humans) can read them; diagnostics and
//! step logs go through the `log` crate instead and never mix with the TAP
//! stream.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Result type for conformance case functions.
pub type CaseResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Extract a human-readable message from panic payload.
fn extract_panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A simple test runner that outputs TAP format.
pub struct TestRunner {
    tests_run: usize,
    tests_passed: usize,
    tests_failed: usize,
    tests_skipped: usize,
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TestRunner {
    /// Create a new test runner.
    pub fn new() -> Self {
        Self {
            tests_run: 0,
            tests_passed: 0,
            tests_failed: 0,
            tests_skipped: 0,
        }
    }

    /// Run one case and record the result.
    ///
    /// The case returns `Ok(())` on pass or `Err(...)` on failure; panics
    /// are caught and recorded as failures.
    pub fn run<F>(&mut self, name: &str, case: F)
    where
        F: FnOnce() -> CaseResult,
    {
        self.tests_run += 1;
        let test_num = self.tests_run;

        let result = catch_unwind(AssertUnwindSafe(case));

        match result {
            Ok(Ok(())) => {
                self.tests_passed += 1;
                println!("ok {} - {}", test_num, name);
            }
            Ok(Err(e)) => {
                self.tests_failed += 1;
                println!("not ok {} - {}", test_num, name);
                println!("# Error: {}", e);
            }
            Err(panic_info) => {
                self.tests_failed += 1;
                println!("not ok {} - {}", test_num, name);
                println!("# Panic: {}", extract_panic_message(&panic_info));
            }
        }
    }

    /// Record a case that does not apply to this DUT.
    pub fn skip(&mut self, name: &str, reason: &str) {
        self.tests_run += 1;
        self.tests_skipped += 1;
        println!("ok {} - {} # SKIP {}", self.tests_run, name, reason);
    }

    /// Print the TAP header. Call this before running cases.
    pub fn print_header(&self, planned_tests: usize) {
        println!("TAP version 14");
        println!("1..{}", planned_tests);
    }

    /// Print a diagnostic comment.
    pub fn comment(msg: &str) {
        println!("# {}", msg);
    }

    /// Finish the run and print a summary. Returns true if nothing failed.
    pub fn finish(&self) -> bool {
        println!("# -----------------------");
        println!("# Cases run: {}", self.tests_run);
        println!("# Passed: {}", self.tests_passed);
        println!("# Failed: {}", self.tests_failed);
        println!("# Skipped: {}", self.tests_skipped);

        if self.tests_failed == 0 {
            println!("# Result: PASS");
            true
        } else {
            println!("# Result: FAIL");
            false
        }
    }

    /// Get the number of cases run.
    pub fn tests_run(&self) -> usize {
        self.tests_run
    }

    /// Get the number of cases passed.
    pub fn tests_passed(&self) -> usize {
        self.tests_passed
    }

    /// Get the number of cases failed.
    pub fn tests_failed(&self) -> usize {
        self.tests_failed
    }
}
