//! Contract enforcement: invariant IDs, fatal violations and contract tracking.
//!
//! Contract-level failures (a caller broke the timing or wiring contract) are never
//! recovered from. Hot paths only call [`contract_violation`] once a check has
//! already failed; cold paths go through [`assert_invariant`], which also records
//! the invariant so tests can prove it was enforced.

#[cfg(feature = "ppt")]
use lazy_static::lazy_static;
#[cfg(feature = "ppt")]
use std::collections::HashSet;
#[cfg(feature = "ppt")]
use std::sync::Mutex;

// Kernel and stream contracts.
pub const KERNEL_INDEX_IN_DOMAIN: u32 = 1;
pub const BREAKPOINT_ORDER: u32 = 2;
pub const STREAM_LOG_COVERAGE: u32 = 3;

// Graph contracts.
pub const GRAPH_PLACEMENT_LEGAL: u32 = 10;
pub const GRAPH_REMOVAL_RELEASES_STATE: u32 = 11;
pub const TICK_ORDER_IS_PERMUTATION: u32 = 12;
pub const PATCH_RESTORES_GRAPH: u32 = 13;
pub const OPERATOR_STATE_KIND: u32 = 14;

#[cfg(feature = "ppt")]
lazy_static! {
    static ref INVARIANT_LOG: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
}

/// Abort on a broken contract. Logs the diagnostic, then panics.
#[cold]
#[inline(never)]
pub fn contract_violation(id: u32, message: &str) -> ! {
    log::error!("contract {} violated: {}", id, message);
    panic!("Invariant {} failed: {}", id, message);
}

#[cfg(feature = "ppt")]
/// Assert an invariant: records it and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, context: Option<&str>) {
    if !condition {
        let full_message = match context {
            Some(ctx) => format!("{} (context: {})", message, ctx),
            None => message.to_string(),
        };
        contract_violation(id, &full_message);
    }
    if let Ok(mut log) = INVARIANT_LOG.lock() {
        log.insert(id);
    }
}

#[cfg(not(feature = "ppt"))]
/// Assert an invariant: checks condition and panics on failure.
pub(crate) fn assert_invariant(id: u32, condition: bool, message: &str, _context: Option<&str>) {
    if !condition {
        contract_violation(id, message);
    }
}

#[cfg(feature = "ppt")]
/// Contract test: checks that specified invariants were asserted.
pub fn contract_test(test_name: &str, required_invariants: &[u32]) {
    let missing: Vec<u32> = {
        let log = INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner());
        required_invariants
            .iter()
            .copied()
            .filter(|inv| !log.contains(inv))
            .collect()
    };
    if !missing.is_empty() {
        panic!(
            "Contract test '{}' failed: invariants not enforced: {:?}",
            test_name, missing
        );
    }
}

#[cfg(not(feature = "ppt"))]
/// Contract test: no-op when PPT feature is disabled.
pub fn contract_test(_test_name: &str, _required_invariants: &[u32]) {}

#[cfg(feature = "ppt")]
/// Clear invariant log (for between test runs).
pub fn clear_invariant_log() {
    INVARIANT_LOG.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

#[cfg(not(feature = "ppt"))]
/// Clear invariant log: no-op when PPT feature is disabled.
pub fn clear_invariant_log() {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passing_invariant_is_recorded() {
        assert_invariant(GRAPH_PLACEMENT_LEGAL, true, "placement ok", Some("unit"));
        contract_test("passing invariant", &[GRAPH_PLACEMENT_LEGAL]);
    }

    #[test]
    #[should_panic(expected = "Invariant 2 failed")]
    fn failing_invariant_panics_with_id() {
        assert_invariant(BREAKPOINT_ORDER, false, "time went backwards", None);
    }

    #[test]
    #[should_panic(expected = "Invariant 3 failed: walk ran out")]
    fn violation_diverges() {
        contract_violation(STREAM_LOG_COVERAGE, "walk ran out");
    }
}
