//! Integration Test: Sleep Prohibition
//!
//! **Policy**: Production code in the client crates MUST NOT call sleep.
//! Sessions wait on channel and socket readiness; there are no retries or
//! heartbeats that could justify a timer.

use architectural_enforcement::scan_production;

fn is_sleep_call(code: &str) -> bool {
    code.contains("::sleep(") || code.contains(".sleep(") || code.contains("sleep_until(")
}

/// Test that production code does not contain sleep() calls
#[test]
fn test_no_sleep_in_production_code() {
    let violations = scan_production(is_sleep_call);

    if !violations.is_empty() {
        eprintln!("\n❌ CRITICAL: Sleep calls found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Wait on the event instead: channel recv, socket read, oneshot.");

        panic!(
            "\nFound {} sleep violation(s) in production code.\nFix these before merging!",
            violations.len()
        );
    }
}

#[test]
fn test_sleep_detection() {
    assert!(is_sleep_call("tokio::time::sleep(Duration::from_millis(5)).await;"));
    assert!(is_sleep_call("std::thread::sleep(d);"));
    assert!(!is_sleep_call("let asleep = false;"));
}
