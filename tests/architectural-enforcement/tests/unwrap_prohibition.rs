//! Integration Test: Unwrap Prohibition
//!
//! **Policy**: Production code in the client crates MUST NOT call
//! `.unwrap()`. Library errors are returned as `thiserror` enums, streaming
//! problems become `error` events, and the binary propagates with `anyhow`.
//! Test modules (`#[cfg(test)]`) are exempt.

use architectural_enforcement::scan_production;

fn is_unwrap_call(code: &str) -> bool {
    code.contains(".unwrap()")
}

#[test]
fn test_no_unwrap_in_production_code() {
    let violations = scan_production(is_unwrap_call);

    if !violations.is_empty() {
        eprintln!("\n❌ unwrap() found in production code!\n");
        for violation in &violations {
            eprintln!("  ❌ {violation}");
        }
        eprintln!("\n✅ Use `?`, a fallback (`unwrap_or_default`), or surface an error event.");

        panic!(
            "\nFound {} unwrap violation(s) in production code.",
            violations.len()
        );
    }
}

#[test]
fn test_unwrap_detection() {
    assert!(is_unwrap_call("let v = parse(x).unwrap();"));
    assert!(!is_unwrap_call("let v = parse(x).unwrap_or_default();"));
    assert!(!is_unwrap_call("let v = parse(x).unwrap_or(0);"));
}
