use std::panic;

use crate::utils::{compiled_pattern, now_millis, panic_message};

#[test]
fn test_panic_message_from_str_payload() {
    let payload = panic::catch_unwind(|| panic!("divide by zero")).unwrap_err();
    assert_eq!(panic_message(payload), "divide by zero");
}

#[test]
fn test_panic_message_from_string_payload() {
    let payload = panic::catch_unwind(|| panic!("bad input: {}", 42)).unwrap_err();
    assert_eq!(panic_message(payload), "bad input: 42");
}

#[test]
fn test_panic_message_from_other_payload() {
    let payload = panic::catch_unwind(|| panic::panic_any(7_u32)).unwrap_err();
    assert_eq!(panic_message(payload), "non-string panic payload");
}

#[test]
fn test_now_millis_is_monotonic_enough() {
    let first = now_millis();
    let second = now_millis();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_compiled_pattern_reuses_and_reports_errors() {
    let first = compiled_pattern("^[a-z]+$").unwrap();
    let second = compiled_pattern("^[a-z]+$").unwrap();
    assert!(first.is_match("abc"));
    assert_eq!(first.as_str(), second.as_str());
    assert!(compiled_pattern("(unclosed").is_err());
    assert!(compiled_pattern("(unclosed").is_err());
}
