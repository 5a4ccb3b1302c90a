//! Halt entry point: acknowledgment shape and timestamp.

use chrono::Utc;

use courier::handler::{halt, HaltStatus};

#[test]
fn halt_echoes_the_reason_with_a_timestamp() {
    let before = Utc::now();
    let ack = halt(Some("redeploy".to_owned()));
    let after = Utc::now();

    assert_eq!(ack.status, HaltStatus::Halted);
    assert_eq!(ack.reason.as_deref(), Some("redeploy"));
    assert!(ack.halted_at >= before && ack.halted_at <= after);
}

#[test]
fn halt_without_a_reason_serializes_cleanly() {
    let ack = halt(None);
    let value = serde_json::to_value(&ack).expect("should serialize");
    assert_eq!(value["status"], "halted");
    assert!(value["reason"].is_null());
    assert!(value["halted_at"].is_string());
}
