//! Call History Integration Tests
//!
//! Replays scripted calls into a SQLite store and reads them back.

use std::sync::Arc;

use tempfile::TempDir;
use tokio::sync::mpsc;

use intake::adapters::{CallHistory, ConsoleDriver, SqliteStore};
use intake::config::Office;
use intake::core::{run_session, CallSession, IntakeToolset, Script};

const BOOKING: &str = r#"
call_id: room-booking
turns:
  - user: "Hi, I'd like to see the doctor"
  - tool: record_patient_info
    arguments:
      name: Jane Doe
      dob: "1990-04-01"
      insurance: Aetna
      referral: Dr. Lee
      complaint: knee pain
      address: 1 Main St
      phone: "5550100"
      email: jane@example.com
  - tool: check_doctor_availability
    arguments:
      patient_availability: Tuesday 3pm
  - tool: book_appointment
  - agent: "Appointment booked successfully!"
  - user: "thanks"
"#;

const HANGUP: &str = r#"
call_id: room-hangup
turns:
  - user: "Hello?"
  - agent: "Hello! How may I help you today?"
"#;

const GOODBYE: &str = r#"
call_id: room-goodbye
turns:
  - user: "Wrong number, sorry. Bye!"
"#;

async fn replay(yaml: &str, store: Arc<SqliteStore>) -> CallSession {
    let script = Script::from_yaml(yaml).unwrap();
    let events = script.events().unwrap();

    let mut session = CallSession::new(IntakeToolset::new(Office::default(), None), store);
    session.assign_call_id(script.call_id.clone().unwrap());

    let (tx, rx) = mpsc::channel(events.len());
    for event in events {
        tx.send(event).await.unwrap();
    }
    drop(tx);

    run_session(session, rx, &ConsoleDriver::new()).await
}

#[tokio::test]
async fn test_replayed_calls_land_in_history() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(SqliteStore::new(temp.path().join("calls.sqlite")).unwrap());

    let booked = replay(BOOKING, store.clone()).await;
    assert!(booked.is_closed());
    // The trailing user turn arrives after close
    assert_eq!(booked.transcript().len(), 2);

    let hangup = replay(HANGUP, store.clone()).await;
    assert!(!hangup.is_closed());

    replay(GOODBYE, store.clone()).await;

    let recent = tokio_test::assert_ok!(store.recent(10).await);
    let ids: Vec<&str> = recent.iter().map(|r| r.call_id.as_str()).collect();
    assert_eq!(ids, vec!["room-goodbye", "room-booking"]);

    let record = tokio_test::assert_ok!(store.find("room-booking").await).unwrap();
    assert_eq!(record.from, "agent");
    assert_eq!(record.patient_info.email, "jane@example.com");
    assert!(record.call_logs.contains("AGENT:\nAppointment booked successfully!"));

    assert!(store.find("room-hangup").await.unwrap().is_none());
}

#[test]
fn test_script_with_unknown_tool_is_rejected() {
    let script = Script::from_yaml(
        r#"
turns:
  - tool: cancel_appointment
"#,
    )
    .unwrap();

    let err = script.events().unwrap_err();
    assert!(format!("{:#}", err).contains("Turn 0 has an invalid tool call"));
}
