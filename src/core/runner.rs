//! Drives a call session from a stream of turn events.

use tokio::sync::mpsc;
use tracing::{error, info, instrument, warn};

use crate::adapters::ConversationDriver;
use crate::domain::{Directive, TurnEvent};

use super::session::CallSession;

/// Feed events into `session` one at a time until it closes or the event
/// stream ends, applying every directive to `driver` as it is produced.
/// A booked call whose stream ends early is still closed and written.
///
/// Driver failures are logged; they never stop the session. Returns the
/// session so callers can inspect the final transcript and record.
#[instrument(skip_all, fields(call_id = %session.call_id()))]
pub async fn run_session(
    mut session: CallSession,
    mut events: mpsc::Receiver<TurnEvent>,
    driver: &dyn ConversationDriver,
) -> CallSession {
    apply(driver, &session.start()).await;

    while let Some(event) = events.recv().await {
        match session.handle(event).await {
            Ok(outcome) => {
                if let Some(ref output) = outcome.tool_output {
                    if let Err(e) = driver.tool_result(output).await {
                        error!(error = %e, "Failed to return tool result");
                    }
                }
                apply(driver, &outcome.directives).await;
            }
            Err(e) => warn!(error = %e, "Event rejected"),
        }

        if session.is_closed() {
            break;
        }
    }

    if !session.is_closed() {
        let directives = session.finish().await;
        apply(driver, &directives).await;
    }

    if !session.is_closed() {
        info!("Event stream ended before completion, nothing persisted");
    }

    session
}

/// Apply directives in order
pub async fn apply(driver: &dyn ConversationDriver, directives: &[Directive]) {
    for directive in directives {
        let result = match directive {
            Directive::Speak { text } => driver.speak(text).await,
            Directive::EndCall => driver.end_call().await,
        };

        if let Err(e) = result {
            error!(?directive, error = %e, "Driver failed to apply directive");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use anyhow::Result;
    use async_trait::async_trait;

    use crate::adapters::MemoryStore;
    use crate::config::Office;
    use crate::core::tools::{IntakeToolset, ToolOutput};

    #[derive(Default)]
    struct ScriptedDriver {
        log: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationDriver for ScriptedDriver {
        async fn speak(&self, text: &str) -> Result<()> {
            self.log.lock().unwrap().push(format!("speak:{text}"));
            Ok(())
        }

        async fn end_call(&self) -> Result<()> {
            self.log.lock().unwrap().push("end".to_string());
            anyhow::bail!("room already disconnected")
        }

        async fn tool_result(&self, output: &ToolOutput) -> Result<()> {
            self.log.lock().unwrap().push(format!("tool:{output:?}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_runs_until_closed() {
        let store = Arc::new(MemoryStore::new());
        let session = CallSession::new(IntakeToolset::new(Office::default(), None), store.clone());
        let driver = ScriptedDriver::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(TurnEvent::user("hello")).await.unwrap();
        tx.send(TurnEvent::user("ok bye")).await.unwrap();
        tx.send(TurnEvent::user("never handled")).await.unwrap();
        drop(tx);

        let session = run_session(session, rx, &driver).await;

        assert!(session.is_closed());
        assert_eq!(session.transcript().len(), 2);
        assert_eq!(store.records().len(), 1);

        let log = driver.log.lock().unwrap();
        assert!(log[0].starts_with("speak:Hello!"));
        assert!(log[1].starts_with("speak:Thank you for calling"));
        assert_eq!(log[2], "end");
    }

    #[tokio::test]
    async fn test_hangup_without_completion_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let session = CallSession::new(IntakeToolset::new(Office::default(), None), store.clone());
        let driver = ScriptedDriver::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(TurnEvent::user("Hi, I need an appointment")).await.unwrap();
        drop(tx);

        let session = run_session(session, rx, &driver).await;

        assert!(!session.is_closed());
        assert!(store.records().is_empty());
    }

    #[tokio::test]
    async fn test_hangup_after_booking_still_persists() {
        let store = Arc::new(MemoryStore::new());
        let session = CallSession::new(IntakeToolset::new(Office::default(), None), store.clone());
        let driver = ScriptedDriver::default();

        let (tx, rx) = mpsc::channel(8);
        tx.send(TurnEvent::tool(crate::domain::ToolCall::BookAppointment))
            .await
            .unwrap();
        drop(tx);

        let session = run_session(session, rx, &driver).await;

        assert!(session.is_closed());
        assert_eq!(store.records().len(), 1);
        assert_eq!(driver.log.lock().unwrap().last().map(String::as_str), Some("end"));
    }
}
