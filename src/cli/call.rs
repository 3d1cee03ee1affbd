//! Call commands.
//!
//! - `intake simulate <script>` - Replay a conversation script
//! - `intake console` - Interactive call on stdin/stdout

use std::io::{BufRead, Write};
use std::path::Path;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::adapters::ConsoleDriver;
use crate::core::{run_session, CallSession, Script};
use crate::domain::{ToolCall, TurnEvent};

use super::Wiring;

/// Replay a YAML conversation script
pub async fn simulate(path: &Path, dry_run: bool) -> Result<()> {
    let script = Script::from_file(path)?;
    let events = script.events()?;

    let wiring = Wiring::resolve(dry_run)?;
    let mut session = wiring.session();
    session.assign_call_id(
        script
            .call_id
            .clone()
            .unwrap_or_else(|| format!("sim-{}", Uuid::new_v4())),
    );

    // Buffer the whole script; the runner still handles it one event at a time
    let (tx, rx) = mpsc::channel(events.len().max(1));
    for event in events {
        tx.send(event).await.context("Session channel closed")?;
    }
    drop(tx);

    let driver = ConsoleDriver::new();
    let session = run_session(session, rx, &driver).await;

    report(&session, &mut std::io::stdout())
}

/// Interactive call: stdin lines become turn events
pub async fn console(call_id: Option<String>, dry_run: bool) -> Result<()> {
    let wiring = Wiring::resolve(dry_run)?;
    let mut session = wiring.session();
    session.assign_call_id(call_id.unwrap_or_else(|| format!("console-{}", Uuid::new_v4())));

    eprintln!("Type caller lines. Prefix assistant lines with '>' and tool calls with '/tool <name> [json]'. Ctrl-D hangs up.");

    let (tx, rx) = mpsc::channel(16);
    spawn_line_reader(std::io::BufReader::new(std::io::stdin()), tx);

    let driver = ConsoleDriver::new();
    let session = run_session(session, rx, &driver).await;

    report(&session, &mut std::io::stdout())
}

/// Forward parsed lines to the session from a plain thread.
///
/// A blocked read on a runtime task would keep the runtime from shutting
/// down after the call closes; a detached thread does not.
fn spawn_line_reader<R>(input: R, tx: mpsc::Sender<TurnEvent>)
where
    R: BufRead + Send + 'static,
{
    std::thread::spawn(move || {
        for line in input.lines() {
            let Ok(line) = line else { break };
            match parse_line(&line) {
                Ok(Some(event)) => {
                    if tx.blocking_send(event).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("⚠️  {:#}", e),
            }
        }
    });
}

/// Parse one console line into an event
fn parse_line(line: &str) -> Result<Option<TurnEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if let Some(agent) = line.strip_prefix('>') {
        return Ok(Some(TurnEvent::agent(agent.trim())));
    }

    if let Some(rest) = tool_command(line) {
        let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let arguments = if args.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(args.trim()).context("Tool arguments must be JSON")?
        };
        let call = ToolCall::from_invocation(name, arguments)?;
        return Ok(Some(TurnEvent::tool(call)));
    }

    Ok(Some(TurnEvent::user(line)))
}

/// Arguments of a `/tool` command, if the line is one
fn tool_command(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("/tool")?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

/// Print the outcome of a finished session.
///
/// Shows the session's own transcript and patient data; the stored row's
/// creation time belongs to the store and is read back with `intake show`.
fn report(session: &CallSession, out: &mut impl Write) -> Result<()> {
    writeln!(out)?;
    if !session.is_closed() {
        warn!(call_id = session.call_id(), "Call ended without completion, no record written");
        writeln!(out, "Call {} ended without completion.", session.call_id())?;
        return Ok(());
    }

    writeln!(
        out,
        "Call {} closed ({:?}).",
        session.call_id(),
        session.end_reason()
    )?;
    if let Some(speaker) = session.last_speaker() {
        writeln!(out, "Last speaker: {}", speaker)?;
    }
    writeln!(out, "\nPatient info:")?;
    writeln!(
        out,
        "{}",
        serde_json::to_string_pretty(session.patient()).context("Failed to format patient info")?
    )?;
    writeln!(out, "\nTranscript:\n{}", session.transcript().render().trim_end())?;
    Ok(())
}
