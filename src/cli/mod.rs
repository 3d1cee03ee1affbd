//! Command-line interface for the intake assistant.
//!
//! Provides commands for replaying scripted calls, running an interactive
//! call in the terminal, browsing stored call records and checking the
//! configured record store.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::adapters::{
    CallHistory, MemoryStore, Notifier, RecordStore, SmtpNotifier, SqliteStore, SupabaseStore,
};
use crate::config::{self, Office, Settings, StoreSettings};
use crate::core::{prompts, tool_specs, CallSession, IntakeToolset};
use crate::domain::{CallRecord, PatientRecord, Speaker, TranscriptLog};

pub mod call;

/// intake - Voice-driven medical intake assistant
#[derive(Parser, Debug)]
#[command(name = "intake")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a YAML conversation script through a call session
    Simulate {
        /// Path to the script
        script: PathBuf,

        /// Keep the record in memory and send no email
        #[arg(long)]
        dry_run: bool,
    },

    /// Run an interactive call in the terminal
    ///
    /// Plain lines are caller turns, lines starting with `>` are assistant
    /// turns and `/tool <name> [json]` invokes a tool.
    Console {
        /// Call identifier (generated if not set)
        #[arg(long)]
        call_id: Option<String>,

        /// Keep the record in memory and send no email
        #[arg(long)]
        dry_run: bool,
    },

    /// List recent call records, newest first
    Calls {
        /// Maximum number of calls to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show transcript and patient info of one call
    Show {
        /// Call identifier
        call_id: String,
    },

    /// Insert a sample record to check the store connection
    StoreTest,

    /// Print the model instructions and the registered tool table
    Tools,

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Simulate { script, dry_run } => call::simulate(&script, dry_run).await,
            Commands::Console { call_id, dry_run } => call::console(call_id, dry_run).await,
            Commands::Calls { limit } => list_calls(limit).await,
            Commands::Show { call_id } => show_call(&call_id).await,
            Commands::StoreTest => store_test().await,
            Commands::Tools => show_tools(),
            Commands::Config => show_config(),
        }
    }
}

/// Collaborators for one call, resolved from settings or in-memory for dry runs
pub(crate) struct Wiring {
    pub office: Office,
    pub goodbye_phrases: Option<Vec<String>>,
    pub store: Arc<dyn RecordStore>,
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl Wiring {
    pub fn resolve(dry_run: bool) -> Result<Self> {
        if dry_run {
            return Ok(Self {
                office: config::office_or_default(),
                goodbye_phrases: None,
                store: Arc::new(MemoryStore::new()),
                notifier: None,
            });
        }

        let settings = config::settings()?;
        let notifier: Option<Arc<dyn Notifier>> = match settings.smtp {
            Some(ref smtp) => {
                let notifier: Arc<dyn Notifier> =
                    Arc::new(SmtpNotifier::new(settings.office.clone(), smtp)?);
                Some(notifier)
            }
            None => None,
        };

        Ok(Self {
            office: settings.office.clone(),
            goodbye_phrases: settings.goodbye_phrases.clone(),
            store: open_store(settings)?,
            notifier,
        })
    }

    /// A fresh session for one call
    pub fn session(&self) -> CallSession {
        let mut tools = IntakeToolset::new(self.office.clone(), self.notifier.clone());
        if let Some(ref phrases) = self.goodbye_phrases {
            tools = tools.with_goodbye_phrases(phrases.clone());
        }
        CallSession::new(tools, self.store.clone())
    }
}

/// Open the configured record store
fn open_store(settings: &Settings) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match settings.store {
        StoreSettings::Supabase {
            ref url,
            ref key,
            ref table,
        } => Arc::new(SupabaseStore::new(url.clone(), key.clone(), table.clone())),
        StoreSettings::Sqlite { ref path } => Arc::new(SqliteStore::new(path.clone())?),
    };
    Ok(store)
}

/// Open the configured store for reading
fn open_history(settings: &Settings) -> Result<Box<dyn CallHistory>> {
    let history: Box<dyn CallHistory> = match settings.store {
        StoreSettings::Supabase {
            ref url,
            ref key,
            ref table,
        } => Box::new(SupabaseStore::new(url.clone(), key.clone(), table.clone())),
        StoreSettings::Sqlite { ref path } => Box::new(SqliteStore::new(path.clone())?),
    };
    Ok(history)
}

/// List recent calls
async fn list_calls(limit: usize) -> Result<()> {
    let history = open_history(config::settings()?)?;
    let calls = history.recent(limit).await?;

    if calls.is_empty() {
        println!("No calls recorded yet.");
        return Ok(());
    }

    println!("{:<24} {:<20} {:<7} {}", "CREATED", "CALL ID", "FROM", "PATIENT");
    println!("{}", "-".repeat(72));
    for call in calls {
        println!(
            "{:<24} {:<20} {:<7} {}",
            call.created_at.format("%Y-%m-%d %H:%M:%S"),
            call.call_id,
            call.from,
            call.patient_info.name
        );
    }

    Ok(())
}

/// Show one call
async fn show_call(call_id: &str) -> Result<()> {
    let history = open_history(config::settings()?)?;
    let call = history
        .find(call_id)
        .await?
        .with_context(|| format!("Call not found: {}", call_id))?;

    print_record(&call)
}

pub(crate) fn print_record(call: &CallRecord) -> Result<()> {
    println!("Call ID: {}", call.call_id);
    println!("Created: {}", call.created_at);
    println!("Last speaker: {}", call.from);
    println!("\nPatient info:");
    println!(
        "{}",
        serde_json::to_string_pretty(&call.patient_info).context("Failed to format patient info")?
    );
    println!("\nTranscript:\n{}", call.call_logs.trim_end());
    Ok(())
}

/// Insert one sample record
async fn store_test() -> Result<()> {
    let settings = config::settings()?;
    let store = open_store(settings)?;

    let mut transcript = TranscriptLog::new();
    transcript.append(Speaker::Agent, "Testing");
    let mut patient = PatientRecord::new();
    patient.name = "John Doe".to_string();

    let record = CallRecord::snapshot(
        &format!("store-test-{}", uuid::Uuid::new_v4()),
        Some(Speaker::Agent),
        &transcript,
        &patient,
    );

    store.insert_call_record(&record).await?;
    println!("Insertion successful! ({} store, call {})", store.name(), record.call_id);
    Ok(())
}

/// Print the system prompt and tool table
fn show_tools() -> Result<()> {
    let office = config::office_or_default();
    println!("Instructions:\n{}\n", prompts::system_prompt(&office));
    println!(
        "Tools:\n{}",
        serde_json::to_string_pretty(&tool_specs()).context("Failed to format tool table")?
    );
    Ok(())
}

/// Show resolved configuration
fn show_config() -> Result<()> {
    let settings = config::settings()?;

    println!("Office: {} (Dr. {})", settings.office.name, settings.office.doctor);
    match settings.store {
        StoreSettings::Supabase { ref url, ref table, .. } => {
            println!("Store: supabase {} table {}", url, table)
        }
        StoreSettings::Sqlite { ref path } => println!("Store: sqlite {}", path.display()),
    }
    match settings.smtp {
        Some(ref smtp) => println!("Email: {}:{} as {}", smtp.server, smtp.port, smtp.sender),
        None => println!("Email: disabled (EMAIL_ADDRESS / EMAIL_PASSWORD not set)"),
    }
    match settings.config_file {
        Some(ref path) => println!("Config file: {}", path.display()),
        None => println!("Config file: none"),
    }

    Ok(())
}
