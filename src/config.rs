//! Configuration for the intake assistant.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (a `.env` file is loaded first if present)
//! 2. Config file (.intake/config.yaml)
//! 3. Defaults
//!
//! Config file discovery:
//! - Searches current directory and parents for .intake/config.yaml
//! - `store.sqlite_path` is relative to the config file's project root
//!
//! Credentials only ever come from the environment. The transport key is
//! always required; store credentials are required for the backend in use.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

/// Global cached settings (stores Result to handle init errors)
static SETTINGS: OnceLock<Result<Settings, String>> = OnceLock::new();

pub const DEFAULT_OFFICE: &str = "Shahil's Medical Office";
pub const DEFAULT_DOCTOR: &str = "Shahil";
pub const DEFAULT_TABLE: &str = "AssortHealthChatHistory";
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;

/// Startup configuration errors. All of them are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{0} not found in environment variables")]
    MissingEnv(&'static str),

    #[error("Unknown store backend '{0}' (expected 'supabase' or 'sqlite')")]
    UnknownBackend(String),
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub office: OfficeConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    /// Replaces the built-in goodbye phrase list
    #[serde(default)]
    pub goodbye_phrases: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfficeConfig {
    pub name: Option<String>,
    pub doctor: Option<String>,
    /// From address on confirmation emails
    pub sender_email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    pub backend: Option<String>,
    pub table: Option<String>,
    pub sqlite_path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SmtpConfig {
    pub server: Option<String>,
    pub port: Option<u16>,
}

/// Office identity used in prompts and emails
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Office {
    pub name: String,
    pub doctor: String,
}

impl Default for Office {
    fn default() -> Self {
        Self {
            name: DEFAULT_OFFICE.to_string(),
            doctor: DEFAULT_DOCTOR.to_string(),
        }
    }
}

/// Where finished calls are written
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    Supabase {
        url: String,
        key: String,
        table: String,
    },
    Sqlite {
        path: PathBuf,
    },
}

/// Outgoing mail settings. Present only when mail credentials are set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender: String,
}

/// Resolved settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub office: Office,
    /// Transport credential
    pub livekit_api_key: String,
    pub store: StoreSettings,
    pub smtp: Option<SmtpSettings>,
    pub goodbye_phrases: Option<Vec<String>>,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".intake").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Intake home directory ($INTAKE_HOME or ~/.intake)
fn intake_home(env: &impl Fn(&str) -> Option<String>) -> Result<PathBuf> {
    match env("INTAKE_HOME") {
        Some(home) => Ok(PathBuf::from(home)),
        None => Ok(dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".intake")),
    }
}

fn required(env: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<String, ConfigError> {
    env(key)
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(key))
}

/// Combine a parsed config file with environment lookups
fn resolve(
    file: ConfigFile,
    base_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings> {
    let livekit_api_key = required(&env, "LIVEKIT_API_KEY")?;

    let office = Office {
        name: file.office.name.unwrap_or_else(|| DEFAULT_OFFICE.to_string()),
        doctor: file.office.doctor.unwrap_or_else(|| DEFAULT_DOCTOR.to_string()),
    };

    let backend = env("INTAKE_STORE")
        .or(file.store.backend)
        .unwrap_or_else(|| "supabase".to_string());

    let store = match backend.as_str() {
        "supabase" => StoreSettings::Supabase {
            url: required(&env, "SUPABASE_URL")?,
            key: required(&env, "SUPABASE_KEY")?,
            table: file.store.table.unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        },
        "sqlite" => {
            let path = match (file.store.sqlite_path, base_dir) {
                (Some(p), Some(base)) if Path::new(&p).is_relative() => base.join(p),
                (Some(p), _) => PathBuf::from(p),
                (None, _) => intake_home(&env)?.join("calls.sqlite"),
            };
            StoreSettings::Sqlite { path }
        }
        other => return Err(ConfigError::UnknownBackend(other.to_string()).into()),
    };

    // Mail is optional: without credentials bookings still succeed, unconfirmed
    let smtp = match (env("EMAIL_ADDRESS"), env("EMAIL_PASSWORD")) {
        (Some(username), Some(password)) => Some(SmtpSettings {
            server: file
                .smtp
                .server
                .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            port: file.smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
            sender: file.office.sender_email.unwrap_or_else(|| username.clone()),
            username,
            password,
        }),
        _ => None,
    };

    Ok(Settings {
        office,
        livekit_api_key,
        store,
        smtp,
        goodbye_phrases: file.goodbye_phrases,
        config_file: None,
    })
}

/// Load settings from all sources
fn load_settings() -> Result<Settings> {
    // A missing .env is normal in production
    let _ = dotenvy::dotenv();

    let config_file = find_config_file();
    let (file, base_dir) = match config_file {
        Some(ref path) => {
            let file = load_config_file(path)?;
            // Base directory is the parent of .intake/
            let base = path.parent().and_then(|p| p.parent()).map(Path::to_path_buf);
            (file, base)
        }
        None => (ConfigFile::default(), None),
    };

    let mut settings = resolve(file, base_dir.as_deref(), |key| std::env::var(key).ok())?;
    settings.config_file = config_file;
    Ok(settings)
}

/// Get the global settings (loads once, then cached)
pub fn settings() -> Result<&'static Settings> {
    let result = SETTINGS.get_or_init(|| load_settings().map_err(|e| e.to_string()));

    match result {
        Ok(settings) => Ok(settings),
        Err(e) => anyhow::bail!("{}", e),
    }
}

/// Office identity without requiring credentials (for dry runs)
pub fn office_or_default() -> Office {
    find_config_file()
        .and_then(|path| load_config_file(&path).ok())
        .map(|file| Office {
            name: file.office.name.unwrap_or_else(|| DEFAULT_OFFICE.to_string()),
            doctor: file.office.doctor.unwrap_or_else(|| DEFAULT_DOCTOR.to_string()),
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::TempDir;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_transport_key_is_fatal() {
        let err = resolve(ConfigFile::default(), None, env_of(&[])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingEnv("LIVEKIT_API_KEY"))
        );
    }

    #[test]
    fn test_supabase_requires_credentials() {
        let err = resolve(
            ConfigFile::default(),
            None,
            env_of(&[("LIVEKIT_API_KEY", "lk"), ("SUPABASE_URL", "https://x.supabase.co")]),
        )
        .unwrap_err();
        assert_eq!(
            err.downcast_ref::<ConfigError>(),
            Some(&ConfigError::MissingEnv("SUPABASE_KEY"))
        );
    }

    #[test]
    fn test_defaults_with_full_env() {
        let settings = resolve(
            ConfigFile::default(),
            None,
            env_of(&[
                ("LIVEKIT_API_KEY", "lk"),
                ("SUPABASE_URL", "https://x.supabase.co"),
                ("SUPABASE_KEY", "anon"),
                ("EMAIL_ADDRESS", "office@example.com"),
                ("EMAIL_PASSWORD", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.office, Office::default());
        assert_eq!(
            settings.store,
            StoreSettings::Supabase {
                url: "https://x.supabase.co".to_string(),
                key: "anon".to_string(),
                table: DEFAULT_TABLE.to_string(),
            }
        );
        let smtp = settings.smtp.unwrap();
        assert_eq!(smtp.server, DEFAULT_SMTP_SERVER);
        assert_eq!(smtp.port, 587);
        assert_eq!(smtp.sender, "office@example.com");
    }

    #[test]
    fn test_sqlite_backend_needs_no_store_credentials() {
        let settings = resolve(
            ConfigFile::default(),
            None,
            env_of(&[
                ("LIVEKIT_API_KEY", "lk"),
                ("INTAKE_STORE", "sqlite"),
                ("INTAKE_HOME", "/tmp/intake-test"),
            ]),
        )
        .unwrap();

        assert_eq!(
            settings.store,
            StoreSettings::Sqlite {
                path: PathBuf::from("/tmp/intake-test/calls.sqlite")
            }
        );
        assert!(settings.smtp.is_none());
    }

    #[test]
    fn test_unknown_backend() {
        let err = resolve(
            ConfigFile::default(),
            None,
            env_of(&[("LIVEKIT_API_KEY", "lk"), ("INTAKE_STORE", "redis")]),
        )
        .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::UnknownBackend(b)) if b == "redis"
        ));
    }

    #[test]
    fn test_config_file_parsing() {
        let temp = TempDir::new().unwrap();
        let intake_dir = temp.path().join(".intake");
        std::fs::create_dir_all(&intake_dir).unwrap();

        let config_path = intake_dir.join("config.yaml");
        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(
            file,
            r#"
office:
  name: Riverside Clinic
  doctor: Patel
store:
  backend: sqlite
  sqlite_path: data/calls.sqlite
goodbye_phrases:
  - farewell
"#
        )
        .unwrap();

        let parsed = load_config_file(&config_path).unwrap();
        let settings = resolve(parsed, Some(temp.path()), env_of(&[("LIVEKIT_API_KEY", "lk")])).unwrap();

        assert_eq!(settings.office.name, "Riverside Clinic");
        assert_eq!(settings.office.doctor, "Patel");
        assert_eq!(
            settings.store,
            StoreSettings::Sqlite {
                path: temp.path().join("data/calls.sqlite")
            }
        );
        assert_eq!(settings.goodbye_phrases, Some(vec!["farewell".to_string()]));
    }
}
