use chrono::NaiveDate;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const ENV_WORKSPACE: &str = "RECORDSD_WORKSPACE";
pub const ENV_LOG_JSON: &str = "RECORDSD_LOG_JSON";
pub const ENV_TODAY: &str = "RECORDSD_TODAY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub workspace: Option<PathBuf>,
    pub log_json: bool,
    /// Fixed "today" for the exam date rule; the local date when unset.
    pub today: Option<NaiveDate>,
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| parse_bool(&v))
        .unwrap_or(default)
}

/// Read before the rest of the config so logging is up first.
pub fn log_json_from_env() -> bool {
    env_bool(ENV_LOG_JSON, false)
}

impl Config {
    pub fn from_env() -> Self {
        let workspace = env::var(ENV_WORKSPACE)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        let today = env::var(ENV_TODAY).ok().and_then(|v| {
            let parsed = NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d").ok();
            if parsed.is_none() {
                tracing::warn!(value = %v, "ignoring {}: expected YYYY-MM-DD", ENV_TODAY);
            }
            parsed
        });
        Self {
            workspace,
            log_json: log_json_from_env(),
            today,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.today
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }
}

/// Logs go to stderr: stdout carries the protocol.
pub fn init_tracing(log_json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}
