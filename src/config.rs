use std::{env, fmt::Display, str::FromStr};

use tracing::info;

use crate::error::ScheduleError;

pub const APP_NAME: &str = "FitBuddy Schedule";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_LOG_FILTER: &str = "fitbuddy_schedule=info,warn";

/// Client configuration, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub token: Option<String>,
    pub cookie: Option<String>,
    /// Per-request timeout; `None` leaves requests unbounded.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_url: DEFAULT_API_URL.to_string(),
            token: None,
            cookie: None,
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ScheduleError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from any key lookup. Split out so tests don't touch
    /// the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ScheduleError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("FITBUDDY_API_URL")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| {
                info!("FITBUDDY_API_URL not set, using default: {DEFAULT_API_URL}");
                DEFAULT_API_URL.to_string()
            });

        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            return Err(ScheduleError::Config(format!(
                "FITBUDDY_API_URL must start with http:// or https://, got '{api_url}'"
            )));
        }

        let timeout_secs = match non_empty(lookup("FITBUDDY_TIMEOUT_SECS")) {
            Some(raw) => {
                let secs: u64 = parse_var("FITBUDDY_TIMEOUT_SECS", &raw)?;
                if secs == 0 {
                    return Err(ScheduleError::Config(
                        "FITBUDDY_TIMEOUT_SECS must be positive".to_string(),
                    ));
                }
                Some(secs)
            }
            None => None,
        };

        let token = non_empty(lookup("FITBUDDY_TOKEN"));
        if token.is_none() {
            info!("FITBUDDY_TOKEN not set, requests will be sent without a bearer token");
        }

        Ok(Config {
            api_url: api_url.trim_end_matches('/').to_string(),
            token,
            cookie: non_empty(lookup("FITBUDDY_COOKIE")),
            timeout_secs,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T, ScheduleError>
where
    T::Err: Display,
{
    raw.parse()
        .map_err(|e| ScheduleError::Config(format!("Invalid {key} value '{raw}': {e}")))
}
