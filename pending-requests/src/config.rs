use std::env;

use crate::middleware::builtin::LogLevel;
use crate::middleware::StageConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub github_api_base: String,
    pub demo_users: Vec<String>,
    pub demo_attempts: usize,
    pub request_delay_ms: u64,
    pub dispatch_log_level: LogLevel,
    pub stage_overrides: Vec<StageConfig>,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let github_api_base = lookup("GITHUB_API_BASE")
            .map(|base| base.trim_end_matches('/').to_string())
            .unwrap_or_else(|| "https://api.github.com".to_string());

        let demo_users: Vec<String> = lookup("DEMO_USERS")
            .map(|users| {
                users
                    .split(',')
                    .map(str::trim)
                    .filter(|user| !user.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();

        let dispatch_log_level = match lookup("DISPATCH_LOG_LEVEL") {
            Some(level) => level.parse().unwrap_or_else(|e| {
                log::warn!("{}, using info", e);
                LogLevel::Info
            }),
            None => LogLevel::Info,
        };

        let stage_overrides = match lookup("PIPELINE_STAGES") {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring invalid PIPELINE_STAGES: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        };

        Self {
            github_api_base,
            demo_users: if demo_users.is_empty() {
                vec!["idolize".to_string()]
            } else {
                demo_users
            },
            demo_attempts: lookup("DEMO_ATTEMPTS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            request_delay_ms: lookup("REQUEST_DELAY_MS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(5000),
            dispatch_log_level,
            stage_overrides,
        }
    }
}
