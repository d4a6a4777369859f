//! Runtime configuration
//!
//! Values are read once from the environment (after `.env` is loaded by the
//! binary) and never change afterwards.

use crate::error::SummaryError;
use crate::Result;
use std::fmt;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Local development origins allowed by CORS
pub const DEFAULT_ALLOWED_ORIGINS: [&str; 3] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:3000",
];

#[derive(Clone)]
pub struct Settings {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub request_timeout: Duration,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = self.gemini_api_key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Settings")
            .field("gemini_api_key", &api_key)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("request_timeout", &self.request_timeout)
            .field("port", &self.port)
            .field("allowed_origins", &self.allowed_origins)
            .finish()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| SummaryError::Config(format!("Invalid PORT '{}': {}", raw, e)))?,
            None => defaults.port,
        };

        let request_timeout = match get("GEMINI_TIMEOUT_SECS") {
            Some(raw) => {
                let secs = raw.parse::<u64>().map_err(|e| {
                    SummaryError::Config(format!("Invalid GEMINI_TIMEOUT_SECS '{}': {}", raw, e))
                })?;
                if secs == 0 {
                    warn!("GEMINI_TIMEOUT_SECS=0 ignored, using default");
                    defaults.request_timeout
                } else {
                    Duration::from_secs(secs)
                }
            }
            None => defaults.request_timeout,
        };

        let allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(|o| o.trim_end_matches('/').to_string())
                .collect(),
            None => defaults.allowed_origins,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: get("GEMINI_BASE_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or(defaults.gemini_base_url),
            request_timeout,
            port,
            allowed_origins,
        })
    }

    /// Return the API key or fail with a descriptive configuration error
    pub fn require_api_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            SummaryError::Config(
                "Missing Gemini API key. Set GEMINI_API_KEY in your .env file or environment."
                    .to_string(),
            )
        })
    }
}
