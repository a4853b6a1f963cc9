//! Configuration for the generation service connection

use serde::{Deserialize, Serialize};
use std::time::Duration;
use log::debug;

pub const DEFAULT_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const API_BASE_ENV: &str = "GEMINI_API_BASE";
pub const TIMEOUT_ENV: &str = "GEMINI_TIMEOUT_SECS";

/// Tutor configuration
///
/// Retry and backoff constants are deliberately absent: they are
/// fixed by [`crate::failover::RetryPolicy::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TutorConfig
{   /// API key for the generation service
    pub api_key: Option<String>
  , /// API base URL (if custom)
    pub api_base: Option<String>
  , /// Request timeout in seconds
    pub timeout_secs: Option<u64>
}

impl TutorConfig
{   /// Build a configuration from the process environment
    pub fn from_env() -> Self
    {   debug!("Loading TutorConfig from environment");
        TutorConfig
        {   api_key: std::env::var(API_KEY_ENV)
              .ok()
              .filter(|k| !k.trim().is_empty())
          , api_base: std::env::var(API_BASE_ENV).ok()
          , timeout_secs: std::env::var(TIMEOUT_ENV)
              .ok()
              .and_then(|s| s.trim().parse().ok())
        }
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str)
      -> Result<Self, crate::error::Error>
    {   serde_json::from_str(json).map_err(|e| {
          crate::error::Error::InvalidConfiguration(e.to_string())
        })
    }

    pub fn api_base(&self) -> &str
    {   self.api_base
          .as_deref()
          .unwrap_or(DEFAULT_API_BASE)
          .trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration
    {   Duration::from_secs(
          self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
        )
    }
}
