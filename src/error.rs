use std::fmt;

/// Custom error type for tutor operations
/// Implements Clone for sending through channels
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for the generation service
    MissingApiKey(String)
  , /// HTTP transport error
    HttpError(String)
  , /// API returned an error response
    ApiError(String)
  , /// Failed to parse API response
    ParseError(String)
  , /// Call succeeded but produced no usable text
    EmptyResponse
  , /// Rate limit or quota exceeded
    RateLimitExceeded
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Timeout error
    Timeout
  , /// Generic error
    Other(String)
}

/// Coarse failure category, used for log records only.
/// Every category is retried the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory
{   Network
  , Auth
  , Quota
  , Response
  , Config
  , Other
}

impl Error
{   /// Classify this error for diagnostics
    pub fn category(&self) -> ErrorCategory
    {   match self
        {   Error::HttpError(_) | Error::Timeout => {
              ErrorCategory::Network
            }
          , Error::MissingApiKey(_) => ErrorCategory::Auth
          , Error::RateLimitExceeded => ErrorCategory::Quota
          , Error::ApiError(_)
          | Error::ParseError(_)
          | Error::EmptyResponse => ErrorCategory::Response
          , Error::InvalidConfiguration(_) => ErrorCategory::Config
          , Error::Other(_) => ErrorCategory::Other
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(service) => {
              write!(f, "Missing API key for: {}", service)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError(msg) => {
              write!(f, "API error: {}", msg)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::EmptyResponse => {
              write!(f, "Empty generation response")
            }
          , Error::RateLimitExceeded => {
              write!(f, "API rate limit exceeded")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}
