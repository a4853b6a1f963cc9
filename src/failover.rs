//! Retry, backoff and model fallback for generation calls

use std::time::Duration;
use async_trait::async_trait;
use log::{debug, error, warn};

use crate::error::Error;
use crate::request::{GenerationOutcome, GenerationRequest};

pub const MAX_ATTEMPTS: usize = 5;
pub const INITIAL_BACKOFF_MS: u64 = 600;
pub const BACKOFF_MULTIPLIER: u32 = 2;

/// Attempts up to and including this one use the primary model
pub const PRIMARY_MODEL_ATTEMPTS: usize = 3;

pub const PRIMARY_MODEL: &str = "gemini-2.5-flash";
pub const FALLBACK_MODEL: &str = "gemini-1.5-flash";

/// Remote text generation call.
///
/// `Ok(None)` means the call went through but carried no text.
#[async_trait]
pub trait TextGenerator: Send + Sync
{   async fn generate_text(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<Option<String>, Error>;
}

/// Non-blocking wait between attempts
#[async_trait]
pub trait Sleeper: Send + Sync
{   async fn sleep(&self, duration: Duration);
}

/// Suspends the current task on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper
{   async fn sleep(&self, duration: Duration)
    {   tokio::time::sleep(duration).await;
    }
}

/// Retry policy for failed requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub backoff_multiplier: u32
  , pub initial_backoff: Duration
}

impl RetryPolicy
{   /// Backoff to wait after the given 1-based attempt fails
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   let exponent = attempt.saturating_sub(1) as u32;
        self.initial_backoff
          * self.backoff_multiplier.saturating_pow(exponent)
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy
        {   max_attempts: MAX_ATTEMPTS
          , backoff_multiplier: BACKOFF_MULTIPLIER
          , initial_backoff: Duration::from_millis(
              INITIAL_BACKOFF_MS
            )
        }
    }
}

/// Ordered (primary, fallback) model pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector
{   pub primary: String
  , pub fallback: String
}

impl ModelSelector
{   pub fn new(
      primary: impl Into<String>
    , fallback: impl Into<String>
    ) -> Self
    {   ModelSelector
        {   primary: primary.into()
          , fallback: fallback.into()
        }
    }

    /// Model for a 1-based attempt number.
    /// Depends only on the attempt count, never on earlier failures.
    pub fn model_for_attempt(&self, attempt: usize) -> &str
    {   if attempt <= PRIMARY_MODEL_ATTEMPTS
        {   &self.primary
        } else
        {   &self.fallback
        }
    }
}

impl Default for ModelSelector
{   fn default() -> Self
    {   ModelSelector::new(PRIMARY_MODEL, FALLBACK_MODEL)
    }
}

/// Wraps a [`TextGenerator`] with bounded retries, model
/// fallback and exponential backoff.
///
/// Stateless between calls: the attempt counter and last failure
/// live on the stack of each [`RetryingGenerator::run`] invocation.
pub struct RetryingGenerator<G, S = TokioSleeper>
{   generator: G
  , sleeper: S
  , policy: RetryPolicy
  , models: ModelSelector
}

impl<G: TextGenerator> RetryingGenerator<G, TokioSleeper>
{   pub fn new(generator: G) -> Self
    {   Self::with_models(generator, ModelSelector::default())
    }

    pub fn with_models(
      generator: G
    , models: ModelSelector
    ) -> Self
    {   debug!(
          "Creating RetryingGenerator ({} -> {})"
        , models.primary
        , models.fallback
        );
        RetryingGenerator
        {   generator
          , sleeper: TokioSleeper
          , policy: RetryPolicy::default()
          , models
        }
    }
}

impl<G: TextGenerator, S: Sleeper> RetryingGenerator<G, S>
{   /// Swap the wait primitive
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T)
      -> RetryingGenerator<G, T>
    {   RetryingGenerator
        {   generator: self.generator
          , sleeper
          , policy: self.policy
          , models: self.models
        }
    }

    pub fn policy(&self) -> &RetryPolicy
    {   &self.policy
    }

    pub fn models(&self) -> &ModelSelector
    {   &self.models
    }

    /// Run the retry loop, reporting budget exhaustion as
    /// [`GenerationOutcome::Failure`]
    pub async fn run(
      &self
    , request: &GenerationRequest
    ) -> GenerationOutcome
    {   let mut attempt = 1;
        let mut last_error = Error::EmptyResponse;

        while attempt <= self.policy.max_attempts
        {   let model = self.models.model_for_attempt(attempt);
            debug!("Generation attempt {} using {}", attempt, model);

            match self.generator
              .generate_text(model, &request.prompt_text)
              .await
            {   Ok(Some(text)) if !text.trim().is_empty() => {
                  debug!("Attempt {} succeeded", attempt);
                  return GenerationOutcome::Success { text };
                }
              , Ok(_) => {
                  warn!(
                    "Generation attempt {} ({}) returned no text"
                  , attempt
                  , model
                  );
                  last_error = Error::EmptyResponse;
                }
              , Err(e) => {
                  warn!(
                    "Generation attempt {} ({}) failed [{:?}]: {}"
                  , attempt
                  , model
                  , e.category()
                  , e
                  );
                  last_error = e;
                }
            }

            if attempt < self.policy.max_attempts
            {   self.sleeper
                  .sleep(self.policy.backoff_for_attempt(attempt))
                  .await;
            }
            attempt += 1;
        }

        error!(
          "Giving up after {} attempts: {}"
        , self.policy.max_attempts
        , last_error
        );
        GenerationOutcome::Failure
        {   reason: last_error.to_string()
        }
    }

    /// Generated text, or the fallback message once every
    /// attempt has failed. Never errors.
    pub async fn generate_with_retry(
      &self
    , request: &GenerationRequest
    ) -> String
    {   self.run(request).await.into_text()
    }
}
