//! Request and outcome types shared by the tutor

use serde::{Deserialize, Serialize};

/// Returned to the user when every attempt failed
pub const FALLBACK_MESSAGE: &str
  = "The AI is currently busy or unavailable. \
     Please wait a few seconds and try again.";

/// Fully assembled prompt text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest
{   pub prompt_text: String
}

impl GenerationRequest
{   pub fn new(prompt_text: impl Into<String>) -> Self
    {   GenerationRequest
        {   prompt_text: prompt_text.into()
        }
    }
}

/// Result of running the retry loop for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome
{   /// Non-blank generated text
    Success { text: String }
  , /// Attempt budget exhausted; carries the last failure cause
    Failure { reason: String }
}

impl GenerationOutcome
{   pub fn is_success(&self) -> bool
    {   matches!(self, GenerationOutcome::Success { .. })
    }

    /// Text shown to the user, the fallback message on failure
    pub fn into_text(self) -> String
    {   match self
        {   GenerationOutcome::Success { text } => text
          , GenerationOutcome::Failure { .. } => {
              FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

/// Submitted exercise code the student wants feedback on
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFeedback
{   pub language: String
  , pub code: String
  , pub diagnostics: String
  , pub lesson_title: String
  , pub lesson_description: String
}

/// Free-form question asked in the tutoring chat
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralQuestion
{   pub language: String
  , pub question: String
}
