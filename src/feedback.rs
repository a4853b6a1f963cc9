//! Code feedback state over the tutor backend

use std::sync::Arc;
use tokio::sync::Mutex;
use log::{debug, warn};

use crate::client::TutorBackend;
use crate::request::CodeFeedback;

/// Latest feedback request as seen by the exercise screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackState
{   pub is_loading: bool
  , pub error: Option<String>
  , pub answer: Option<String>
}

pub struct FeedbackSession
{   backend: Arc<TutorBackend>
  , state: Mutex<FeedbackState>
}

impl FeedbackSession
{   pub fn new(backend: Arc<TutorBackend>) -> Self
    {   FeedbackSession
        {   backend
          , state: Mutex::new(FeedbackState::default())
        }
    }

    pub async fn state(&self) -> FeedbackState
    {   self.state.lock().await.clone()
    }

    /// Request feedback, clearing any previous answer or error first
    pub async fn ask_for_feedback(
      &self
    , feedback: CodeFeedback
    ) -> FeedbackState
    {   debug!("ask_for_feedback: {}", feedback.lesson_title);
        *self.state.lock().await = FeedbackState
        {   is_loading: true
          , ..FeedbackState::default()
        };

        let result = self.backend.request_feedback(feedback).await;

        let mut state = self.state.lock().await;
        state.is_loading = false;
        match result
        {   Ok(answer) => state.answer = Some(answer)
          , Err(e) => {
              warn!("Feedback request failed: {}", e);
              state.error = Some(e.to_string());
            }
        }
        state.clone()
    }

    pub async fn reset(&self)
    {   *self.state.lock().await = FeedbackState::default();
    }
}
