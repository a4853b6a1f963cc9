//! In-memory tutoring chat over the tutor backend

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use log::{debug, warn};

use crate::client::TutorBackend;
use crate::request::GeneralQuestion;

/// Messages kept by a [`ChatSession`], about the last five
/// questions and their replies
pub const MAX_MESSAGES: usize = 10;

/// Shown in the chat when the backend could not answer at all
pub const CHAT_BUSY_MESSAGE: &str
  = "The AI is currently busy. Please wait a few seconds and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole
{   User
  , Model
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage
{   pub role: ChatRole
  , pub text: String
  , pub timestamp: DateTime<Utc>
}

impl ChatMessage
{   pub fn new(role: ChatRole, text: impl Into<String>) -> Self
    {   ChatMessage
        {   role
          , text: text.into()
          , timestamp: Utc::now()
        }
    }

    pub fn user(text: impl Into<String>) -> Self
    {   Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self
    {   Self::new(ChatRole::Model, text)
    }
}

/// Chat session allowing one question in flight at a time
pub struct ChatSession
{   backend: Arc<TutorBackend>
  , messages: Mutex<Vec<ChatMessage>>
  , loading: AtomicBool
}

/// Clears the loading flag however the request ends
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_>
{   fn drop(&mut self)
    {   self.0.store(false, Ordering::Release);
    }
}

impl ChatSession
{   pub fn new(backend: Arc<TutorBackend>) -> Self
    {   ChatSession
        {   backend
          , messages: Mutex::new(Vec::new())
          , loading: AtomicBool::new(false)
        }
    }

    pub fn is_loading(&self) -> bool
    {   self.loading.load(Ordering::Acquire)
    }

    /// Ask a question and record both sides of the exchange.
    /// Returns `None` without doing anything while another
    /// message is still in flight.
    pub async fn send_message(
      &self
    , language: &str
    , question: &str
    ) -> Option<String>
    {   if self.loading
          .compare_exchange(
            false, true, Ordering::AcqRel, Ordering::Acquire
          )
          .is_err()
        {   debug!("Ignoring message, a request is already in flight");
            return None;
        }
        let _guard = LoadingGuard(&self.loading);

        self.record(ChatMessage::user(question)).await;

        let answer = self.backend
          .request_answer(GeneralQuestion
          {   language: language.to_string()
            , question: question.to_string()
          })
          .await
          .unwrap_or_else(|e| {
            warn!("Chat answer failed: {}", e);
            CHAT_BUSY_MESSAGE.to_string()
          });

        self.record(ChatMessage::model(answer.clone())).await;
        Some(answer)
    }

    /// Append a message, dropping the oldest beyond [`MAX_MESSAGES`]
    async fn record(&self, message: ChatMessage)
    {   let mut messages = self.messages.lock().await;
        messages.push(message);
        let excess = messages.len().saturating_sub(MAX_MESSAGES);
        messages.drain(..excess);
    }

    /// Most recent messages, oldest first
    pub async fn history(&self) -> Vec<ChatMessage>
    {   self.messages.lock().await.clone()
    }
}
