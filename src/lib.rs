pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod prompts;
pub mod failover;
pub mod client;
pub mod chat;
pub mod feedback;

/*

codecraft-tutor: async AI tutoring for a beginner coding course.
Every answer goes through one retry primitive that masks transient
failures of the generation service and falls back to a polite busy
message when the attempt budget runs out.

codecraft-tutor/
├── Cargo.toml
├── src/
│   ├── lib.rs          # Re-exports and backend command types
│   ├── error.rs        # Error type and categories
│   ├── config.rs       # Service connection configuration
│   ├── request.rs      # Requests, outcomes, tutoring inputs
│   ├── prompts.rs      # Prompt templates for both call sites
│   ├── failover.rs     # Retry loop, backoff, model fallback
│   ├── client.rs       # Tutor facade and backend actor
│   ├── chat.rs         # In-memory tutoring chat session
│   ├── feedback.rs     # Code feedback request state
│   └── providers/
│       ├── mod.rs
│       └── gemini.rs   # Gemini generateContent client
└── tests/

*/

pub use chat::{ChatMessage, ChatRole, ChatSession};
pub use client::{Tutor, TutorBackend};
pub use config::TutorConfig;
pub use error::{Error, ErrorCategory};
pub use feedback::{FeedbackSession, FeedbackState};
pub use failover::{
  ModelSelector, RetryPolicy, RetryingGenerator, Sleeper
, TextGenerator, TokioSleeper
};
pub use request::{
  CodeFeedback, GeneralQuestion, GenerationOutcome
, GenerationRequest, FALLBACK_MESSAGE
};

/// TUTOR BACKEND INTERFACE:

// ===== AskFeedback =====

pub type TutorReply = Result<String, crate::error::Error>;
pub type TutorReplySender
  = tokio::sync::mpsc::UnboundedSender<TutorReply>;

pub struct AskFeedbackArgs
{   pub feedback: crate::request::CodeFeedback
  , pub reply: TutorReplySender
}

// ===== AskQuestion =====

pub struct AskQuestionArgs
{   pub question: crate::request::GeneralQuestion
  , pub reply: TutorReplySender
}

// ===== KillProcess =====

pub type KillProcessReply = Result<(), crate::error::Error>;
pub type KillProcessReplySender
  = tokio::sync::mpsc::UnboundedSender<KillProcessReply>;

pub struct KillProcessArgs
{   pub reply: KillProcessReplySender
}

// ===== TutorHand (sender side) =====

pub struct TutorHand
{   pub ask_feedback_tx
      : tokio::sync::mpsc::UnboundedSender<AskFeedbackArgs>
  , pub ask_question_tx
      : tokio::sync::mpsc::UnboundedSender<AskQuestionArgs>
  , pub kill_process_tx
      : tokio::sync::mpsc::UnboundedSender<KillProcessArgs>
}

// ===== TutorFoot (receiver side) =====

pub struct TutorFoot
{   pub ask_feedback_rx
      : tokio::sync::mpsc::UnboundedReceiver<AskFeedbackArgs>
  , pub ask_question_rx
      : tokio::sync::mpsc::UnboundedReceiver<AskQuestionArgs>
  , pub kill_process_rx
      : tokio::sync::mpsc::UnboundedReceiver<KillProcessArgs>
}

/// Install the env_logger backend for the `log` macros.
/// Reads `RUST_LOG`, defaulting to `info`. Safe to call twice.
pub fn init_logging()
{   let _ = env_logger::Builder::from_env(
      env_logger::Env::default().default_filter_or("info")
    ).try_init();
}
