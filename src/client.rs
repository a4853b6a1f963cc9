use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use log::{debug, warn, error, info};

use crate::config::TutorConfig;
use crate::error::Error;
use crate::failover::{
  RetryingGenerator, Sleeper, TextGenerator, TokioSleeper
};
use crate::prompts;
use crate::providers::GeminiClient;
use crate::request::{CodeFeedback, GeneralQuestion};
use crate::TutorFoot;

/// Both tutoring call sites over one shared retry primitive
pub struct Tutor<G, S = TokioSleeper>
{   generator: RetryingGenerator<G, S>
}

impl Tutor<GeminiClient, TokioSleeper>
{   /// Gemini-backed tutor with the default model pair
    pub fn from_config(config: &TutorConfig)
      -> Result<Self, Error>
    {   let client = GeminiClient::new(config)?;
        Ok(Tutor::new(RetryingGenerator::new(client)))
    }
}

impl<G: TextGenerator, S: Sleeper> Tutor<G, S>
{   pub fn new(generator: RetryingGenerator<G, S>) -> Self
    {   Tutor { generator }
    }

    pub fn generator(&self) -> &RetryingGenerator<G, S>
    {   &self.generator
    }

    /// Feedback on submitted code given its diagnostics
    pub async fn feedback_for_code(
      &self
    , feedback: &CodeFeedback
    ) -> String
    {   debug!(
          "feedback_for_code: {} / {}"
        , feedback.language
        , feedback.lesson_title
        );
        let request = prompts::code_feedback_prompt(feedback);
        self.generator.generate_with_retry(&request).await
    }

    /// Answer to a free-form question
    pub async fn general_answer(
      &self
    , question: &GeneralQuestion
    ) -> String
    {   debug!("general_answer: {}", question.language);
        let request = prompts::general_question_prompt(question);
        self.generator.generate_with_retry(&request).await
    }
}

/// Public API for the tutor backend - owns the task
pub struct TutorBackend
{   hand: crate::TutorHand
  , _task_handle: tokio::task::JoinHandle<()>
}

impl TutorBackend
{   /// Spawn a Gemini-backed backend.
    /// Without an API key every request is answered with
    /// [`Error::MissingApiKey`].
    pub fn new(config: TutorConfig) -> Self
    {   let tutor = Tutor::from_config(&config).inspect_err(|e| {
          warn!("Tutor unavailable: {}", e);
        });
        Self::start(tutor)
    }

    /// Spawn a backend serving the given tutor
    pub fn spawn<G, S>(tutor: Tutor<G, S>) -> Self
    where
      G: TextGenerator + 'static
    , S: Sleeper + 'static
    {   Self::start(Ok(tutor))
    }

    fn start<G, S>(tutor: Result<Tutor<G, S>, Error>) -> Self
    where
      G: TextGenerator + 'static
    , S: Sleeper + 'static
    {   debug!("Creating TutorBackend with task ownership");

        let (ask_feedback_tx, ask_feedback_rx)
          = mpsc::unbounded_channel();
        let (ask_question_tx, ask_question_rx)
          = mpsc::unbounded_channel();
        let (kill_process_tx, kill_process_rx)
          = mpsc::unbounded_channel();

        let hand = crate::TutorHand
        {   ask_feedback_tx
          , ask_question_tx
          , kill_process_tx
        };

        let foot = crate::TutorFoot
        {   ask_feedback_rx
          , ask_question_rx
          , kill_process_rx
        };

        let tutor = tutor.map(Arc::new);
        let _task_handle = tokio::spawn(async move {
          run_backend_loop(foot, tutor).await
        });

        TutorBackend
        {   hand
          , _task_handle
        }
    }

    /// Queue a code feedback request - returns immediately
    pub async fn ask_feedback(
      &self
    , feedback: CodeFeedback
    ) -> Result<
        mpsc::UnboundedReceiver<crate::TutorReply>,
        Error
      >
    {   debug!("ask_feedback queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::AskFeedbackArgs
        {   feedback
          , reply: reply_tx
        };

        self.hand.ask_feedback_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other("Backend disconnected".to_string())
          })?;

        Ok(reply_rx)
    }

    /// Queue a general question - returns immediately
    pub async fn ask_question(
      &self
    , question: GeneralQuestion
    ) -> Result<
        mpsc::UnboundedReceiver<crate::TutorReply>,
        Error
      >
    {   debug!("ask_question queuing command");
        let (reply_tx, reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::AskQuestionArgs
        {   question
          , reply: reply_tx
        };

        self.hand.ask_question_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel closed");
            Error::Other("Backend disconnected".to_string())
          })?;

        Ok(reply_rx)
    }

    /// Queue a code feedback request and wait for the reply
    pub async fn request_feedback(
      &self
    , feedback: CodeFeedback
    ) -> crate::TutorReply
    {   let mut reply_rx = self.ask_feedback(feedback).await?;
        await_reply(&mut reply_rx).await
    }

    /// Queue a general question and wait for the reply
    pub async fn request_answer(
      &self
    , question: GeneralQuestion
    ) -> crate::TutorReply
    {   let mut reply_rx = self.ask_question(question).await?;
        await_reply(&mut reply_rx).await
    }

    /// Gracefully shutdown the backend, aborting in-flight requests
    pub async fn shutdown(&self)
      -> Result<(), Error>
    {   debug!("Shutting down TutorBackend");
        let (reply_tx, mut reply_rx)
          = mpsc::unbounded_channel();

        let cmd = crate::KillProcessArgs
        {   reply: reply_tx
        };

        self.hand.kill_process_tx
          .send(cmd)
          .map_err(|_| {
            error!("Backend channel already closed");
            Error::Other("Backend already shutdown".to_string())
          })?;

        // Wait for shutdown confirmation
        if let Some(result) = reply_rx.recv().await
        {   debug!("Backend shutdown confirmed");
            result
        } else
        {   error!("Backend shutdown timeout");
            Err(Error::Timeout)
        }
    }
}

async fn await_reply(
  reply_rx: &mut mpsc::UnboundedReceiver<crate::TutorReply>
) -> crate::TutorReply
{   reply_rx.recv().await.unwrap_or_else(|| {
      warn!("Reply channel closed before an answer arrived");
      Err(Error::Other("Request cancelled".to_string()))
    })
}

/// Main backend event loop
///
/// Every request runs in its own task so a slow retry sequence
/// never stalls the loop, and no retry state is shared.
async fn run_backend_loop<G, S>(
  foot: TutorFoot
, tutor: Result<Arc<Tutor<G, S>>, Error>
)
where
  G: TextGenerator + 'static
, S: Sleeper + 'static
{   debug!("Starting TutorBackend event loop");
    let mut in_flight: JoinSet<()> = JoinSet::new();
    let TutorFoot
    {   mut ask_feedback_rx
      , mut ask_question_rx
      , mut kill_process_rx
    } = foot;

    loop
    { tokio::select!
      { Some(cmd) = ask_feedback_rx.recv() => {
          debug!("Received AskFeedback");
          match &tutor
          {   Ok(tutor) => {
                let tutor = Arc::clone(tutor);
                in_flight.spawn(async move {
                  let answer = tutor
                    .feedback_for_code(&cmd.feedback)
                    .await;
                  let _ = cmd.reply.send(Ok(answer));
                });
              }
            , Err(e) => {
                let _ = cmd.reply.send(Err(e.clone()));
              }
          }
        }
      , Some(cmd) = ask_question_rx.recv() => {
          debug!("Received AskQuestion");
          match &tutor
          {   Ok(tutor) => {
                let tutor = Arc::clone(tutor);
                in_flight.spawn(async move {
                  let answer = tutor
                    .general_answer(&cmd.question)
                    .await;
                  let _ = cmd.reply.send(Ok(answer));
                });
              }
            , Err(e) => {
                let _ = cmd.reply.send(Err(e.clone()));
              }
          }
        }
      , Some(cmd) = kill_process_rx.recv() => {
          debug!(
            "Received KillProcess, aborting {} in-flight requests"
          , in_flight.len()
          );
          in_flight.shutdown().await;
          let _ = cmd.reply.send(Ok(()));
          info!("TutorBackend shutting down");
          break;
        }
      , Some(joined) = in_flight.join_next() => {
          if let Err(e) = joined
          {   if e.is_panic()
              {   error!("Tutor request task panicked: {}", e);
              }
          }
        }
      , else => {
          debug!("All command channels closed");
          break;
        }
      }
    }
}
