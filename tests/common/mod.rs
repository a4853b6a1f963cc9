#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use tokio::sync::Notify;

use codecraft_tutor::{Error, Sleeper, TextGenerator};

/// One scripted reply of the fake generation service
#[derive(Debug, Clone)]
pub enum Step
{   Text(&'static str)
  , Blank(&'static str)
  , Nothing
  , Fail(Error)
}

/// Replays a script of replies, repeating the last step once the
/// script runs out, and records every (model, prompt) call.
#[derive(Clone)]
pub struct ScriptedGenerator
{   script: Vec<Step>
  , calls: Arc<Mutex<Vec<(String, String)>>>
}

impl ScriptedGenerator
{   pub fn new(script: Vec<Step>) -> Self
    {   ScriptedGenerator
        {   script
          , calls: Arc::new(Mutex::new(Vec::new()))
        }
    }

    pub fn always(step: Step) -> Self
    {   Self::new(vec![step])
    }

    pub fn calls(&self) -> Vec<(String, String)>
    {   self.calls.lock().unwrap().clone()
    }

    pub fn models(&self) -> Vec<String>
    {   self.calls().into_iter().map(|(m, _)| m).collect()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator
{   async fn generate_text(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<Option<String>, Error>
    {   let index = {
          let mut calls = self.calls.lock().unwrap();
          calls.push((model.to_string(), prompt.to_string()));
          calls.len() - 1
        };
        let step = self.script
          .get(index)
          .or_else(|| self.script.last())
          .cloned()
          .unwrap_or(Step::Nothing);
        match step
        {   Step::Text(text) | Step::Blank(text) => {
              Ok(Some(text.to_string()))
            }
          , Step::Nothing => Ok(None)
          , Step::Fail(e) => Err(e)
        }
    }
}

/// Records requested waits and returns immediately
#[derive(Clone, Default)]
pub struct RecordingSleeper
{   waits: Arc<Mutex<Vec<Duration>>>
}

impl RecordingSleeper
{   pub fn waits_ms(&self) -> Vec<u128>
    {   self.waits
          .lock()
          .unwrap()
          .iter()
          .map(Duration::as_millis)
          .collect()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper
{   async fn sleep(&self, duration: Duration)
    {   self.waits.lock().unwrap().push(duration);
    }
}

/// Prompts containing this marker skip the gate
pub const UNGATED: &str = "[ungated]";

/// Blocks every call until released, except ungated prompts
#[derive(Clone, Default)]
pub struct GatedGenerator
{   pub started: Arc<Notify>
  , pub release: Arc<Notify>
}

#[async_trait]
impl TextGenerator for GatedGenerator
{   async fn generate_text(
      &self
    , _model: &str
    , prompt: &str
    ) -> Result<Option<String>, Error>
    {   if prompt.contains(UNGATED)
        {   return Ok(Some("quick".to_string()));
        }
        self.started.notify_one();
        self.release.notified().await;
        Ok(Some("released".to_string()))
    }
}

pub fn init_test_logging()
{   let _ = env_logger::builder().is_test(true).try_init();
}
