use serde::{Deserialize, Serialize};
use async_trait::async_trait;
use log::{debug, trace, error};

use crate::config::TutorConfig;
use crate::error::Error;
use crate::failover::TextGenerator;

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
}

impl GenerateContentRequest
{   /// Single user turn holding the whole prompt
    pub fn from_prompt(prompt: &str) -> Self
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![
                    Part { text: Some(prompt.to_string()) }
                  ]
              }
            ]
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   #[serde(default)]
    pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

impl GenerateContentResponse
{   /// Text of the first candidate, all text parts joined.
    /// `None` when there is nothing to join.
    pub fn text(&self) -> Option<String>
    {   let content = self.candidates.first()?.content.as_ref()?;
        let texts: Vec<&str> = content.parts
          .iter()
          .filter_map(|p| p.text.as_deref())
          .collect();
        if texts.is_empty()
        {   None
        } else
        {   Some(texts.concat())
        }
    }
}

// ===== Gemini Client =====

/// Gemini `generateContent` client
pub struct GeminiClient
{   api_key: String
  , api_base: String
  , http_client: reqwest::Client
}

impl GeminiClient
{   /// Build a client; fails when no API key is configured
    pub fn new(config: &TutorConfig) -> Result<Self, Error>
    {   debug!("Creating GeminiClient");
        let api_key = config.api_key
          .clone()
          .filter(|k| !k.trim().is_empty())
          .ok_or_else(|| {
            error!("No API key for Gemini");
            Error::MissingApiKey("Gemini".to_string())
          })?;

        let http_client = reqwest::Client::builder()
          .timeout(config.timeout())
          .build()
          .map_err(|e| {
            error!("Failed to build HTTP client: {}", e);
            Error::InvalidConfiguration(e.to_string())
          })?;

        Ok(GeminiClient
        {   api_key
          , api_base: config.api_base().to_string()
          , http_client
        })
    }

    pub fn endpoint(&self, model: &str) -> String
    {   format!("{}/models/{}:generateContent", self.api_base, model)
    }
}

impl std::fmt::Debug for GeminiClient
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.debug_struct("GeminiClient")
          .field("api_base", &self.api_base)
          .finish_non_exhaustive()
    }
}

#[async_trait]
impl TextGenerator for GeminiClient
{   async fn generate_text(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<Option<String>, Error>
    {   let request = GenerateContentRequest::from_prompt(prompt);
        trace!("Gemini request for {}: {:?}", model, request);

        let response = self.http_client
          .post(self.endpoint(model))
          .header("x-goog-api-key", &self.api_key)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            if e.is_timeout()
            {   Error::Timeout
            } else
            {   Error::HttpError(e.to_string())
            }
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS
        {   return Err(Error::RateLimitExceeded);
        }

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(Error::ApiError(
              format!("Gemini {}: {}", status, error_text)
            ));
        }

        let body: GenerateContentResponse
          = response.json().await.map_err(|e| {
            Error::ParseError(e.to_string())
          })?;

        if let Some(reason) = body.candidates
          .first()
          .and_then(|c| c.finish_reason.as_deref())
        {   trace!("Gemini finish reason: {}", reason);
        }

        Ok(body.text())
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;
    use tokio_test::{assert_err, assert_ok};

    fn config_with_key(key: Option<&str>) -> TutorConfig
    {   TutorConfig
        {   api_key: key.map(str::to_string)
          , ..TutorConfig::default()
        }
    }

    #[test]
    fn test_request_body_shape()
    {   let body = serde_json::to_value(
          GenerateContentRequest::from_prompt("hello")
        ).unwrap();
        assert_eq!(
          body
        , serde_json::json!({
            "contents": [
              { "role": "user", "parts": [ { "text": "hello" } ] }
            ]
          })
        );
    }

    #[test]
    fn test_response_text_joins_parts()
    {   let body: GenerateContentResponse = serde_json::from_str(
          r#"{ "candidates": [ { "content": { "role": "model",
               "parts": [ { "text": "Hello, " }, { "text": "world" } ] },
               "finishReason": "STOP" } ] }"#
        ).unwrap();
        assert_eq!(body.text().as_deref(), Some("Hello, world"));
        assert_eq!(
          body.candidates[0].finish_reason.as_deref()
        , Some("STOP")
        );
    }

    #[test]
    fn test_response_without_text()
    {   let empty: GenerateContentResponse
          = serde_json::from_str("{}").unwrap();
        assert!(empty.text().is_none());

        let blocked: GenerateContentResponse = serde_json::from_str(
          r#"{ "candidates": [ { "finishReason": "SAFETY" } ] }"#
        ).unwrap();
        assert!(blocked.text().is_none());
    }

    #[tokio::test]
    async fn test_client_requires_key()
    {   let err = assert_err!(GeminiClient::new(&config_with_key(None)));
        assert_eq!(err, Error::MissingApiKey("Gemini".to_string()));
        assert_err!(GeminiClient::new(&config_with_key(Some("  "))));
    }

    #[tokio::test]
    async fn test_endpoint()
    {   let client = assert_ok!(
          GeminiClient::new(&config_with_key(Some("k")))
        );
        assert_eq!(
          client.endpoint("gemini-2.5-flash")
        , "https://generativelanguage.googleapis.com/v1beta\
           /models/gemini-2.5-flash:generateContent"
        );
    }

    // ===== Local HTTP stub =====

    /// Read one request: headers, then `content-length` body bytes
    async fn read_request(socket: &mut TcpStream) -> String
    {   let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop
        {   let n = socket.read(&mut chunk).await.unwrap();
            if n == 0
            {   break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(end) = buf
              .windows(4)
              .position(|w| w == b"\r\n\r\n")
            {   let head = String::from_utf8_lossy(&buf[..end])
                  .to_lowercase();
                let body_len = head
                  .lines()
                  .find_map(|l| l.strip_prefix("content-length:"))
                  .and_then(|v| v.trim().parse::<usize>().ok())
                  .unwrap_or(0);
                if buf.len() >= end + 4 + body_len
                {   break;
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    /// Serve one canned response; the handle yields the raw request
    async fn serve_once(
      status: &'static str
    , body: &'static str
    ) -> (GeminiClient, JoinHandle<String>)
    {   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
          let (mut socket, _) = listener.accept().await.unwrap();
          let request = read_request(&mut socket).await;
          let response = format!(
            "HTTP/1.1 {}\r\n\
             content-type: application/json\r\n\
             content-length: {}\r\n\
             connection: close\r\n\r\n{}"
          , status
          , body.len()
          , body
          );
          socket.write_all(response.as_bytes()).await.unwrap();
          let _ = socket.shutdown().await;
          request
        });
        let client = GeminiClient::new(&TutorConfig
        {   api_key: Some("test-key".to_string())
          , api_base: Some(format!("http://{}", addr))
          , timeout_secs: Some(5)
        }).unwrap();
        (client, handle)
    }

    #[tokio::test]
    async fn test_generate_sends_model_key_and_prompt()
    {   let (client, server) = serve_once(
          "200 OK"
        , r#"{ "candidates": [ { "content":
             { "parts": [ { "text": "Hi there" } ] } } ] }"#
        ).await;

        let text = assert_ok!(
          client.generate_text("gemini-2.5-flash", "Say hi").await
        );
        assert_eq!(text.as_deref(), Some("Hi there"));

        let request = server.await.unwrap();
        assert!(request.starts_with(
          "POST /models/gemini-2.5-flash:generateContent HTTP/1.1"
        ));
        assert!(request.to_lowercase().contains("x-goog-api-key: test-key"));
        assert!(request.contains(r#""text":"Say hi""#));
    }

    #[tokio::test]
    async fn test_rate_limit_status()
    {   let (client, _server) = serve_once(
          "429 Too Many Requests"
        , r#"{ "error": { "code": 429 } }"#
        ).await;

        let err = assert_err!(client.generate_text("m", "p").await);
        assert_eq!(err, Error::RateLimitExceeded);
        assert_eq!(err.category(), crate::error::ErrorCategory::Quota);
    }

    #[tokio::test]
    async fn test_server_error_status()
    {   let (client, _server) = serve_once(
          "500 Internal Server Error"
        , r#"{ "error": "backend exploded" }"#
        ).await;

        let err = assert_err!(client.generate_text("m", "p").await);
        match err
        {   Error::ApiError(msg) => {
              assert!(msg.contains("500"), "{}", msg);
              assert!(msg.contains("backend exploded"), "{}", msg);
            }
          , other => panic!("expected ApiError, got {:?}", other)
        }
    }

    #[tokio::test]
    async fn test_malformed_body()
    {   let (client, _server) = serve_once("200 OK", "not json").await;

        let err = assert_err!(client.generate_text("m", "p").await);
        assert!(matches!(err, Error::ParseError(_)), "{:?}", err);
    }

    #[tokio::test]
    async fn test_empty_candidates()
    {   let (client, _server)
          = serve_once("200 OK", r#"{ "candidates": [] }"#).await;

        let text = assert_ok!(client.generate_text("m", "p").await);
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn test_silent_server_times_out()
    {   let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
          let (mut socket, _) = listener.accept().await.unwrap();
          read_request(&mut socket).await;
          // hold the connection open without answering
          tokio::time::sleep(std::time::Duration::from_secs(30)).await;
          drop(socket);
        });
        let client = GeminiClient::new(&TutorConfig
        {   api_key: Some("test-key".to_string())
          , api_base: Some(format!("http://{}", addr))
          , timeout_secs: Some(1)
        }).unwrap();

        let err = assert_err!(client.generate_text("m", "p").await);
        assert_eq!(err, Error::Timeout);
    }
}
