use futures::TryStreamExt;
use log::debug;
use serde_json::json;
use tokio::io::AsyncBufReadExt;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;
use tokio_util::io::StreamReader;

use crate::llm::provider::{ChatStream, LlmProvider, Message, ProviderError, default_client};

/// Client for a local Ollama inference server, talking to `/api/chat`
/// directly over HTTP.
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    temperature: f32,
}

impl OllamaProvider {
    pub fn new(base_url: &str, model: String, temperature: f32) -> Self {
        Self {
            client: default_client(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            temperature,
        }
    }

    fn request_body(&self, messages: &[Message], stream: bool) -> serde_json::Value {
        json!({
            "model": self.model,
            "messages": messages,
            "stream": stream,
            "options": { "temperature": self.temperature },
        })
    }

    async fn send(
        &self,
        messages: &[Message],
        stream: bool,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        debug!("ollama request to {} (model: {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(messages, stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: "ollama",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

impl LlmProvider for OllamaProvider {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let body: serde_json::Value = self.send(messages, false).await?.json().await?;

        let content = body
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .ok_or_else(|| ProviderError::Malformed {
                provider: "ollama",
                detail: "missing message.content".into(),
            })?;

        if content.is_empty() {
            return Err(ProviderError::Empty("ollama"));
        }

        Ok(content.to_string())
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, ProviderError> {
        let response = self.send(messages, true).await?;

        // Streamed responses are NDJSON, one chunk object per line.
        let bytes = Box::pin(response.bytes_stream().map_err(std::io::Error::other));
        let lines = LinesStream::new(tokio::io::BufReader::new(StreamReader::new(bytes)).lines());

        let stream = lines.filter_map(|line| match line {
            Ok(line) => parse_chunk_line(&line),
            Err(e) => Some(Err(ProviderError::Malformed {
                provider: "ollama",
                detail: e.to_string(),
            })),
        });

        Ok(Box::pin(stream))
    }
}

/// Decode one NDJSON chunk line into a text delta. Lines with no content
/// (keep-alives, the final `done` summary) yield nothing.
fn parse_chunk_line(line: &str) -> Option<Result<String, ProviderError>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let value: serde_json::Value = match serde_json::from_str(line) {
        Ok(v) => v,
        Err(e) => {
            return Some(Err(ProviderError::Malformed {
                provider: "ollama",
                detail: e.to_string(),
            }));
        }
    };

    if let Some(err) = value.get("error").and_then(|e| e.as_str()) {
        return Some(Err(ProviderError::Malformed {
            provider: "ollama",
            detail: err.to_string(),
        }));
    }

    let content = value
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or_default();

    if content.is_empty() {
        None
    } else {
        Some(Ok(content.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::Role;

    #[test]
    fn chunk_line_yields_content() {
        let line = r#"{"message":{"role":"assistant","content":"hel"},"done":false}"#;
        let chunk = parse_chunk_line(line).unwrap().unwrap();
        assert_eq!(chunk, "hel");
    }

    #[test]
    fn final_done_line_is_skipped() {
        let line = r#"{"message":{"role":"assistant","content":""},"done":true,"eval_count":42}"#;
        assert!(parse_chunk_line(line).is_none());
        assert!(parse_chunk_line("").is_none());
    }

    #[test]
    fn error_line_surfaces() {
        let err = parse_chunk_line(r#"{"error":"model not found"}"#)
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }

    #[test]
    fn garbage_line_is_malformed() {
        assert!(parse_chunk_line("not json").unwrap().is_err());
    }

    #[test]
    fn request_body_shape() {
        let provider = OllamaProvider::new("http://localhost:11434/", "llama3.1:8b".into(), 0.3);
        assert_eq!(provider.base_url, "http://localhost:11434");

        let body = provider.request_body(&[Message::user("hi")], false);
        assert_eq!(body["model"], "llama3.1:8b");
        assert_eq!(body["stream"], false);
        assert_eq!(body["messages"][0]["role"], "user");
        let temperature = body["options"]["temperature"].as_f64().unwrap();
        assert!((temperature - 0.3).abs() < 1e-6);
        assert_eq!(Message::system("s").role, Role::System);
    }
}
