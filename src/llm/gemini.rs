use eventsource_stream::Eventsource;
use log::debug;
use serde_json::json;
use tokio_stream::StreamExt;

use crate::llm::provider::{ChatStream, LlmProvider, Message, ProviderError, Role, default_client};

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Client for the Gemini REST API (`generateContent` /
/// `streamGenerateContent`).
#[derive(Debug, Clone)]
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl GeminiProvider {
    pub fn new(api_key: String, model: String, temperature: f32, max_tokens: u32) -> Self {
        Self {
            client: default_client(),
            api_key,
            model,
            temperature,
            max_tokens,
        }
    }

    fn request_body(&self, messages: &[Message]) -> serde_json::Value {
        let (system, contents) = split_contents(messages);

        let mut body = json!({
            "contents": contents,
            "generationConfig": {
                "temperature": self.temperature,
                "maxOutputTokens": self.max_tokens,
            },
        });

        if let Some(system) = system {
            body["systemInstruction"] = json!({ "parts": [{ "text": system }] });
        }

        body
    }

    async fn send(
        &self,
        messages: &[Message],
        method: &str,
        query: &str,
    ) -> Result<reqwest::Response, ProviderError> {
        let url = format!(
            "{}/{}:{}?{}key={}",
            GEMINI_ENDPOINT, self.model, method, query, self.api_key
        );
        debug!("gemini {} request (model: {})", method, self.model);

        let response = self
            .client
            .post(&url)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                provider: "gemini",
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let body: serde_json::Value = self
            .send(messages, "generateContent", "")
            .await?
            .json()
            .await?;

        let content = candidate_text(&body).ok_or_else(|| ProviderError::Malformed {
            provider: "gemini",
            detail: "missing candidates[0].content.parts[0].text".into(),
        })?;

        if content.is_empty() {
            return Err(ProviderError::Empty("gemini"));
        }

        Ok(content)
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, ProviderError> {
        let response = self
            .send(messages, "streamGenerateContent", "alt=sse&")
            .await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .filter_map(|event| match event {
                Ok(event) => parse_sse_data(&event.data),
                Err(e) => Some(Err(ProviderError::Malformed {
                    provider: "gemini",
                    detail: e.to_string(),
                })),
            });

        Ok(Box::pin(stream))
    }
}

/// Split a conversation into the optional system instruction and the
/// Gemini `contents` array. Gemini has no system role and calls the
/// assistant role "model".
fn split_contents(messages: &[Message]) -> (Option<String>, Vec<serde_json::Value>) {
    let mut system = None;
    let mut contents = Vec::with_capacity(messages.len());

    for message in messages {
        match message.role {
            Role::System if system.is_none() => system = Some(message.content.clone()),
            Role::System => {
                // Extra system messages fold into the conversation as user turns.
                contents.push(json!({ "role": "user", "parts": [{ "text": message.content }] }));
            }
            Role::User => {
                contents.push(json!({ "role": "user", "parts": [{ "text": message.content }] }));
            }
            Role::Assistant => {
                contents.push(json!({ "role": "model", "parts": [{ "text": message.content }] }));
            }
        }
    }

    (system, contents)
}

fn candidate_text(body: &serde_json::Value) -> Option<String> {
    body.get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.get(0))
        .and_then(|p| p.get("text"))
        .and_then(|t| t.as_str())
        .map(str::to_string)
}

fn parse_sse_data(data: &str) -> Option<Result<String, ProviderError>> {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(Err(ProviderError::Malformed {
                provider: "gemini",
                detail: e.to_string(),
            }));
        }
    };

    match candidate_text(&value) {
        Some(text) if !text.is_empty() => Some(Ok(text)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_message_becomes_instruction() {
        let messages = [
            Message::system("be terse"),
            Message::user("hello"),
            Message::assistant("hi"),
            Message::user("bye"),
        ];

        let (system, contents) = split_contents(&messages);
        assert_eq!(system.as_deref(), Some("be terse"));
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[0]["role"], "user");
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[2]["parts"][0]["text"], "bye");
    }

    #[test]
    fn candidate_text_walks_response() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "tailored" }] } }]
        });
        assert_eq!(candidate_text(&body).as_deref(), Some("tailored"));
        assert!(candidate_text(&json!({ "candidates": [] })).is_none());
    }

    #[test]
    fn sse_chunk_yields_text() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"chunk"}]}}]}"#;
        assert_eq!(parse_sse_data(data).unwrap().unwrap(), "chunk");
        // finish chunks carry no parts
        assert!(parse_sse_data(r#"{"candidates":[{"finishReason":"STOP"}]}"#).is_none());
    }

    #[test]
    fn request_body_carries_generation_config() {
        let provider = GeminiProvider::new("key".into(), "gemini-2.0-flash".into(), 0.3, 4000);
        let body = provider.request_body(&[Message::system("s"), Message::user("u")]);

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "s");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 4000);
        assert_eq!(body["contents"][0]["role"], "user");
    }
}
