use std::sync::{Arc, Mutex};

use crate::llm::provider::{ChatStream, LlmProvider, Message, ProviderError, Role};

/// Offline provider returning deterministic canned YAML. Never performs I/O;
/// used for tests and for dry-running the pipeline without an inference
/// backend.
#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
    responses: Arc<Mutex<Vec<String>>>,
    fail: bool,
    fail_when: Option<String>,
}

impl MockProvider {
    pub fn new(model: String) -> Self {
        Self {
            model,
            responses: Arc::new(Mutex::new(Vec::new())),
            fail: false,
            fail_when: None,
        }
    }

    /// Script the next responses; once the queue drains, canned responses
    /// take over again.
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::new("mock".into())
        }
    }

    /// Fail every chat call.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new("mock".into())
        }
    }

    /// Fail only when the last message contains `needle`; everything else
    /// answers normally. Lets a batch test break exactly one job.
    pub fn failing_when(needle: impl Into<String>) -> Self {
        Self {
            fail_when: Some(needle.into()),
            ..Self::new("mock".into())
        }
    }

    fn canned(&self, prompt: &str) -> String {
        if prompt.contains("company name and the job title") {
            return "```yaml\ncompany: \"Mock Industries\"\nrole: \"Software Engineer\"\n```"
                .to_string();
        }

        if prompt.contains("keywords") {
            return "keywords:\n  - Rust\n  - Go\n  - Kubernetes\n  - PostgreSQL\n  - Distributed Systems"
                .to_string();
        }

        if prompt.contains("highlights") {
            return "highlights:\n  - \"Led migration of 20+ services to Kubernetes, cutting deploy time by 60%\"\n  - \"Reduced API latency by 40% with Redis caching in Go\""
                .to_string();
        }

        if prompt.contains("skill categories") {
            return "skills:\n  - label: \"Languages\"\n    details: \"Go, Rust, Python\"\n  - label: \"Infrastructure\"\n    details: \"Kubernetes, PostgreSQL, Terraform\""
                .to_string();
        }

        if prompt.contains("professional summary") {
            return "summary:\n  - \"Backend engineer with 6+ years of experience building distributed systems in Go and Rust.\""
                .to_string();
        }

        format!("mock response from {}", self.model)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn chat(&self, messages: &[Message]) -> Result<String, ProviderError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        if self.fail {
            return Err(ProviderError::Empty("mock"));
        }
        if let Some(needle) = &self.fail_when
            && prompt.contains(needle.as_str())
        {
            return Err(ProviderError::Empty("mock"));
        }

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(self.canned(prompt))
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, ProviderError> {
        let response = self.chat(messages).await?;
        let chunks: Vec<_> = response
            .split_inclusive('\n')
            .map(|chunk| Ok(chunk.to_string()))
            .collect();

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
