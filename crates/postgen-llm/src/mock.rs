//! Scripted backend for tests and offline demos.
//!
//! Replays a fixed sequence of steps, or echoes the prompt word by word.

use crate::streaming::Delta;
use crate::traits::{ChatClient, ChatRequest, ChatResponse, DeltaStream};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted upstream unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Text(String),
    /// Role-only / metadata chunk with no text
    Empty,
    /// Upstream error at this point of the stream
    Fail(String),
}

#[derive(Debug, Clone)]
enum Script {
    Fixed(Vec<Step>),
    Echo,
}

pub struct ScriptedClient {
    script: Script,
    open_error: Option<String>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Script::Fixed(steps),
            open_error: None,
            delay: Duration::ZERO,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn from_texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Step::Text((*t).to_string())).collect())
    }

    /// Echo the last user message back, one word per delta
    pub fn echo() -> Self {
        Self {
            script: Script::Echo,
            ..Self::new(Vec::new())
        }
    }

    /// Fail before any delta is produced (auth, connection)
    pub fn failing_on_open(message: impl Into<String>) -> Self {
        Self {
            open_error: Some(message.into()),
            ..Self::new(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    fn open(&self, request: &ChatRequest) -> Result<Vec<Step>> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content().to_string())
            .unwrap_or_default();

        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.clone());
        }

        if let Some(message) = &self.open_error {
            anyhow::bail!("{}", message);
        }

        Ok(match &self.script {
            Script::Fixed(steps) => steps.clone(),
            Script::Echo => echo_steps(&prompt),
        })
    }
}

fn echo_steps(prompt: &str) -> Vec<Step> {
    let mut steps = vec![Step::Empty];
    for (i, word) in prompt.split_whitespace().enumerate() {
        let text = if i == 0 {
            word.to_string()
        } else {
            format!(" {}", word)
        };
        steps.push(Step::Text(text));
    }
    steps
}

#[async_trait]
impl ChatClient for ScriptedClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let mut content = String::new();
        for step in self.open(&request)? {
            match step {
                Step::Text(text) => content.push_str(&text),
                Step::Empty => {}
                Step::Fail(message) => anyhow::bail!("{}", message),
            }
        }

        Ok(ChatResponse {
            content: Some(content),
            finish_reason: Some("stop".to_string()),
        })
    }

    async fn chat_stream(&self, request: ChatRequest) -> Result<DeltaStream> {
        let steps = self.open(&request)?;
        let delay = self.delay;

        Ok(Box::pin(async_stream::stream! {
            for step in steps {
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                match step {
                    Step::Text(text) => yield Ok(Delta::text(text)),
                    Step::Empty => yield Ok(Delta::default()),
                    Step::Fail(message) => yield Err(anyhow::anyhow!(message)),
                }
            }
        }))
    }
}
