use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Completion, Provider, Usage};

/// A mock provider that returns pre-configured responses for testing and
/// records what it was asked.
pub struct MockProvider {
    responses: Mutex<Vec<Result<Completion, String>>>,
    calls: Mutex<Vec<(Vec<Message>, Vec<Tool>)>>,
}

impl MockProvider {
    pub fn new(responses: Vec<Completion>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// A provider whose every call fails with `error`.
    pub fn failing(error: &str) -> Self {
        Self {
            responses: Mutex::new(vec![Err(error.to_string())]),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn text(reply: &str) -> Self {
        Self::new(vec![Completion::Text(reply.to_string())])
    }

    pub fn calls(&self) -> Vec<(Vec<Message>, Vec<Tool>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<(Completion, Usage)> {
        self.calls
            .lock()
            .unwrap()
            .push((messages.to_vec(), tools.to_vec()));

        let mut responses = self.responses.lock().unwrap();
        match responses.first() {
            // A failing provider keeps failing
            Some(Err(e)) => Err(anyhow!(e.clone())),
            Some(Ok(_)) => {
                let completion = responses.remove(0).map_err(|e| anyhow!(e))?;
                Ok((completion, Usage::default()))
            }
            None => Ok((Completion::Text(String::new()), Usage::default())),
        }
    }
}
