// Scripted provider for exercising the fallback chain without a network.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::AiError;
use crate::traits::{Message, ModelNaming, TextProvider};

/// Replays a queue of canned outcomes; once the queue is drained the last
/// outcome repeats. Clones share call counters.
#[derive(Clone)]
pub struct ScriptedProvider {
    name: String,
    naming: ModelNaming,
    script: Arc<Mutex<VecDeque<Result<String, String>>>>,
    last: Arc<Mutex<Result<String, String>>>,
    delay: Option<Duration>,
    models: Arc<Mutex<Vec<String>>>,
    prompts: Arc<Mutex<Vec<Vec<Message>>>>,
}

impl ScriptedProvider {
    pub fn new(name: &str, naming: ModelNaming, outcomes: Vec<Result<String, String>>) -> Self {
        let last = outcomes
            .last()
            .cloned()
            .unwrap_or_else(|| Err("no script".to_string()));
        Self {
            name: name.to_string(),
            naming,
            script: Arc::new(Mutex::new(outcomes.into())),
            last: Arc::new(Mutex::new(last)),
            delay: None,
            models: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn replying(name: &str, naming: ModelNaming, reply: &str) -> Self {
        Self::new(name, naming, vec![Ok(reply.to_string())])
    }

    pub fn failing(name: &str, naming: ModelNaming) -> Self {
        Self::new(name, naming, vec![Err(format!("{name} unavailable"))])
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.models.lock().unwrap().len()
    }

    pub fn models_seen(&self) -> Vec<String> {
        self.models.lock().unwrap().clone()
    }

    /// Messages of every call, in order.
    pub fn prompts(&self) -> Vec<Vec<Message>> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model_naming(&self) -> ModelNaming {
        self.naming
    }

    async fn generate(
        &self,
        messages: &[Message],
        model: &str,
        _max_tokens: u32,
        _temperature: f32,
    ) -> Result<String, AiError> {
        self.models.lock().unwrap().push(model.to_string());
        self.prompts.lock().unwrap().push(messages.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.script.lock().unwrap().pop_front() {
            Some(outcome) => outcome,
            None => self.last.lock().unwrap().clone(),
        };
        outcome.map_err(|body| AiError::Api { status: 503, body })
    }
}
