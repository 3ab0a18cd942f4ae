/*!
 * Scripted translation clients for testing
 *
 * `ScriptedClient` replays a queue of batch responses in order and records
 * every request, so tests can assert on exactly what the scheduler sent.
 * Once the script runs out it echoes the input with a `[lang]` prefix.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use fictrans::errors::ProviderError;
use fictrans::translation::{RefineRequest, TranslateOptions, TranslationClient};

/// One scripted batch response
#[derive(Debug, Clone)]
pub enum Scripted {
    /// Translate every text normally
    Echo,
    /// Return exactly these strings
    Texts(Vec<String>),
    Fail(ProviderError),
}

/// A request as the client received it
#[derive(Debug, Clone)]
pub struct BatchCall {
    pub texts: Vec<String>,
    pub options: TranslateOptions,
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedClient {
    script: Arc<Mutex<VecDeque<Scripted>>>,
    calls: Arc<Mutex<Vec<BatchCall>>>,
    refine_result: Arc<Mutex<Option<Result<String, ProviderError>>>>,
    glossary_result: Arc<Mutex<Option<Result<String, ProviderError>>>>,
    delay: Duration,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_script(responses: Vec<Scripted>) -> Self {
        let client = Self::new();
        client.script.lock().extend(responses);
        client
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_refine_result(&self, result: Result<String, ProviderError>) {
        *self.refine_result.lock() = Some(result);
    }

    pub fn set_glossary_result(&self, result: Result<String, ProviderError>) {
        *self.glossary_result.lock() = Some(result);
    }

    pub fn calls(&self) -> Vec<BatchCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

pub fn overloaded() -> ProviderError {
    ProviderError::ApiError {
        status_code: 503,
        message: "The model is overloaded".to_string(),
    }
}

pub fn bad_request() -> ProviderError {
    ProviderError::ApiError {
        status_code: 400,
        message: "Invalid argument".to_string(),
    }
}

#[async_trait]
impl TranslationClient for ScriptedClient {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        _fandom: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        self.calls.lock().push(BatchCall {
            texts: texts.to_vec(),
            options: options.clone(),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let next = self.script.lock().pop_front().unwrap_or(Scripted::Echo);
        match next {
            Scripted::Echo => Ok(texts.iter().map(|t| format!("[{}] {}", target_lang, t)).collect()),
            Scripted::Texts(texts) => Ok(texts),
            Scripted::Fail(error) => Err(error),
        }
    }

    async fn refine(&self, request: &RefineRequest) -> Result<String, ProviderError> {
        match self.refine_result.lock().clone() {
            Some(result) => result,
            None => Ok(format!("{} (refined)", request.current_translation)),
        }
    }

    async fn identify_fandom(&self, _sample: &str, _model: &str) -> Result<String, ProviderError> {
        Ok("Scripted Fandom".to_string())
    }

    async fn generate_glossary(&self, fandom: &str, target_lang: &str, _model: &str) -> Result<String, ProviderError> {
        match self.glossary_result.lock().clone() {
            Some(result) => result,
            None => Ok(format!("{}: {} glossary", fandom, target_lang)),
        }
    }
}
