/*!
 * Deterministic mock translation client.
 *
 * Backs the CLI's `mock` backend (dry runs without a model) and the test
 * suites. Behaviors:
 * - `MockClient::working()` - prefixes every text with `[<target>] `
 * - `MockClient::failing()` - always answers 503
 * - `MockClient::flaky(n)` - answers 503 for the first `n` calls, then works
 * - `MockClient::permanent()` - always answers 400
 * - `MockClient::wrong_length()` - drops the last text of every batch
 * - `MockClient::fail_on_call(n)` - answers 400 on the n-th call (1-based)
 *
 * Every request is rendered with the same prompt builders a model-backed
 * client uses; the rendered prompts are recorded and logged at trace level
 * so a dry run shows exactly what would have been sent.
 */

use async_trait::async_trait;
use log::trace;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::ProviderError;
use crate::translation::client::{RefineRequest, TranslateOptions, TranslationClient};
use crate::translation::prompts::{
    build_batch_prompt, build_fandom_prompt, build_glossary_prompt, render_refine_prompt, RefineVars,
    REFINE_SYSTEM_INSTRUCTION,
};

/// Behavior mode for the mock client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    Working,
    /// Transient failure on every call
    Failing,
    /// Transient failure for the first `failures` calls
    Flaky { failures: usize },
    /// Non-retryable failure on every call
    Permanent,
    /// Non-retryable failure on one call, success otherwise
    FailOnCall { call: usize },
    /// Returns one translation too few
    WrongLength,
}

/// A batch as the mock received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBatch {
    pub texts: Vec<String>,
    pub target_lang: String,
    pub fandom: String,
    pub options: TranslateOptions,
}

/// A rendered prompt as a model would have received it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPrompt {
    /// Separate system instruction, if the call carries one
    pub system: Option<String>,
    pub body: String,
}

/// Mock client with shared call accounting
#[derive(Debug, Clone)]
pub struct MockClient {
    behavior: MockBehavior,
    delay: Duration,
    calls: Arc<AtomicUsize>,
    batches: Arc<Mutex<Vec<RecordedBatch>>>,
    prompts: Arc<Mutex<Vec<RecordedPrompt>>>,
}

impl MockClient {
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            calls: Arc::new(AtomicUsize::new(0)),
            batches: Arc::new(Mutex::new(Vec::new())),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn flaky(failures: usize) -> Self {
        Self::new(MockBehavior::Flaky { failures })
    }

    pub fn permanent() -> Self {
        Self::new(MockBehavior::Permanent)
    }

    pub fn fail_on_call(call: usize) -> Self {
        Self::new(MockBehavior::FailOnCall { call })
    }

    pub fn wrong_length() -> Self {
        Self::new(MockBehavior::WrongLength)
    }

    /// Simulate latency on every call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of calls received, successful or not
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every batch received, in order
    pub fn batches(&self) -> Vec<RecordedBatch> {
        self.batches.lock().clone()
    }

    /// Every prompt rendered, in call order
    pub fn prompts(&self) -> Vec<RecordedPrompt> {
        self.prompts.lock().clone()
    }

    fn record_prompt(&self, system: Option<&str>, body: String) {
        trace!("mock prompt:\n{}", body);
        self.prompts.lock().push(RecordedPrompt {
            system: system.map(str::to_string),
            body,
        });
    }

    /// The deterministic translation of one text
    pub fn translate_text(text: &str, target_lang: &str) -> String {
        format!("[{}] {}", target_lang, text)
    }

    /// Count the call and decide whether it fails
    async fn begin_call(&self) -> Result<(), ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.behavior {
            MockBehavior::Failing => Err(unavailable(call)),
            MockBehavior::Flaky { failures } if call <= failures => Err(unavailable(call)),
            MockBehavior::Permanent => Err(rejected(call)),
            MockBehavior::FailOnCall { call: failing } if call == failing => Err(rejected(call)),
            _ => Ok(()),
        }
    }
}

fn unavailable(call: usize) -> ProviderError {
    ProviderError::ApiError {
        status_code: 503,
        message: format!("Simulated overload (request #{})", call),
    }
}

fn rejected(call: usize) -> ProviderError {
    ProviderError::ApiError {
        status_code: 400,
        message: format!("Simulated invalid request (request #{})", call),
    }
}

#[async_trait]
impl TranslationClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        fandom: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        self.batches.lock().push(RecordedBatch {
            texts: texts.to_vec(),
            target_lang: target_lang.to_string(),
            fandom: fandom.to_string(),
            options: options.clone(),
        });
        self.record_prompt(None, build_batch_prompt(texts, target_lang, fandom, options));
        self.begin_call().await?;

        let mut translated: Vec<String> =
            texts.iter().map(|t| Self::translate_text(t, target_lang)).collect();
        if self.behavior == MockBehavior::WrongLength {
            translated.pop();
        }
        Ok(translated)
    }

    async fn refine(&self, request: &RefineRequest) -> Result<String, ProviderError> {
        let vars = RefineVars {
            original: &request.original,
            translated: &request.current_translation,
            target_lang: &request.target_lang,
            fandom: &request.fandom,
            instruction: &request.instruction,
        };
        self.record_prompt(Some(REFINE_SYSTEM_INSTRUCTION), render_refine_prompt(&request.template, vars));
        self.begin_call().await?;
        Ok(format!(
            "[{}] {} ({})",
            request.target_lang, request.current_translation, request.instruction
        ))
    }

    async fn identify_fandom(&self, sample: &str, _model: &str) -> Result<String, ProviderError> {
        self.record_prompt(None, build_fandom_prompt(sample));
        self.begin_call().await?;
        Ok("Mock Fandom".to_string())
    }

    async fn generate_glossary(&self, fandom: &str, target_lang: &str, _model: &str) -> Result<String, ProviderError> {
        self.record_prompt(None, build_glossary_prompt(fandom, target_lang));
        self.begin_call().await?;
        Ok(format!("{}: {} ({})", fandom, fandom, target_lang))
    }
}
