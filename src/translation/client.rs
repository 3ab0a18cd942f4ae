/*!
 * Translation client contract.
 *
 * A `TranslationClient` performs exactly one backend call per method. The
 * pipeline drives it through the retry policy and owns every decision
 * about batching, context and persistence; implementations only have to
 * turn an option bundle into a request and a response into strings.
 */

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderError;

/// Configuration passed with every batch translation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateOptions {
    /// Model identifier
    pub model: String,
    /// System prompt; empty means the client's default
    pub custom_prompt: String,
    /// Joined context buffer
    pub previous_context: String,
    /// Work tags, empty when tags are disabled
    pub tags: Vec<String>,
    /// Guidance on how to use the tags
    pub tag_instruction: String,
    /// Glossary or style guide
    pub glossary: String,
}

/// One refinement call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefineRequest {
    pub original: String,
    pub current_translation: String,
    pub target_lang: String,
    pub fandom: String,
    pub model: String,
    pub instruction: String,
    /// Template with `{{original}}`-style placeholders
    pub template: String,
}

/// A backend able to translate text
#[async_trait]
pub trait TranslationClient: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Translate `texts` in order; the result must have the same length
    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        fandom: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError>;

    /// Produce a replacement translation for one block
    async fn refine(&self, request: &RefineRequest) -> Result<String, ProviderError>;

    /// Name the fandom of a text sample
    async fn identify_fandom(&self, sample: &str, model: &str) -> Result<String, ProviderError>;

    /// Draft a glossary of names and terms for a fandom
    async fn generate_glossary(&self, fandom: &str, target_lang: &str, model: &str) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: TranslationClient + ?Sized> TranslationClient for std::sync::Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        target_lang: &str,
        fandom: &str,
        options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        (**self).translate_batch(texts, target_lang, fandom, options).await
    }

    async fn refine(&self, request: &RefineRequest) -> Result<String, ProviderError> {
        (**self).refine(request).await
    }

    async fn identify_fandom(&self, sample: &str, model: &str) -> Result<String, ProviderError> {
        (**self).identify_fandom(sample, model).await
    }

    async fn generate_glossary(&self, fandom: &str, target_lang: &str, model: &str) -> Result<String, ProviderError> {
        (**self).generate_glossary(fandom, target_lang, model).await
    }
}

/// Passthrough backend: every translation is the source text itself
///
/// Used for the `original` target language, where the reader wants the
/// document laid out block by block without a model in the loop.
#[derive(Debug, Clone, Default)]
pub struct PassthroughClient;

#[async_trait]
impl TranslationClient for PassthroughClient {
    fn name(&self) -> &str {
        "original"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        _target_lang: &str,
        _fandom: &str,
        _options: &TranslateOptions,
    ) -> Result<Vec<String>, ProviderError> {
        Ok(texts.to_vec())
    }

    async fn refine(&self, request: &RefineRequest) -> Result<String, ProviderError> {
        Ok(request.current_translation.clone())
    }

    async fn identify_fandom(&self, _sample: &str, _model: &str) -> Result<String, ProviderError> {
        Ok(super::prompts::GENERIC_FANDOM.to_string())
    }

    async fn generate_glossary(&self, _fandom: &str, _target_lang: &str, _model: &str) -> Result<String, ProviderError> {
        Ok(String::new())
    }
}
