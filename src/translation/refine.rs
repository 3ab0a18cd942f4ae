/*!
 * Single-block refinement, fandom identification and glossary drafting.
 *
 * All three calls are best effort. A failed refinement leaves the block's
 * current translation in place and reports `RefineOutcome::FellBack`, so
 * the reader keeps working text while the host can still surface the
 * failure. A failed identification yields the generic fandom name, and a
 * failed glossary request yields an empty string.
 */

use log::{debug, warn};

use super::client::{RefineRequest, TranslationClient};
use super::prompts::{strip_code_fence, truncate_chars, FANDOM_SAMPLE_LIMIT, GENERIC_FANDOM};
use crate::errors::{ProviderError, TranslationError};
use crate::project::{BlockType, Project};

/// Number of leading blocks sampled for fandom identification
pub const FANDOM_SAMPLE_BLOCKS: usize = 3;

/// Result of a refinement request
#[derive(Debug, Clone, PartialEq)]
pub enum RefineOutcome {
    /// The block now holds the refined text
    Refined { text: String },
    /// The backend failed; the previous translation was kept
    FellBack { error: ProviderError },
}

impl RefineOutcome {
    pub fn is_refined(&self) -> bool {
        matches!(self, RefineOutcome::Refined { .. })
    }
}

/// Refine one block's translation following a free-form instruction
pub async fn refine_block(
    client: &dyn TranslationClient,
    project: &mut Project,
    block_id: &str,
    instruction: &str,
) -> Result<RefineOutcome, TranslationError> {
    if instruction.trim().is_empty() {
        return Err(TranslationError::InvalidRequest("refinement instruction is empty".into()));
    }
    if project.metadata.model.trim().is_empty() {
        return Err(TranslationError::Configuration("no model id configured".into()));
    }

    let request = {
        let block = project
            .block(block_id)
            .ok_or_else(|| TranslationError::InvalidRequest(format!("unknown block {}", block_id)))?;
        if block.block_type == BlockType::Separator {
            return Err(TranslationError::InvalidRequest("separators cannot be refined".into()));
        }

        RefineRequest {
            original: block.original.clone(),
            current_translation: block.translated.clone(),
            target_lang: project.metadata.target_language.clone(),
            fandom: project.metadata.fandom.clone(),
            model: project.metadata.model.clone(),
            instruction: instruction.to_string(),
            template: project.metadata.refine_prompt_template.clone(),
        }
    };

    if let Some(block) = project.block_mut(block_id) {
        block.is_loading = true;
    }

    let result = client.refine(&request).await;

    let outcome = match result {
        Ok(text) => {
            let cleaned = strip_code_fence(&text);
            if cleaned.is_empty() {
                debug!("Refinement of block {} returned nothing, keeping current text", block_id);
                RefineOutcome::FellBack {
                    error: ProviderError::ParseError("empty refinement".into()),
                }
            } else {
                RefineOutcome::Refined { text: cleaned.to_string() }
            }
        }
        Err(error) => {
            warn!("Refinement of block {} failed, keeping current text: {}", block_id, error);
            RefineOutcome::FellBack { error }
        }
    };

    match &outcome {
        RefineOutcome::Refined { text } => {
            project.update_translation(block_id, text);
        }
        RefineOutcome::FellBack { .. } => {
            if let Some(block) = project.block_mut(block_id) {
                block.is_loading = false;
            }
        }
    }

    Ok(outcome)
}

/// Text sample used to identify a work's fandom
pub fn fandom_sample(project: &Project) -> String {
    let joined = project
        .blocks
        .iter()
        .take(FANDOM_SAMPLE_BLOCKS)
        .map(|b| b.original.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    truncate_chars(&joined, FANDOM_SAMPLE_LIMIT).to_string()
}

/// Ask the backend for the fandom, falling back to the generic name
pub async fn identify_fandom(client: &dyn TranslationClient, project: &Project, model: &str) -> String {
    let sample = fandom_sample(project);
    if sample.trim().is_empty() {
        return GENERIC_FANDOM.to_string();
    }

    match client.identify_fandom(&sample, model).await {
        Ok(name) if !name.trim().is_empty() => name.trim().to_string(),
        Ok(_) => GENERIC_FANDOM.to_string(),
        Err(error) => {
            warn!("Fandom identification failed: {}", error);
            GENERIC_FANDOM.to_string()
        }
    }
}

/// Draft a glossary for the project's fandom; empty when the backend fails
pub async fn generate_glossary(client: &dyn TranslationClient, project: &Project) -> String {
    let metadata = &project.metadata;
    match client
        .generate_glossary(&metadata.fandom, &metadata.target_language, &metadata.model)
        .await
    {
        Ok(text) => strip_code_fence(&text).to_string(),
        Err(error) => {
            warn!("Glossary generation failed: {}", error);
            String::new()
        }
    }
}
