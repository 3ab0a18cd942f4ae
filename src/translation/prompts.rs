/*!
 * Prompt templates for literary translation.
 *
 * The pipeline itself never talks to a model; these helpers exist so that
 * every `TranslationClient` implementation builds the same prompts from
 * the same option bundle.
 */

use super::client::TranslateOptions;

/// Default system prompt for batch translation
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a professional literary translator specializing in Fanfiction.
Maintain the character's voice, tone, and narrative style.
Use fandom-specific terminology correctly.
Optimize typography for reading comfort.";

/// Default refinement template
pub const DEFAULT_REFINE_TEMPLATE: &str = r#"You are a professional editor.
Task: specific improvement of a translation segment.

Context:
Fandom: {{fandom}}
Target Language: {{targetLang}}

Source:
{{original}}

Current Draft:
{{translated}}

Instruction:
{{instruction}}

Requirements:
1. Output ONLY the result.
2. Do not include "Here is the translation".
3. If the instruction asks to re-translate, ignore the Current Draft."#;

/// Default guidance sent alongside the work's tags
pub const DEFAULT_TAG_INSTRUCTION: &str =
    "Use tags to understand context; translate only if they appear in text.";

/// System instruction used with the refinement template
pub const REFINE_SYSTEM_INSTRUCTION: &str = "You are a professional literary translator and editor.
Your task is to REWRITE the \"Current Draft\" based on the \"User Instruction\".
If the User Instruction asks for a translation or correction, output ONLY the final corrected text.
Do not output explanation. Do not output markdown code fences.";

/// Fallback fandom name when identification fails
pub const GENERIC_FANDOM: &str = "General";

/// Longest sample sent for fandom identification, in characters
pub const FANDOM_SAMPLE_LIMIT: usize = 1000;

/// Values substituted into a refinement template
#[derive(Debug, Clone, Copy)]
pub struct RefineVars<'a> {
    pub original: &'a str,
    pub translated: &'a str,
    pub target_lang: &'a str,
    pub fandom: &'a str,
    pub instruction: &'a str,
}

/// Interpolate a refinement template; an empty template uses the default
pub fn render_refine_prompt(template: &str, vars: RefineVars<'_>) -> String {
    let template = if template.trim().is_empty() {
        DEFAULT_REFINE_TEMPLATE
    } else {
        template
    };

    template
        .replace("{{original}}", vars.original)
        .replace("{{translated}}", vars.translated)
        .replace("{{targetLang}}", vars.target_lang)
        .replace("{{fandom}}", vars.fandom)
        .replace("{{instruction}}", vars.instruction)
}

/// Build the full prompt for one translation window
pub fn build_batch_prompt(
    texts: &[String],
    target_lang: &str,
    fandom: &str,
    options: &TranslateOptions,
) -> String {
    let system = if options.custom_prompt.trim().is_empty() {
        DEFAULT_SYSTEM_PROMPT
    } else {
        options.custom_prompt.as_str()
    };

    let mut prompt = format!("{}\n\nTarget Language: {}\nFandom Context: {}\n", system, target_lang, fandom);

    if !options.tags.is_empty() {
        prompt.push_str(&format!("Work Tags/Keywords: {}\n", options.tags.join(", ")));
        if !options.tag_instruction.is_empty() {
            prompt.push_str(&format!("Instruction for Tags: {}\n", options.tag_instruction));
        }
    }

    if !options.glossary.trim().is_empty() {
        prompt.push_str(&format!("Glossary / Style Guide:\n{}\n", options.glossary));
    }

    if !options.previous_context.is_empty() {
        prompt.push_str(&format!(
            "\nCONTEXT FROM PREVIOUS SECTION (For continuity only, DO NOT TRANSLATE THIS):\n\"{}\"\n",
            options.previous_context
        ));
    }

    let input = serde_json::to_string(texts).unwrap_or_else(|_| "[]".to_string());
    prompt.push_str(&format!(
        "\nTask: Translate the following array of text blocks.\n\n\
         Guidelines:\n\
         1. Output MUST be a JSON array of strings, with exactly corresponding indices to the input.\n\
         2. Ensure narrative flow connects smoothly with the context provided.\n\n\
         Input Blocks:\n{}\n",
        input
    ));

    prompt
}

/// Prompt asking a model to name the fandom of a text sample
pub fn build_fandom_prompt(sample: &str) -> String {
    format!(
        "Analyze the following text sample from a fanfiction. Identify the \"Fandom\" \
         (the original work, show, book, or game it is based on). Return ONLY the name of \
         the fandom. If unknown, return \"{}\".\n\nText: \"{}...\"",
        GENERIC_FANDOM,
        truncate_chars(sample, FANDOM_SAMPLE_LIMIT)
    )
}

/// Prompt asking a model for a glossary of a fandom's names and terms
pub fn build_glossary_prompt(fandom: &str, target_lang: &str) -> String {
    format!(
        "Task: Create a concise glossary for the fandom \"{}\".\n\
         Target Language: {}\n\n\
         Include:\n\
         1. Key Character Names (Original -> Translated)\n\
         2. Specific Terminology / Jargon (Original -> Translated)\n\
         3. Location Names\n\n\
         Output Format:\n\
         Original Term: Translated Term (Brief Note if needed)\n\n\
         Keep it strictly relevant to translation and helpful for maintaining consistency. \
         Do not output conversational text.",
        fandom, target_lang
    )
}

/// Strip a surrounding markdown code fence from model output
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Cut a string to at most `limit` characters on a char boundary
pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}
