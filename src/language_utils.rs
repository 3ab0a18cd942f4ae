use anyhow::{anyhow, Result};
use isolang::Language;

/// Language utilities for target language tags
///
/// Target languages are ISO 639 codes optionally followed by a region or
/// script subtag (`zh-CN`, `pt-BR`, `sr-Latn`). The special value `original`
/// keeps the source text and never reaches a translation backend.

/// Target language that copies the original text
pub const ORIGINAL_LANGUAGE: &str = "original";

/// Language code type of the primary subtag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T or 639-3 (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
    /// The `original` passthrough mode
    Original,
}

/// ISO 639-2/B codes that differ from their 639-2/T counterpart
const PART2B_CODES: [(&str, &str); 18] = [
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Whether `code` selects the passthrough mode
pub fn is_original(code: &str) -> bool {
    code.trim().eq_ignore_ascii_case(ORIGINAL_LANGUAGE)
}

/// Lowercased language part of a tag (`zh-CN` -> `zh`)
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

fn subtags_are_wellformed(code: &str) -> bool {
    code.trim()
        .split(['-', '_'])
        .skip(1)
        .all(|subtag| (2..=8).contains(&subtag.len()) && subtag.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Validate a target language tag
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    if is_original(code) {
        return Ok(LanguageCodeType::Original);
    }
    if !subtags_are_wellformed(code) {
        return Err(anyhow!("Invalid language code: {}", code));
    }

    let primary = primary_subtag(code);
    match primary.len() {
        2 if Language::from_639_1(&primary).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&primary).is_some() => Ok(LanguageCodeType::Part2T),
        3 if PART2B_CODES.iter().any(|(b, _)| *b == primary) => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize the primary subtag to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let primary = primary_subtag(code);

    if primary.len() == 2 {
        if let Some(lang) = Language::from_639_1(&primary) {
            return Ok(lang.to_639_3().to_string());
        }
    } else if primary.len() == 3 {
        if Language::from_639_3(&primary).is_some() {
            return Ok(primary);
        }
        if let Some((_, t)) = PART2B_CODES.iter().find(|(b, _)| *b == primary) {
            return Ok(t.to_string());
        }
    }

    Err(anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Check if two tags name the same language, ignoring region subtags
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Human readable name used in prompts (`zh-CN` -> `Chinese (CN)`)
pub fn get_language_name(code: &str) -> Result<String> {
    if is_original(code) {
        return Ok("Original".to_string());
    }

    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    let region: Vec<&str> = code.trim().split(['-', '_']).skip(1).collect();
    if region.is_empty() {
        Ok(lang.to_name().to_string())
    } else {
        Ok(format!("{} ({})", lang.to_name(), region.join("-")))
    }
}
