/*!
 * Fingerprint-based block merging.
 *
 * Blocks are matched across re-parses by a normalized form of their source
 * text. Matching is content keyed, so insertions, deletions and reordering
 * in the refreshed document are tolerated. The output always follows the
 * new document's order and keeps the new blocks' ids; `follow_block` maps
 * an old id (such as the bookmark) onto its successor.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::project::{Block, BlockType};

static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Normalized source text used as a cross-version lookup key
pub fn fingerprint(text: &str) -> String {
    WHITESPACE_RUN.replace_all(&text.trim().to_lowercase(), " ").into_owned()
}

/// Percentage of old text blocks whose fingerprint survives in `new`
pub fn similarity(old: &[Block], new: &[Block]) -> u8 {
    let old_text: Vec<&Block> = old.iter().filter(|b| b.block_type == BlockType::Text).collect();
    if old_text.is_empty() {
        return 0;
    }

    let new_keys: HashSet<String> = new
        .iter()
        .filter(|b| b.block_type == BlockType::Text)
        .map(|b| fingerprint(&b.original))
        .collect();

    let preserved = old_text
        .iter()
        .filter(|b| new_keys.contains(&fingerprint(&b.original)))
        .count();

    ((100.0 * preserved as f64) / old_text.len() as f64).round() as u8
}

/// A merged block and the position in the old list its state came from
#[derive(Debug, Clone, PartialEq)]
pub struct MergedBlock {
    pub block: Block,
    pub source: Option<usize>,
}

/// Carry user state from `old` onto the matching blocks of `new`
///
/// Only old blocks with user state (a translation, a favorite, a note, or
/// a header role) are candidates. A matched block takes `translated`,
/// `is_edited`, `is_favorite`, `note` and `block_type` from its match and
/// keeps everything else from the new block. The result is not chapter
/// indexed.
///
/// Repeated fingerprints are paired by occurrence: the k-th new copy
/// takes the k-th old copy, so merging a list with itself is the identity.
pub fn merge(old: &[Block], new: &[Block]) -> Vec<Block> {
    merge_tracked(old, new).into_iter().map(|m| m.block).collect()
}

/// `merge`, also reporting which old block each result was matched to
pub fn merge_tracked(old: &[Block], new: &[Block]) -> Vec<MergedBlock> {
    let mut old_by_key: HashMap<String, Vec<(usize, &Block)>> = HashMap::new();
    for (position, block) in old.iter().enumerate() {
        old_by_key
            .entry(fingerprint(&block.original))
            .or_default()
            .push((position, block));
    }

    let new_keys: Vec<String> = new.iter().map(|b| fingerprint(&b.original)).collect();
    let mut new_counts: HashMap<&str, usize> = HashMap::new();
    for key in &new_keys {
        *new_counts.entry(key.as_str()).or_default() += 1;
    }

    let mut seen: HashMap<&str, usize> = HashMap::new();
    new.iter()
        .zip(&new_keys)
        .map(|(block, key)| {
            let occurrence = seen.entry(key.as_str()).or_default();
            let k = *occurrence;
            *occurrence += 1;

            let matched = old_by_key
                .get(key)
                .and_then(|copies| pick_match(copies, k, new_counts[key.as_str()]));

            match matched {
                Some((position, source)) => MergedBlock {
                    block: carry_state(block, source),
                    source: Some(position),
                },
                None => MergedBlock {
                    block: block.clone(),
                    source: None,
                },
            }
        })
        .collect()
}

/// Id of the merged block that takes over from the old block `old_id`
///
/// Old blocks without user state are never merge sources; those follow
/// their fingerprint, paired by occurrence like `merge` does.
pub fn follow_block(old: &[Block], merged: &[MergedBlock], old_id: &str) -> Option<String> {
    let position = old.iter().position(|b| b.id == old_id)?;
    if let Some(found) = merged.iter().find(|m| m.source == Some(position)) {
        return Some(found.block.id.clone());
    }

    let key = fingerprint(&old[position].original);
    let occurrence = old[..position]
        .iter()
        .filter(|b| fingerprint(&b.original) == key)
        .count();
    let candidates: Vec<&MergedBlock> = merged
        .iter()
        .filter(|m| fingerprint(&m.block.original) == key)
        .collect();

    candidates
        .get(occurrence)
        .or(candidates.last())
        .map(|m| m.block.id.clone())
}

type Candidate<'a> = (usize, &'a Block);

fn pick_match<'a>(copies: &[Candidate<'a>], k: usize, new_count: usize) -> Option<Candidate<'a>> {
    let last_significant = copies.iter().rev().find(|(_, b)| b.has_user_state()).copied();

    if new_count >= copies.len() {
        match copies.get(k) {
            Some(paired) if paired.1.has_user_state() => Some(*paired),
            Some(_) => None,
            None => last_significant,
        }
    } else {
        copies
            .iter()
            .filter(|(_, b)| b.has_user_state())
            .nth(k)
            .copied()
            .or(last_significant)
    }
}

fn carry_state(new: &Block, old: &Block) -> Block {
    Block {
        translated: old.translated.clone(),
        is_edited: old.is_edited,
        is_favorite: old.is_favorite,
        note: old.note.clone(),
        block_type: old.block_type,
        ..new.clone()
    }
}
