/*!
 * Chapter indexing.
 *
 * Header blocks open a new chapter, except when the header is the very
 * first block of the document (that one is the work's title).
 */

use super::model::{Block, BlockType};

/// Renumber chapters and return the updated blocks
pub fn reindex(mut blocks: Vec<Block>) -> Vec<Block> {
    reindex_in_place(&mut blocks);
    blocks
}

/// Renumber chapters without reallocating
pub fn reindex_in_place(blocks: &mut [Block]) {
    let mut chapter = 0;
    for (position, block) in blocks.iter_mut().enumerate() {
        if block.block_type == BlockType::Header && position > 0 {
            chapter += 1;
        }
        block.chapter_index = chapter;
    }
}

/// Index of the first block of every chapter, in order
pub fn chapter_starts(blocks: &[Block]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut current = None;
    for (position, block) in blocks.iter().enumerate() {
        if current != Some(block.chapter_index) {
            starts.push(position);
            current = Some(block.chapter_index);
        }
    }
    starts
}
