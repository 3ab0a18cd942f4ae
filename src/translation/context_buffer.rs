/*!
 * Rolling context buffer.
 *
 * A bounded FIFO of the most recent source texts, handed to the backend
 * with every window so consecutive batches read as one narrative.
 */

use std::collections::VecDeque;

use crate::project::Block;

/// Largest context window accepted
pub const MAX_CONTEXT_WINDOW: usize = 10;

/// Bounded FIFO of recent original texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextBuffer {
    capacity: usize,
    entries: VecDeque<String>,
}

impl ContextBuffer {
    /// Create an empty buffer; the capacity is clamped to `[0, 10]`
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.min(MAX_CONTEXT_WINDOW);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Build a buffer from every block that already has a translation
    pub fn bootstrap(capacity: usize, blocks: &[Block]) -> Self {
        let mut buffer = Self::new(capacity);
        buffer.extend(blocks.iter().filter(|b| b.is_translated()).map(|b| b.original.as_str()));
        buffer
    }

    /// Append one text, dropping from the front past the bound
    pub fn push(&mut self, text: &str) {
        if self.capacity == 0 {
            return;
        }
        self.entries.push_back(text.to_string());
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    pub fn extend<'a>(&mut self, texts: impl IntoIterator<Item = &'a str>) {
        for text in texts {
            self.push(text);
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Buffered texts, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Texts joined with newlines, as sent to the backend
    pub fn joined(&self) -> String {
        self.entries().collect::<Vec<_>>().join("\n")
    }
}
