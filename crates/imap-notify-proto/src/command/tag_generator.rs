//! Command tag generator.

use crate::types::Tag;

/// Generates sequential tags: `A0001`, `A0002`, ...
///
/// Owned by a single codec, so a plain counter is enough. Past `A9999` the
/// number simply grows wider; tags stay unique.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    counter: u64,
    prefix: char,
}

impl TagGenerator {
    /// Creates a generator with the given prefix.
    #[must_use]
    pub const fn new(prefix: char) -> Self {
        Self { counter: 0, prefix }
    }

    /// Produces the next tag.
    pub fn next_tag(&mut self) -> Tag {
        self.counter += 1;
        Tag(format!("{}{:04}", self.prefix, self.counter))
    }

    /// Number of tags handed out so far.
    #[must_use]
    pub const fn issued(&self) -> u64 {
        self.counter
    }
}

impl Default for TagGenerator {
    fn default() -> Self {
        Self::new('A')
    }
}
