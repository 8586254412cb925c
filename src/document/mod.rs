//! Text buffers handed to the language service, and the byte-offset
//! machinery shared by every later stage.
mod line_index;
pub mod splitter;

pub use line_index::LineIndex;
pub use splitter::{DocumentSegment, split};

use tower_lsp::lsp_types::{Position, Range, Url};

/// Half-open byte range `[start, end)` into a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextRange {
    pub start: usize,
    pub end: usize,
}

impl TextRange {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "inverted range {start}..{end}");
        Self { start, end }
    }

    pub fn empty(at: usize) -> Self {
        Self { start: at, end: at }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// End-inclusive containment, so a cursor sitting just after a token
    /// still belongs to it.
    pub fn touches(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    pub fn contains_range(&self, other: TextRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn shifted(self, by: usize) -> Self {
        Self {
            start: self.start + by,
            end: self.end + by,
        }
    }
}

/// An immutable text buffer together with the URI it was loaded from.
#[derive(Debug, Clone)]
pub struct TextDocument {
    pub uri: Url,
    pub version: i32,
    pub text: String,
}

impl TextDocument {
    pub fn new(uri: Url, version: i32, text: impl Into<String>) -> Self {
        Self {
            uri,
            version,
            text: text.into(),
        }
    }

    pub fn line_index(&self) -> LineIndex<'_> {
        LineIndex::new(&self.text)
    }

    pub fn position_at(&self, offset: usize) -> Position {
        self.line_index().position_at(offset)
    }

    pub fn offset_at(&self, position: Position) -> usize {
        self.line_index().offset_at(position)
    }

    pub fn range_of(&self, range: TextRange) -> Range {
        self.line_index().range_of(range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_touches_is_end_inclusive() {
        let range = TextRange::new(4, 7);
        assert!(range.touches(4));
        assert!(range.touches(7));
        assert!(!range.touches(3));
        assert!(!range.touches(8));
    }

    #[test]
    fn test_document_offsets_round_trip() {
        let uri = Url::parse("file:///tmp/test.yaml").unwrap();
        let doc = TextDocument::new(uri, 0, "name: jack\nage: 22\n");
        let offset = doc.text.find("age").unwrap();
        let position = doc.position_at(offset);
        assert_eq!(position, Position::new(1, 0));
        assert_eq!(doc.offset_at(position), offset);
    }
}
