use super::TextRange;
use tower_lsp::lsp_types::{Position, Range};

/// Maps byte offsets to LSP positions (zero-based line, UTF-16 character)
/// and back.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    text: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(idx, _)| idx + 1),
        );

        Self { text, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    pub fn position_at(&self, offset: usize) -> Position {
        let offset = self.clamp(offset);
        let line = self.line_starts.partition_point(|start| *start <= offset) - 1;
        let line_start = self.line_starts[line];
        let character = self.text[line_start..offset].encode_utf16().count();

        Position::new(line as u32, character as u32)
    }

    pub fn offset_at(&self, position: Position) -> usize {
        let line = position.line as usize;
        if line >= self.line_starts.len() {
            return self.text.len();
        }

        let line_start = self.line_starts[line];
        let line_end = self
            .line_starts
            .get(line + 1)
            .map(|next| next - 1)
            .unwrap_or(self.text.len());

        let mut remaining = position.character as usize;
        for (idx, ch) in self.text[line_start..line_end].char_indices() {
            if remaining == 0 {
                return line_start + idx;
            }
            remaining = remaining.saturating_sub(ch.len_utf16());
        }

        line_end
    }

    pub fn range_of(&self, range: TextRange) -> Range {
        Range::new(self.position_at(range.start), self.position_at(range.end))
    }

    fn clamp(&self, offset: usize) -> usize {
        let mut offset = offset.min(self.text.len());
        while !self.text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }
}
