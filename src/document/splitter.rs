//! Splits a buffer into YAML documents at `---` boundary lines.

use super::TextRange;

/// One YAML document inside a multi-document buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentSegment<'a> {
    pub start_offset: usize,
    pub end_offset: usize,
    pub raw_text: &'a str,
    /// Boundary line (including its line break) that opened this segment.
    pub marker: Option<TextRange>,
}

impl DocumentSegment<'_> {
    pub fn range(&self) -> TextRange {
        TextRange::new(self.start_offset, self.end_offset)
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.range().touches(offset)
    }

    pub fn is_blank(&self) -> bool {
        self.raw_text
            .lines()
            .map(str::trim)
            .all(|line| line.is_empty() || line.starts_with('#'))
    }
}

/// Partition `text` into document segments. Never fails: malformed input only
/// moves the boundaries, and everything else is left to the tree builder.
pub fn split(text: &str) -> Vec<DocumentSegment<'_>> {
    let mut segments = Vec::new();
    let mut segment_start = 0;
    let mut marker = None;
    let mut block_scalar_indent: Option<usize> = None;
    let mut line_start = 0;

    for line in text.split_inclusive('\n') {
        let line_end = line_start + line.len();
        let content = line.trim_end_matches(['\n', '\r']);
        let indent = indentation(content);

        if let Some(parent_indent) = block_scalar_indent {
            if content.trim().is_empty() || indent > parent_indent {
                line_start = line_end;
                continue;
            }
            block_scalar_indent = None;
        }

        if is_document_marker(content) {
            segments.push(DocumentSegment {
                start_offset: segment_start,
                end_offset: line_start,
                raw_text: &text[segment_start..line_start],
                marker,
            });
            marker = Some(TextRange::new(line_start, line_end));
            segment_start = line_end;
        } else if opens_block_scalar(content) {
            block_scalar_indent = Some(indent);
        }

        line_start = line_end;
    }

    segments.push(DocumentSegment {
        start_offset: segment_start,
        end_offset: text.len(),
        raw_text: &text[segment_start..],
        marker,
    });

    segments
}

/// Index of the segment owning `offset`. Offsets on a boundary line belong to
/// no segment.
pub fn segment_at(segments: &[DocumentSegment<'_>], offset: usize) -> Option<usize> {
    segments.iter().position(|segment| {
        segment.contains(offset)
            && !segment
                .marker
                .is_some_and(|marker| marker.start <= offset && offset < marker.end)
    })
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

fn is_document_marker(line: &str) -> bool {
    let trimmed = line.trim();
    match trimmed.strip_prefix("---") {
        Some(rest) => {
            rest.is_empty()
                || (rest.starts_with(char::is_whitespace) && rest.trim_start().starts_with('#'))
        }
        None => false,
    }
}

/// True when the line ends with a literal (`|`) or folded (`>`) block scalar
/// header, e.g. `key: |-`, `- >2` or `script: | # comment`.
fn opens_block_scalar(line: &str) -> bool {
    let code = strip_comment(line).trim_end();
    let header_start = code
        .rfind(|ch: char| ch == '|' || ch == '>')
        .filter(|idx| {
            code[idx + 1..]
                .chars()
                .all(|ch| ch.is_ascii_digit() || ch == '+' || ch == '-')
        });

    let Some(idx) = header_start else {
        return false;
    };

    let before = code[..idx].trim_end();
    before.is_empty()
        || before.ends_with(':')
        || before.ends_with('-')
        || before.ends_with('?')
        || before
            .rsplit(char::is_whitespace)
            .next()
            .is_some_and(|token| token.starts_with('!') || token.starts_with('&'))
}

fn strip_comment(line: &str) -> &str {
    let mut in_single = false;
    let mut in_double = false;
    let mut previous = ' ';

    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single && previous != '\\' => in_double = !in_double,
            '#' if !in_single && !in_double && previous.is_whitespace() => {
                return &line[..idx];
            }
            _ => {}
        }
        previous = ch;
    }

    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(text: &str, segments: &[DocumentSegment<'_>]) -> String {
        let mut out = String::new();
        for segment in segments {
            if let Some(marker) = segment.marker {
                out.push_str(&text[marker.start..marker.end]);
            }
            out.push_str(segment.raw_text);
        }
        out
    }

    #[test]
    fn test_single_document_without_markers() {
        let text = "name: jack\nage: 22\n";
        let segments = split(text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].raw_text, text);
        assert_eq!(segments[0].range(), TextRange::new(0, text.len()));
        assert!(segments[0].marker.is_none());
    }

    #[test]
    fn test_two_documents() {
        let text = "name: jack\nage: 22\n---\nanalytics: true";
        let segments = split(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].raw_text, "name: jack\nage: 22\n");
        assert_eq!(segments[1].raw_text, "analytics: true");
        assert_eq!(segments[1].marker, Some(TextRange::new(19, 23)));
        assert_eq!(segments[1].start_offset, 23);
    }

    #[test]
    fn test_leading_marker_yields_empty_first_segment() {
        let segments = split("---\na: 1\n");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].raw_text, "");
        assert!(segments[0].is_blank());
        assert_eq!(segments[1].raw_text, "a: 1\n");
    }

    #[test]
    fn test_trailing_marker_yields_empty_segment() {
        let text = "a: 1\n---";
        let segments = split(text);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[1].raw_text, "");
        assert_eq!(segments[1].start_offset, text.len());
    }

    #[test]
    fn test_marker_with_whitespace_and_comment() {
        let segments = split("a: 1\n  ---  \nb: 2\n--- # next\nc: 3\n");
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].raw_text, "c: 3\n");
    }

    #[test]
    fn test_marker_with_content_is_not_a_boundary() {
        let segments = split("a: 1\n---x\n");
        assert_eq!(segments.len(), 1);
    }

    #[test]
    fn test_marker_inside_block_scalar_is_ignored() {
        let text = "script: |\n  echo start\n  ---\n  echo end\nother: 1\n---\nb: 2\n";
        let segments = split(text);
        assert_eq!(segments.len(), 2);
        assert!(segments[0].raw_text.contains("echo end"));
        assert_eq!(segments[1].raw_text, "b: 2\n");
    }

    #[test]
    fn test_block_scalar_ends_at_dedent() {
        let text = "text: >-\n  folded\n---\nb: 2\n";
        assert_eq!(split(text).len(), 2);
    }

    #[test]
    fn test_pipe_inside_value_does_not_open_block() {
        assert!(!opens_block_scalar("cmd: a | b"));
        assert!(!opens_block_scalar("cmd: 'x |'"));
        assert!(opens_block_scalar("cmd: |"));
        assert!(opens_block_scalar("- >+"));
        assert!(opens_block_scalar("cmd: !Sub | # literal"));
    }

    #[test]
    fn test_split_is_lossless() {
        let inputs = [
            "",
            "---",
            "---\n",
            "a: 1\r\n---\r\nb: 2\r\n",
            "\nname: jack\nage: 22\n---\nanalytics: true\n            ",
            "x: |\n  ---\n---\n---\n",
        ];
        for text in inputs {
            let segments = split(text);
            assert_eq!(reconstruct(text, &segments), text, "input {text:?}");
        }
    }

    #[test]
    fn test_segment_at_skips_marker_lines() {
        let text = "a: 1\n---\nb: 2";
        let segments = split(text);
        assert_eq!(segment_at(&segments, 0), Some(0));
        assert_eq!(segment_at(&segments, 6), None);
        assert_eq!(segment_at(&segments, 10), Some(1));
    }
}
