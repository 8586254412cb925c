//! Builds [`SyntaxTree`]s from `yaml-rust2` marked events.

use super::scalar::{resolve_core_tagged, resolve_plain, scalar_end};
use super::{CustomTags, NodeId, NodeKind, NodeShape, ScalarValue, Slot, SyntaxNode, SyntaxTree};
use crate::document::{DocumentSegment, TextRange};
use std::collections::HashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser, Tag};
use yaml_rust2::scanner::{Marker, TScalarStyle};

const CORE_TAG_PREFIX: &str = "tag:yaml.org,2002:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// The scanner or parser gave up; the tree is partial.
    Parse,
    DuplicateKey,
    /// A declared custom tag was applied to a node of another kind.
    TagKind,
    /// A second document started inside the segment (`--- value` or `...`).
    ExtraDocument,
}

impl SyntaxErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            SyntaxErrorKind::Parse => "parseError",
            SyntaxErrorKind::DuplicateKey => "duplicateKey",
            SyntaxErrorKind::TagKind => "customTagKind",
            SyntaxErrorKind::ExtraDocument => "extraDocument",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub range: TextRange,
    pub message: String,
}

/// The outcome of parsing one document segment. Parsing never fails outright:
/// problems are reported in `errors` next to whatever tree could be built.
#[derive(Debug, Clone, Default)]
pub struct ParsedDocument {
    pub tree: SyntaxTree,
    pub errors: Vec<SyntaxError>,
}

pub fn parse(segment: &DocumentSegment<'_>, custom_tags: &CustomTags) -> ParsedDocument {
    parse_text(segment.raw_text, segment.start_offset, custom_tags)
}

/// Parse `text`, reporting ranges shifted by `base` so they address the
/// original buffer.
pub fn parse_text(text: &str, base: usize, custom_tags: &CustomTags) -> ParsedDocument {
    let mut builder = TreeBuilder::new(text, base, custom_tags);
    let mut parser = Parser::new_from_str(text);

    if let Err(err) = parser.load(&mut builder, true) {
        let offset = builder.offsets.byte(err.marker().index());
        tracing::debug!(offset = base + offset, "YAML parse error: {}", err.info());
        // Errors past an extra document start are covered by that report.
        if builder.extra_document.is_none() {
            builder.fail(offset, err.info());
        }
    }

    builder.finish()
}

/// Converts the parser's character indices into byte offsets.
enum CharOffsets {
    Ascii(usize),
    Mapped(Vec<usize>),
}

impl CharOffsets {
    fn new(text: &str) -> Self {
        if text.is_ascii() {
            CharOffsets::Ascii(text.len())
        } else {
            let mut offsets: Vec<usize> = text.char_indices().map(|(idx, _)| idx).collect();
            offsets.push(text.len());
            CharOffsets::Mapped(offsets)
        }
    }

    fn byte(&self, char_index: usize) -> usize {
        match self {
            CharOffsets::Ascii(len) => char_index.min(*len),
            CharOffsets::Mapped(offsets) => offsets
                .get(char_index)
                .or_else(|| offsets.last())
                .copied()
                .unwrap_or(0),
        }
    }
}

/// A collection still receiving children.
struct Frame {
    id: NodeId,
    anchor: usize,
    flow: bool,
    pending_key: Option<NodeId>,
    keys: HashMap<String, NodeId>,
    tag_error: Option<String>,
}

struct TagResolution {
    kind: NodeKind,
    name: Option<String>,
    core_suffix: Option<String>,
    mismatch: Option<String>,
}

struct TreeBuilder<'a> {
    source: &'a str,
    base: usize,
    offsets: CharOffsets,
    custom_tags: &'a CustomTags,
    tree: SyntaxTree,
    stack: Vec<Frame>,
    anchors: HashMap<usize, NodeId>,
    errors: Vec<SyntaxError>,
    documents: usize,
    /// Offset where a second document began; later events are ignored.
    extra_document: Option<usize>,
}

impl<'a> TreeBuilder<'a> {
    fn new(source: &'a str, base: usize, custom_tags: &'a CustomTags) -> Self {
        Self {
            source,
            base,
            offsets: CharOffsets::new(source),
            custom_tags,
            tree: SyntaxTree::default(),
            stack: Vec::new(),
            anchors: HashMap::new(),
            errors: Vec::new(),
            documents: 0,
            extra_document: None,
        }
    }

    fn finish(mut self) -> ParsedDocument {
        while let Some(frame) = self.stack.pop() {
            self.close(frame, None);
        }
        self.errors.sort_by_key(|error| error.range.start);

        ParsedDocument {
            tree: self.tree,
            errors: self.errors,
        }
    }

    fn fail(&mut self, offset: usize, message: &str) {
        let start = self.base + offset.min(self.source.len());
        self.errors.push(SyntaxError {
            kind: SyntaxErrorKind::Parse,
            range: TextRange::new(start, self.base + self.source.len()),
            message: message.to_string(),
        });
    }

    fn on_document_start(&mut self, marker: Marker) {
        self.documents += 1;
        if self.documents < 2 {
            return;
        }

        let offset = self.offsets.byte(marker.index());
        self.extra_document = Some(offset);
        self.errors.push(SyntaxError {
            kind: SyntaxErrorKind::ExtraDocument,
            range: TextRange::new(self.base + offset, self.base + self.source.len()),
            message: "Only one document is read here. Put the next document after its own `---` line."
                .to_string(),
        });
    }

    fn resolve_tag(&self, tag: Option<Tag>, shape: NodeShape) -> TagResolution {
        let mut resolution = TagResolution {
            kind: shape.into(),
            name: None,
            core_suffix: None,
            mismatch: None,
        };

        let Some(tag) = tag else {
            return resolution;
        };

        if tag.handle == "!!" || tag.handle == CORE_TAG_PREFIX {
            resolution.name = Some(format!("!!{}", tag.suffix));
            resolution.core_suffix = Some(tag.suffix);
            return resolution;
        }

        let name = if tag.handle == "!" {
            format!("!{}", tag.suffix)
        } else {
            format!("{}{}", tag.handle, tag.suffix)
        };

        match self.custom_tags.kinds(&name) {
            Some(kinds) if kinds.contains(&shape) => {}
            Some(kinds) => {
                let expected: Vec<String> = kinds.iter().map(ToString::to_string).collect();
                resolution.kind = NodeKind::Tagged;
                resolution.mismatch = Some(format!(
                    "Custom tag {} expects a {} value, found a {}",
                    name,
                    expected.join(" or "),
                    shape
                ));
            }
            None => resolution.kind = NodeKind::Tagged,
        }
        resolution.name = Some(name);
        resolution
    }

    /// Link a freshly created node into the innermost open collection.
    fn attach(&mut self, mut node: SyntaxNode) -> NodeId {
        let Some(frame) = self.stack.last_mut() else {
            node.slot = Slot::Root;
            let id = self.tree.push(node);
            if self.tree.root.is_none() {
                self.tree.root = Some(id);
            }
            return id;
        };

        let parent = frame.id;
        let parent_shape = self.tree.node(parent).shape;
        node.parent = Some(parent);

        let id = match parent_shape {
            NodeShape::Mapping => match frame.pending_key.take() {
                None => {
                    node.slot = Slot::Key { value: None };
                    let duplicate_name = (node.shape == NodeShape::Scalar && node.alias_of.is_none())
                        .then(|| node.text.clone());
                    let range = node.range;
                    let id = self.tree.push(node);
                    frame.pending_key = Some(id);

                    if let Some(name) = duplicate_name {
                        if frame.keys.contains_key(&name) {
                            self.errors.push(SyntaxError {
                                kind: SyntaxErrorKind::DuplicateKey,
                                range,
                                message: "Map keys must be unique".to_string(),
                            });
                        } else {
                            frame.keys.insert(name, id);
                        }
                    }
                    id
                }
                Some(key) => {
                    node.slot = Slot::Value { key };
                    let id = self.tree.push(node);
                    self.tree.node_mut(key).slot = Slot::Key { value: Some(id) };
                    id
                }
            },
            NodeShape::Sequence | NodeShape::Scalar => {
                node.slot = Slot::Item {
                    index: self.tree.node(parent).children.len(),
                };
                self.tree.push(node)
            }
        };

        self.tree.node_mut(parent).children.push(id);
        id
    }

    fn open(&mut self, shape: NodeShape, anchor: usize, tag: Option<Tag>, marker: Marker) {
        let start = self.offsets.byte(marker.index());
        let opener = if shape == NodeShape::Mapping { '{' } else { '[' };
        let flow = self.source[start..].starts_with(opener);
        let resolution = self.resolve_tag(tag, shape);

        let id = self.attach(SyntaxNode {
            kind: resolution.kind,
            shape,
            range: TextRange::empty(self.base + start),
            value: None,
            text: String::new(),
            tag: resolution.name,
            parent: None,
            children: Vec::new(),
            slot: Slot::Root,
            alias_of: None,
        });

        self.stack.push(Frame {
            id,
            anchor,
            flow,
            pending_key: None,
            keys: HashMap::new(),
            tag_error: resolution.mismatch,
        });
    }

    /// Finish a collection. `marker` is the closing event's position, absent
    /// when the parser stopped early.
    fn close(&mut self, frame: Frame, marker: Option<Marker>) {
        if let Some(key) = frame.pending_key {
            // Recovery: a key whose value never arrived gets an implicit null.
            let mut value = null_scalar(TextRange::empty(self.tree.node(key).range.end));
            value.parent = Some(frame.id);
            value.slot = Slot::Value { key };
            let id = self.tree.push(value);
            self.tree.node_mut(key).slot = Slot::Key { value: Some(id) };
            self.tree.node_mut(frame.id).children.push(id);
        }

        let node = self.tree.node(frame.id);
        // Block mappings are announced at their first `:`, after the first key.
        let start = node
            .children
            .iter()
            .map(|child| self.tree.node(*child).range.start)
            .fold(node.range.start, usize::min);
        let children_end = node
            .children
            .iter()
            .map(|child| self.tree.node(*child).range.end)
            .max()
            .unwrap_or(start);

        let closing = marker.map(|m| self.offsets.byte(m.index())).filter(|offset| {
            frame.flow && self.source[*offset..].starts_with([']', '}'])
        });
        let end = match closing {
            Some(offset) => self.base + offset + 1,
            None => children_end,
        }
        .max(start);

        self.tree.node_mut(frame.id).range = TextRange::new(start, end);

        if frame.anchor > 0 {
            self.anchors.insert(frame.anchor, frame.id);
        }
        if let Some(message) = frame.tag_error {
            self.errors.push(SyntaxError {
                kind: SyntaxErrorKind::TagKind,
                range: TextRange::new(start, end),
                message,
            });
        }
    }

    fn on_scalar(
        &mut self,
        text: String,
        style: TScalarStyle,
        anchor: usize,
        tag: Option<Tag>,
        marker: Marker,
    ) {
        let start = self.offsets.byte(marker.index());
        let plain = matches!(style, TScalarStyle::Plain);

        let range = if plain && text.is_empty() {
            // Implicit null: anchor it right after the key it belongs to.
            match self.stack.last().and_then(|frame| frame.pending_key) {
                Some(key) => TextRange::empty(self.tree.node(key).range.end),
                None => TextRange::empty(self.base + start),
            }
        } else {
            let end = scalar_end(self.source, start, style, &text);
            TextRange::new(start, end.max(start)).shifted(self.base)
        };

        let resolution = self.resolve_tag(tag, NodeShape::Scalar);
        let value = match &resolution.core_suffix {
            Some(suffix) => resolve_core_tagged(suffix, &text),
            None if plain => resolve_plain(&text),
            None => ScalarValue::String(text.clone()),
        };

        let id = self.attach(SyntaxNode {
            kind: resolution.kind,
            shape: NodeShape::Scalar,
            range,
            value: Some(value),
            text,
            tag: resolution.name,
            parent: None,
            children: Vec::new(),
            slot: Slot::Root,
            alias_of: None,
        });

        if anchor > 0 {
            self.anchors.insert(anchor, id);
        }
        if let Some(message) = resolution.mismatch {
            self.errors.push(SyntaxError {
                kind: SyntaxErrorKind::TagKind,
                range,
                message,
            });
        }
    }

    fn on_alias(&mut self, anchor: usize, marker: Marker) {
        let start = self.offsets.byte(marker.index());
        let token_len = self.source[start..]
            .find(|ch: char| ch.is_whitespace() || matches!(ch, ',' | '[' | ']' | '{' | '}'))
            .unwrap_or(self.source.len() - start);
        let range = TextRange::new(start, start + token_len).shifted(self.base);

        let node = match self.anchors.get(&anchor).copied() {
            Some(target) => {
                let target_node = self.tree.node(target);
                SyntaxNode {
                    kind: target_node.kind,
                    shape: target_node.shape,
                    range,
                    value: target_node.value.clone(),
                    text: target_node.text.clone(),
                    tag: target_node.tag.clone(),
                    parent: None,
                    children: Vec::new(),
                    slot: Slot::Root,
                    alias_of: Some(target),
                }
            }
            None => null_scalar(range),
        };

        self.attach(node);
    }
}

fn null_scalar(range: TextRange) -> SyntaxNode {
    SyntaxNode {
        kind: NodeKind::Scalar,
        shape: NodeShape::Scalar,
        range,
        value: Some(ScalarValue::Null),
        text: String::new(),
        tag: None,
        parent: None,
        children: Vec::new(),
        slot: Slot::Root,
        alias_of: None,
    }
}

impl MarkedEventReceiver for TreeBuilder<'_> {
    fn on_event(&mut self, ev: Event, marker: Marker) {
        if self.extra_document.is_some() {
            return;
        }

        match ev {
            Event::Nothing => {}
            Event::StreamStart => {}
            Event::StreamEnd => {}
            Event::DocumentStart => self.on_document_start(marker),
            Event::DocumentEnd => {}

            Event::Scalar(text, style, anchor, tag) => {
                self.on_scalar(text, style, anchor, tag, marker);
            }

            Event::SequenceStart(anchor, tag) => {
                self.open(NodeShape::Sequence, anchor, tag, marker);
            }

            Event::MappingStart(anchor, tag) => {
                self.open(NodeShape::Mapping, anchor, tag, marker);
            }

            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(frame) = self.stack.pop() {
                    self.close(frame, Some(marker));
                }
            }

            Event::Alias(anchor) => self.on_alias(anchor, marker),
        }
    }
}
