//! Position-aware YAML syntax trees.
//!
//! Every document segment is parsed into its own [`SyntaxTree`], an arena of
//! [`SyntaxNode`]s indexed by creation order. Children are owned through the
//! arena; parent links are plain indices so the position query engine can
//! walk upwards without shared ownership.
mod builder;
mod scalar;
pub mod tags;

pub use builder::{ParsedDocument, SyntaxError, SyntaxErrorKind, parse, parse_text};
pub use tags::{CustomTagSpec, CustomTags};

use crate::document::TextRange;
use serde::{Deserialize, Serialize};

/// Upper bound on nodes rendered by [`SyntaxTree::to_json`].
const MAX_JSON_NODES: usize = 100_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The structural form a node was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeShape {
    Scalar,
    Sequence,
    Mapping,
}

impl std::fmt::Display for NodeShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeShape::Scalar => write!(f, "scalar"),
            NodeShape::Sequence => write!(f, "sequence"),
            NodeShape::Mapping => write!(f, "mapping"),
        }
    }
}

/// The kind a node is validated as. `Tagged` marks a node carrying a tag
/// that no configuration declared: it keeps its structure but is not
/// checked against schema keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Scalar,
    Sequence,
    Mapping,
    Tagged,
}

impl From<NodeShape> for NodeKind {
    fn from(shape: NodeShape) -> Self {
        match shape {
            NodeShape::Scalar => NodeKind::Scalar,
            NodeShape::Sequence => NodeKind::Sequence,
            NodeShape::Mapping => NodeKind::Mapping,
        }
    }
}

/// Where a node sits inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Root,
    Key { value: Option<NodeId> },
    Value { key: NodeId },
    Item { index: usize },
}

/// A resolved scalar, following the YAML 1.2 core schema.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl ScalarValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ScalarValue::Null => "null",
            ScalarValue::Bool(_) => "boolean",
            ScalarValue::Int(_) => "integer",
            ScalarValue::Float(_) => "number",
            ScalarValue::String(_) => "string",
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Null => serde_json::Value::Null,
            ScalarValue::Bool(b) => serde_json::Value::Bool(*b),
            ScalarValue::Int(i) => serde_json::Value::from(*i),
            ScalarValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ScalarValue::String(s) => serde_json::Value::String(s.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SyntaxNode {
    pub kind: NodeKind,
    pub shape: NodeShape,
    /// Absolute byte range in the original buffer.
    pub range: TextRange,
    pub value: Option<ScalarValue>,
    /// Scalar content as written, after unquoting and folding.
    pub text: String,
    pub tag: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub slot: Slot,
    pub alias_of: Option<NodeId>,
}

#[derive(Debug, Clone, Default)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
    root: Option<NodeId>,
}

impl SyntaxTree {
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|idx| NodeId(idx as u32))
    }

    /// Follow an alias to the node it names.
    pub fn resolve_alias(&self, id: NodeId) -> NodeId {
        self.node(id).alias_of.unwrap_or(id)
    }

    /// Key/value pairs of a mapping node, in source order.
    pub fn entries(&self, mapping: NodeId) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        let node = self.node(mapping);
        let children = if node.shape == NodeShape::Mapping {
            node.children.as_slice()
        } else {
            &[]
        };
        children.chunks_exact(2).map(|pair| (pair[0], pair[1]))
    }

    /// Items of a sequence node, in source order.
    pub fn items(&self, sequence: NodeId) -> &[NodeId] {
        let node = self.node(sequence);
        if node.shape == NodeShape::Sequence {
            &node.children
        } else {
            &[]
        }
    }

    /// The property name a key node spells, if it is a scalar.
    pub fn key_text(&self, key: NodeId) -> Option<&str> {
        let node = self.node(self.resolve_alias(key));
        (node.shape == NodeShape::Scalar).then_some(node.text.as_str())
    }

    pub fn get(&self, mapping: NodeId, key: &str) -> Option<NodeId> {
        self.entries(mapping)
            .find(|(k, _)| self.key_text(*k) == Some(key))
            .map(|(_, v)| v)
    }

    /// JSON type name of a node, as used in schema `type` keywords.
    pub fn type_name(&self, id: NodeId) -> &'static str {
        let node = self.node(self.resolve_alias(id));
        match node.shape {
            NodeShape::Mapping => "object",
            NodeShape::Sequence => "array",
            NodeShape::Scalar => node
                .value
                .as_ref()
                .map(ScalarValue::type_name)
                .unwrap_or("null"),
        }
    }

    /// Structural JSON value of a subtree, used for `enum`, `const` and
    /// `uniqueItems` comparisons. Aliases are expanded; past a fixed number
    /// of nodes the remainder is rendered as `null`.
    pub fn to_json(&self, id: NodeId) -> serde_json::Value {
        let mut budget = MAX_JSON_NODES;
        self.to_json_bounded(id, 0, &mut budget)
    }

    fn to_json_bounded(&self, id: NodeId, depth: usize, budget: &mut usize) -> serde_json::Value {
        const MAX_DEPTH: usize = 256;
        let id = self.resolve_alias(id);
        let node = self.node(id);
        if depth > MAX_DEPTH || *budget == 0 {
            return serde_json::Value::Null;
        }
        *budget -= 1;

        match node.shape {
            NodeShape::Scalar => node
                .value
                .as_ref()
                .map(ScalarValue::to_json)
                .unwrap_or(serde_json::Value::Null),
            NodeShape::Sequence => serde_json::Value::Array(
                self.items(id)
                    .iter()
                    .map(|item| self.to_json_bounded(*item, depth + 1, budget))
                    .collect(),
            ),
            NodeShape::Mapping => serde_json::Value::Object(
                self.entries(id)
                    .map(|(key, value)| {
                        let key = self.key_text(key).unwrap_or_default().to_string();
                        (key, self.to_json_bounded(value, depth + 1, budget))
                    })
                    .collect(),
            ),
        }
    }

    /// Nodes from the root down to `id`, inclusive.
    pub fn ancestry(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = id;
        while let Some(parent) = self.node(current).parent {
            chain.push(parent);
            current = parent;
        }
        chain.reverse();
        chain
    }

    fn push(&mut self, node: SyntaxNode) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    fn node_mut(&mut self, id: NodeId) -> &mut SyntaxNode {
        &mut self.nodes[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entries_and_lookup() {
        let parsed = parse_text("name: jack\nage: 22\n", 0, &CustomTags::default());
        let tree = parsed.tree;
        let root = tree.root().unwrap();

        let keys: Vec<_> = tree
            .entries(root)
            .map(|(k, _)| tree.key_text(k).unwrap().to_string())
            .collect();
        assert_eq!(keys, vec!["name", "age"]);

        let age = tree.get(root, "age").unwrap();
        assert_eq!(tree.node(age).value, Some(ScalarValue::Int(22)));
        assert_eq!(tree.type_name(age), "integer");
    }

    #[test]
    fn test_to_json() {
        let parsed = parse_text("a: [1, two, true]\nb: {c: null}\n", 0, &CustomTags::default());
        let tree = parsed.tree;
        let json = tree.to_json(tree.root().unwrap());
        assert_eq!(
            json,
            serde_json::json!({"a": [1, "two", true], "b": {"c": null}})
        );
    }

    #[test]
    fn test_to_json_bounds_alias_expansion() {
        let mut yaml = String::from("l0: &l0 [x, x, x, x, x, x, x, x, x, x]\n");
        for level in 1..7 {
            let items = vec![format!("*l{}", level - 1); 10].join(", ");
            yaml.push_str(&format!("l{}: &l{} [{}]\n", level, level, items));
        }
        let parsed = parse_text(&yaml, 0, &CustomTags::default());
        let tree = parsed.tree;
        let last = tree.get(tree.root().unwrap(), "l6").unwrap();

        let json = tree.to_json(last);
        assert_eq!(json.as_array().map(Vec::len), Some(10));
        // Rendering stopped early: the tail is null.
        assert_eq!(json[9], serde_json::Value::Null);
    }

    #[test]
    fn test_ancestry_runs_root_first() {
        let parsed = parse_text("a:\n  b:\n    - x\n", 0, &CustomTags::default());
        let tree = parsed.tree;
        let root = tree.root().unwrap();
        let a = tree.get(root, "a").unwrap();
        let b = tree.get(a, "b").unwrap();
        let x = tree.items(b)[0];

        assert_eq!(tree.ancestry(x), vec![root, a, b, x]);
        assert_eq!(tree.node(x).slot, Slot::Item { index: 0 });
    }
}
