//! Position queries: which node sits under a cursor and which schema
//! fragment describes it.

use crate::schema::{Items, Schema, SchemaDocument};
use crate::syntax::{NodeId, Slot, SyntaxTree};
use crate::validation::{self, BranchOutcome, ValidationOptions, best_branch};

/// Expansion depth past which `$ref` chains are abandoned.
const MAX_EXPANSION_DEPTH: usize = 64;

/// Deepest node whose range touches `offset`, end-inclusive. Offsets in the
/// gaps between children resolve to the enclosing collection.
pub fn locate(tree: &SyntaxTree, offset: usize) -> Option<NodeId> {
    let root = tree.root()?;
    if !tree.node(root).range.touches(offset) {
        return None;
    }

    let mut current = root;
    loop {
        let children = &tree.node(current).children;
        let strictly_inside = children.iter().find(|child| {
            let range = tree.node(**child).range;
            range.start <= offset && offset < range.end
        });
        let next = strictly_inside.or_else(|| {
            children
                .iter()
                .find(|child| tree.node(**child).range.touches(offset))
        });

        match next {
            Some(child) => current = *child,
            None => return Some(current),
        }
    }
}

/// Description of `node` according to `document`. A key node is described
/// by the schema of its value.
pub fn describe(
    tree: &SyntaxTree,
    node: NodeId,
    document: &SchemaDocument,
    options: &ValidationOptions,
) -> Option<String> {
    let target = match tree.node(node).slot {
        Slot::Key { value: Some(value) } => value,
        _ => node,
    };

    SchemaWalker {
        tree,
        document,
        options,
    }
    .schemas_for(target)
    .into_iter()
    .find_map(Schema::description)
    .map(str::to_string)
}

enum Step<'t> {
    Property(&'t str),
    Index(usize),
}

struct SchemaWalker<'a> {
    tree: &'a SyntaxTree,
    document: &'a SchemaDocument,
    options: &'a ValidationOptions,
}

impl<'a> SchemaWalker<'a> {
    /// Every schema fragment that applies to `target`, outermost first.
    fn schemas_for(&self, target: NodeId) -> Vec<&'a Schema> {
        let path = self.tree.ancestry(target);
        let Some((&root, _)) = path.split_first() else {
            return Vec::new();
        };

        let mut current = Vec::new();
        self.expand(root, &self.document.root, 0, &mut current);

        for child in path.iter().skip(1) {
            let step = match self.tree.node(*child).slot {
                Slot::Value { key } => match self.tree.key_text(key) {
                    Some(name) => Step::Property(name),
                    None => return Vec::new(),
                },
                Slot::Item { index } => Step::Index(index),
                Slot::Key { .. } | Slot::Root => return Vec::new(),
            };

            let mut next = Vec::new();
            for schema in current.iter().copied() {
                for sub in child_schemas(schema, &step) {
                    self.expand(*child, sub, 0, &mut next);
                }
            }
            current = next;
        }

        current
    }

    fn expand(&self, node: NodeId, schema: &'a Schema, depth: usize, out: &mut Vec<&'a Schema>) {
        if depth > MAX_EXPANSION_DEPTH {
            return;
        }
        out.push(schema);

        let Schema::Object(object) = schema else {
            return;
        };
        if let Some(target) = object
            .reference
            .as_deref()
            .and_then(|r| self.document.resolve_ref(r))
        {
            self.expand(node, target, depth + 1, out);
        }
        for branch in &object.all_of {
            self.expand(node, branch, depth + 1, out);
        }
        for branches in [&object.any_of, &object.one_of] {
            if let Some(best) = self.best_branch(node, branches) {
                self.expand(node, best, depth + 1, out);
            }
        }
    }

    fn best_branch(&self, node: NodeId, branches: &'a [Schema]) -> Option<&'a Schema> {
        let outcomes = branches.iter().enumerate().map(|(index, branch)| BranchOutcome {
            index,
            problems: validation::validate_node(
                self.tree,
                self.document,
                node,
                branch,
                self.options,
            ),
        });
        best_branch(outcomes).and_then(|best| branches.get(best.index))
    }
}

fn child_schemas<'a>(schema: &'a Schema, step: &Step<'_>) -> Vec<&'a Schema> {
    let Some(object) = schema.as_object() else {
        return Vec::new();
    };

    match step {
        Step::Property(name) => {
            let mut found: Vec<&Schema> = object.properties.get(*name).into_iter().collect();
            found.extend(
                object
                    .pattern_properties
                    .iter()
                    .filter(|(pattern, _)| pattern.is_match(name))
                    .map(|(_, schema)| schema),
            );
            if found.is_empty() {
                found.extend(
                    object
                        .additional_properties
                        .as_ref()
                        .filter(|s| s.as_object().is_some()),
                );
            }
            found
        }
        Step::Index(index) => match &object.items {
            Some(Items::Single(schema)) => vec![schema],
            Some(Items::Tuple(schemas)) => schemas
                .get(*index)
                .or(object.additional_items.as_ref())
                .into_iter()
                .collect(),
            None => Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{CustomTags, parse_text};
    use serde_json::json;

    fn hover_text(yaml: &str, needle: &str, schema: serde_json::Value) -> Option<String> {
        let parsed = parse_text(yaml, 0, &CustomTags::default());
        let document = SchemaDocument::from_value("mem://test", &schema);
        let offset = yaml.find(needle).unwrap() + 1;
        let node = locate(&parsed.tree, offset)?;
        describe(&parsed.tree, node, &document, &ValidationOptions::default())
    }

    #[test]
    fn test_locate_deepest_node() {
        let yaml = "outer:\n  inner: [a, bb]\n";
        let tree = parse_text(yaml, 0, &CustomTags::default()).tree;

        let node = locate(&tree, yaml.find("bb").unwrap()).unwrap();
        assert_eq!(tree.node(node).text, "bb");

        // End-inclusive: just past the token still hits it.
        let node = locate(&tree, yaml.find("bb").unwrap() + 2).unwrap();
        assert_eq!(tree.node(node).text, "bb");

        let node = locate(&tree, yaml.find("inner").unwrap()).unwrap();
        assert_eq!(tree.node(node).text, "inner");
    }

    #[test]
    fn test_first_keys_of_block_mappings() {
        let schema = json!({
            "properties": {
                "outer": {
                    "description": "Outer",
                    "properties": {"first": {"description": "First nested"}}
                }
            }
        });
        let yaml = "outer:\n  first: 1\n  second: 2\n";
        assert_eq!(hover_text(yaml, "outer", schema.clone()).as_deref(), Some("Outer"));
        assert_eq!(hover_text(yaml, "first", schema).as_deref(), Some("First nested"));

        let tree = parse_text(yaml, 0, &CustomTags::default()).tree;
        let node = locate(&tree, 0).unwrap();
        assert_eq!(tree.node(node).text, "outer");
    }

    #[test]
    fn test_locate_gap_resolves_to_parent() {
        let yaml = "a: [x,   y]\n";
        let tree = parse_text(yaml, 0, &CustomTags::default()).tree;
        let node = locate(&tree, yaml.find("x").unwrap() + 3).unwrap();
        assert_eq!(tree.node(node).children.len(), 2);
    }

    #[test]
    fn test_locate_outside_root() {
        let tree = parse_text("a: 1\n\n\n", 0, &CustomTags::default()).tree;
        assert!(locate(&tree, 7).is_none());
    }

    #[test]
    fn test_describe_property_and_item() {
        let schema = json!({
            "properties": {
                "age": {"type": "integer", "description": "The age"},
                "tags": {"items": {"title": "A tag"}}
            }
        });
        assert_eq!(
            hover_text("age: 3\ntags: [x]\n", "age", schema.clone()).as_deref(),
            Some("The age")
        );
        assert_eq!(
            hover_text("age: 3\ntags: [x]\n", "x", schema).as_deref(),
            Some("A tag")
        );
    }

    #[test]
    fn test_describe_through_refs_and_best_branch() {
        let schema = json!({
            "anyOf": [{"$ref": "#/definitions/a"}, {"$ref": "#/definitions/b"}],
            "definitions": {
                "a": {"properties": {"kind": {"const": "a", "description": "Kind A"}}},
                "b": {"properties": {"kind": {"const": "b", "description": "Kind B"}}}
            }
        });
        assert_eq!(hover_text("kind: b\n", "kind", schema.clone()).as_deref(), Some("Kind B"));
        assert_eq!(hover_text("kind: a\n", "kind", schema).as_deref(), Some("Kind A"));
    }

    #[test]
    fn test_describe_all_of_and_missing() {
        let schema = json!({
            "allOf": [{"properties": {"a": {"description": "From allOf"}}}]
        });
        assert_eq!(hover_text("a: 1\n", "a", schema.clone()).as_deref(), Some("From allOf"));
        assert_eq!(hover_text("b: 1\n", "b", schema), None);
    }
}
