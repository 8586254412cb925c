mod best_match;
mod validator;

pub(crate) use best_match::{BranchOutcome, best_branch};

use crate::document::TextRange;
use crate::schema::{Schema, SchemaDocument};
use crate::syntax::{NodeId, SyntaxTree};
use std::collections::HashSet;
use validator::Validator;

/// Kind of schema violation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProblemKind {
    // Value checks
    TypeMismatch,
    EnumMismatch,
    ConstMismatch,
    FalseSchema,

    // Object checks
    MissingProperty,
    PropertyNotAllowed,
    MinProperties,
    MaxProperties,

    // Array checks
    AdditionalItems,
    MinItems,
    MaxItems,
    UniqueItems,

    // String checks
    PatternMismatch,
    MinLength,
    MaxLength,

    // Number checks
    Minimum,
    Maximum,
    ExclusiveMinimum,
    ExclusiveMaximum,
    MultipleOf,

    // Composition checks
    NotMatched,
    MultipleOneOf,
}

impl ProblemKind {
    /// Diagnostic code reported to clients.
    pub fn code(self) -> &'static str {
        match self {
            ProblemKind::TypeMismatch => "typeMismatch",
            ProblemKind::EnumMismatch => "enumMismatch",
            ProblemKind::ConstMismatch => "constMismatch",
            ProblemKind::FalseSchema => "falseSchema",
            ProblemKind::MissingProperty => "missingProperty",
            ProblemKind::PropertyNotAllowed => "propertyNotAllowed",
            ProblemKind::MinProperties => "minProperties",
            ProblemKind::MaxProperties => "maxProperties",
            ProblemKind::AdditionalItems => "additionalItems",
            ProblemKind::MinItems => "minItems",
            ProblemKind::MaxItems => "maxItems",
            ProblemKind::UniqueItems => "uniqueItems",
            ProblemKind::PatternMismatch => "patternMismatch",
            ProblemKind::MinLength => "minLength",
            ProblemKind::MaxLength => "maxLength",
            ProblemKind::Minimum => "minimum",
            ProblemKind::Maximum => "maximum",
            ProblemKind::ExclusiveMinimum => "exclusiveMinimum",
            ProblemKind::ExclusiveMaximum => "exclusiveMaximum",
            ProblemKind::MultipleOf => "multipleOf",
            ProblemKind::NotMatched => "notMatched",
            ProblemKind::MultipleOneOf => "multipleOneOf",
        }
    }
}

impl std::fmt::Display for ProblemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// A schema violation anchored at a byte range of the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaProblem {
    pub kind: ProblemKind,
    pub range: TextRange,
    pub message: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationOptions {
    /// Reject undeclared properties in object schemas that declare
    /// properties but say nothing about additional ones.
    pub disable_additional_properties: bool,
}

/// Validate a whole tree against a schema document. Problems are sorted by
/// start offset; problems starting at the same offset keep discovery order.
pub fn validate(
    tree: &SyntaxTree,
    document: &SchemaDocument,
    options: &ValidationOptions,
) -> Vec<SchemaProblem> {
    match tree.root() {
        Some(root) => validate_node(tree, document, root, &document.root, options),
        None => Vec::new(),
    }
}

/// Validate one node against one schema of `document`.
pub fn validate_node(
    tree: &SyntaxTree,
    document: &SchemaDocument,
    node: NodeId,
    schema: &Schema,
    options: &ValidationOptions,
) -> Vec<SchemaProblem> {
    let mut problems = Vec::new();
    Validator::new(tree, document, options).validate(node, schema, &mut problems);
    let mut problems = dedup_problems(problems);
    problems.sort_by_key(|p| p.range.start);
    problems
}

/// Drop repeats of the same problem at the same range, keeping first
/// occurrences in order. Aliased subtrees report through every alias.
fn dedup_problems(problems: Vec<SchemaProblem>) -> Vec<SchemaProblem> {
    let mut seen = HashSet::new();
    problems
        .into_iter()
        .filter(|problem| seen.insert(problem.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{CustomTagSpec, CustomTags, NodeShape, parse_text};
    use serde_json::json;

    fn problems(yaml: &str, schema: serde_json::Value) -> Vec<SchemaProblem> {
        problems_with(yaml, schema, ValidationOptions::default())
    }

    fn problems_with(
        yaml: &str,
        schema: serde_json::Value,
        options: ValidationOptions,
    ) -> Vec<SchemaProblem> {
        let parsed = parse_text(yaml, 0, &CustomTags::default());
        let document = SchemaDocument::from_value("mem://test", &schema);
        validate(&parsed.tree, &document, &options)
    }

    fn kinds(problems: &[SchemaProblem]) -> Vec<ProblemKind> {
        problems.iter().map(|p| p.kind).collect()
    }

    #[test]
    fn test_type_mismatch_message_and_range() {
        let yaml = "age: twenty\n";
        let found = problems(
            yaml,
            json!({"properties": {"age": {"type": "integer"}}}),
        );
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].message,
            r#"Incorrect type. Expected "integer" but found "string"."#
        );
        assert_eq!(&yaml[found[0].range.start..found[0].range.end], "twenty");
    }

    #[test]
    fn test_integer_accepts_whole_floats() {
        assert!(problems("1.0", json!({"type": "integer"})).is_empty());
        assert_eq!(
            kinds(&problems("1.5", json!({"type": "integer"}))),
            vec![ProblemKind::TypeMismatch]
        );
        assert!(problems("3", json!({"type": "number"})).is_empty());
    }

    #[test]
    fn test_capitalised_false_is_boolean() {
        let schema = json!({"properties": {"analytics": {"type": "boolean"}}});
        assert!(problems("analytics: False\n", schema).is_empty());
    }

    #[test]
    fn test_required_anchors_at_mapping() {
        let yaml = "name: jack\n";
        let found = problems(yaml, json!({"required": ["name", "age"]}));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, r#"Missing property "age"."#);
        assert_eq!(found[0].range.start, 0);
    }

    #[test]
    fn test_additional_properties() {
        let schema = json!({
            "properties": {"name": {}},
            "additionalProperties": false
        });
        let yaml = "name: a\nname1: b\n";
        let found = problems(yaml, schema);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].message, "Property name1 is not allowed.");
        assert_eq!(&yaml[found[0].range.start..found[0].range.end], "name1");

        let schema = json!({"properties": {"name": {}}, "additionalProperties": {"type": "integer"}});
        assert_eq!(
            kinds(&problems("name: a\nextra: b\n", schema)),
            vec![ProblemKind::TypeMismatch]
        );
    }

    #[test]
    fn test_disable_additional_properties_option() {
        let options = ValidationOptions {
            disable_additional_properties: true,
        };
        let schema = json!({"properties": {"name": {}}});
        assert_eq!(
            kinds(&problems_with("name: a\nother: b\n", schema.clone(), options)),
            vec![ProblemKind::PropertyNotAllowed]
        );
        assert!(problems("name: a\nother: b\n", schema).is_empty());
        // Schemas without declared properties stay open.
        assert!(problems_with("other: b\n", json!({"type": "object"}), options).is_empty());
    }

    #[test]
    fn test_pattern_properties() {
        let schema = json!({
            "patternProperties": {"^x-": {"type": "string"}},
            "additionalProperties": false
        });
        assert!(problems("x-a: b\n", schema.clone()).is_empty());
        assert_eq!(
            kinds(&problems("x-a: 1\ny: 2\n", schema)),
            vec![ProblemKind::TypeMismatch, ProblemKind::PropertyNotAllowed]
        );
    }

    #[test]
    fn test_enum_and_const() {
        let found = problems("b", json!({"enum": ["a", 1]}));
        assert_eq!(found[0].message, r#"Value is not accepted. Valid values: "a", 1."#);
        assert!(problems("1.0", json!({"enum": [1]})).is_empty());
        assert_eq!(
            kinds(&problems("x", json!({"const": "y"}))),
            vec![ProblemKind::ConstMismatch]
        );
        assert!(problems("{a: [1]}", json!({"const": {"a": [1]}})).is_empty());
    }

    #[test]
    fn test_items_and_tuples() {
        let schema = json!({"items": {"type": "string"}, "minItems": 3});
        assert_eq!(
            kinds(&problems("[a, 1]", schema)),
            vec![ProblemKind::MinItems, ProblemKind::TypeMismatch]
        );

        let tuple = json!({"items": [{"type": "string"}], "additionalItems": false});
        assert_eq!(
            kinds(&problems("[a, b]", tuple)),
            vec![ProblemKind::AdditionalItems]
        );
        assert_eq!(
            kinds(&problems("[a, a]", json!({"uniqueItems": true}))),
            vec![ProblemKind::UniqueItems]
        );
    }

    #[test]
    fn test_string_and_number_bounds() {
        let found = problems("abc", json!({"maxLength": 2, "pattern": "^z"}));
        assert_eq!(
            kinds(&found),
            vec![ProblemKind::PatternMismatch, ProblemKind::MaxLength]
        );
        assert_eq!(
            kinds(&problems("5", json!({"minimum": 6, "exclusiveMaximum": 5, "multipleOf": 2}))),
            vec![
                ProblemKind::Minimum,
                ProblemKind::ExclusiveMaximum,
                ProblemKind::MultipleOf
            ]
        );
        assert!(problems("0.3", json!({"multipleOf": 0.1})).is_empty());
    }

    #[test]
    fn test_all_of_reports_every_branch() {
        let schema = json!({"allOf": [{"type": "string"}, {"minimum": 10}]});
        assert_eq!(
            kinds(&problems("5", schema)),
            vec![ProblemKind::TypeMismatch, ProblemKind::Minimum]
        );
    }

    #[test]
    fn test_any_of_reports_closest_branch() {
        let schema = json!({"anyOf": [
            {"properties": {"a": {"type": "string"}, "b": {"type": "string"}}},
            {"properties": {"a": {"type": "integer"}, "b": {"type": "boolean"}}}
        ]});
        let found = problems("a: x\nb: 1\n", schema.clone());
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains(r#"Expected "string""#));

        assert!(problems("a: x\nb: y\n", schema).is_empty());
    }

    #[test]
    fn test_any_of_ties_keep_first_branch() {
        let schema = json!({"anyOf": [{"type": "string"}, {"type": "boolean"}]});
        let found = problems("1", schema);
        assert_eq!(found.len(), 1);
        assert!(found[0].message.contains(r#"Expected "string""#));
    }

    #[test]
    fn test_one_of() {
        let schema = json!({"oneOf": [{"type": "integer"}, {"type": "number"}]});
        let found = problems("1", schema.clone());
        assert_eq!(found[0].message, "Matches multiple schemas when only one must validate.");
        assert!(problems("1.5", schema.clone()).is_empty());
        assert_eq!(kinds(&problems("x", schema)), vec![ProblemKind::TypeMismatch]);
    }

    #[test]
    fn test_not_and_false_schema() {
        let found = problems("x", json!({"not": {"type": "string"}}));
        assert_eq!(found[0].message, "Matches a schema that is not allowed.");
        assert!(problems("1", json!({"not": {"type": "string"}})).is_empty());

        assert_eq!(
            kinds(&problems("a: 1\n", json!({"properties": {"a": false}}))),
            vec![ProblemKind::FalseSchema]
        );
        assert!(problems("a: 1\n", json!(true)).is_empty());
    }

    #[test]
    fn test_refs_and_cycles() {
        let schema = json!({
            "$ref": "#/definitions/node",
            "definitions": {
                "node": {
                    "type": "object",
                    "properties": {"child": {"$ref": "#/definitions/node"}, "v": {"type": "integer"}}
                },
                "loop": {"$ref": "#/definitions/loop"}
            }
        });
        let found = problems("child:\n  child:\n    v: x\n", schema);
        assert_eq!(kinds(&found), vec![ProblemKind::TypeMismatch]);

        let looping = json!({"$ref": "#/definitions/loop", "definitions": {"loop": {"$ref": "#/definitions/loop"}}});
        assert!(problems("a: 1\n", looping).is_empty());
    }

    #[test]
    fn test_problems_sorted_by_offset() {
        let schema = json!({
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}},
            "required": ["c"]
        });
        let found = problems("b: 1\na: 2\n", schema);
        let starts: Vec<_> = found.iter().map(|p| p.range.start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(found[0].kind, ProblemKind::MissingProperty);
    }

    #[test]
    fn test_undeclared_tag_is_not_validated() {
        let parsed = parse_text("value: !Unknown 1\n", 0, &CustomTags::default());
        let document = SchemaDocument::from_value(
            "mem://test",
            &json!({"properties": {"value": {"type": "string"}}}),
        );
        assert!(validate(&parsed.tree, &document, &ValidationOptions::default()).is_empty());
    }

    #[test]
    fn test_declared_tag_is_validated() {
        let tags = CustomTags::new([CustomTagSpec::new("!Env", NodeShape::Scalar)]);
        let parsed = parse_text("value: !Env 1\n", 0, &tags);
        let document = SchemaDocument::from_value(
            "mem://test",
            &json!({"properties": {"value": {"type": "string"}}}),
        );
        assert_eq!(
            kinds(&validate(&parsed.tree, &document, &ValidationOptions::default())),
            vec![ProblemKind::TypeMismatch]
        );
    }

    fn nested_aliases(levels: usize) -> String {
        let names: Vec<String> = (0..levels).map(|i| format!("l{}", i)).collect();
        let mut yaml = format!("{}: &{} [{}]\n", names[0], names[0], vec!["x"; 10].join(", "));
        for pair in names.windows(2) {
            let items = vec![format!("*{}", pair[0]); 10].join(", ");
            yaml.push_str(&format!("{}: &{} [{}]\n", pair[1], pair[1], items));
        }
        yaml
    }

    #[test]
    fn test_nested_aliases_report_each_problem_once() {
        let yaml = nested_aliases(7);
        let mut schema = json!({"type": "integer"});
        for _ in 0..7 {
            schema = json!({"items": schema});
        }
        let found = problems(&yaml, json!({"properties": {"l6": schema}}));

        assert_eq!(found.len(), 10);
        let first_line = yaml.find('\n').unwrap();
        assert!(found.iter().all(|p| p.range.end <= first_line));
        assert!(found.iter().all(|p| p.kind == ProblemKind::TypeMismatch));
    }

    #[test]
    fn test_alias_problems_at_alias_node() {
        let yaml = "base: &b {x: 1}
copy: *b
";
        let schema = json!({"properties": {"copy": {"required": ["y"]}}});
        let found = problems(yaml, schema);
        assert_eq!(found.len(), 1);
        assert_eq!(&yaml[found[0].range.start..found[0].range.end], "*b");
    }

    #[test]
    fn test_validation_is_repeatable() {
        let yaml = "a: [1, x]\nb: {c: d}\n";
        let schema = json!({"properties": {"a": {"items": {"type": "integer"}}, "b": {"required": ["e"]}}});
        assert_eq!(problems(yaml, schema.clone()), problems(yaml, schema));
    }
}
