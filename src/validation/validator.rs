use super::best_match::{BranchOutcome, best_branch};
use super::{ProblemKind, SchemaProblem, ValidationOptions};
use crate::schema::{Items, JsonType, Schema, SchemaDocument, SchemaObject};
use crate::syntax::{NodeId, NodeKind, NodeShape, ScalarValue, SyntaxTree};
use serde_json::Value;
use std::collections::HashMap;

/// Walks a syntax tree against a schema, collecting problems.
pub(super) struct Validator<'a> {
    tree: &'a SyntaxTree,
    document: &'a SchemaDocument,
    options: &'a ValidationOptions,
    /// `$ref`s currently being expanded, per node. Re-entering one is a cycle.
    active_refs: Vec<(NodeId, &'a str)>,
    /// Problems already found for an alias node against a schema. Aliases
    /// share their anchor's subtree, so nested aliases would otherwise walk
    /// it once per path.
    alias_results: HashMap<(NodeId, *const Schema), Vec<SchemaProblem>>,
}

impl<'a> Validator<'a> {
    pub fn new(
        tree: &'a SyntaxTree,
        document: &'a SchemaDocument,
        options: &'a ValidationOptions,
    ) -> Self {
        Self {
            tree,
            document,
            options,
            active_refs: Vec::new(),
            alias_results: HashMap::new(),
        }
    }

    pub fn validate(&mut self, node: NodeId, schema: &'a Schema, out: &mut Vec<SchemaProblem>) {
        if self.tree.node(node).alias_of.is_some() {
            self.validate_alias(node, schema, out);
        } else {
            self.validate_direct(node, schema, out);
        }
    }

    fn validate_alias(&mut self, node: NodeId, schema: &'a Schema, out: &mut Vec<SchemaProblem>) {
        let key = (node, std::ptr::from_ref(schema));
        if let Some(cached) = self.alias_results.get(&key) {
            out.extend(cached.iter().cloned());
            return;
        }

        let mut problems = Vec::new();
        self.validate_direct(node, schema, &mut problems);
        let problems = super::dedup_problems(problems);
        out.extend(problems.iter().cloned());

        // Results cut short by a `$ref` cycle on this node are not reusable.
        if !self.active_refs.iter().any(|(active, _)| *active == node) {
            self.alias_results.insert(key, problems);
        }
    }

    fn validate_direct(
        &mut self,
        node: NodeId,
        schema: &'a Schema,
        out: &mut Vec<SchemaProblem>,
    ) {
        let object = match schema {
            Schema::Bool(true) => return,
            Schema::Bool(false) => {
                self.report(
                    out,
                    ProblemKind::FalseSchema,
                    node,
                    "Matches a schema that is not allowed.".to_string(),
                );
                return;
            }
            Schema::Object(object) => object.as_ref(),
        };

        let target = self.tree.resolve_alias(node);
        if self.tree.node(target).kind == NodeKind::Tagged {
            return;
        }

        if let Some(reference) = object.reference.as_deref() {
            self.validate_ref(node, reference, out);
        }
        self.check_type(node, object, out);
        self.check_composition(node, object, out);
        self.check_value(node, object, out);

        match self.tree.node(target).shape {
            NodeShape::Scalar => self.check_scalar(node, target, object, out),
            NodeShape::Sequence => self.check_sequence(node, target, object, out),
            NodeShape::Mapping => self.check_mapping(node, target, object, out),
        }
    }

    fn validate_ref(&mut self, node: NodeId, reference: &'a str, out: &mut Vec<SchemaProblem>) {
        if self.active_refs.contains(&(node, reference)) {
            tracing::trace!(reference, "Cutting $ref cycle");
            return;
        }
        let Some(target) = self.document.resolve_ref(reference) else {
            return;
        };

        self.active_refs.push((node, reference));
        self.validate(node, target, out);
        self.active_refs.pop();
    }

    fn check_type(&self, node: NodeId, object: &SchemaObject, out: &mut Vec<SchemaProblem>) {
        if object.types.is_empty() {
            return;
        }

        let actual = self.tree.type_name(node);
        let value = self.tree.node(self.tree.resolve_alias(node)).value.as_ref();
        if object
            .types
            .iter()
            .any(|expected| type_accepts(*expected, actual, value))
        {
            return;
        }

        let expected: Vec<&str> = object.types.iter().map(|t| t.as_str()).collect();
        self.report(
            out,
            ProblemKind::TypeMismatch,
            node,
            format!(
                "Incorrect type. Expected \"{}\" but found \"{}\".",
                expected.join(" | "),
                actual
            ),
        );
    }

    fn check_composition(
        &mut self,
        node: NodeId,
        object: &'a SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        for branch in &object.all_of {
            self.validate(node, branch, out);
        }

        if !object.any_of.is_empty() {
            let outcomes = self.branch_outcomes(node, &object.any_of);
            if let Some(best) = best_branch(outcomes) {
                out.extend(best.problems);
            }
        }

        if !object.one_of.is_empty() {
            let outcomes = self.branch_outcomes(node, &object.one_of);
            match outcomes.iter().filter(|o| o.is_match()).count() {
                0 => {
                    if let Some(best) = best_branch(outcomes) {
                        out.extend(best.problems);
                    }
                }
                1 => {}
                _ => self.report(
                    out,
                    ProblemKind::MultipleOneOf,
                    node,
                    "Matches multiple schemas when only one must validate.".to_string(),
                ),
            }
        }

        if let Some(not) = &object.not {
            let mut problems = Vec::new();
            self.validate(node, not, &mut problems);
            if problems.is_empty() {
                self.report(
                    out,
                    ProblemKind::NotMatched,
                    node,
                    "Matches a schema that is not allowed.".to_string(),
                );
            }
        }
    }

    fn branch_outcomes(&mut self, node: NodeId, branches: &'a [Schema]) -> Vec<BranchOutcome> {
        branches
            .iter()
            .enumerate()
            .map(|(index, branch)| {
                let mut problems = Vec::new();
                self.validate(node, branch, &mut problems);
                BranchOutcome { index, problems }
            })
            .collect()
    }

    fn check_value(&self, node: NodeId, object: &SchemaObject, out: &mut Vec<SchemaProblem>) {
        if object.enum_values.is_none() && object.const_value.is_none() {
            return;
        }
        let actual = self.tree.to_json(node);

        if let Some(values) = &object.enum_values {
            if !values.iter().any(|v| json_equal(v, &actual)) {
                let listed: Vec<String> = values.iter().map(Value::to_string).collect();
                self.report(
                    out,
                    ProblemKind::EnumMismatch,
                    node,
                    format!("Value is not accepted. Valid values: {}.", listed.join(", ")),
                );
            }
        }

        if let Some(expected) = &object.const_value {
            if !json_equal(expected, &actual) {
                self.report(
                    out,
                    ProblemKind::ConstMismatch,
                    node,
                    format!("Value must be {}.", expected),
                );
            }
        }
    }

    fn check_scalar(
        &self,
        node: NodeId,
        target: NodeId,
        object: &SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        match &self.tree.node(target).value {
            Some(ScalarValue::String(text)) => self.check_string(node, text, object, out),
            Some(ScalarValue::Int(i)) => self.check_number(node, *i as f64, object, out),
            Some(ScalarValue::Float(f)) => self.check_number(node, *f, object, out),
            _ => {}
        }
    }

    fn check_string(
        &self,
        node: NodeId,
        text: &str,
        object: &SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        if let Some(pattern) = &object.pattern {
            if !pattern.is_match(text) {
                self.report(
                    out,
                    ProblemKind::PatternMismatch,
                    node,
                    format!("String does not match the pattern of \"{}\".", pattern.as_str()),
                );
            }
        }

        let length = text.chars().count();
        if let Some(min) = object.min_length.filter(|min| length < *min) {
            self.report(
                out,
                ProblemKind::MinLength,
                node,
                format!("String is shorter than the minimum length of {}.", min),
            );
        }
        if let Some(max) = object.max_length.filter(|max| length > *max) {
            self.report(
                out,
                ProblemKind::MaxLength,
                node,
                format!("String is longer than the maximum length of {}.", max),
            );
        }
    }

    fn check_number(
        &self,
        node: NodeId,
        value: f64,
        object: &SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        if let Some(min) = object.minimum.filter(|min| value < *min) {
            self.report(
                out,
                ProblemKind::Minimum,
                node,
                format!("Value is below the minimum of {}.", min),
            );
        }
        if let Some(min) = object.exclusive_minimum.filter(|min| value <= *min) {
            self.report(
                out,
                ProblemKind::ExclusiveMinimum,
                node,
                format!("Value is below the exclusive minimum of {}.", min),
            );
        }
        if let Some(max) = object.maximum.filter(|max| value > *max) {
            self.report(
                out,
                ProblemKind::Maximum,
                node,
                format!("Value is above the maximum of {}.", max),
            );
        }
        if let Some(max) = object.exclusive_maximum.filter(|max| value >= *max) {
            self.report(
                out,
                ProblemKind::ExclusiveMaximum,
                node,
                format!("Value is above the exclusive maximum of {}.", max),
            );
        }
        if let Some(divisor) = object.multiple_of {
            let quotient = value / divisor;
            if (quotient - quotient.round()).abs() > 1e-9 {
                self.report(
                    out,
                    ProblemKind::MultipleOf,
                    node,
                    format!("Value is not divisible by {}.", divisor),
                );
            }
        }
    }

    fn check_sequence(
        &mut self,
        node: NodeId,
        target: NodeId,
        object: &'a SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        let tree = self.tree;
        let items = tree.items(target);

        if let Some(min) = object.min_items.filter(|min| items.len() < *min) {
            self.report(
                out,
                ProblemKind::MinItems,
                node,
                format!("Array has too few items. Expected {} or more.", min),
            );
        }
        if let Some(max) = object.max_items.filter(|max| items.len() > *max) {
            self.report(
                out,
                ProblemKind::MaxItems,
                node,
                format!("Array has too many items. Expected {} or fewer.", max),
            );
        }
        if object.unique_items {
            let values: Vec<Value> = items.iter().map(|item| tree.to_json(*item)).collect();
            let duplicated = values
                .iter()
                .enumerate()
                .any(|(i, a)| values[i + 1..].iter().any(|b| json_equal(a, b)));
            if duplicated {
                self.report(
                    out,
                    ProblemKind::UniqueItems,
                    node,
                    "Array has duplicate items.".to_string(),
                );
            }
        }

        match &object.items {
            Some(Items::Single(schema)) => {
                for item in items {
                    self.validate(*item, schema, out);
                }
            }
            Some(Items::Tuple(schemas)) => {
                for (item, schema) in items.iter().zip(schemas) {
                    self.validate(*item, schema, out);
                }
                let extra = items.get(schemas.len()..).unwrap_or_default();
                match &object.additional_items {
                    Some(Schema::Bool(false)) => {
                        for item in extra {
                            self.report(
                                out,
                                ProblemKind::AdditionalItems,
                                *item,
                                format!(
                                    "Array has too many items according to schema. Expected {} or fewer.",
                                    schemas.len()
                                ),
                            );
                        }
                    }
                    Some(schema) => {
                        for item in extra {
                            self.validate(*item, schema, out);
                        }
                    }
                    None => {}
                }
            }
            None => {}
        }
    }

    fn check_mapping(
        &mut self,
        node: NodeId,
        target: NodeId,
        object: &'a SchemaObject,
        out: &mut Vec<SchemaProblem>,
    ) {
        let tree = self.tree;
        let entries: Vec<(NodeId, NodeId)> = tree.entries(target).collect();

        for name in &object.required {
            let present = entries
                .iter()
                .any(|(key, _)| tree.key_text(*key) == Some(name.as_str()));
            if !present {
                self.report(
                    out,
                    ProblemKind::MissingProperty,
                    node,
                    format!("Missing property \"{}\".", name),
                );
            }
        }
        if let Some(min) = object.min_properties.filter(|min| entries.len() < *min) {
            self.report(
                out,
                ProblemKind::MinProperties,
                node,
                format!("Object has fewer properties than the required number of {}.", min),
            );
        }
        if let Some(max) = object.max_properties.filter(|max| entries.len() > *max) {
            self.report(
                out,
                ProblemKind::MaxProperties,
                node,
                format!("Object has more properties than the limit of {}.", max),
            );
        }

        let closed = self.options.disable_additional_properties
            && (!object.properties.is_empty() || !object.pattern_properties.is_empty());

        for (key, value) in entries {
            let Some(name) = tree.key_text(key) else {
                continue;
            };

            let mut matched = false;
            if let Some(schema) = object.properties.get(name) {
                matched = true;
                self.validate(value, schema, out);
            }
            for (pattern, schema) in &object.pattern_properties {
                if pattern.is_match(name) {
                    matched = true;
                    self.validate(value, schema, out);
                }
            }
            if matched {
                continue;
            }

            match &object.additional_properties {
                Some(Schema::Bool(false)) => self.not_allowed(key, name, out),
                Some(schema) => self.validate(value, schema, out),
                None if closed => self.not_allowed(key, name, out),
                None => {}
            }
        }
    }

    fn not_allowed(&self, key: NodeId, name: &str, out: &mut Vec<SchemaProblem>) {
        self.report(
            out,
            ProblemKind::PropertyNotAllowed,
            key,
            format!("Property {} is not allowed.", name),
        );
    }

    fn report(&self, out: &mut Vec<SchemaProblem>, kind: ProblemKind, node: NodeId, message: String) {
        out.push(SchemaProblem {
            kind,
            range: self.tree.node(node).range,
            message,
        });
    }
}

fn type_accepts(expected: JsonType, actual: &str, value: Option<&ScalarValue>) -> bool {
    match expected {
        JsonType::Integer => match value {
            Some(ScalarValue::Int(_)) => true,
            Some(ScalarValue::Float(f)) => f.is_finite() && f.fract() == 0.0,
            _ => false,
        },
        JsonType::Number => matches!(actual, "integer" | "number"),
        other => other.as_str() == actual,
    }
}

/// Structural equality where numbers compare by value (`1` equals `1.0`).
fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_equal(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, a)| y.get(key).is_some_and(|b| json_equal(a, b)))
        }
        _ => a == b,
    }
}
