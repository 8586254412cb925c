//! JSON Schema documents compiled into a typed, recursive model.
//!
//! Schemas are self-describing and dynamically shaped, so they are modelled
//! as a tagged variant: a boolean schema or an object schema whose keywords
//! may themselves hold schemas, lists of schemas or tuples of schemas.
pub mod fetch;
pub mod resolver;

pub use fetch::{FileSchemaFetcher, MemorySchemaFetcher, SchemaFetcher};
pub use resolver::{
    ResolvedSchema, SchemaBinding, SchemaConfiguration, SchemaMergePolicy, SchemaResolver,
    modeline_schema,
};

use crate::error::{Result, YamlLsError};
use indexmap::IndexMap;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub enum Schema {
    Bool(bool),
    Object(Box<SchemaObject>),
}

impl Schema {
    pub fn as_object(&self) -> Option<&SchemaObject> {
        match self {
            Schema::Object(object) => Some(object),
            Schema::Bool(_) => None,
        }
    }

    pub fn description(&self) -> Option<&str> {
        let object = self.as_object()?;
        object.description.as_deref().or(object.title.as_deref())
    }
}

#[derive(Debug, Clone)]
pub enum Items {
    Single(Schema),
    Tuple(Vec<Schema>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Number,
    String,
    Array,
    Object,
}

impl JsonType {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "null" => JsonType::Null,
            "boolean" => JsonType::Boolean,
            "integer" => JsonType::Integer,
            "number" => JsonType::Number,
            "string" => JsonType::String,
            "array" => JsonType::Array,
            "object" => JsonType::Object,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JsonType::Null => "null",
            JsonType::Boolean => "boolean",
            JsonType::Integer => "integer",
            JsonType::Number => "number",
            JsonType::String => "string",
            JsonType::Array => "array",
            JsonType::Object => "object",
        }
    }
}

/// An object schema. Keywords this engine does not know are dropped at
/// compile time.
#[derive(Debug, Clone, Default)]
pub struct SchemaObject {
    pub reference: Option<String>,
    pub types: Vec<JsonType>,
    pub enum_values: Option<Vec<Value>>,
    pub const_value: Option<Value>,

    pub properties: IndexMap<String, Schema>,
    pub pattern_properties: Vec<(Regex, Schema)>,
    pub additional_properties: Option<Schema>,
    pub required: Vec<String>,
    pub min_properties: Option<usize>,
    pub max_properties: Option<usize>,

    pub items: Option<Items>,
    pub additional_items: Option<Schema>,
    pub min_items: Option<usize>,
    pub max_items: Option<usize>,
    pub unique_items: bool,

    pub pattern: Option<Regex>,
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,

    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub exclusive_minimum: Option<f64>,
    pub exclusive_maximum: Option<f64>,
    pub multiple_of: Option<f64>,

    pub all_of: Vec<Schema>,
    pub any_of: Vec<Schema>,
    pub one_of: Vec<Schema>,
    pub not: Option<Schema>,

    pub title: Option<String>,
    pub description: Option<String>,
}

/// A compiled schema together with every local `$ref` target it uses.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    pub uri: String,
    pub root: Schema,
    refs: HashMap<String, Schema>,
}

impl SchemaDocument {
    /// Parse schema text. JSON is tried first; YAML is accepted as well.
    pub fn parse(uri: &str, content: &str) -> Result<Self> {
        let value: Value = match serde_json::from_str(content) {
            Ok(value) => value,
            Err(json_err) => serde_yaml::from_str(content).map_err(|yaml_err| {
                YamlLsError::SchemaParseError {
                    uri: uri.to_string(),
                    message: format!("not JSON ({}) nor YAML ({})", json_err, yaml_err),
                }
            })?,
        };

        if !value.is_object() && !value.is_boolean() {
            return Err(YamlLsError::SchemaParseError {
                uri: uri.to_string(),
                message: "a schema must be an object or a boolean".to_string(),
            });
        }

        Ok(Self::from_value(uri, &value))
    }

    pub fn from_value(uri: &str, value: &Value) -> Self {
        let mut compiler = Compiler {
            uri,
            pending: Vec::new(),
            refs: HashMap::new(),
        };
        let root = compiler.compile(value);

        while let Some(reference) = compiler.pending.pop() {
            if compiler.refs.contains_key(&reference) {
                continue;
            }
            // Placeholder first so self-referencing targets terminate.
            compiler.refs.insert(reference.clone(), Schema::Bool(true));
            match resolve_pointer(value, &reference) {
                Some(target) => {
                    let compiled = compiler.compile(target);
                    compiler.refs.insert(reference, compiled);
                }
                None => {
                    tracing::warn!(schema = uri, reference = %reference, "Unresolvable $ref");
                    compiler.refs.remove(&reference);
                }
            }
        }

        Self {
            uri: uri.to_string(),
            root,
            refs: compiler.refs,
        }
    }

    pub fn resolve_ref(&self, reference: &str) -> Option<&Schema> {
        self.refs.get(reference)
    }
}

fn resolve_pointer<'v>(root: &'v Value, reference: &str) -> Option<&'v Value> {
    let pointer = reference.strip_prefix('#')?;
    root.pointer(&pointer.replace("%25", "%").replace("%20", " "))
}

struct Compiler<'v> {
    uri: &'v str,
    pending: Vec<String>,
    refs: HashMap<String, Schema>,
}

impl Compiler<'_> {
    fn compile(&mut self, value: &Value) -> Schema {
        match value {
            Value::Bool(b) => Schema::Bool(*b),
            Value::Object(map) => Schema::Object(Box::new(self.compile_object(map))),
            _ => Schema::Bool(true),
        }
    }

    fn compile_list(&mut self, value: Option<&Value>) -> Vec<Schema> {
        value
            .and_then(Value::as_array)
            .map(|list| list.iter().map(|v| self.compile(v)).collect())
            .unwrap_or_default()
    }

    fn compile_object(&mut self, map: &Map<String, Value>) -> SchemaObject {
        let mut object = SchemaObject::default();

        if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
            if reference.starts_with('#') {
                if !self.refs.contains_key(reference) {
                    self.pending.push(reference.to_string());
                }
            } else {
                tracing::debug!(schema = self.uri, reference, "Ignoring non-local $ref");
            }
            object.reference = Some(reference.to_string());
        }

        object.types = match map.get("type") {
            Some(Value::String(name)) => JsonType::parse(name).into_iter().collect(),
            Some(Value::Array(names)) => names
                .iter()
                .filter_map(Value::as_str)
                .filter_map(JsonType::parse)
                .collect(),
            _ => Vec::new(),
        };

        object.enum_values = map.get("enum").and_then(Value::as_array).cloned();
        object.const_value = map.get("const").cloned();

        if let Some(properties) = map.get("properties").and_then(Value::as_object) {
            for (name, schema) in properties {
                let compiled = self.compile(schema);
                object.properties.insert(name.clone(), compiled);
            }
        }
        if let Some(patterns) = map.get("patternProperties").and_then(Value::as_object) {
            for (pattern, schema) in patterns {
                if let Some(regex) = self.regex(pattern) {
                    let compiled = self.compile(schema);
                    object.pattern_properties.push((regex, compiled));
                }
            }
        }
        object.additional_properties = map.get("additionalProperties").map(|v| self.compile(v));
        object.required = map
            .get("required")
            .and_then(Value::as_array)
            .map(|names| {
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        object.min_properties = as_usize(map.get("minProperties"));
        object.max_properties = as_usize(map.get("maxProperties"));

        object.items = match map.get("items") {
            Some(Value::Array(list)) => {
                Some(Items::Tuple(list.iter().map(|v| self.compile(v)).collect()))
            }
            Some(schema) => Some(Items::Single(self.compile(schema))),
            None => None,
        };
        object.additional_items = map.get("additionalItems").map(|v| self.compile(v));
        object.min_items = as_usize(map.get("minItems"));
        object.max_items = as_usize(map.get("maxItems"));
        object.unique_items = map
            .get("uniqueItems")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        object.pattern = map
            .get("pattern")
            .and_then(Value::as_str)
            .and_then(|p| self.regex(p));
        object.min_length = as_usize(map.get("minLength"));
        object.max_length = as_usize(map.get("maxLength"));

        object.minimum = map.get("minimum").and_then(Value::as_f64);
        object.maximum = map.get("maximum").and_then(Value::as_f64);
        // Draft 4 spells exclusivity as a flag on minimum/maximum.
        match map.get("exclusiveMinimum") {
            Some(Value::Bool(true)) => object.exclusive_minimum = object.minimum.take(),
            Some(value) => object.exclusive_minimum = value.as_f64(),
            None => {}
        }
        match map.get("exclusiveMaximum") {
            Some(Value::Bool(true)) => object.exclusive_maximum = object.maximum.take(),
            Some(value) => object.exclusive_maximum = value.as_f64(),
            None => {}
        }
        object.multiple_of = map
            .get("multipleOf")
            .and_then(Value::as_f64)
            .filter(|m| *m > 0.0);

        object.all_of = self.compile_list(map.get("allOf"));
        object.any_of = self.compile_list(map.get("anyOf"));
        object.one_of = self.compile_list(map.get("oneOf"));
        object.not = map.get("not").map(|v| self.compile(v));

        object.title = map.get("title").and_then(Value::as_str).map(str::to_string);
        object.description = map
            .get("description")
            .and_then(Value::as_str)
            .map(str::to_string);

        object
    }

    fn regex(&self, pattern: &str) -> Option<Regex> {
        match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(err) => {
                tracing::warn!(schema = self.uri, pattern, "Ignoring invalid pattern: {}", err);
                None
            }
        }
    }
}

fn as_usize(value: Option<&Value>) -> Option<usize> {
    value.and_then(Value::as_u64).map(|n| n as usize)
}
