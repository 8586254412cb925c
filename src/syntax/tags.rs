use super::NodeShape;
use crate::error::{Result, YamlLsError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Declares that a local tag such as `!Ref` is accepted and which node kind
/// it must resolve to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTagSpec {
    pub tag: String,
    #[serde(default = "default_kind")]
    pub kind: NodeShape,
}

fn default_kind() -> NodeShape {
    NodeShape::Scalar
}

impl CustomTagSpec {
    pub fn new(tag: impl Into<String>, kind: NodeShape) -> Self {
        Self {
            tag: tag.into(),
            kind,
        }
    }

    /// Parse a `"<tag>"` or `"<tag> <kind>"` declaration. A bare tag name is a
    /// scalar tag.
    pub fn parse(declaration: &str) -> Result<Self> {
        let mut parts = declaration.split_whitespace();
        let tag = parts
            .next()
            .ok_or_else(|| YamlLsError::InvalidSettings("empty custom tag".to_string()))?;

        let kind = match parts.next() {
            None | Some("scalar") => NodeShape::Scalar,
            Some("sequence") => NodeShape::Sequence,
            Some("mapping") => NodeShape::Mapping,
            Some(other) => {
                return Err(YamlLsError::InvalidSettings(format!(
                    "unknown kind '{}' for custom tag {}",
                    other, tag
                )));
            }
        };

        if parts.next().is_some() {
            return Err(YamlLsError::InvalidSettings(format!(
                "unexpected text after custom tag declaration '{}'",
                declaration
            )));
        }

        Ok(Self::new(tag, kind))
    }
}

/// Lookup table of declared custom tags. One tag may be declared for several
/// kinds.
#[derive(Debug, Clone, Default)]
pub struct CustomTags {
    kinds: HashMap<String, Vec<NodeShape>>,
}

impl CustomTags {
    pub fn new(specs: impl IntoIterator<Item = CustomTagSpec>) -> Self {
        let mut kinds: HashMap<String, Vec<NodeShape>> = HashMap::new();
        for spec in specs {
            let entry = kinds.entry(spec.tag).or_default();
            if !entry.contains(&spec.kind) {
                entry.push(spec.kind);
            }
        }
        Self { kinds }
    }

    pub fn kinds(&self, tag: &str) -> Option<&[NodeShape]> {
        self.kinds.get(tag).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_declarations() {
        assert_eq!(
            CustomTagSpec::parse("!Test").unwrap(),
            CustomTagSpec::new("!Test", NodeShape::Scalar)
        );
        assert_eq!(
            CustomTagSpec::parse("!Ref sequence").unwrap(),
            CustomTagSpec::new("!Ref", NodeShape::Sequence)
        );
        assert_eq!(
            CustomTagSpec::parse("  !Map   mapping ").unwrap(),
            CustomTagSpec::new("!Map", NodeShape::Mapping)
        );
    }

    #[test]
    fn test_parse_rejects_bad_declarations() {
        assert!(CustomTagSpec::parse("").is_err());
        assert!(CustomTagSpec::parse("!Ref list").is_err());
        assert!(CustomTagSpec::parse("!Ref scalar extra").is_err());
    }

    #[test]
    fn test_tag_with_several_kinds() {
        let tags = CustomTags::new([
            CustomTagSpec::new("!Ref", NodeShape::Scalar),
            CustomTagSpec::new("!Ref", NodeShape::Sequence),
            CustomTagSpec::new("!Ref", NodeShape::Scalar),
        ]);
        assert_eq!(
            tags.kinds("!Ref"),
            Some(&[NodeShape::Scalar, NodeShape::Sequence][..])
        );
        assert!(tags.kinds("!Other").is_none());
    }
}
