//! Preload specifications - trees naming which associations to eager load

use serde_json::Value as JsonValue;

use crate::error::{PreloadError, PreloadResult};

/// A tree of association names to preload.
///
/// Mirrors the three shapes accepted at the API boundary: a single name, a
/// list of sibling subtrees applied to the same owners, and a mapping from
/// parent names to child subtrees loaded against the parents' results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreloadSpec {
    /// A single association name
    Name(String),
    /// Sibling subtrees, each applied to the same owners
    List(Vec<PreloadSpec>),
    /// Parent association names mapped to the subtree loaded on their results
    Mapping(Vec<(String, PreloadSpec)>),
}

impl PreloadSpec {
    /// Create a leaf node naming one association
    pub fn name(name: impl Into<String>) -> Self {
        PreloadSpec::Name(name.into())
    }

    /// Create a list node from sibling subtrees
    pub fn list(items: Vec<PreloadSpec>) -> Self {
        PreloadSpec::List(items)
    }

    /// Create a mapping node from parent names and child subtrees
    pub fn mapping(pairs: Vec<(impl Into<String>, PreloadSpec)>) -> Self {
        PreloadSpec::Mapping(
            pairs
                .into_iter()
                .map(|(name, child)| (name.into(), child))
                .collect(),
        )
    }

    /// Create a mapping node with a single parent name and child subtree
    pub fn nested(name: impl Into<String>, child: PreloadSpec) -> Self {
        PreloadSpec::Mapping(vec![(name.into(), child)])
    }

    /// Parse a dotted association path such as `commentable.project`.
    ///
    /// A path with no dots parses to a leaf; each further segment nests one
    /// mapping level deeper.
    pub fn parse(path: &str) -> PreloadResult<Self> {
        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(PreloadError::InvalidSpec {
                value: JsonValue::String(path.to_string()),
            });
        }

        let mut spec = PreloadSpec::Name(segments[segments.len() - 1].to_string());
        for segment in segments[..segments.len() - 1].iter().rev() {
            spec = PreloadSpec::Mapping(vec![(segment.to_string(), spec)]);
        }
        Ok(spec)
    }

    /// Parse a comma-separated list of dotted paths such as
    /// `commentable.project, comments`
    pub fn parse_list(paths: &str) -> PreloadResult<Self> {
        let mut specs = Vec::new();
        for path in paths.split(',') {
            let path = path.trim();
            if path.is_empty() {
                return Err(PreloadError::InvalidSpec {
                    value: JsonValue::String(paths.to_string()),
                });
            }
            specs.push(PreloadSpec::parse(path)?);
        }
        Ok(PreloadSpec::List(specs))
    }

    /// The association names at the top level of this tree
    pub fn names(&self) -> Vec<&str> {
        match self {
            PreloadSpec::Name(name) => vec![name.as_str()],
            PreloadSpec::List(items) => items.iter().flat_map(PreloadSpec::names).collect(),
            PreloadSpec::Mapping(pairs) => {
                pairs.iter().map(|(name, _)| name.as_str()).collect()
            }
        }
    }

    /// Count the association names in this tree, nested names included
    pub fn len(&self) -> usize {
        match self {
            PreloadSpec::Name(_) => 1,
            PreloadSpec::List(items) => items.iter().map(PreloadSpec::len).sum(),
            PreloadSpec::Mapping(pairs) => pairs
                .iter()
                .map(|(_, child)| 1 + child.len())
                .sum(),
        }
    }

    /// Returns true if this tree names no associations
    pub fn is_empty(&self) -> bool {
        match self {
            PreloadSpec::Name(_) => false,
            PreloadSpec::List(items) => items.iter().all(PreloadSpec::is_empty),
            PreloadSpec::Mapping(pairs) => pairs.is_empty(),
        }
    }
}

impl TryFrom<&JsonValue> for PreloadSpec {
    type Error = PreloadError;

    /// Classify an untyped value into a preload tree.
    ///
    /// Strings become (possibly dotted) paths, arrays become lists, objects
    /// become mappings. Anything else is rejected up front so malformed
    /// input fails before any loading starts.
    fn try_from(value: &JsonValue) -> PreloadResult<Self> {
        match value {
            JsonValue::String(path) => PreloadSpec::parse(path),
            JsonValue::Array(items) => {
                let mut specs = Vec::with_capacity(items.len());
                for item in items {
                    specs.push(PreloadSpec::try_from(item)?);
                }
                Ok(PreloadSpec::List(specs))
            }
            JsonValue::Object(map) => {
                let mut pairs = Vec::with_capacity(map.len());
                for (name, child) in map {
                    if name.is_empty() {
                        return Err(PreloadError::InvalidSpec {
                            value: value.clone(),
                        });
                    }
                    pairs.push((name.clone(), PreloadSpec::try_from(child)?));
                }
                Ok(PreloadSpec::Mapping(pairs))
            }
            other => Err(PreloadError::InvalidSpec {
                value: other.clone(),
            }),
        }
    }
}
