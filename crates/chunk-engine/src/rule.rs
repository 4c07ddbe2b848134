use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// An immutable pattern mapping node types to chunk behavior.
///
/// Rules are consulted only for node types that are not unconditionally
/// chunked or ignored by a [`crate::LanguageConfig`]. When several rules
/// match the same node type, the highest priority wins; ties keep insertion
/// order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRule {
    node_types: BTreeSet<String>,
    priority: i32,
    include_descendants: bool,
    #[serde(default)]
    metadata: Map<String, Value>,
}

impl ChunkRule {
    /// Create a rule matching the given node types at the given priority.
    ///
    /// Descends into matched subtrees by default; use
    /// [`with_descendants`](Self::with_descendants) to stop extraction below
    /// an emitted chunk.
    pub fn new(
        node_types: impl IntoIterator<Item = impl Into<String>>,
        priority: i32,
    ) -> Self {
        Self {
            node_types: node_types.into_iter().map(Into::into).collect(),
            priority,
            include_descendants: true,
            metadata: Map::new(),
        }
    }

    /// Builder: control whether traversal continues below chunks emitted by
    /// this rule
    #[must_use]
    pub const fn with_descendants(mut self, include: bool) -> Self {
        self.include_descendants = include;
        self
    }

    /// Builder: attach an opaque metadata entry carried onto every chunk this
    /// rule emits
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Node types this rule matches
    #[must_use]
    pub const fn node_types(&self) -> &BTreeSet<String> {
        &self.node_types
    }

    /// Resolution priority (higher wins)
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether traversal descends below chunks emitted by this rule
    #[must_use]
    pub const fn include_descendants(&self) -> bool {
        self.include_descendants
    }

    /// Opaque metadata attached to chunks emitted by this rule
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Check whether this rule matches a node type
    #[must_use]
    pub fn matches(&self, node_type: &str) -> bool {
        self.node_types.contains(node_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_only_listed_types() {
        let rule = ChunkRule::new(["lambda", "arrow_function"], 5);
        assert!(rule.matches("lambda"));
        assert!(rule.matches("arrow_function"));
        assert!(!rule.matches("function_definition"));
    }

    #[test]
    fn builder_sets_metadata_and_descent() {
        let rule = ChunkRule::new(["lambda"], 5)
            .with_descendants(false)
            .with_metadata("kind", "lambda");

        assert!(!rule.include_descendants());
        assert_eq!(rule.priority(), 5);
        assert_eq!(
            rule.metadata().get("kind"),
            Some(&Value::String("lambda".to_string()))
        );
    }

    #[test]
    fn descends_by_default() {
        assert!(ChunkRule::new(["lambda"], 0).include_descendants());
    }
}
