use crate::error::{ChunkerError, ConfigViolation, ConfigViolations, Result};
use crate::rule::ChunkRule;
use crate::types::Chunk;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tree_sitter::Node;

/// Per-language hook applied to each chunk before emission
pub type ChunkHook = fn(&mut Chunk);

/// The decision surface a traversal consults for one language.
///
/// Implemented by [`LanguageConfig`] for a single language and by
/// [`crate::CompositeLanguageConfig`] for language families. The resolution
/// algorithm lives in the default methods: an ignored type is removed from
/// candidacy unconditionally, an unconditional chunk type wins next, and
/// rules are scanned last in priority order.
pub trait ChunkPolicy: Send + Sync {
    /// Unique language identifier
    fn language_id(&self) -> &str;

    /// Computed view of every unconditionally chunked node type
    fn chunk_types(&self) -> BTreeSet<&str>;

    /// Computed view of every ignored node type
    fn ignore_types(&self) -> BTreeSet<&str>;

    /// Computed view of all rules, sorted by priority descending with stable
    /// ties
    fn rules(&self) -> Vec<&ChunkRule>;

    /// Whether the node type is unconditionally chunked
    fn is_chunk_type(&self, node_type: &str) -> bool;

    /// Whether the node type and its whole subtree are skipped
    fn should_ignore_node(&self, node_type: &str) -> bool;

    /// Decide whether a node of this type is a chunk boundary.
    ///
    /// The syntactic parent type is provided for implementations that want
    /// it; the default resolution does not consult it.
    fn should_chunk_node(&self, node_type: &str, _parent_type: Option<&str>) -> bool {
        if self.should_ignore_node(node_type) {
            return false;
        }
        if self.is_chunk_type(node_type) {
            return true;
        }
        self.matched_rule(node_type).is_some()
    }

    /// First rule matching the node type, in priority order
    fn matched_rule(&self, node_type: &str) -> Option<&ChunkRule> {
        self.rules().into_iter().find(|rule| rule.matches(node_type))
    }

    /// Metadata of the highest-priority rule matching the node type, empty
    /// when none matches
    fn chunk_metadata(&self, node_type: &str) -> Map<String, Value> {
        self.matched_rule(node_type)
            .map(|rule| rule.metadata().clone())
            .unwrap_or_default()
    }

    /// Context string inherited by the children of an emitted chunk
    fn context_for_children(&self, node: Node<'_>, source: &str) -> String {
        let _ = source;
        node.kind().to_string()
    }

    /// Optional per-language chunk post-processing hook
    fn chunk_hook(&self) -> Option<ChunkHook> {
        None
    }
}

/// How a language renders the context string its chunks hand to their
/// children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ContextStyle {
    /// The raw grammar node type (e.g. `class_definition`)
    #[default]
    NodeType,
    /// A label derived from the node type plus the declared name, e.g.
    /// `class:Bar` or `function:f`; falls back to the node type when the
    /// node declares no name
    LabeledName,
}

impl ContextStyle {
    /// Render the context string for the children of `node`
    #[must_use]
    pub fn render(self, node: Node<'_>, source: &str) -> String {
        match self {
            Self::NodeType => node.kind().to_string(),
            Self::LabeledName => {
                let kind = node.kind();
                let label = kind
                    .strip_suffix("_definition")
                    .or_else(|| kind.strip_suffix("_declaration"))
                    .or_else(|| kind.strip_suffix("_item"))
                    .unwrap_or(kind);
                match symbol_name(node, source) {
                    Some(name) => format!("{label}:{name}"),
                    None => kind.to_string(),
                }
            }
        }
    }
}

/// Extract the declared name of a definition-like node.
///
/// Grammars disagree on the node kind carrying the name, so the common
/// identifier kinds are all accepted.
#[must_use]
pub fn symbol_name(node: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        let is_name_node = matches!(
            child.kind(),
            "identifier" | "name" | "type_identifier" | "field_identifier" | "property_identifier"
        );

        if is_name_node {
            return source
                .get(child.start_byte()..child.end_byte())
                .map(str::to_string);
        }
    }
    None
}

/// Chunking policy for a single language: unconditional chunk types,
/// unconditional ignore types, and a priority-ordered rule list.
///
/// Construct through [`LanguageConfig::builder`]; invalid configurations are
/// rejected at build time with every violation aggregated into one error.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    language_id: String,
    chunk_types: BTreeSet<String>,
    ignore_types: BTreeSet<String>,
    rules: Vec<ChunkRule>,
    context: ContextStyle,
    chunk_hook: Option<ChunkHook>,
}

impl LanguageConfig {
    /// Start building a configuration for the given language
    pub fn builder(language_id: impl Into<String>) -> LanguageConfigBuilder {
        LanguageConfigBuilder {
            language_id: language_id.into(),
            chunk_types: BTreeSet::new(),
            ignore_types: BTreeSet::new(),
            rules: Vec::new(),
            context: ContextStyle::default(),
            chunk_hook: None,
        }
    }
}

impl ChunkPolicy for LanguageConfig {
    fn language_id(&self) -> &str {
        &self.language_id
    }

    fn chunk_types(&self) -> BTreeSet<&str> {
        self.chunk_types.iter().map(String::as_str).collect()
    }

    fn ignore_types(&self) -> BTreeSet<&str> {
        self.ignore_types.iter().map(String::as_str).collect()
    }

    fn rules(&self) -> Vec<&ChunkRule> {
        self.rules.iter().collect()
    }

    fn is_chunk_type(&self, node_type: &str) -> bool {
        self.chunk_types.contains(node_type)
    }

    fn should_ignore_node(&self, node_type: &str) -> bool {
        self.ignore_types.contains(node_type)
    }

    fn context_for_children(&self, node: Node<'_>, source: &str) -> String {
        self.context.render(node, source)
    }

    fn chunk_hook(&self) -> Option<ChunkHook> {
        self.chunk_hook
    }
}

/// Builder for [`LanguageConfig`]; `build` validates and sorts the rule list
#[derive(Debug, Clone)]
pub struct LanguageConfigBuilder {
    language_id: String,
    chunk_types: BTreeSet<String>,
    ignore_types: BTreeSet<String>,
    rules: Vec<ChunkRule>,
    context: ContextStyle,
    chunk_hook: Option<ChunkHook>,
}

impl LanguageConfigBuilder {
    /// Add unconditionally chunked node types
    #[must_use]
    pub fn chunk_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.chunk_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Add unconditionally ignored node types
    #[must_use]
    pub fn ignore_types(mut self, types: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.ignore_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Append a rule; relative order of equal-priority rules is preserved
    #[must_use]
    pub fn rule(mut self, rule: ChunkRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Set the context rendering style
    #[must_use]
    pub const fn context(mut self, context: ContextStyle) -> Self {
        self.context = context;
        self
    }

    /// Attach a per-chunk post-processing hook
    #[must_use]
    pub const fn chunk_hook(mut self, hook: ChunkHook) -> Self {
        self.chunk_hook = Some(hook);
        self
    }

    /// Validate and finish the configuration.
    ///
    /// All violations are aggregated into a single
    /// [`ConfigViolations`] error rather than reported one at a time.
    pub fn build(mut self) -> Result<LanguageConfig> {
        // Stable sort: equal priorities keep insertion order.
        self.rules
            .sort_by(|a, b| b.priority().cmp(&a.priority()));

        let config = LanguageConfig {
            language_id: self.language_id,
            chunk_types: self.chunk_types,
            ignore_types: self.ignore_types,
            rules: self.rules,
            context: self.context,
            chunk_hook: self.chunk_hook,
        };

        let violations = validate_policy(&config);
        if violations.is_empty() {
            Ok(config)
        } else {
            Err(ChunkerError::InvalidConfig(ConfigViolations {
                language_id: config.language_id,
                violations,
            }))
        }
    }
}

/// Structural validation shared by plain and composite configurations.
///
/// Operates on the computed views, so a composite is checked against the
/// merged types and rules it actually exposes.
pub(crate) fn validate_policy(policy: &dyn ChunkPolicy) -> Vec<ConfigViolation> {
    let mut violations = Vec::new();

    if policy.language_id().trim().is_empty() {
        violations.push(ConfigViolation::EmptyLanguageId);
    }

    let chunk_types = policy.chunk_types();
    let ignore_types = policy.ignore_types();

    if chunk_types.is_empty() {
        violations.push(ConfigViolation::EmptyChunkTypes);
    }

    for (field, types) in [("chunk_types", &chunk_types), ("ignore_types", &ignore_types)] {
        for node_type in types.iter() {
            if malformed(node_type) {
                violations.push(ConfigViolation::MalformedNodeType {
                    node_type: (*node_type).to_string(),
                    field,
                });
            }
        }
    }

    let overlap: Vec<String> = chunk_types
        .intersection(&ignore_types)
        .map(|t| (*t).to_string())
        .collect();
    if !overlap.is_empty() {
        violations.push(ConfigViolation::OverlappingTypes(overlap));
    }

    for (index, rule) in policy.rules().iter().enumerate() {
        if rule.node_types().is_empty() {
            violations.push(ConfigViolation::EmptyRulePattern { index });
        }
        if rule.priority() < 0 {
            violations.push(ConfigViolation::NegativePriority {
                index,
                priority: rule.priority(),
            });
        }
        for node_type in rule.node_types() {
            if malformed(node_type) {
                violations.push(ConfigViolation::MalformedNodeType {
                    node_type: node_type.clone(),
                    field: "rule node_types",
                });
            }
        }
    }

    violations
}

pub(crate) fn malformed(node_type: &str) -> bool {
    node_type.is_empty() || node_type.chars().any(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse_python(source: &str) -> tree_sitter::Tree {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .expect("python grammar loads");
        parser.parse(source, None).expect("source parses")
    }

    #[test]
    fn rules_sort_by_priority_descending_with_stable_ties() {
        let config = LanguageConfig::builder("test")
            .chunk_types(["function_definition"])
            .rule(ChunkRule::new(["a"], 5).with_metadata("tag", "first_five"))
            .rule(ChunkRule::new(["b"], 10))
            .rule(ChunkRule::new(["c"], 1))
            .rule(ChunkRule::new(["a"], 5).with_metadata("tag", "second_five"))
            .build()
            .expect("valid config");

        let priorities: Vec<i32> = config.rules().iter().map(|r| r.priority()).collect();
        assert_eq!(priorities, vec![10, 5, 5, 1]);

        // The first-added rule of a tied priority still resolves first.
        let matched = config.matched_rule("a").expect("rule matches");
        assert_eq!(
            matched.metadata().get("tag"),
            Some(&serde_json::Value::String("first_five".to_string()))
        );
    }

    #[test]
    fn overlapping_chunk_and_ignore_types_are_rejected_by_name() {
        let err = LanguageConfig::builder("test")
            .chunk_types(["function_definition", "comment"])
            .ignore_types(["comment"])
            .build()
            .expect_err("overlap must be rejected");

        let ChunkerError::InvalidConfig(violations) = err else {
            panic!("expected InvalidConfig, got: {err}");
        };
        assert_eq!(
            violations.violations,
            vec![ConfigViolation::OverlappingTypes(vec![
                "comment".to_string()
            ])]
        );
    }

    #[test]
    fn every_violation_is_reported_in_one_error() {
        let err = LanguageConfig::builder("")
            .rule(ChunkRule::new(Vec::<String>::new(), -3))
            .rule(ChunkRule::new(["has space"], 1))
            .build()
            .expect_err("invalid config must be rejected");

        let ChunkerError::InvalidConfig(violations) = err else {
            panic!("expected InvalidConfig, got: {err}");
        };
        let violations = violations.violations;

        assert!(violations.contains(&ConfigViolation::EmptyLanguageId));
        assert!(violations.contains(&ConfigViolation::EmptyChunkTypes));
        assert!(violations.contains(&ConfigViolation::EmptyRulePattern { index: 1 }));
        assert!(violations.contains(&ConfigViolation::NegativePriority {
            index: 1,
            priority: -3
        }));
        assert!(violations.iter().any(|v| matches!(
            v,
            ConfigViolation::MalformedNodeType { node_type, .. } if node_type == "has space"
        )));
    }

    #[test]
    fn ignore_wins_over_explicit_rules() {
        let config = LanguageConfig::builder("test")
            .chunk_types(["function_definition"])
            .ignore_types(["comment"])
            .rule(ChunkRule::new(["comment"], 100))
            .build()
            .expect("rules may overlap the ignore set");

        assert!(!config.should_chunk_node("comment", None));
        assert!(config.should_ignore_node("comment"));
    }

    #[test]
    fn resolution_order_is_ignore_then_chunk_types_then_rules() {
        let config = LanguageConfig::builder("test")
            .chunk_types(["function_definition"])
            .rule(ChunkRule::new(["lambda"], 5))
            .build()
            .expect("valid config");

        assert!(config.should_chunk_node("function_definition", None));
        assert!(config.should_chunk_node("lambda", None));
        assert!(!config.should_chunk_node("identifier", None));
    }

    #[test]
    fn chunk_metadata_comes_from_highest_priority_match() {
        let config = LanguageConfig::builder("test")
            .chunk_types(["function_definition"])
            .rule(ChunkRule::new(["lambda"], 1).with_metadata("source", "low"))
            .rule(ChunkRule::new(["lambda"], 9).with_metadata("source", "high"))
            .build()
            .expect("valid config");

        assert_eq!(
            config.chunk_metadata("lambda").get("source"),
            Some(&serde_json::Value::String("high".to_string()))
        );
        assert!(config.chunk_metadata("function_definition").is_empty());
    }

    #[test]
    fn labeled_name_context_extracts_declared_names() {
        let source = "class Widget:\n    pass\n";
        let tree = parse_python(source);
        let class_node = tree.root_node().child(0).expect("class node");
        assert_eq!(class_node.kind(), "class_definition");

        assert_eq!(
            ContextStyle::LabeledName.render(class_node, source),
            "class:Widget"
        );
        assert_eq!(
            ContextStyle::NodeType.render(class_node, source),
            "class_definition"
        );
    }

    #[test]
    fn labeled_name_falls_back_to_node_type_without_a_name() {
        let source = "g = lambda x: x + 1\n";
        let tree = parse_python(source);
        // module -> expression_statement -> assignment -> lambda
        let lambda = tree
            .root_node()
            .child(0)
            .and_then(|n| n.child(0))
            .and_then(|n| n.child_by_field_name("right"))
            .expect("lambda node");
        assert_eq!(lambda.kind(), "lambda");

        assert_eq!(ContextStyle::LabeledName.render(lambda, source), "lambda");
    }
}
