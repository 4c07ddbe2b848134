use crate::config::{ChunkHook, ChunkPolicy, ContextStyle};
use crate::rule::ChunkRule;
use std::collections::BTreeSet;
use std::sync::Arc;
use tree_sitter::Node;

/// A chunking policy assembled from one or more parent policies plus its own
/// additions, for language families that share most of their boundaries
/// (e.g. TypeScript extending JavaScript).
///
/// The merged `chunk_types`/`ignore_types`/`rules` are *views*: they are
/// recomputed from the parents on every query, never cached, so
/// [`add_parent`](Self::add_parent) is immediately visible. Parents are held
/// behind `Arc` and are immutable once shared; membership of the parent list
/// is the composite's only mutable state. Parents may themselves be
/// composites; resolution recurses through each level, and a shared ancestor
/// reachable through two parents contributes its rules once per path.
pub struct CompositeLanguageConfig {
    language_id: String,
    parents: Vec<Arc<dyn ChunkPolicy>>,
    chunk_types: BTreeSet<String>,
    ignore_types: BTreeSet<String>,
    rules: Vec<ChunkRule>,
    context: Option<ContextStyle>,
    chunk_hook: Option<ChunkHook>,
}

impl CompositeLanguageConfig {
    /// Create a composite over the given parents, earliest parent first.
    ///
    /// Parent order is the tie-break for equal-priority rules: the earlier
    /// parent's rule resolves first (after the composite's own rules).
    pub fn new(language_id: impl Into<String>, parents: Vec<Arc<dyn ChunkPolicy>>) -> Self {
        Self {
            language_id: language_id.into(),
            parents,
            chunk_types: BTreeSet::new(),
            ignore_types: BTreeSet::new(),
            rules: Vec::new(),
            context: None,
            chunk_hook: None,
        }
    }

    /// Append a parent; the merged views reflect it immediately
    pub fn add_parent(&mut self, parent: Arc<dyn ChunkPolicy>) {
        self.parents.push(parent);
    }

    /// Builder: add own unconditionally chunked node types
    #[must_use]
    pub fn with_chunk_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.chunk_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Builder: add own unconditionally ignored node types
    #[must_use]
    pub fn with_ignore_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ignore_types.extend(types.into_iter().map(Into::into));
        self
    }

    /// Builder: append an own rule (own rules sort before parent rules at
    /// equal priority)
    #[must_use]
    pub fn with_rule(mut self, rule: ChunkRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Builder: set an own context style instead of inheriting the first
    /// parent's
    #[must_use]
    pub const fn with_context(mut self, context: ContextStyle) -> Self {
        self.context = Some(context);
        self
    }

    /// Builder: attach an own chunk hook instead of inheriting one
    #[must_use]
    pub const fn with_chunk_hook(mut self, hook: ChunkHook) -> Self {
        self.chunk_hook = Some(hook);
        self
    }

    /// The parent policies, in tie-break order
    #[must_use]
    pub fn parents(&self) -> &[Arc<dyn ChunkPolicy>] {
        &self.parents
    }
}

impl std::fmt::Debug for CompositeLanguageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeLanguageConfig")
            .field("language_id", &self.language_id)
            .field(
                "parents",
                &self
                    .parents
                    .iter()
                    .map(|p| p.language_id().to_string())
                    .collect::<Vec<_>>(),
            )
            .field("chunk_types", &self.chunk_types)
            .field("ignore_types", &self.ignore_types)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl ChunkPolicy for CompositeLanguageConfig {
    fn language_id(&self) -> &str {
        &self.language_id
    }

    fn chunk_types(&self) -> BTreeSet<&str> {
        let mut types: BTreeSet<&str> = self.chunk_types.iter().map(String::as_str).collect();
        for parent in &self.parents {
            types.extend(parent.chunk_types());
        }
        types
    }

    fn ignore_types(&self) -> BTreeSet<&str> {
        let mut types: BTreeSet<&str> = self.ignore_types.iter().map(String::as_str).collect();
        for parent in &self.parents {
            types.extend(parent.ignore_types());
        }
        types
    }

    fn rules(&self) -> Vec<&ChunkRule> {
        let mut merged: Vec<&ChunkRule> = self.rules.iter().collect();
        for parent in &self.parents {
            merged.extend(parent.rules());
        }
        // Stable sort keeps own-then-parent-argument order within a priority.
        merged.sort_by(|a, b| b.priority().cmp(&a.priority()));
        merged
    }

    fn is_chunk_type(&self, node_type: &str) -> bool {
        self.chunk_types.contains(node_type)
            || self.parents.iter().any(|p| p.is_chunk_type(node_type))
    }

    fn should_ignore_node(&self, node_type: &str) -> bool {
        self.ignore_types.contains(node_type)
            || self.parents.iter().any(|p| p.should_ignore_node(node_type))
    }

    fn context_for_children(&self, node: Node<'_>, source: &str) -> String {
        match self.context {
            Some(style) => style.render(node, source),
            None => self
                .parents
                .first()
                .map_or_else(|| node.kind().to_string(), |p| {
                    p.context_for_children(node, source)
                }),
        }
    }

    fn chunk_hook(&self) -> Option<ChunkHook> {
        self.chunk_hook
            .or_else(|| self.parents.iter().find_map(|p| p.chunk_hook()))
    }
}
