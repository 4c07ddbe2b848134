use crate::config::ChunkPolicy;
use crate::types::{chunk_id, Chunk};
use std::rc::Rc;
use tree_sitter::Node;

/// Line-count filters applied to every chunk candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Minimum number of lines a candidate must span to be emitted
    pub min_chunk_lines: usize,

    /// Maximum number of lines a candidate may span, unlimited when `None`
    pub max_chunk_lines: Option<usize>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            min_chunk_lines: 1,
            max_chunk_lines: None,
        }
    }
}

/// Walks an externally parsed syntax tree and emits chunks per one
/// language's [`ChunkPolicy`].
///
/// The walk is depth-first pre-order over an explicit work stack, so source
/// nesting depth never threatens the host call stack. It reads the tree and
/// the source buffer, never mutates either, and performs no IO; error
/// recovery artifacts in the tree (`ERROR`, `MISSING` nodes) are traversed
/// like any other node.
pub struct ChunkExtractor<'p> {
    policy: &'p dyn ChunkPolicy,
    options: ExtractOptions,
}

impl<'p> ChunkExtractor<'p> {
    /// Create an extractor with default size filters
    pub fn new(policy: &'p dyn ChunkPolicy) -> Self {
        Self {
            policy,
            options: ExtractOptions::default(),
        }
    }

    /// Create an extractor with explicit size filters
    pub const fn with_options(policy: &'p dyn ChunkPolicy, options: ExtractOptions) -> Self {
        Self { policy, options }
    }

    /// Extract chunks from the tree rooted at `root`, in pre-order.
    ///
    /// `source` must be the buffer the tree was parsed from; byte offsets in
    /// emitted chunks index into it. An ancestor's chunk always precedes its
    /// descendants' chunks, and siblings are emitted left to right.
    pub fn extract<'tree>(
        &self,
        source: &str,
        root: Node<'tree>,
        file_path: &str,
    ) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let top_level: Rc<str> = Rc::from("");
        let mut stack: Vec<(Node<'tree>, Rc<str>)> = vec![(root, top_level)];

        while let Some((node, context)) = stack.pop() {
            let node_type = node.kind();

            if self.policy.should_ignore_node(node_type) {
                log::debug!("skipping ignored subtree: {node_type}");
                continue;
            }

            let parent_type = node.parent().map(|p| p.kind());
            let mut child_context = Rc::clone(&context);
            let mut descend = true;

            if self.policy.should_chunk_node(node_type, parent_type) {
                if self.within_size_limits(node) {
                    chunks.push(self.emit(source, node, file_path, &context));
                    child_context = Rc::from(self.policy.context_for_children(node, source));
                    // An unconditional chunk type always descends; a rule
                    // match descends unless the rule opts out.
                    if !self.policy.is_chunk_type(node_type) {
                        descend = self
                            .policy
                            .matched_rule(node_type)
                            .map_or(true, |rule| rule.include_descendants());
                    }
                } else {
                    // A filtered-out candidate is discarded, but its children
                    // are still evaluated against the same policy with the
                    // inherited context.
                    log::debug!(
                        "discarding {node_type} candidate at line {}: outside size limits",
                        node.start_position().row + 1
                    );
                }
            }

            if descend {
                for i in (0..node.child_count()).rev() {
                    if let Some(child) = node.child(i) {
                        stack.push((child, Rc::clone(&child_context)));
                    }
                }
            }
        }

        chunks
    }

    fn within_size_limits(&self, node: Node<'_>) -> bool {
        let lines = node.end_position().row - node.start_position().row + 1;
        lines >= self.options.min_chunk_lines
            && self.options.max_chunk_lines.map_or(true, |max| lines <= max)
    }

    fn emit(&self, source: &str, node: Node<'_>, file_path: &str, context: &str) -> Chunk {
        let node_type = node.kind();
        let byte_start = node.start_byte();
        let byte_end = node.end_byte();

        let mut chunk = Chunk {
            chunk_id: chunk_id(file_path, byte_start, byte_end, node_type),
            file_path: file_path.to_string(),
            language: self.policy.language_id().to_string(),
            node_type: node_type.to_string(),
            start_line: node.start_position().row + 1,
            end_line: node.end_position().row + 1,
            byte_start,
            byte_end,
            content: source
                .get(byte_start..byte_end)
                .unwrap_or_default()
                .to_string(),
            parent_context: context.to_string(),
            metadata: self.policy.chunk_metadata(node_type),
        };

        if let Some(hook) = self.policy.chunk_hook() {
            hook(&mut chunk);
        }

        chunk
    }
}
