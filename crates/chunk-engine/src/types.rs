use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// A semantically meaningful source span selected during traversal.
///
/// Chunks are created only by the traversal engine and never mutated after
/// emission; downstream consumers own them from there (serialization and
/// export happen outside this crate).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Stable identifier derived from the file path, byte span, and node type
    pub chunk_id: String,

    /// Source file path this chunk was extracted from
    pub file_path: String,

    /// Language tag of the policy that emitted this chunk
    pub language: String,

    /// Grammar node type at the chunk boundary (e.g. `function_definition`)
    pub node_type: String,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Byte offset of the first byte of the chunk
    pub byte_start: usize,

    /// Byte offset one past the last byte of the chunk
    pub byte_end: usize,

    /// The decoded source slice
    pub content: String,

    /// Context string built by the nearest enclosing chunk, empty at top level
    pub parent_context: String,

    /// Language-specific annotations (rule metadata, hook output)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

impl Chunk {
    /// Get the number of lines in this chunk
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// The `(byte_start, byte_end, node_type)` span this chunk occupies
    #[must_use]
    pub fn span(&self) -> (usize, usize, &str) {
        (self.byte_start, self.byte_end, &self.node_type)
    }
}

/// Stable 16-hex-character fingerprint for a chunk position.
///
/// Derived from the file path, byte span, and node type so the same chunk
/// gets the same identifier across runs and across streaming windows.
#[must_use]
pub(crate) fn chunk_id(
    file_path: &str,
    byte_start: usize,
    byte_end: usize,
    node_type: &str,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0u8]);
    hasher.update(byte_start.to_be_bytes());
    hasher.update(byte_end.to_be_bytes());
    hasher.update(node_type.as_bytes());
    let digest = hasher.finalize();
    digest[..8].iter().map(|b| format!("{b:02x}")).collect()
}

/// Statistics about an extracted chunk list
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub avg_lines_per_chunk: usize,
    pub min_lines: usize,
    pub max_lines: usize,
}

impl ChunkStats {
    /// Summarize an emitted chunk list
    #[must_use]
    pub fn from_chunks(chunks: &[Chunk]) -> Self {
        let total_lines: usize = chunks.iter().map(Chunk::line_count).sum();
        Self {
            total_chunks: chunks.len(),
            total_lines,
            avg_lines_per_chunk: if chunks.is_empty() {
                0
            } else {
                total_lines / chunks.len()
            },
            min_lines: chunks.iter().map(Chunk::line_count).min().unwrap_or(0),
            max_lines: chunks.iter().map(Chunk::line_count).max().unwrap_or(0),
        }
    }
}

impl std::fmt::Display for ChunkStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Chunks: {} | Lines: {} | Avg: {} | Range: {}-{}",
            self.total_chunks,
            self.total_lines,
            self.avg_lines_per_chunk,
            self.min_lines,
            self.max_lines
        )
    }
}
