//! # Chunk Engine
//!
//! Boundary-precise extraction of semantic code units ("chunks") from
//! tree-sitter syntax trees, for downstream indexing, embedding, and search.
//!
//! ## Philosophy
//!
//! Parsing stays outside: the engine consumes trees built elsewhere and a
//! per-language policy of which node types mark chunk boundaries. One
//! traversal algorithm serves every language; languages differ only in the
//! data (chunk types, ignore types, prioritized rules) and the small
//! capabilities (context rendering, chunk hooks) they plug into it.
//!
//! ## Architecture
//!
//! ```text
//! Syntax Tree (external parser)
//!     │
//!     ├──> LanguageRegistry ── language id/alias → ChunkPolicy
//!     │        ├─> LanguageConfig (chunk/ignore types + rules)
//!     │        └─> CompositeLanguageConfig (family = parents + additions)
//!     │
//!     ├──> ChunkExtractor
//!     │    ├─> skip ignored subtrees
//!     │    ├─> resolve chunk boundaries (types, then rules by priority)
//!     │    ├─> apply size filters
//!     │    └─> propagate parent context downward
//!     │
//!     └──> Chunk[] in pre-order
//!          (StreamingChunker runs the same walk over byte windows and
//!           reconciles the window boundaries)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use chunk_engine::{languages, ChunkExtractor};
//! use tree_sitter::Parser;
//!
//! let source = "\
//! class Greeter:
//!     def hello(self):
//!         return \"hi\"
//! ";
//!
//! let mut parser = Parser::new();
//! parser
//!     .set_language(&tree_sitter_python::LANGUAGE.into())
//!     .unwrap();
//! let tree = parser.parse(source, None).unwrap();
//!
//! let config = languages::python();
//! let chunks = ChunkExtractor::new(&config).extract(source, tree.root_node(), "greeter.py");
//!
//! assert_eq!(chunks[0].node_type, "class_definition");
//! assert_eq!(chunks[1].parent_context, "class:Greeter");
//! ```

mod composite;
mod config;
mod error;
pub mod languages;
mod registry;
mod rule;
mod streaming;
mod traversal;
mod types;

pub use composite::CompositeLanguageConfig;
pub use config::{symbol_name, ChunkHook, ChunkPolicy, ContextStyle, LanguageConfig, LanguageConfigBuilder};
pub use error::{ChunkerError, ConfigViolation, ConfigViolations, Result};
pub use registry::LanguageRegistry;
pub use rule::ChunkRule;
pub use streaming::{ChunkStream, StreamingChunker, WindowParser, DEFAULT_WINDOW_SIZE};
pub use traversal::{ChunkExtractor, ExtractOptions};
pub use types::{Chunk, ChunkStats};
