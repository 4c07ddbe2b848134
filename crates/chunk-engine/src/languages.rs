//! Builtin language table.
//!
//! One constructor per language, each a plain data configuration plus the
//! small capabilities it needs (context style, chunk hook). Language
//! families extend a relative through [`CompositeLanguageConfig`] instead of
//! redefining the shared boundary set.

use crate::composite::CompositeLanguageConfig;
use crate::config::{ContextStyle, LanguageConfig};
use crate::registry::LanguageRegistry;
use crate::rule::ChunkRule;
use crate::types::Chunk;
use std::sync::Arc;

/// Python: functions and classes, lambdas via rule
#[must_use]
pub fn python() -> LanguageConfig {
    LanguageConfig::builder("python")
        .chunk_types(["function_definition", "class_definition"])
        .ignore_types(["comment"])
        .rule(ChunkRule::new(["lambda"], 10).with_metadata("kind", "lambda"))
        .context(ContextStyle::LabeledName)
        .build()
        .expect("builtin python configuration is valid")
}

/// Rust: item-level declarations, macro definitions via rule
#[must_use]
pub fn rust() -> LanguageConfig {
    LanguageConfig::builder("rust")
        .chunk_types([
            "function_item",
            "struct_item",
            "enum_item",
            "impl_item",
            "trait_item",
            "mod_item",
            "const_item",
            "static_item",
        ])
        .ignore_types(["line_comment", "block_comment"])
        .rule(ChunkRule::new(["macro_definition"], 5).with_metadata("kind", "macro"))
        .context(ContextStyle::LabeledName)
        .chunk_hook(tag_visibility)
        .build()
        .expect("builtin rust configuration is valid")
}

/// JavaScript: declarations and class members, arrow functions via rule
#[must_use]
pub fn javascript() -> LanguageConfig {
    LanguageConfig::builder("javascript")
        .chunk_types([
            "function_declaration",
            "generator_function_declaration",
            "class_declaration",
            "method_definition",
        ])
        .ignore_types(["comment"])
        .rule(
            ChunkRule::new(["arrow_function"], 5)
                .with_descendants(false)
                .with_metadata("kind", "arrow"),
        )
        .context(ContextStyle::LabeledName)
        .build()
        .expect("builtin javascript configuration is valid")
}

/// TypeScript: JavaScript plus type-level declarations
#[must_use]
pub fn typescript() -> CompositeLanguageConfig {
    CompositeLanguageConfig::new("typescript", vec![Arc::new(javascript())]).with_chunk_types([
        "interface_declaration",
        "enum_declaration",
        "type_alias_declaration",
        "abstract_class_declaration",
    ])
}

/// Mark `pub` Rust items so downstream consumers can filter by visibility
fn tag_visibility(chunk: &mut Chunk) {
    if chunk.node_type.ends_with("_item") && chunk.content.starts_with("pub ") {
        chunk
            .metadata
            .insert("visibility".to_string(), "public".into());
    }
}

impl LanguageRegistry {
    /// A registry pre-populated with the builtin languages, keyed by
    /// identifier and by the usual file extensions
    #[must_use]
    pub fn with_builtin_languages() -> Self {
        let registry = Self::new();
        registry
            .register(Arc::new(python()), &["py"])
            .expect("builtin python registers");
        registry
            .register(Arc::new(rust()), &["rs"])
            .expect("builtin rust registers");
        registry
            .register(Arc::new(javascript()), &["js", "mjs", "cjs"])
            .expect("builtin javascript registers");
        registry
            .register(Arc::new(typescript()), &["ts", "tsx"])
            .expect("builtin typescript registers");
        registry
    }
}
