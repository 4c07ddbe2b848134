use crate::config::{malformed, validate_policy, ChunkPolicy};
use crate::error::{ChunkerError, ConfigViolation, ConfigViolations, Result};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Maps language identifiers and aliases to chunking policies.
///
/// An explicit value to thread through call sites, not process-global state.
/// Registration takes the write lock; lookups take a brief read lock, so
/// independent traversals on separate threads can resolve languages
/// concurrently while registrations proceed.
pub struct LanguageRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    configs: HashMap<String, Arc<dyn ChunkPolicy>>,
    aliases: HashMap<String, String>,
}

impl LanguageRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
        }
    }

    /// Register a policy under its `language_id`, plus any aliases.
    ///
    /// The policy is validated structurally (a composite against its merged
    /// views) and against the registry for identifier collisions; every
    /// violation is reported in one aggregated error and nothing is
    /// registered when any is found.
    pub fn register(&self, config: Arc<dyn ChunkPolicy>, aliases: &[&str]) -> Result<()> {
        let mut violations = validate_policy(config.as_ref());
        let language_id = config.language_id().to_string();

        let mut inner = self.inner.write().expect("registry lock poisoned");

        if inner.configs.contains_key(&language_id) {
            violations.push(ConfigViolation::DuplicateLanguage(language_id.clone()));
        }

        for alias in aliases {
            if malformed(alias) {
                violations.push(ConfigViolation::MalformedAlias((*alias).to_string()));
                continue;
            }
            let taken_by = inner
                .aliases
                .get(*alias)
                .cloned()
                .or_else(|| inner.configs.contains_key(*alias).then(|| (*alias).to_string()));
            if let Some(existing) = taken_by {
                violations.push(ConfigViolation::DuplicateAlias {
                    alias: (*alias).to_string(),
                    existing,
                });
            }
        }

        if !violations.is_empty() {
            return Err(ChunkerError::InvalidConfig(ConfigViolations {
                language_id,
                violations,
            }));
        }

        for alias in aliases {
            inner.aliases.insert((*alias).to_string(), language_id.clone());
        }
        log::debug!(
            "registered language {language_id:?} with {} alias(es)",
            aliases.len()
        );
        inner.configs.insert(language_id, config);
        Ok(())
    }

    /// Look up a policy by language identifier or alias
    #[must_use]
    pub fn get(&self, id_or_alias: &str) -> Option<Arc<dyn ChunkPolicy>> {
        let inner = self.inner.read().expect("registry lock poisoned");
        if let Some(config) = inner.configs.get(id_or_alias) {
            return Some(Arc::clone(config));
        }
        inner
            .aliases
            .get(id_or_alias)
            .and_then(|id| inner.configs.get(id))
            .map(Arc::clone)
    }

    /// All registered language identifiers, sorted
    #[must_use]
    pub fn list_languages(&self) -> Vec<String> {
        let inner = self.inner.read().expect("registry lock poisoned");
        let mut languages: Vec<String> = inner.configs.keys().cloned().collect();
        languages.sort();
        languages
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
