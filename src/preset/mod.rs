use std::collections::HashMap;
use std::path::Path;

use lazy_static::lazy_static;

use crate::error::CodeRunError;

pub use default::DEFAULT_IMAGE;
pub use spec::LanguageSpec;

use default::{CPP_PRESET, JAVASCRIPT_PRESET, PYTHON_PRESET};

mod default;
mod spec;

lazy_static! {
  static ref LANGUAGE_ALIAS_MAP: HashMap<&'static str, &'static str> = {
    let mut map = HashMap::new();
    map.insert("cc", "cpp");
    map.insert("c++", "cpp");
    map.insert("cxx", "cpp");
    map.insert("python", "py");
    map.insert("python3", "py");
    map.insert("javascript", "js");
    map.insert("node", "js");
    map.insert("nodejs", "js");
    map
  };
  static ref DEFAULT_REGISTRY: LanguageRegistry = LanguageRegistry::empty()
    .with(CPP_PRESET.clone())
    .with(PYTHON_PRESET.clone())
    .with(JAVASCRIPT_PRESET.clone());
}

/// Language tag -> sandbox recipe
///
/// A registry is assembled up front and then shared read-only by an engine.
/// `LanguageRegistry::default()` carries the built-in `cpp`, `py` and `js`.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
  languages: HashMap<String, LanguageSpec>,
}

impl LanguageRegistry {
  pub fn empty() -> Self {
    LanguageRegistry {
      languages: HashMap::new(),
    }
  }

  /// Add a language, returning the entry it replaced
  pub fn register(&mut self, spec: LanguageSpec) -> Option<LanguageSpec> {
    self.languages.insert(spec.tag().to_string(), spec)
  }

  /// Add a language while building a registry
  pub fn with(mut self, spec: LanguageSpec) -> Self {
    self.register(spec);
    self
  }

  /// Look up a tag (or one of its aliases, case-insensitive)
  pub fn resolve(&self, tag: &str) -> Result<&LanguageSpec, CodeRunError> {
    if let Some(spec) = self.languages.get(tag) {
      return Ok(spec);
    }
    let normalized = tag.trim().to_lowercase();
    let canonical = LANGUAGE_ALIAS_MAP
      .get(normalized.as_str())
      .copied()
      .unwrap_or(normalized.as_str());
    self
      .languages
      .get(canonical)
      .ok_or_else(|| CodeRunError::unsupported(tag))
  }

  pub fn contains(&self, tag: &str) -> bool {
    self.resolve(tag).is_ok()
  }

  /// Registered tags, sorted
  pub fn tags(&self) -> Vec<&str> {
    let mut tags = self.languages.keys().map(|t| t.as_str()).collect::<Vec<&str>>();
    tags.sort_unstable();
    tags
  }

  pub fn len(&self) -> usize {
    self.languages.len()
  }

  pub fn is_empty(&self) -> bool {
    self.languages.is_empty()
  }

  /// Pick the language of a submission: an explicit tag wins, otherwise the
  /// file extension is matched against tags and aliases
  pub fn detect(&self, language: Option<&str>, submission: &Path) -> Option<&LanguageSpec> {
    if let Some(language) = language {
      return self.resolve(language).ok();
    }
    let ext = submission.extension()?.to_str()?;
    self.resolve(ext).ok()
  }
}

impl Default for LanguageRegistry {
  fn default() -> Self {
    DEFAULT_REGISTRY.clone()
  }
}
