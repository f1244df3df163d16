//! Language configuration.
//!
//! Connects file types to the grammars that parse them. Definitions come
//! from the embedded `runtime/languages.toml`.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Embedded languages.toml from the runtime directory.
pub(crate) const LANGUAGES_TOML: &str = include_str!("../../../runtime/languages.toml");

/// Errors that can occur when reading language configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to parse languages.toml: {0}")]
	Parse(#[from] toml::de::Error),
}

/// Configuration for a single language.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LanguageConfig {
	/// Language identifier, e.g. "veld".
	pub name: String,

	/// Tree-sitter grammar name. Defaults to `name` if not specified.
	pub grammar: Option<String>,

	/// File extensions associated with this language.
	#[serde(default)]
	pub extensions: Vec<String>,

	/// Exact filenames (e.g. "Veldfile").
	#[serde(default)]
	pub filenames: Vec<String>,

	/// Shebang interpreters.
	#[serde(default)]
	pub shebangs: Vec<String>,

	/// Line comment token(s).
	#[serde(default)]
	pub comment_tokens: Vec<String>,

	/// Block comment tokens (start, end).
	#[serde(default)]
	pub block_comment: Option<(String, String)>,

	/// Pattern matching injection markers (e.g. in fenced code blocks).
	#[serde(default)]
	pub injection_regex: Option<String>,
}

impl LanguageConfig {
	/// Returns the grammar name to use for loading.
	pub fn grammar_name(&self) -> &str {
		self.grammar.as_deref().unwrap_or(&self.name)
	}

	/// Compiles the injection pattern, if one is configured.
	pub fn injection_regex(&self) -> Option<regex::Regex> {
		self.injection_regex
			.as_deref()
			.and_then(|pattern| regex::Regex::new(pattern).ok())
	}
}

#[derive(Debug, Deserialize)]
struct LanguagesFile {
	#[serde(default, rename = "language")]
	languages: Vec<LanguageConfig>,
}

/// Loads language configurations from the embedded `languages.toml`.
pub fn load_language_configs() -> Result<Vec<LanguageConfig>, ConfigError> {
	let config: LanguagesFile = toml::from_str(LANGUAGES_TOML)?;
	Ok(config.languages)
}

/// Language lookups by name, file path, and shebang.
#[derive(Debug, Default)]
pub struct LanguageRegistry {
	languages: Vec<LanguageConfig>,
	by_extension: HashMap<String, usize>,
	by_filename: HashMap<String, usize>,
	by_shebang: HashMap<String, usize>,
}

impl LanguageRegistry {
	/// Builds a registry from the embedded configuration.
	pub fn from_embedded() -> Result<Self, ConfigError> {
		Ok(Self::from_configs(load_language_configs()?))
	}

	pub fn from_configs(configs: Vec<LanguageConfig>) -> Self {
		let mut registry = Self::default();
		for config in configs {
			registry.register(config);
		}
		registry
	}

	fn register(&mut self, config: LanguageConfig) {
		let idx = self.languages.len();

		for ext in &config.extensions {
			self.by_extension.insert(ext.clone(), idx);
		}
		for name in &config.filenames {
			self.by_filename.insert(name.clone(), idx);
		}
		for shebang in &config.shebangs {
			self.by_shebang.insert(shebang.clone(), idx);
		}

		self.languages.push(config);
	}

	/// Finds a language by name.
	pub fn get(&self, name: &str) -> Option<&LanguageConfig> {
		self.languages.iter().find(|config| config.name == name)
	}

	/// Finds a language by file path (exact filename first, then extension).
	pub fn language_for_path(&self, path: &Path) -> Option<&LanguageConfig> {
		if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
			if let Some(&idx) = self.by_filename.get(name) {
				return self.languages.get(idx);
			}
		}

		path.extension()
			.and_then(|ext| ext.to_str())
			.and_then(|ext| self.by_extension.get(ext))
			.and_then(|&idx| self.languages.get(idx))
	}

	/// Finds a language by shebang line.
	pub fn language_for_shebang(&self, first_line: &str) -> Option<&LanguageConfig> {
		let line = first_line.strip_prefix("#!")?;
		let parts: Vec<&str> = line.split_whitespace().collect();

		// Handle /usr/bin/env veld style
		let interpreter = if parts.first() == Some(&"/usr/bin/env") || parts.first() == Some(&"env")
		{
			parts.get(1).copied()
		} else {
			parts.first().and_then(|p| p.rsplit('/').next())
		};

		interpreter.and_then(|interp| {
			// Strip trailing version digits (veld2 -> veld)
			let base = interp.trim_end_matches(|c: char| c.is_ascii_digit());
			self.by_shebang.get(base).and_then(|&idx| self.languages.get(idx))
		})
	}

	/// Returns all registered languages.
	pub fn languages(&self) -> impl Iterator<Item = &LanguageConfig> {
		self.languages.iter()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_embedded_config_parses() {
		let configs = load_language_configs().unwrap();
		assert!(!configs.is_empty());
	}

	#[test]
	fn test_veld_language_config() {
		let registry = LanguageRegistry::from_embedded().unwrap();
		let veld = registry.get("veld").expect("veld is configured");

		assert_eq!(veld.grammar_name(), "veld");
		assert!(veld.extensions.iter().any(|ext| ext == "veld"));
		assert!(veld.comment_tokens.iter().any(|token| token == "#"));
		assert_eq!(veld.block_comment, None);
	}

	#[test]
	fn test_language_for_path() {
		let registry = LanguageRegistry::from_embedded().unwrap();

		let veld = registry.language_for_path(Path::new("demos/fib.veld"));
		assert_eq!(veld.map(|c| c.name.as_str()), Some("veld"));

		assert!(registry.language_for_path(Path::new("main.rs")).is_none());
	}

	#[test]
	fn test_shebang_detection() {
		let registry = LanguageRegistry::from_embedded().unwrap();

		let veld = registry.language_for_shebang("#!/usr/bin/env veld");
		assert_eq!(veld.map(|c| c.name.as_str()), Some("veld"));

		let veld = registry.language_for_shebang("#!/usr/local/bin/veld");
		assert_eq!(veld.map(|c| c.name.as_str()), Some("veld"));

		assert!(registry.language_for_shebang("not a shebang").is_none());
	}
}
