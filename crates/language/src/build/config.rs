//! Grammar build configuration.

use std::path::PathBuf;

use serde::Deserialize;

use super::Result;
use crate::config::LANGUAGES_TOML;
use crate::grammar::{cache_dir, grammar_search_paths, runtime_dir};

/// Grammar configuration from languages.toml.
#[derive(Debug, Clone, Deserialize)]
pub struct GrammarConfig {
	/// The grammar name (used for the output library name).
	#[serde(rename = "name")]
	pub grammar_id: String,
	/// The source location for the grammar.
	pub source: GrammarSource,
}

/// Source location for a grammar.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum GrammarSource {
	/// A local path to the grammar source.
	Local { path: String },
	/// A git repository containing the grammar.
	Git {
		#[serde(rename = "git")]
		remote: String,
		#[serde(rename = "rev")]
		revision: String,
		/// Optional subdirectory within the repository.
		subpath: Option<String>,
	},
}

#[derive(Debug, Deserialize)]
struct GrammarsFile {
	#[serde(default, rename = "grammar")]
	grammars: Vec<GrammarConfig>,
}

/// Loads grammar configurations from the embedded `languages.toml`.
pub fn load_grammar_configs() -> Result<Vec<GrammarConfig>> {
	let config: GrammarsFile = toml::from_str(LANGUAGES_TOML)?;
	Ok(config.grammars)
}

/// Directory where grammar sources are checked out.
///
/// Sources live in the cache directory since they can be re-fetched at any
/// time.
pub fn grammar_sources_dir() -> PathBuf {
	cache_dir()
		.unwrap_or_else(runtime_dir)
		.join("grammars")
		.join("sources")
}

/// Directory where compiled grammar libraries are written.
pub fn grammar_lib_dir() -> PathBuf {
	grammar_search_paths()
		.first()
		.cloned()
		.unwrap_or_else(|| runtime_dir().join("grammars"))
}

/// Source directory of a grammar checkout (where `parser.c` lives).
pub fn get_grammar_src_dir(grammar: &GrammarConfig) -> PathBuf {
	match &grammar.source {
		GrammarSource::Local { path } => PathBuf::from(path).join("src"),
		GrammarSource::Git { subpath, .. } => {
			let base = grammar_sources_dir().join(&grammar.grammar_id);
			match subpath {
				Some(sub) => base.join(sub).join("src"),
				None => base.join("src"),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_embedded_config_declares_veld_grammar() {
		let grammars = load_grammar_configs().unwrap();
		let veld = grammars
			.iter()
			.find(|grammar| grammar.grammar_id == "veld")
			.expect("veld grammar is configured");

		assert!(matches!(veld.source, GrammarSource::Git { .. }));
	}

	#[test]
	fn test_grammar_source_deserialization() {
		let toml_git = r#"
            [[grammar]]
            name = "veld"
            source = { git = "https://github.com/veld-lang/tree-sitter-veld", rev = "abc123" }
        "#;

		let config: GrammarsFile = toml::from_str(toml_git).unwrap();
		assert_eq!(config.grammars.len(), 1);
		assert_eq!(config.grammars[0].grammar_id, "veld");
		assert!(matches!(config.grammars[0].source, GrammarSource::Git { .. }));

		let toml_local = r#"
            [[grammar]]
            name = "veld"
            source = { path = "/path/to/tree-sitter-veld" }
        "#;

		let config: GrammarsFile = toml::from_str(toml_local).unwrap();
		assert_eq!(config.grammars.len(), 1);
		assert!(matches!(config.grammars[0].source, GrammarSource::Local { .. }));
	}

	#[test]
	fn test_local_source_src_dir() {
		let grammar = GrammarConfig {
			grammar_id: "veld".to_string(),
			source: GrammarSource::Local {
				path: "/work/tree-sitter-veld".to_string(),
			},
		};

		assert_eq!(
			get_grammar_src_dir(&grammar),
			PathBuf::from("/work/tree-sitter-veld/src")
		);
	}
}
