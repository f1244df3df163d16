//! The seam between grammar packagings and the parsing runtime.
//!
//! A [`GrammarProvider`] hands the runtime a [`Language`] constructed from
//! some packaging of a grammar: a shared library on disk, a statically linked
//! parser, or anything else that can produce the handle. Verification code is
//! written against this trait so it does not care how a grammar ships.

use std::path::PathBuf;

use tree_sitter::Language;

use crate::grammar::{self, GrammarError};

/// A source of a compiled grammar.
pub trait GrammarProvider {
	/// The grammar name, e.g. `"veld"`.
	fn grammar_name(&self) -> &str;

	/// Constructs the runtime language handle.
	fn language(&self) -> Result<Language, GrammarError>;
}

/// Loads a grammar from a compiled shared library.
///
/// By default the library is resolved across the runtime search paths; use
/// [`DylibGrammar::with_library`] to pin an explicit path.
#[derive(Debug, Clone)]
pub struct DylibGrammar {
	name: String,
	library_path: Option<PathBuf>,
}

impl DylibGrammar {
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			library_path: None,
		}
	}

	/// Pins the provider to an explicit library path instead of the search
	/// paths.
	pub fn with_library(name: impl Into<String>, library_path: impl Into<PathBuf>) -> Self {
		Self {
			name: name.into(),
			library_path: Some(library_path.into()),
		}
	}
}

impl GrammarProvider for DylibGrammar {
	fn grammar_name(&self) -> &str {
		&self.name
	}

	fn language(&self) -> Result<Language, GrammarError> {
		match &self.library_path {
			Some(path) => grammar::load_grammar_from(path, &self.name),
			None => grammar::load_grammar(&self.name),
		}
	}
}

/// A grammar whose parser is linked into the binary.
///
/// Binding crates expose a `language()` constructor for their compiled-in
/// parser; this wraps one of those constructors as a provider.
#[derive(Debug, Clone, Copy)]
pub struct StaticGrammar {
	name: &'static str,
	constructor: fn() -> Language,
}

impl StaticGrammar {
	pub const fn new(name: &'static str, constructor: fn() -> Language) -> Self {
		Self { name, constructor }
	}
}

impl GrammarProvider for StaticGrammar {
	fn grammar_name(&self) -> &str {
		self.name
	}

	fn language(&self) -> Result<Language, GrammarError> {
		Ok((self.constructor)())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_static_grammar_produces_language() {
		let provider = StaticGrammar::new("rust", tree_sitter_rust::language);
		assert_eq!(provider.grammar_name(), "rust");

		let language = provider.language().unwrap();
		assert!(language.node_kind_count() > 0);
	}

	#[test]
	fn test_dylib_grammar_missing_library() {
		let provider = DylibGrammar::new("no-such-grammar");
		assert!(matches!(
			provider.language(),
			Err(GrammarError::NotFound(_))
		));
	}

	#[test]
	fn test_dylib_grammar_pinned_path() {
		let provider = DylibGrammar::with_library("veld", "/nonexistent/libveld.so");
		assert!(matches!(
			provider.language(),
			Err(GrammarError::LoadError(_))
		));
	}
}
