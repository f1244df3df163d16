//! Grammar byproducts: node types and query files.
//!
//! A generated grammar ships a `node-types.json` describing its node kinds,
//! and query files (`highlights.scm` and friends) under the runtime queries
//! directory. Neither is needed to load a grammar; both are needed by tools
//! that inspect one.

use std::fs;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::grammar::query_search_paths;

/// Errors that can occur when reading grammar metadata.
#[derive(Debug, Error)]
pub enum MetadataError {
	#[error("failed to read node-types.json: {0}")]
	Io(#[from] std::io::Error),

	#[error("failed to parse node-types.json: {0}")]
	Parse(#[from] serde_json::Error),
}

/// One entry of a grammar's `node-types.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeInfo {
	/// The node kind, e.g. `"if_statement"`.
	#[serde(rename = "type")]
	pub kind: String,
	/// Whether the node is named (as opposed to an anonymous token).
	pub named: bool,
	/// Concrete kinds of a supertype node.
	#[serde(default)]
	pub subtypes: Vec<NodeKind>,
}

/// A bare node kind reference inside `node-types.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeKind {
	#[serde(rename = "type")]
	pub kind: String,
	pub named: bool,
}

/// Reads the static node types of a grammar from its generated sources.
///
/// `src_dir` is the grammar source directory, the one containing `parser.c`.
pub fn node_types_from(src_dir: &Path) -> Result<Vec<NodeTypeInfo>, MetadataError> {
	let raw = fs::read_to_string(src_dir.join("node-types.json"))?;
	Ok(serde_json::from_str(&raw)?)
}

static INHERITS_REGEX: Lazy<Regex> =
	Lazy::new(|| Regex::new(r";+\s*inherits\s*:?\s*([a-z_,()-]+)\s*").unwrap());

/// Reads a query file for a language from the runtime search paths.
///
/// `; inherits: a,b` directives are replaced with the inherited languages'
/// query files, recursively. A missing query resolves to the empty string.
pub fn read_query(language: &str, filename: &str) -> String {
	read_query_from(&query_search_paths(), language, filename)
}

/// Reads a query file from an explicit set of query roots.
pub fn read_query_from(roots: &[PathBuf], language: &str, filename: &str) -> String {
	let raw = roots
		.iter()
		.find_map(|dir| fs::read_to_string(dir.join(language).join(filename)).ok())
		.unwrap_or_default();

	INHERITS_REGEX
		.replace_all(&raw, |captures: &regex::Captures| {
			captures[1]
				.split(',')
				.map(|inherited| format!("\n{}\n", read_query_from(roots, inherited, filename)))
				.collect::<String>()
		})
		.to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_node_types_parse() {
		let dir = tempfile::tempdir().unwrap();
		fs::write(
			dir.path().join("node-types.json"),
			r#"[
				{
					"type": "statement",
					"named": true,
					"subtypes": [
						{ "type": "let_statement", "named": true },
						{ "type": "expression_statement", "named": true }
					]
				},
				{ "type": "identifier", "named": true },
				{ "type": "=>", "named": false }
			]"#,
		)
		.unwrap();

		let node_types = node_types_from(dir.path()).unwrap();
		assert_eq!(node_types.len(), 3);

		let statement = &node_types[0];
		assert_eq!(statement.kind, "statement");
		assert!(statement.named);
		assert_eq!(statement.subtypes.len(), 2);

		let arrow = &node_types[2];
		assert_eq!(arrow.kind, "=>");
		assert!(!arrow.named);
	}

	#[test]
	fn test_node_types_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		assert!(matches!(
			node_types_from(dir.path()),
			Err(MetadataError::Io(_))
		));
	}

	#[test]
	fn test_read_query_missing_is_empty() {
		let dir = tempfile::tempdir().unwrap();
		let roots = vec![dir.path().to_path_buf()];
		assert_eq!(read_query_from(&roots, "veld", "highlights.scm"), "");
	}

	#[test]
	fn test_read_query_resolves_inherits() {
		let dir = tempfile::tempdir().unwrap();
		let veld_dir = dir.path().join("veld");
		let core_dir = dir.path().join("core");
		fs::create_dir_all(&veld_dir).unwrap();
		fs::create_dir_all(&core_dir).unwrap();

		fs::write(
			veld_dir.join("highlights.scm"),
			"; inherits: core\n(identifier) @variable\n",
		)
		.unwrap();
		fs::write(core_dir.join("highlights.scm"), "(comment) @comment\n").unwrap();

		let roots = vec![dir.path().to_path_buf()];
		let query = read_query_from(&roots, "veld", "highlights.scm");

		assert!(query.contains("(comment) @comment"));
		assert!(query.contains("(identifier) @variable"));
		assert!(!query.contains("inherits"));
	}
}
