//! Grammar source fetching.
//!
//! Git-sourced grammars are checked out shallowly into the sources cache and
//! pinned to the configured revision. Local sources are used in place.

use std::fs;
use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use super::config::{GrammarConfig, GrammarSource, grammar_sources_dir};
use super::{GrammarBuildError, Result};

/// Status of a fetch operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
	/// Grammar was already at the pinned revision.
	UpToDate,
	/// Grammar was updated to the pinned revision.
	Updated,
	/// Grammar uses a local path (no fetch needed).
	Local,
}

/// Check if git is available on PATH.
fn ensure_git_available() -> Result<()> {
	Command::new("git")
		.arg("--version")
		.output()
		.map_err(|_| GrammarBuildError::GitNotAvailable)?;
	Ok(())
}

/// Runs a git command in `dir`, returning trimmed stdout.
fn git(dir: &Path, args: &[&str]) -> Result<String> {
	let output = Command::new("git")
		.args(args)
		.current_dir(dir)
		.output()
		.map_err(|e| GrammarBuildError::GitCommand(e.to_string()))?;

	if !output.status.success() {
		return Err(GrammarBuildError::GitCommand(
			String::from_utf8_lossy(&output.stderr).to_string(),
		));
	}

	Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Fetches a grammar source checkout, pinning it to the configured revision.
pub fn fetch_grammar(grammar: &GrammarConfig) -> Result<FetchStatus> {
	let GrammarSource::Git {
		remote, revision, ..
	} = &grammar.source
	else {
		return Ok(FetchStatus::Local);
	};

	ensure_git_available()?;

	let grammar_dir = grammar_sources_dir().join(&grammar.grammar_id);
	fs::create_dir_all(&grammar_dir)?;

	if grammar_dir.join(".git").exists() {
		let current = git(&grammar_dir, &["rev-parse", "HEAD"])?;
		if current.starts_with(revision.as_str()) || revision.starts_with(current.as_str()) {
			debug!(grammar = %grammar.grammar_id, rev = %revision, "Grammar source up to date");
			return Ok(FetchStatus::UpToDate);
		}

		git(&grammar_dir, &["fetch", "--depth", "1", "origin", revision])?;
		git(&grammar_dir, &["checkout", "FETCH_HEAD"])?;
	} else {
		info!(grammar = %grammar.grammar_id, remote = %remote, "Cloning grammar source");
		git(&grammar_dir, &["clone", "--depth", "1", "--single-branch", remote, "."])?;

		if git(&grammar_dir, &["checkout", revision]).is_err() {
			// Shallow clones may not contain the pinned revision; fetch it
			// explicitly, falling back to a full fetch for older servers.
			git(&grammar_dir, &["fetch", "--depth", "1", "origin", revision])
				.or_else(|_| git(&grammar_dir, &["fetch", "origin", revision]))?;
			git(&grammar_dir, &["checkout", "FETCH_HEAD"])?;
		}
	}

	info!(grammar = %grammar.grammar_id, rev = %revision, "Grammar source updated");
	Ok(FetchStatus::Updated)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_local_source_needs_no_fetch() {
		let grammar = GrammarConfig {
			grammar_id: "veld".to_string(),
			source: GrammarSource::Local {
				path: "/work/tree-sitter-veld".to_string(),
			},
		};

		assert_eq!(fetch_grammar(&grammar).unwrap(), FetchStatus::Local);
	}
}
