//! Grammar loading from compiled shared libraries.
//!
//! A grammar is a tree-sitter parser compiled into a platform shared library
//! that exports a `tree_sitter_<name>` constructor. This module locates those
//! libraries across the runtime directories and turns them into runtime
//! [`Language`] handles.

use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use thiserror::Error;
use tree_sitter::{LANGUAGE_VERSION, Language, MIN_COMPATIBLE_LANGUAGE_VERSION};

use crate::build::GrammarBuildError;

/// Environment variable overriding the runtime directory.
pub const RUNTIME_ENV_VAR: &str = "VELD_RUNTIME";

/// Errors that can occur when loading a grammar.
#[derive(Debug, Error)]
pub enum GrammarError {
	#[error("grammar not found: {0}")]
	NotFound(String),

	#[error("failed to load grammar library: {0}")]
	LoadError(#[from] libloading::Error),

	#[error("grammar library missing language function: {0}")]
	MissingSymbol(String),

	#[error(
		"incompatible grammar ABI version {version} (supported {min}..={max})",
		min = MIN_COMPATIBLE_LANGUAGE_VERSION,
		max = LANGUAGE_VERSION
	)]
	IncompatibleVersion { version: usize },

	#[error("failed to build grammar: {0}")]
	Build(#[from] GrammarBuildError),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

/// Returns the runtime directory.
///
/// `VELD_RUNTIME` overrides everything; otherwise the per-user data directory
/// is used, falling back to a `runtime/` directory beside the executable.
pub fn runtime_dir() -> PathBuf {
	if let Some(runtime) = std::env::var_os(RUNTIME_ENV_VAR) {
		return PathBuf::from(runtime);
	}

	if let Some(data_dir) = data_local_dir() {
		return data_dir.join("veld");
	}

	std::env::current_exe()
		.ok()
		.and_then(|exe| exe.parent().map(|dir| dir.join("runtime")))
		.unwrap_or_else(|| PathBuf::from("runtime"))
}

/// Returns the per-user cache directory, if one can be determined.
pub fn cache_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_CACHE_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".cache")))
			.map(|dir| dir.join("veld"))
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(|dir| PathBuf::from(dir).join("veld"))
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

/// Returns runtime directories where compiled grammars are searched.
/// Order: VELD_RUNTIME env, user config dir, user data dir, exe-relative dirs.
pub fn grammar_search_paths() -> Vec<PathBuf> {
	runtime_subdir_paths("grammars")
}

/// Returns directories to search for query files.
pub fn query_search_paths() -> Vec<PathBuf> {
	runtime_subdir_paths("queries")
}

fn runtime_subdir_paths(subdir: &str) -> Vec<PathBuf> {
	let mut dirs = Vec::new();

	// Development: VELD_RUNTIME takes priority
	if let Some(runtime) = std::env::var_os(RUNTIME_ENV_VAR) {
		dirs.push(PathBuf::from(runtime).join(subdir));
	}

	if let Some(config_dir) = config_dir() {
		dirs.push(config_dir.join("veld").join(subdir));
	}

	if let Some(data_dir) = data_local_dir() {
		dirs.push(data_dir.join("veld").join(subdir));
	}

	// Bundled files relative to the executable, plus the share directory
	// used by installed packages
	if let Ok(exe_path) = std::env::current_exe() {
		if let Some(exe_dir) = exe_path.parent() {
			dirs.push(exe_dir.join(subdir));
			dirs.push(exe_dir.join("..").join("share").join("veld").join(subdir));
		}
	}

	dirs
}

// Minimal platform-specific directory helpers
fn config_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_CONFIG_HOME")
			.map(PathBuf::from)
			.or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
	}
	#[cfg(windows)]
	{
		std::env::var_os("APPDATA").map(PathBuf::from)
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

fn data_local_dir() -> Option<PathBuf> {
	#[cfg(unix)]
	{
		std::env::var_os("XDG_DATA_HOME")
			.map(PathBuf::from)
			.or_else(|| {
				std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".local").join("share"))
			})
	}
	#[cfg(windows)]
	{
		std::env::var_os("LOCALAPPDATA").map(PathBuf::from)
	}
	#[cfg(not(any(unix, windows)))]
	{
		None
	}
}

/// Library file extension for the current platform.
#[cfg(target_os = "windows")]
pub fn library_extension() -> &'static str {
	"dll"
}

#[cfg(target_os = "macos")]
pub fn library_extension() -> &'static str {
	"dylib"
}

#[cfg(all(unix, not(target_os = "macos")))]
pub fn library_extension() -> &'static str {
	"so"
}

/// Library file name for a grammar, e.g. `libveld.so` on Linux.
pub fn library_file_name(name: &str) -> String {
	format!("lib{}.{}", name.replace('-', "_"), library_extension())
}

/// Symbol name exported by a compiled grammar.
fn language_symbol(name: &str) -> String {
	format!("tree_sitter_{}", name.replace('-', "_"))
}

fn find_library(dirs: &[PathBuf], name: &str) -> Option<PathBuf> {
	let file_name = library_file_name(name);
	dirs.iter().map(|dir| dir.join(&file_name)).find(|path| path.exists())
}

/// Resolves the compiled library for a grammar across the search paths.
pub fn grammar_library_path(name: &str) -> Option<PathBuf> {
	find_library(&grammar_search_paths(), name)
}

/// Loads a grammar from the runtime search paths.
pub fn load_grammar(name: &str) -> Result<Language, GrammarError> {
	let library_path =
		grammar_library_path(name).ok_or_else(|| GrammarError::NotFound(name.to_string()))?;
	load_grammar_from(&library_path, name)
}

/// Loads a grammar from an explicit shared library path.
pub fn load_grammar_from(library_path: &Path, name: &str) -> Result<Language, GrammarError> {
	let library = unsafe { Library::new(library_path) }?;

	let symbol_name = language_symbol(name);
	let language = unsafe {
		let constructor: Symbol<unsafe extern "C" fn() -> Language> = library
			.get(symbol_name.as_bytes())
			.map_err(|_| GrammarError::MissingSymbol(symbol_name.clone()))?;
		constructor()
	};

	let version = language.version();
	if !(MIN_COMPATIBLE_LANGUAGE_VERSION..=LANGUAGE_VERSION).contains(&version) {
		return Err(GrammarError::IncompatibleVersion { version });
	}

	// The language handle points into the library; keep it mapped for the
	// rest of the process.
	std::mem::forget(library);

	tracing::debug!(grammar = %name, library = %library_path.display(), "Loaded grammar");
	Ok(language)
}

/// Loads a grammar, building it from the configured source if no compiled
/// library exists yet.
pub fn load_grammar_or_build(name: &str) -> Result<Language, GrammarError> {
	match load_grammar(name) {
		Err(GrammarError::NotFound(_)) => {}
		other => return other,
	}

	let config = crate::build::load_grammar_configs()?
		.into_iter()
		.find(|grammar| grammar.grammar_id == name)
		.ok_or_else(|| GrammarError::NotFound(name.to_string()))?;

	tracing::info!(grammar = %name, "Grammar library missing, building from source");
	crate::build::fetch_grammar(&config)?;
	crate::build::build_grammar(&config)?;

	load_grammar(name)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_search_paths_not_empty() {
		// Should have at least the exe-relative path
		let dirs = grammar_search_paths();
		assert!(!dirs.is_empty());
	}

	#[test]
	fn test_library_file_name() {
		let name = library_file_name("veld");
		#[cfg(target_os = "linux")]
		assert_eq!(name, "libveld.so");
		#[cfg(target_os = "macos")]
		assert_eq!(name, "libveld.dylib");
		#[cfg(target_os = "windows")]
		assert_eq!(name, "libveld.dll");

		// C symbols cannot contain hyphens, so library names use underscores
		assert!(library_file_name("veld-script").contains("veld_script"));
	}

	#[test]
	fn test_find_library() {
		let dir = tempfile::tempdir().unwrap();
		let lib_path = dir.path().join(library_file_name("veld"));
		std::fs::write(&lib_path, b"").unwrap();

		let dirs = vec![dir.path().to_path_buf()];
		assert_eq!(find_library(&dirs, "veld"), Some(lib_path));
		assert_eq!(find_library(&dirs, "other"), None);
	}

	#[test]
	fn test_load_grammar_from_missing_library() {
		let result = load_grammar_from(Path::new("/nonexistent/libveld.so"), "veld");
		assert!(matches!(result, Err(GrammarError::LoadError(_))));
	}

	#[test]
	fn test_load_grammar_from_malformed_library() {
		let dir = tempfile::tempdir().unwrap();
		let lib_path = dir.path().join(library_file_name("veld"));
		std::fs::write(&lib_path, b"not a shared library").unwrap();

		let result = load_grammar_from(&lib_path, "veld");
		assert!(matches!(result, Err(GrammarError::LoadError(_))));
	}

	#[test]
	fn test_load_unknown_grammar_is_not_found() {
		let result = load_grammar("no-such-grammar");
		assert!(matches!(result, Err(GrammarError::NotFound(_))));
	}
}
