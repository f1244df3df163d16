//! Grammar compilation into dynamic libraries.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::config::{GrammarConfig, get_grammar_src_dir, grammar_lib_dir};
use super::{GrammarBuildError, Result};
use crate::grammar::library_file_name;

/// Status of a build operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
	/// Grammar was already built and up to date.
	AlreadyBuilt,
	/// Grammar was newly built.
	Built,
}

/// Returns the first compiler from `candidates` that executes successfully.
fn find_compiler(candidates: &[&'static str]) -> Option<&'static str> {
	candidates.iter().copied().find(|name| {
		Command::new(name)
			.arg("--version")
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()
			.is_ok()
	})
}

/// Resolves C and C++ compilers, preferring the CC/CXX environment variables
/// and then probing common names.
fn resolve_compilers() -> (Option<String>, Option<String>) {
	static COMPILERS: std::sync::OnceLock<(Option<String>, Option<String>)> =
		std::sync::OnceLock::new();
	COMPILERS
		.get_or_init(|| {
			#[cfg(unix)]
			const CC_CANDIDATES: &[&str] = &["cc", "clang", "gcc"];
			#[cfg(unix)]
			const CXX_CANDIDATES: &[&str] = &["c++", "clang++", "g++"];
			#[cfg(windows)]
			const CC_CANDIDATES: &[&str] = &["cl", "clang-cl", "clang", "gcc"];
			#[cfg(windows)]
			const CXX_CANDIDATES: &[&str] = &["cl", "clang-cl", "clang++", "g++"];
			#[cfg(not(any(unix, windows)))]
			const CC_CANDIDATES: &[&str] = &["cc", "clang", "gcc"];
			#[cfg(not(any(unix, windows)))]
			const CXX_CANDIDATES: &[&str] = &["c++", "clang++", "g++"];

			let cc = std::env::var("CC")
				.ok()
				.or_else(|| find_compiler(CC_CANDIDATES).map(str::to_string));
			let cxx = std::env::var("CXX")
				.ok()
				.or_else(|| find_compiler(CXX_CANDIDATES).map(str::to_string));
			(cc, cxx)
		})
		.clone()
}

/// Returns true if any source file is newer than the compiled library.
fn needs_recompile(src_dir: &Path, lib_path: &Path) -> bool {
	let Ok(lib_mtime) = fs::metadata(lib_path).and_then(|m| m.modified()) else {
		return true;
	};

	["parser.c", "scanner.c", "scanner.cc"].iter().any(|file| {
		fs::metadata(src_dir.join(file))
			.and_then(|m| m.modified())
			.is_ok_and(|src_mtime| src_mtime > lib_mtime)
	})
}

fn compile_target() -> String {
	std::env::var("TARGET").unwrap_or_else(|_| {
		let arch = std::env::consts::ARCH;
		if cfg!(target_os = "windows") {
			format!("{arch}-pc-windows-msvc")
		} else if cfg!(target_os = "macos") {
			format!("{arch}-apple-darwin")
		} else {
			format!("{arch}-unknown-linux-gnu")
		}
	})
}

/// Compiles a tree-sitter grammar into a dynamic library.
///
/// Verifies the presence of `parser.c`, skips the build when the library is
/// newer than all sources, compiles object files with the [`cc`] crate, and
/// links them into a platform shared library with the system compiler.
///
/// # Errors
///
/// * [`GrammarBuildError::NoParserSource`] if the grammar checkout is
///   incomplete.
/// * [`GrammarBuildError::Compilation`] if no compiler is available or either
///   the compilation or linking stage fails.
pub fn build_grammar(grammar: &GrammarConfig) -> Result<BuildStatus> {
	let src_dir = get_grammar_src_dir(grammar);
	if !src_dir.join("parser.c").exists() {
		return Err(GrammarBuildError::NoParserSource(src_dir));
	}

	let lib_dir = grammar_lib_dir();
	fs::create_dir_all(&lib_dir)?;
	let lib_path = lib_dir.join(library_file_name(&grammar.grammar_id));

	if !needs_recompile(&src_dir, &lib_path) {
		debug!(grammar = %grammar.grammar_id, lib_path = %lib_path.display(), "Grammar library up to date");
		return Ok(BuildStatus::AlreadyBuilt);
	}

	info!(grammar = %grammar.grammar_id, lib_path = %lib_path.display(), "Compiling grammar");

	let needs_cxx = src_dir.join("scanner.cc").exists();
	let (cc, cxx) = resolve_compilers();
	let compiler = if needs_cxx {
		cxx.ok_or_else(|| {
			GrammarBuildError::Compilation(format!(
				"C++ compiler required for {} but none found; install clang++/g++ or set CXX",
				grammar.grammar_id
			))
		})?
	} else {
		cc.ok_or_else(|| {
			GrammarBuildError::Compilation(
				"C compiler required but none found; install clang/gcc or set CC".into(),
			)
		})?
	};

	let objects = compile_objects(&src_dir, &lib_dir, &grammar.grammar_id, &compiler, needs_cxx)?;
	link_shared_library(&objects, &lib_path, &compiler, needs_cxx)?;

	if !lib_path.exists() {
		return Err(GrammarBuildError::Compilation(format!(
			"compilation succeeded but library not found at {}",
			lib_path.display()
		)));
	}

	debug!(grammar = %grammar.grammar_id, lib_path = %lib_path.display(), "Successfully compiled grammar");
	Ok(BuildStatus::Built)
}

/// Compiles the grammar sources into object files.
fn compile_objects(
	src_dir: &Path,
	lib_dir: &Path,
	grammar_id: &str,
	compiler: &str,
	needs_cxx: bool,
) -> Result<Vec<PathBuf>> {
	let target = compile_target();

	let mut build = cc::Build::new();
	build
		.opt_level(3)
		.cargo_metadata(false)
		.warnings(false)
		.pic(true)
		.include(src_dir)
		.host(&target)
		.target(&target)
		.compiler(compiler)
		.file(src_dir.join("parser.c"));

	let scanner_cc = src_dir.join("scanner.cc");
	let scanner_c = src_dir.join("scanner.c");
	if needs_cxx && scanner_cc.exists() {
		build.cpp(true).file(&scanner_cc).std("c++14");
	} else if scanner_c.exists() {
		build.file(&scanner_c);
	}

	let obj_dir = lib_dir.join("obj").join(grammar_id);
	fs::create_dir_all(&obj_dir)?;
	build.out_dir(&obj_dir);

	build
		.try_compile_intermediates()
		.map_err(|e| GrammarBuildError::Compilation(e.to_string()))
}

/// Links object files into a shared library using the system compiler.
fn link_shared_library(
	objects: &[PathBuf],
	lib_path: &Path,
	compiler: &str,
	needs_cxx: bool,
) -> Result<()> {
	#[cfg(unix)]
	{
		let mut cmd = Command::new(compiler);
		cmd.args(["-shared", "-fPIC", "-O3"])
			.arg("-o")
			.arg(lib_path)
			.args(objects);

		if needs_cxx {
			cmd.arg("-lstdc++");
		}

		// Security hardening on Linux
		#[cfg(target_os = "linux")]
		cmd.arg("-Wl,-z,relro,-z,now");

		run_compiler(cmd)
	}

	#[cfg(windows)]
	{
		let _ = (compiler, needs_cxx);
		let mut cmd = Command::new("cl.exe");
		cmd.args(["/nologo", "/LD", "/utf-8"])
			.arg(format!("/Fe:{}", lib_path.display()))
			.args(objects);

		run_compiler(cmd)
	}
}

fn run_compiler(mut cmd: Command) -> Result<()> {
	let output = cmd
		.output()
		.map_err(|e| GrammarBuildError::Compilation(e.to_string()))?;

	if output.status.success() {
		Ok(())
	} else {
		Err(GrammarBuildError::Compilation(
			String::from_utf8_lossy(&output.stderr).into(),
		))
	}
}

#[cfg(test)]
mod tests {
	use std::time::{Duration, SystemTime};

	use super::*;
	use crate::build::GrammarSource;

	fn touch(path: &Path, mtime: SystemTime) {
		fs::write(path, b"").unwrap();
		fs::File::options()
			.write(true)
			.open(path)
			.unwrap()
			.set_modified(mtime)
			.unwrap();
	}

	#[test]
	fn test_needs_recompile_when_library_missing() {
		let dir = tempfile::tempdir().unwrap();
		assert!(needs_recompile(dir.path(), &dir.path().join("libveld.so")));
	}

	#[test]
	fn test_needs_recompile_tracks_source_mtimes() {
		let dir = tempfile::tempdir().unwrap();
		let lib_path = dir.path().join("libveld.so");

		let base = SystemTime::now();
		touch(&dir.path().join("parser.c"), base - Duration::from_secs(60));
		touch(&dir.path().join("scanner.c"), base - Duration::from_secs(60));
		touch(&lib_path, base);
		assert!(!needs_recompile(dir.path(), &lib_path));

		touch(&dir.path().join("scanner.c"), base + Duration::from_secs(60));
		assert!(needs_recompile(dir.path(), &lib_path));
	}

	#[test]
	fn test_build_requires_parser_source() {
		let dir = tempfile::tempdir().unwrap();
		let grammar = GrammarConfig {
			grammar_id: "veld".to_string(),
			source: GrammarSource::Local {
				path: dir.path().to_string_lossy().into_owned(),
			},
		};

		assert!(matches!(
			build_grammar(&grammar),
			Err(GrammarBuildError::NoParserSource(_))
		));
	}
}
