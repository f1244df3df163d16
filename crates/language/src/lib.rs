// Library code must report through tracing, not stderr
#![deny(clippy::print_stderr)]

//! Veld grammar loading and verification.
//!
//! This crate locates, builds, and loads the compiled Veld tree-sitter
//! grammar and verifies that the parsing runtime accepts it.
//!
//! # Architecture
//!
//! * [`grammar`]: dynamic grammar loading from shared libraries
//! * [`provider`]: the seam between grammar packagings and the runtime
//! * [`check`]: the grammar load check
//! * [`config`]: language metadata from `runtime/languages.toml`
//! * [`build`]: fetching and compiling grammar sources
//! * [`metadata`]: node types and query files shipped beside a grammar
//!
//! # Loading the grammar
//!
//! The grammar ships as a shared library (`libveld.so` and platform
//! equivalents) resolved across the runtime directories; see
//! [`grammar::grammar_search_paths`]. [`load_grammar_or_build`] compiles the
//! library from the configured source checkout when it is missing.

pub mod build;
pub mod check;
pub mod config;
pub mod grammar;
pub mod metadata;
pub mod provider;

pub use check::{CheckReport, CheckStatus, GrammarCheck, LOAD_FAILURE_MESSAGE, check_grammar};
pub use config::{LanguageConfig, LanguageRegistry, load_language_configs};
pub use grammar::{
	GrammarError, grammar_library_path, grammar_search_paths, load_grammar, load_grammar_or_build,
	query_search_paths, runtime_dir,
};
pub use metadata::{NodeTypeInfo, node_types_from, read_query};
pub use provider::{DylibGrammar, GrammarProvider, StaticGrammar};
