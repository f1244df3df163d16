//! Veld grammar tooling.
//!
//! Fetches, builds, verifies, and exercises the compiled Veld grammar.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use veld_language::build::{
	build_all_grammars, fetch_all_grammars, load_grammar_configs,
};
use veld_language::{DylibGrammar, check_grammar, load_grammar_or_build};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "veld-syntax")]
#[command(about = "Grammar tooling for the Veld language")]
struct Args {
	/// Verbose logging
	#[arg(short, long, global = true)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Fetch configured grammar sources
	Fetch,
	/// Fetch and compile grammars into shared libraries
	Build,
	/// Verify that a compiled grammar loads
	Check {
		/// Grammar to check
		#[arg(long, default_value = "veld")]
		grammar: String,
	},
	/// Parse a file (or stdin) and print the syntax tree
	Parse {
		/// File to parse; reads stdin when omitted
		file: Option<PathBuf>,

		/// Only report parse errors, without printing the tree
		#[arg(short, long)]
		quiet: bool,
	},
}

fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	let subscriber = tracing_subscriber::fmt()
		.with_max_level(if args.verbose {
			tracing::Level::DEBUG
		} else {
			tracing::Level::INFO
		})
		.with_writer(std::io::stderr)
		.finish();
	tracing::subscriber::set_global_default(subscriber)?;

	match args.command {
		Command::Fetch => fetch(),
		Command::Build => build(),
		Command::Check { grammar } => check(&grammar),
		Command::Parse { file, quiet } => parse(file.as_deref(), quiet),
	}
}

fn progress_printer() -> veld_language::build::ProgressCallback {
	Box::new(|grammar, status| println!("{grammar}: {status}"))
}

fn fetch() -> anyhow::Result<()> {
	let grammars = load_grammar_configs()?;
	let results = fetch_all_grammars(grammars, Some(progress_printer()));

	let failures: Vec<_> = results
		.iter()
		.filter_map(|(grammar, result)| result.as_ref().err().map(|e| (grammar, e)))
		.collect();
	for (grammar, err) in &failures {
		tracing::error!(grammar = %grammar.grammar_id, error = %err, "Fetch failed");
	}
	anyhow::ensure!(failures.is_empty(), "{} grammar(s) failed to fetch", failures.len());
	Ok(())
}

fn build() -> anyhow::Result<()> {
	fetch()?;

	let grammars = load_grammar_configs()?;
	let results = build_all_grammars(grammars, Some(progress_printer()));

	let failures: Vec<_> = results
		.iter()
		.filter_map(|(grammar, result)| result.as_ref().err().map(|e| (grammar, e)))
		.collect();
	for (grammar, err) in &failures {
		tracing::error!(grammar = %grammar.grammar_id, error = %err, "Build failed");
	}
	anyhow::ensure!(failures.is_empty(), "{} grammar(s) failed to build", failures.len());
	Ok(())
}

fn check(grammar: &str) -> anyhow::Result<()> {
	let report = check_grammar(&DylibGrammar::new(grammar));

	if report.status.is_passed() {
		println!("{grammar}: passed");
		Ok(())
	} else {
		println!("{grammar}: {}", report.message.unwrap_or_default());
		std::process::exit(1);
	}
}

fn parse(file: Option<&Path>, quiet: bool) -> anyhow::Result<()> {
	let source = match file {
		Some(path) => std::fs::read_to_string(path)
			.with_context(|| format!("could not read {}", path.display()))?,
		None => {
			let mut buffer = String::new();
			std::io::stdin()
				.read_to_string(&mut buffer)
				.context("could not read from stdin")?;
			buffer
		}
	};

	let language = load_grammar_or_build("veld")?;

	let mut parser = tree_sitter::Parser::new();
	parser
		.set_language(&language)
		.context("runtime rejected the veld grammar")?;

	let tree = parser
		.parse(&source, None)
		.context("parser produced no tree")?;
	let root = tree.root_node();

	if !quiet {
		println!("{}", root.to_sexp());
	}

	if root.has_error() {
		anyhow::bail!("input contains syntax errors");
	}

	info!(bytes = source.len(), "Parsed input");
	Ok(())
}
