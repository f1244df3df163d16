//! Parallel grammar fetching and building.

use std::sync::mpsc;
use std::thread;

use super::Result;
use super::compile::{BuildStatus, build_grammar};
use super::config::GrammarConfig;
use super::fetch::{FetchStatus, fetch_grammar};

/// Callback type for progress reporting.
pub type ProgressCallback = Box<dyn Fn(&str, &str) + Send + Sync>;

/// Runs `op` over all grammars across worker threads.
fn run_all<T: Send + 'static>(
	grammars: Vec<GrammarConfig>,
	op: fn(&GrammarConfig) -> Result<T>,
	describe: fn(&Result<T>) -> &'static str,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<T>)> {
	let (tx, rx) = mpsc::channel();
	let num_jobs = thread::available_parallelism()
		.map(|n| n.get())
		.unwrap_or(4)
		.min(8);
	let chunk_size = (grammars.len() / num_jobs).max(1);

	for chunk in grammars.chunks(chunk_size).map(<[GrammarConfig]>::to_vec) {
		let tx = tx.clone();

		thread::spawn(move || {
			for grammar in chunk {
				let result = op(&grammar);
				let _ = tx.send((grammar, result));
			}
		});
	}

	drop(tx);

	let mut results = Vec::new();
	for (grammar, result) in rx {
		if let Some(ref cb) = on_progress {
			cb(&grammar.grammar_id, describe(&result));
		}
		results.push((grammar, result));
	}

	results
}

/// Fetch all grammars in parallel.
pub fn fetch_all_grammars(
	grammars: Vec<GrammarConfig>,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<FetchStatus>)> {
	run_all(
		grammars,
		fetch_grammar,
		|result| match result {
			Ok(FetchStatus::UpToDate) => "up to date",
			Ok(FetchStatus::Updated) => "updated",
			Ok(FetchStatus::Local) => "local",
			Err(_) => "error",
		},
		on_progress,
	)
}

/// Build all grammars in parallel.
pub fn build_all_grammars(
	grammars: Vec<GrammarConfig>,
	on_progress: Option<ProgressCallback>,
) -> Vec<(GrammarConfig, Result<BuildStatus>)> {
	run_all(
		grammars,
		build_grammar,
		|result| match result {
			Ok(BuildStatus::AlreadyBuilt) => "up to date",
			Ok(BuildStatus::Built) => "built",
			Err(_) => "error",
		},
		on_progress,
	)
}
