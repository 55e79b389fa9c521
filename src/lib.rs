pub mod config;
pub mod constants;
pub mod display;
pub mod error;
pub mod monitor;
pub mod source;
pub mod util;

use std::sync::atomic::AtomicBool;

use tracing::{info, warn};

use crate::config::RunConfig;
use crate::display::{print_header, print_summary};
use crate::error::RunqError;
use crate::monitor::{CpuSampler, RunSummary, run_sampling};
use crate::source::{CounterSource, ProcStat};
use crate::util::signal::install_interrupt_flag;

/// Measures average CPU utilization over the configured window and prints the result
///
/// This is the main entry point: it samples the statistics file named in
/// `cfg`, and Ctrl+C ends the window early with the average of what was taken.
pub fn run(cfg: &RunConfig) -> Result<RunSummary, RunqError> {
	cfg.validate()?;
	print_header(cfg);

	static NEVER: AtomicBool = AtomicBool::new(false);
	let stop = install_interrupt_flag().unwrap_or_else(|e| {
		warn!(error = %e, "Ctrl+C will abort without a report");
		&NEVER
	});

	let summary = run_with_source(cfg, ProcStat::new(&cfg.stat_path), stop);
	print_summary(&summary, cfg);

	Ok(summary)
}

/// Runs the sampling window against any counter source without printing a report
pub fn run_with_source<S: CounterSource>(cfg: &RunConfig, source: S, stop: &AtomicBool) -> RunSummary {
	let loops = cfg.loop_count();
	info!(loops, interval_ms = cfg.interval_ms, cpus = cfg.cpu_count, "starting sampling window");

	let mut sampler = CpuSampler::from_config(source, cfg);
	run_sampling(&mut sampler, loops, cfg.interval(), cfg.method, stop)
}
