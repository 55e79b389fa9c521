use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::config::{Method, RunConfig};
use crate::display::print_performance;
use crate::source::CounterSource;
use crate::util::cpu::{CpuTracker, Sample};
use crate::util::mean;

/// Reads the statistics source and keeps the per-CPU snapshots for a run
#[derive(Debug)]
pub struct CpuSampler<S: CounterSource> {
	source: S,
	tracker: CpuTracker,
	verbose: bool,
}

impl<S: CounterSource> CpuSampler<S> {
	/// Creates a sampler tracking `cpu_count` stat lines from `source`
	pub fn new(source: S, cpu_count: usize, include_blocked: bool, verbose: bool) -> Self {
		Self {
			source,
			tracker: CpuTracker::new(cpu_count, include_blocked),
			verbose,
		}
	}

	pub fn from_config(source: S, cfg: &RunConfig) -> Self {
		Self::new(source, cfg.cpu_count, cfg.include_blocked, cfg.verbose)
	}

	/// Takes one reading and updates every tracked CPU in place
	///
	/// An unreadable source gives a neutral sample and leaves the snapshots untouched.
	pub fn sample(&mut self) -> Sample {
		let Some(contents) = self.source.read() else {
			return Sample::default();
		};

		let sample = self.tracker.update(&contents);

		if self.verbose {
			if let Some(primary) = self.tracker.primary() {
				print_performance(primary);
			}
		}

		sample
	}

	pub fn tracker(&self) -> &CpuTracker {
		&self.tracker
	}
}

/// Running sums across the samples of a window
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Accumulator {
	pub iterations: u64,
	pub total_running: f64,
	pub total_blocked: u64,
}

impl Accumulator {
	pub fn add(&mut self, sample: Sample) {
		self.iterations += 1;
		self.total_running += sample.running;
		self.total_blocked = self.total_blocked.saturating_add(sample.blocked);
	}

	/// Folds the sums into the reported value for `method`
	pub fn finish(&self, method: Method) -> RunSummary {
		let value = match method {
			Method::Average => mean(self.total_running, self.iterations),
		};

		RunSummary {
			method,
			loops: self.iterations,
			total_running: self.total_running,
			total_blocked: self.total_blocked,
			average: value,
		}
	}
}

/// Outcome of a complete sampling window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
	pub method: Method,
	/// Samples actually taken, lower than planned if the run was interrupted
	pub loops: u64,
	pub total_running: f64,
	/// I/O-wait ticks of the first CPU summed over the window
	pub total_blocked: u64,
	pub average: f64,
}

/// Samples `loops` times, `interval` apart, and aggregates the readings
///
/// A priming read is taken first so that every counted iteration has a
/// previous sample to diff against. Setting `stop` ends the window early;
/// the result then covers only the iterations that ran.
pub fn run_sampling<S: CounterSource>(
	sampler: &mut CpuSampler<S>,
	loops: u64,
	interval: Duration,
	method: Method,
	stop: &AtomicBool,
) -> RunSummary {
	let mut acc = Accumulator::default();

	if loops == 0 {
		return acc.finish(method);
	}

	sampler.sample();

	for i in 0..loops {
		if stop.load(Ordering::Relaxed) {
			info!(completed = i, planned = loops, "sampling interrupted");
			break;
		}

		thread::sleep(interval);
		acc.add(sampler.sample());
	}

	debug!(loops = acc.iterations, total_running = acc.total_running, total_blocked = acc.total_blocked, "window complete");

	acc.finish(method)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::StaticSource;

	fn stat(user: u64, system: u64, idle: u64, iowait: u64) -> String {
		format!("cpu  {user} 0 {system} {idle} {iowait} 0 0 0\ncpu0 {user} 0 {system} {idle} {iowait} 0 0 0\n")
	}

	#[test]
	fn zero_loops_reports_zero_without_reading() {
		let mut sampler = CpuSampler::new(StaticSource::new([stat(1, 1, 1, 0)]), 2, false, false);
		let stop = AtomicBool::new(false);

		let summary = run_sampling(&mut sampler, 0, Duration::ZERO, Method::Average, &stop);

		assert_eq!(summary.loops, 0);
		assert_eq!(summary.average, 0.0);
		assert!(!summary.average.is_nan());
	}

	#[test]
	fn average_is_mean_of_readings() {
		// utilizations: 0.75, 0.5, 0.0 (no ticks elapsed)
		let reads = [stat(10, 10, 70, 0), stat(25, 25, 80, 0), stat(30, 30, 90, 0), stat(30, 30, 90, 0)];
		let mut sampler = CpuSampler::new(StaticSource::new(reads), 1, false, false);
		let stop = AtomicBool::new(false);

		let summary = run_sampling(&mut sampler, 3, Duration::ZERO, Method::Average, &stop);

		assert_eq!(summary.loops, 3);
		assert!((summary.total_running - 1.25).abs() < 1e-12);
		assert!((summary.average - 1.25 / 3.0).abs() < 1e-12);
	}

	#[test]
	fn blocked_ticks_accumulate() {
		let reads = [stat(10, 0, 80, 5), stat(20, 0, 90, 15), stat(30, 0, 100, 40)];
		let mut sampler = CpuSampler::new(StaticSource::new(reads), 1, false, false);
		let stop = AtomicBool::new(false);

		let summary = run_sampling(&mut sampler, 2, Duration::ZERO, Method::Average, &stop);

		assert_eq!(summary.total_blocked, 35);
	}

	#[test]
	fn unreadable_source_counts_as_zero_samples() {
		let mut sampler = CpuSampler::new(StaticSource::default(), 4, false, false);
		let stop = AtomicBool::new(false);

		let summary = run_sampling(&mut sampler, 5, Duration::ZERO, Method::Average, &stop);

		assert_eq!(summary.loops, 5);
		assert_eq!(summary.average, 0.0);
		assert!(sampler.tracker().snapshots().iter().all(|s| s.count == 0));
	}

	#[test]
	fn stop_flag_ends_window_early() {
		let mut sampler = CpuSampler::new(StaticSource::new([stat(1, 1, 1, 0)]), 1, false, false);
		let stop = AtomicBool::new(true);

		let summary = run_sampling(&mut sampler, 10, Duration::ZERO, Method::Average, &stop);

		assert_eq!(summary.loops, 0);
		assert_eq!(summary.average, 0.0);
	}

	#[test]
	fn accumulator_finish_uses_iterations() {
		let mut acc = Accumulator::default();
		acc.add(Sample { running: 0.5, blocked: 2 });
		acc.add(Sample { running: 1.0, blocked: 3 });

		let summary = acc.finish(Method::Average);
		assert_eq!(summary.loops, 2);
		assert_eq!(summary.average, 0.75);
		assert_eq!(summary.total_blocked, 5);
	}
}
