use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};

use crate::constants::{DEFAULT_DURATION_SECS, DEFAULT_INTERVAL_MS, DEFAULT_METHOD, MAX_TRACKED_CPUS, PROC_STAT_PATH};
use crate::error::RunqError;

/// How the per-sample readings are folded into the reported value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Method {
	/// Arithmetic mean over every sample in the window
	#[default]
	Average,
}

#[derive(Parser, Debug)]
#[command(name = "runq")]
#[command(version, about = "Average CPU utilization over a sampling window, read from /proc/stat")]
pub struct Cli {
	/// Duration (s); negative values fall back to the default
	#[arg(long, allow_negative_numbers = true)]
	pub duration: Option<i64>,

	/// Interval (ms); values of 0 or less fall back to the default
	#[arg(long, allow_negative_numbers = true)]
	pub interval: Option<i64>,

	/// Method
	#[arg(long, value_enum, default_value = DEFAULT_METHOD)]
	pub method: Method,

	/// Include blocked (I/O-wait) time as busy time
	#[arg(long, num_args = 0..=1, default_value_t = false, default_missing_value = "true", action = ArgAction::Set)]
	pub blocked: bool,

	/// Verbose
	#[arg(long, num_args = 0..=1, default_value_t = false, default_missing_value = "true", action = ArgAction::Set)]
	pub verbose: bool,

	/// Number of CPU lines to track (defaults to the logical CPU count)
	#[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_TRACKED_CPUS))]
	pub cpus: Option<u64>,

	/// Statistics file to sample
	#[arg(long, default_value = PROC_STAT_PATH)]
	pub stat_path: PathBuf,
}

/// Settings for one measurement run, fixed once sampling starts
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
	pub duration_secs: u64,
	pub interval_ms: u64,
	pub method: Method,
	pub include_blocked: bool,
	pub verbose: bool,
	pub cpu_count: usize,
	pub stat_path: PathBuf,
	/// Whether a positive duration/interval came from the command line
	pub duration_supplied: bool,
	pub interval_supplied: bool,
}

impl Default for RunConfig {
	fn default() -> Self {
		Self {
			duration_secs: DEFAULT_DURATION_SECS,
			interval_ms: DEFAULT_INTERVAL_MS,
			method: Method::Average,
			include_blocked: false,
			verbose: false,
			cpu_count: detected_cpus(),
			stat_path: PathBuf::from(PROC_STAT_PATH),
			duration_supplied: false,
			interval_supplied: false,
		}
	}
}

impl RunConfig {
	pub fn from_cli(cli: &Cli) -> Result<Self, RunqError> {
		// An explicit zero duration is kept and yields zero loops
		let duration_secs = match cli.duration {
			Some(secs) if secs >= 0 => secs as u64,
			_ => DEFAULT_DURATION_SECS,
		};
		let interval_ms = match cli.interval {
			Some(ms) if ms > 0 => ms as u64,
			_ => DEFAULT_INTERVAL_MS,
		};

		let cfg = Self {
			duration_secs,
			interval_ms,
			method: cli.method,
			include_blocked: cli.blocked,
			verbose: cli.verbose,
			cpu_count: cli.cpus.map_or_else(detected_cpus, |n| n as usize),
			stat_path: cli.stat_path.clone(),
			duration_supplied: cli.duration.is_some_and(|secs| secs > 0),
			interval_supplied: cli.interval.is_some_and(|ms| ms > 0),
		};

		cfg.validate()?;
		Ok(cfg)
	}

	pub fn validate(&self) -> Result<(), RunqError> {
		if self.cpu_count == 0 {
			return Err(RunqError::NoCpus);
		}
		if self.cpu_count as u64 > MAX_TRACKED_CPUS {
			return Err(RunqError::TooManyCpus(self.cpu_count));
		}
		Ok(())
	}

	/// Number of samples that fit in the window: floor(duration / interval)
	pub fn loop_count(&self) -> u64 {
		loop_count(self.duration_secs, self.interval_ms)
	}

	pub fn interval(&self) -> Duration {
		Duration::from_millis(self.interval_ms)
	}
}

fn detected_cpus() -> usize {
	num_cpus::get().min(MAX_TRACKED_CPUS as usize)
}

/// How many `interval_ms` samples fit into `duration_secs`, rounded down
///
/// Integer arithmetic keeps 1 s / 10 ms at exactly 100. A zero interval
/// yields zero loops rather than dividing by zero.
pub fn loop_count(duration_secs: u64, interval_ms: u64) -> u64 {
	if interval_ms == 0 {
		return 0;
	}
	duration_secs.saturating_mul(1000) / interval_ms
}

/// Rewrites Go-style single-dash long flags (`-duration 5`) to `--duration 5`
///
/// Single-letter flags such as `-h` and negative numbers are left alone.
pub fn normalize_args<I, T>(args: I) -> Vec<OsString>
where
	I: IntoIterator<Item = T>,
	T: Into<OsString>,
{
	let mut args = args.into_iter().map(Into::into);
	let mut normalized: Vec<OsString> = args.next().into_iter().collect();

	for arg in args {
		let rewritten = arg.to_str().and_then(|s| {
			let rest = s.strip_prefix('-')?;
			let name_len = rest.split('=').next().map_or(0, str::len);
			let first = rest.chars().next()?;
			if first == '-' || first.is_ascii_digit() || name_len < 2 {
				return None;
			}
			Some(OsString::from(format!("-{s}")))
		});
		normalized.push(rewritten.unwrap_or(arg));
	}

	normalized
}

/// Rejects a command line with no options, so a bare invocation shows usage
pub fn args_check(args: &[OsString]) -> Result<(), RunqError> {
	if args.len() <= 1 {
		return Err(RunqError::NoFlags);
	}
	Ok(())
}
