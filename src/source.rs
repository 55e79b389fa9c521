use std::collections::VecDeque;
use std::fmt::Debug;
use std::fs;
use std::path::PathBuf;

use tracing::warn;

use crate::constants::PROC_STAT_PATH;

/// Somewhere the aggregate CPU statistics can be read from
pub trait CounterSource: Debug {
	/// Returns the full text of the statistics file, or `None` if it could not be read
	fn read(&mut self) -> Option<String>;
}

/// The kernel's /proc/stat, or a captured copy of it at another path
#[derive(Debug, Clone)]
pub struct ProcStat {
	path: PathBuf,
	warned: bool,
}

impl ProcStat {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			warned: false,
		}
	}
}

impl Default for ProcStat {
	fn default() -> Self {
		Self::new(PROC_STAT_PATH)
	}
}

impl CounterSource for ProcStat {
	fn read(&mut self) -> Option<String> {
		match fs::read_to_string(&self.path) {
			Ok(contents) => Some(contents),
			Err(e) => {
				// Reported once; every later failure just yields a neutral sample
				if !self.warned {
					warn!(path = %self.path.display(), error = %e, "cannot read CPU statistics");
					self.warned = true;
				}
				None
			},
		}
	}
}

/// Replays a fixed list of stat file contents, then reports the source as unreadable
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
	reads: VecDeque<String>,
}

impl StaticSource {
	pub fn new<I, S>(reads: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			reads: reads.into_iter().map(Into::into).collect(),
		}
	}

	/// Number of reads left before the source runs dry
	pub fn remaining(&self) -> usize {
		self.reads.len()
	}
}

impl CounterSource for StaticSource {
	fn read(&mut self) -> Option<String> {
		self.reads.pop_front()
	}
}
