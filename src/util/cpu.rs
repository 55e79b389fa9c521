use serde::Serialize;
use tracing::debug;

use crate::constants::CPU_LINE_PREFIX;
use crate::util::tick_delta;

/// Cumulative time buckets for a single CPU line of /proc/stat, in clock ticks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CpuCounters {
	#[serde(rename = "UserMode")]
	pub user: u64,
	#[serde(rename = "NicedProcesses")]
	pub nice: u64,
	#[serde(rename = "SystemProcesses")]
	pub system: u64,
	#[serde(rename = "IdleProcesses")]
	pub idle: u64,
	#[serde(rename = "IowaitProcesses")]
	pub iowait: u64,
	#[serde(rename = "IrqProcesses")]
	pub irq: u64,
	#[serde(rename = "SoftIrq")]
	pub softirq: u64,
	#[serde(rename = "Steal")]
	pub steal: u64,
	#[serde(rename = "GuestMode")]
	pub guest: u64,
}

impl CpuCounters {
	/// Builds counters from the numeric fields of a stat line (label already stripped)
	///
	/// Missing trailing fields (older kernels stop at `steal`) and fields that
	/// fail to parse are both read as zero.
	pub fn from_fields(fields: &[&str]) -> Self {
		let field = |i: usize| fields.get(i).map_or(0, |f| parse_counter(f));

		Self {
			user: field(0),
			nice: field(1),
			system: field(2),
			idle: field(3),
			iowait: field(4),
			irq: field(5),
			softirq: field(6),
			steal: field(7),
			guest: field(8),
		}
	}

	/// Ticks spent doing work. I/O-wait only counts when `include_iowait` is set.
	///
	/// Guest time is already folded into `user` by the kernel, so it is left out.
	pub fn running(&self, include_iowait: bool) -> u64 {
		let busy = [self.user, self.nice, self.system, self.irq, self.softirq, self.steal]
			.into_iter()
			.fold(0u64, u64::saturating_add);

		if include_iowait { busy.saturating_add(self.iowait) } else { busy }
	}

	/// Ticks spent not doing work
	pub fn idle_total(&self, include_iowait: bool) -> u64 {
		if include_iowait { self.idle } else { self.idle.saturating_add(self.iowait) }
	}
}

/// Derived totals remembered from the previous update of a CPU
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CpuStats {
	pub total_running: u64,
	pub total_idle: u64,
	pub total: u64,
	/// I/O-wait ticks elapsed between the last two updates
	pub iowait_delta: u64,
	/// Busy fraction between the last two updates, 0.0 until the second update
	#[serde(rename = "Performance")]
	pub utilization: f64,
}

/// State of one logical CPU, updated in place once per sample
///
/// Serializes flat, with the counters inlined next to the label.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CpuSnapshot {
	pub name: String,
	#[serde(flatten)]
	pub counters: CpuCounters,
	pub stats: CpuStats,
	pub count: u64,
}

impl CpuSnapshot {
	/// Applies a freshly read stat line (label followed by counters)
	///
	/// Returns the utilization since the previous update, or `None` on the
	/// first update, which only primes the totals.
	pub fn update(&mut self, fields: &[&str], include_iowait: bool) -> Option<f64> {
		self.count += 1;

		let Some((label, values)) = fields.split_first() else {
			return None;
		};

		let previous = self.counters;
		self.name = (*label).to_string();
		self.counters = CpuCounters::from_fields(values);

		let total_running = self.counters.running(include_iowait);
		let total_idle = self.counters.idle_total(include_iowait);
		let total = total_running.saturating_add(total_idle);

		let utilization = if self.count > 1 {
			let total_delta = tick_delta(self.stats.total, total);
			let idle_delta = tick_delta(self.stats.total_idle, total_idle);
			self.stats.iowait_delta = tick_delta(previous.iowait, self.counters.iowait);
			self.stats.utilization = utilization_fraction(total_delta, idle_delta);
			Some(self.stats.utilization)
		} else {
			None
		};

		self.stats.total = total;
		self.stats.total_running = total_running;
		self.stats.total_idle = total_idle;

		utilization
	}
}

/// Result of one pass of the counter reader over the stats source
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sample {
	/// Utilization of the first tracked CPU (the all-cores line)
	pub running: f64,
	/// I/O-wait ticks of the first tracked CPU since the previous sample
	pub blocked: u64,
}

/// Tracks cumulative counters for a fixed set of logical CPUs
///
/// The snapshot vector is sized once and never grows; lines past the
/// tracked count are ignored.
#[derive(Debug, Clone)]
pub struct CpuTracker {
	snapshots: Vec<CpuSnapshot>,
	include_iowait: bool,
}

impl CpuTracker {
	/// Creates a tracker for `cpu_count` stat lines
	pub fn new(cpu_count: usize, include_iowait: bool) -> Self {
		Self {
			snapshots: vec![CpuSnapshot::default(); cpu_count],
			include_iowait,
		}
	}

	/// Updates every tracked snapshot from the contents of a stat file
	///
	/// Only lines starting with `cpu` are consumed, in kernel order, so index 0
	/// is the all-cores summary.
	pub fn update(&mut self, contents: &str) -> Sample {
		let include_iowait = self.include_iowait;
		let mut running = None;

		let cpu_lines = contents.lines().filter(|line| line.starts_with(CPU_LINE_PREFIX));
		for (index, (snapshot, line)) in self.snapshots.iter_mut().zip(cpu_lines).enumerate() {
			let fields: Vec<&str> = line.split_whitespace().collect();
			let utilization = snapshot.update(&fields, include_iowait);
			if index == 0 {
				running = utilization;
			}
		}

		let Some(first) = self.snapshots.first() else {
			return Sample::default();
		};

		match running {
			Some(running) => {
				debug!(cpu = %first.name, running, blocked = first.stats.iowait_delta, "sample");
				Sample {
					running,
					blocked: first.stats.iowait_delta,
				}
			},
			None => Sample::default(),
		}
	}

	pub fn snapshots(&self) -> &[CpuSnapshot] {
		&self.snapshots
	}

	/// The all-cores snapshot the reported metric is taken from
	pub fn primary(&self) -> Option<&CpuSnapshot> {
		self.snapshots.first()
	}
}

/// Parses one counter field, treating anything that is not a u64 as zero
pub fn parse_counter(field: &str) -> u64 {
	field.trim().parse().unwrap_or(0)
}

/// Fraction of `total_delta` ticks that were not idle
///
/// A zero delta (no time elapsed, or an unreadable source) yields 0.0.
pub fn utilization_fraction(total_delta: u64, idle_delta: u64) -> f64 {
	if total_delta == 0 {
		return 0.0;
	}
	total_delta.saturating_sub(idle_delta) as f64 / total_delta as f64
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn malformed_fields_parse_as_zero() {
		let counters = CpuCounters::from_fields(&["10", "x", "-3", "40", "", "1.5", "7", "8", "9"]);

		assert_eq!(counters.user, 10);
		assert_eq!(counters.nice, 0);
		assert_eq!(counters.system, 0);
		assert_eq!(counters.idle, 40);
		assert_eq!(counters.iowait, 0);
		assert_eq!(counters.irq, 0);
		assert_eq!(counters.softirq, 7);
		assert_eq!(counters.steal, 8);
		assert_eq!(counters.guest, 9);
	}

	#[test]
	fn missing_guest_field_is_zero() {
		let counters = CpuCounters::from_fields(&["1", "2", "3", "4", "5", "6", "7", "8"]);
		assert_eq!(counters.steal, 8);
		assert_eq!(counters.guest, 0);
	}

	#[test]
	fn first_update_only_primes() {
		let mut snapshot = CpuSnapshot::default();
		let first = snapshot.update(&["cpu", "10", "0", "10", "70", "0", "0", "0", "0"], false);

		assert_eq!(first, None);
		assert_eq!(snapshot.count, 1);
		assert_eq!(snapshot.name, "cpu");
		assert_eq!(snapshot.stats.total, 90);
		assert_eq!(snapshot.stats.total_running, 20);
		assert_eq!(snapshot.stats.total_idle, 70);
		assert_eq!(snapshot.stats.utilization, 0.0);
	}

	#[test]
	fn second_update_reports_busy_fraction() {
		let mut snapshot = CpuSnapshot::default();
		snapshot.update(&["cpu", "10", "0", "10", "70", "0", "0", "0", "0"], false);
		let second = snapshot.update(&["cpu", "25", "0", "25", "80", "0", "0", "0", "0"], false);

		assert_eq!(second, Some(0.75));
		assert_eq!(snapshot.count, 2);
	}

	#[test]
	fn iowait_counts_as_idle_unless_blocked_is_included() {
		let first = ["cpu", "10", "0", "0", "80", "10", "0", "0", "0"];
		let second = ["cpu", "20", "0", "0", "90", "30", "0", "0", "0"];

		let mut idle = CpuSnapshot::default();
		idle.update(&first, false);
		assert_eq!(idle.update(&second, false), Some(0.25));
		assert_eq!(idle.stats.iowait_delta, 20);

		let mut busy = CpuSnapshot::default();
		busy.update(&first, true);
		assert_eq!(busy.update(&second, true), Some(0.75));
		assert_eq!(busy.stats.iowait_delta, 20);
	}

	#[test]
	fn unchanged_counters_do_not_divide_by_zero() {
		let line = ["cpu", "10", "0", "10", "70", "0", "0", "0", "0"];
		let mut snapshot = CpuSnapshot::default();
		snapshot.update(&line, false);
		let utilization = snapshot.update(&line, false);

		assert_eq!(utilization, Some(0.0));
	}

	#[test]
	fn utilization_stays_in_unit_range() {
		assert_eq!(utilization_fraction(0, 0), 0.0);
		assert_eq!(utilization_fraction(0, 5), 0.0);
		assert_eq!(utilization_fraction(10, 20), 0.0);
		assert_eq!(utilization_fraction(10, 0), 1.0);
		assert_eq!(utilization_fraction(40, 10), 0.75);
	}

	#[test]
	fn tracker_reports_first_line_and_ignores_extra_cpus() {
		let mut tracker = CpuTracker::new(2, false);
		let first = "cpu  10 0 10 70 0 0 0 0\ncpu0 5 0 5 35 0 0 0 0\ncpu1 5 0 5 35 0 0 0 0\nintr 1 2 3\n";
		let second = "cpu  25 0 25 80 0 0 0 0\ncpu0 10 0 10 45 0 0 0 0\ncpu1 10 0 10 45 0 0 0 0\nintr 4 5 6\n";

		assert_eq!(tracker.update(first), Sample::default());
		let sample = tracker.update(second);

		assert_eq!(sample.running, 0.75);
		assert_eq!(sample.blocked, 0);
		assert_eq!(tracker.snapshots().len(), 2);
		assert_eq!(tracker.snapshots()[1].name, "cpu0");
		assert_eq!(tracker.snapshots()[1].stats.utilization, 0.5);
		assert_eq!(tracker.primary().map(|s| s.count), Some(2));
	}

	#[test]
	fn tracker_skips_non_cpu_lines() {
		let mut tracker = CpuTracker::new(1, false);
		tracker.update("intr 1\ncpu  10 0 10 70 0 0 0 0\n");
		let sample = tracker.update("ctxt 9\ncpu  25 0 25 80 0 0 0 0\n");

		assert_eq!(sample.running, 0.75);
	}

	#[test]
	fn empty_contents_yield_neutral_sample() {
		let mut tracker = CpuTracker::new(4, false);
		assert_eq!(tracker.update(""), Sample::default());
		assert_eq!(tracker.update(""), Sample::default());
		assert!(tracker.snapshots().iter().all(|s| s.count == 0));
	}
}
