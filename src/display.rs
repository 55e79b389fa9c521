use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use tracing::debug;

use crate::config::RunConfig;
use crate::constants::VERSION;
use crate::monitor::RunSummary;
use crate::util::cpu::CpuSnapshot;

// Every dump line after the first starts with this, then tab indentation
const DUMP_LINE_PREFIX: &str = " ";

pub fn banner() -> String {
	format!("runq Version {VERSION} - CPU utilization sampler")
}

/// Banner, any explicitly supplied settings and the tracked CPU count
pub fn header_lines(cfg: &RunConfig) -> Vec<String> {
	let mut lines = vec![banner()];

	if cfg.duration_supplied {
		lines.push(format!("Duration: {} ", cfg.duration_secs));
	}
	if cfg.interval_supplied {
		lines.push(format!("Interval: {} ", cfg.interval_ms));
	}
	if cfg.verbose {
		lines.push(format!("Method: {:?}", cfg.method));
		lines.push(format!("Blocked: {}", cfg.include_blocked));
		lines.push(format!("Source: {}", cfg.stat_path.display()));
	}

	lines.push(format!("====== Number of CPUs: {} ============", cfg.cpu_count));
	lines
}

pub fn print_header(cfg: &RunConfig) {
	for line in header_lines(cfg) {
		println!("{line}");
	}
}

/// Renders `value` as tab-indented JSON with `prefix` before every line but the first
///
/// Returns an empty string if the value cannot be serialized.
pub fn to_tab_json<T: Serialize>(value: &T, prefix: &str) -> String {
	let mut buf = Vec::new();
	let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b"\t"));

	if let Err(e) = value.serialize(&mut ser) {
		debug!(error = %e, "diagnostic dump failed");
		return String::new();
	}

	let json = String::from_utf8(buf).unwrap_or_default();
	if prefix.is_empty() {
		return json;
	}
	json.replace('\n', &format!("\n{prefix}"))
}

/// Diagnostic dump of a CPU's state after a sample
pub fn performance_line(snapshot: &CpuSnapshot) -> String {
	format!("Performance: {}", to_tab_json(snapshot, DUMP_LINE_PREFIX))
}

pub fn print_performance(snapshot: &CpuSnapshot) {
	println!("{}", performance_line(snapshot));
}

pub fn summary_lines(summary: &RunSummary) -> Vec<String> {
	let mut lines = Vec::with_capacity(2);
	if summary.loops > 0 {
		lines.push(format!("Loops: {}", summary.loops));
	}
	lines.push(format!("CPU usage average: {:.6}", summary.average));
	lines
}

pub fn print_summary(summary: &RunSummary, cfg: &RunConfig) {
	for line in summary_lines(summary) {
		println!("{line}");
	}

	if cfg.include_blocked || cfg.verbose {
		println!("Blocked ticks: {}", summary.total_blocked);
	}
}
