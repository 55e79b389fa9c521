pub mod cpu;
pub mod signal;

/// Ticks elapsed between two readings of a cumulative counter
///
/// # Arguments
///
/// * `previous` - Counter value at the earlier sample
/// * `current` - Counter value at the later sample
///
/// # Returns
///
/// The difference, or zero if the counter went backwards (CPU hotplug or a
/// truncated read)
pub const fn tick_delta(previous: u64, current: u64) -> u64 {
	current.saturating_sub(previous)
}

/// Arithmetic mean of `total` over `count` readings, 0.0 when there were none
pub fn mean(total: f64, count: u64) -> f64 {
	if count == 0 {
		return 0.0;
	}
	total / count as f64
}
