// Kernel aggregate CPU statistics
pub const PROC_STAT_PATH: &str = "/proc/stat";
pub const CPU_LINE_PREFIX: &str = "cpu";

// Sampling defaults
pub const DEFAULT_DURATION_SECS: u64 = 1;
pub const DEFAULT_INTERVAL_MS: u64 = 10;
pub const DEFAULT_METHOD: &str = "average";

// Upper bound for --cpus
pub const MAX_TRACKED_CPUS: u64 = 4096;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
