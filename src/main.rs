use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use runq::config::{Cli, RunConfig, args_check, normalize_args};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
	let args = normalize_args(std::env::args_os());

	if args_check(&args).is_err() {
		println!("Usage: runq [options]");
		let _ = Cli::command().print_help();
		return ExitCode::FAILURE;
	}

	let cli = Cli::parse_from(args);
	init_tracing(cli.verbose);

	let cfg = match RunConfig::from_cli(&cli) {
		Ok(cfg) => cfg,
		Err(e) => {
			error!(error = %e, "invalid configuration");
			return ExitCode::FAILURE;
		},
	};

	match runq::run(&cfg) {
		Ok(_) => ExitCode::SUCCESS,
		Err(e) => {
			error!(error = %e, "run failed");
			ExitCode::FAILURE
		},
	}
}

fn init_tracing(verbose: bool) {
	let default = if verbose { "info" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}
