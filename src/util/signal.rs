use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn on_interrupt(_signal: libc::c_int) {
	INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Installs a SIGINT handler that raises the returned flag instead of killing the process
///
/// # Returns
///
/// The flag the sampling loop polls between iterations, or an io::Error if
/// the handler could not be installed
pub fn install_interrupt_flag() -> io::Result<&'static AtomicBool> {
	let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;

	// SAFETY: the handler only performs an atomic store, which is async-signal-safe.
	let previous = unsafe { libc::signal(libc::SIGINT, handler) };
	if previous == libc::SIG_ERR {
		return Err(io::Error::last_os_error());
	}

	Ok(&INTERRUPTED)
}
