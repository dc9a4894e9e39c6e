use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Installs a compact stderr subscriber.
///
/// `RUST_LOG` wins over `verbosity` when set. Safe to call more than once;
/// later calls leave the first subscriber in place.
pub fn init_logging(verbosity: u8) {
	// 0 = warnings plus popup lifecycle at info
	// 1 = info everywhere, popup internals at debug
	// 2+ = everything
	let filter = match verbosity {
		0 => "warn,testkit=info",
		1 => "info,testkit=debug",
		_ => "debug,testkit=trace",
	};

	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

	let stderr = std::io::stderr.with_max_level(tracing::Level::TRACE);

	let _ = tracing_subscriber::fmt()
		.with_env_filter(env_filter)
		.with_writer(stderr)
		.with_target(true)
		.with_level(true)
		.compact()
		.try_init();
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn repeated_init_is_harmless() {
		init_logging(0);
		init_logging(2);
		tracing::info!(target = "testkit", "logging initialized twice");
	}
}
