use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize logging to stderr, leaving stdout for the summary table.
///
/// The level applies to this crate only; `RUST_LOG` overrides it entirely.
/// Calling this twice is harmless: the second subscriber is discarded.
pub fn init_logging(level: &str) {
    let default_filter = format!("solver_sweep_rs={level},sweep={level},warn");
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&default_filter));

    let initialized = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false),
        )
        .try_init();

    if initialized.is_ok() {
        tracing::debug!("logging initialized (level={})", level);
    }
}
