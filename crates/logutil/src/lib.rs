//! Utilities for logging.
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::SubscriberBuilder;

/// Initialize logging for tests.
///
/// The filter is taken from `RUST_LOG` if set, otherwise debug. Output is
/// captured by the test harness. Safe to call from every test, only the first
/// call installs the subscriber.
pub fn init_test() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::DEBUG.into())
        .from_env_lossy();

    let _ = SubscriberBuilder::default()
        .with_env_filter(env_filter)
        .with_test_writer()
        .with_thread_names(true)
        .try_init();
}
