use std::sync::Once;

use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: Once = Once::new();

/// Filter used when neither the argument nor `RUST_LOG` provide one.
const DEFAULT_FILTER: &str = "info";

/// Install the process-wide tracing subscriber, once.
///
/// `rust_log` is the filter directive to use when the `RUST_LOG` environment
/// variable is not set; tests usually pass `option_env!("RUST_LOG")` so that
/// the filter chosen at build time is honoured. Subsequent calls are no-ops.
///
/// If another subscriber has already been installed (for instance by a test
/// harness), it is left in place.
pub fn log_init(rust_log: Option<&str>) {
    LOG_INIT.call_once(|| {
        if std::env::var("RUST_BACKTRACE").is_err() {
            unsafe {
                std::env::set_var("RUST_BACKTRACE", "1");
            }
        }

        let directive = std::env::var("RUST_LOG")
            .ok()
            .or_else(|| rust_log.map(ToOwned::to_owned))
            .unwrap_or_else(|| DEFAULT_FILTER.to_owned());

        tracing_setup(&directive);
        debug!("tracing initialised with filter: {directive}");
    });
}

fn tracing_setup(directive: &str) {
    let format = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(true)
        .compact();

    let filter = EnvFilter::try_new(directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // `try_init` fails when a global subscriber already exists: keep that one.
    let _already_set = tracing_subscriber::registry()
        .with(filter)
        .with(format)
        .try_init();
}
