use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, prelude::*, EnvFilter, Layer};

use crate::settings::LogFormat;

/// Install the global subscriber. Logs go to stderr so command output on stdout stays parseable.
/// `RUST_LOG` narrows or widens the default `info` level. A second call is a no-op.
pub fn init(format: LogFormat) {
    let filter = || {
        EnvFilter::builder()
            .with_default_directive(LevelFilter::INFO.into())
            .from_env_lossy()
    };

    let layer = match format {
        LogFormat::Default => tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter())
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .with_filter(filter())
            .boxed(),
    };

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
