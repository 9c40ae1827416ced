//! Tracing setup for the `measure` binary and test harnesses.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `level` when set. With `json` every event is one JSON
/// object per line. Only the first call in a process installs anything.
pub fn init_tracing(json: bool, level: Level) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let json_layer = json.then(|| fmt::layer().with_target(false).json());
    let text_layer = (!json).then(|| fmt::layer().with_target(false));

    if tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_err()
    {
        tracing::trace!("tracing subscriber already installed");
    }
}
