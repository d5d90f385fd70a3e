use tracing::Level;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LEVEL: Level = Level::INFO;

/// Installs the process-wide stdout log sink.
///
/// `RUST_LOG` takes precedence; otherwise events from this crate at `level`
/// (default `info`) and above are written.
pub fn init(level: Option<Level>) {
    let level = level.unwrap_or(DEFAULT_LEVEL);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(level)));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stdout))
        .with(filter)
        .init();
}

fn default_directive(level: Level) -> String {
    format!("library_organizer={}", level.as_str().to_lowercase())
}
