use std::fs;
use std::path::Path;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{LOG_DIR, LOG_FILE};

/// Initializes console and JSON file logging.
///
/// Variables from `env_path` are loaded first so a `RUST_LOG` set there overrides the
/// default `textprep=info` filter. Keep the returned guard alive for the life of the
/// process so buffered file output is flushed on exit.
pub fn init_logging(env_path: &Path) -> WorkerGuard {
    let (filter, env_loaded) = filter_after_env(env_path);

    let _ = fs::create_dir_all(LOG_DIR);

    let file_appender = tracing_appender::rolling::daily(LOG_DIR, LOG_FILE);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);
    let console_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    if let Err(e) = env_loaded {
        warn!("Could not load {}: {}", env_path.display(), e);
    }
    guard
}

fn filter_after_env(env_path: &Path) -> (EnvFilter, Result<(), dotenv::Error>) {
    let env_loaded = dotenv::from_path(env_path);
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("textprep=info"));
    (filter, env_loaded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::tempdir;

    #[test]
    fn env_file_sets_the_filter() {
        env::remove_var("RUST_LOG");
        let dir = tempdir().unwrap();
        let env_path = dir.path().join(".env");
        fs::write(&env_path, "RUST_LOG=textprep=debug\n").unwrap();

        let (filter, loaded) = filter_after_env(&env_path);
        assert!(loaded.is_ok());
        assert_eq!(filter.to_string(), "textprep=debug");

        env::remove_var("RUST_LOG");
        let (filter, loaded) = filter_after_env(&dir.path().join("absent.env"));
        assert!(loaded.is_err());
        assert_eq!(filter.to_string(), "textprep=info");
    }
}
