use std::path::Path;
use std::sync::Once;

use anyhow::Result;
use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE: &str = "promptline.log";

/// Log to `promptline.log` in `dir`, filtered by `RUST_LOG`. The file is
/// truncated per run. Returns `None` when a subscriber is already
/// installed; keep the guard alive for the life of the process.
pub fn configure_logging(dir: &Path) -> Result<Option<WorkerGuard>> {
    let log_path = dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(()) => Ok(Some(guard)),
        // Already installed; dropping the guard shuts the writer down.
        Err(_) => Ok(None),
    }
}

pub fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}
