//! clipkeep daemon: watch the system clipboard and record history.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use clipkeep::history::{start_monitoring, ClipboardHistory, StoragePaths};
use clipkeep::{config, logging};

fn main() -> Result<()> {
    let _logging_guard = logging::init();

    let paths = StoragePaths::default_dir();
    let config = config::load_or_default(&paths.config());

    let history = Arc::new(
        ClipboardHistory::open(&paths, &config).context("failed to open clipboard history")?,
    );
    info!(
        entries = history.len(),
        history_limit = config.history_limit,
        cache_budget_mb = config.cache_budget_mb,
        "History restored"
    );

    {
        let observed = history.clone();
        history.set_on_change(move || {
            debug!(entries = observed.len(), "History changed");
        });
    }

    let monitor = start_monitoring(history.clone()).context("failed to start monitor")?;

    // Foreground daemon: run until stdin closes (Ctrl-D, or service
    // supervisor shutdown), then stop the monitor and flush.
    info!("clipkeep running; close stdin to stop");
    let mut line = String::new();
    while std::io::stdin().read_line(&mut line).unwrap_or(0) > 0 {
        line.clear();
    }

    monitor.stop();
    info!(entries = history.len(), "clipkeep shutting down");
    Ok(())
}
