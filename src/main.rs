use std::time::Duration;

use anyhow::Result;
use punchclock::{cli::run_cli, utils::runtime::single_thread_runtime};
use tracing::error;

fn main() -> Result<()> {
    let runtime = single_thread_runtime()?;
    let result = runtime.block_on(run_cli());
    // Stdin is read on a blocking thread that won't return until the next line arrives.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result.inspect_err(|e| {
        error!("Error running cli {e:?}");
    })
}
