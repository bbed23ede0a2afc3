use anyhow::Result;

/// Timers are driven from a single event loop, so a current-thread runtime is all the
/// application needs.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
