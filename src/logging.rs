use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

pub fn init_logging() -> Result<()> {
    // Default filter, overridable via RUST_LOG. Raw ffmpeg stderr lines are
    // logged at debug so operators can replay what the classifier saw.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ott_monitor=debug"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .init();

    Ok(())
}
