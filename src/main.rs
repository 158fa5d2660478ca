//! notchbet - a notch overlay for quick prediction questions.

use notchbet::{App, Config, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // The terminal belongs to the UI, so logs go to a daily file.
    let log_dir = notchbet::config::log_dir()?;
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "notchbet.log");
    let (writer, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "notchbet=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();

    // Load configuration
    let config = Config::load_or_default()?;

    // Run the application
    let mut app = App::new(config).await?;
    app.run().await?;

    Ok(())
}
