use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log lines go. Workers keep stdout free for the handshake line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTarget {
    Stdout,
    Stderr,
}

pub fn init_logging(verbose: bool, no_color: bool, target: LogTarget) {
    let filter = std::env::var("FLEETLOAD_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .map_or_else(
            |_| {
                if verbose {
                    EnvFilter::new("debug")
                } else {
                    EnvFilter::new("info")
                }
            },
            |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
        );

    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_ansi(!no_color);

    let result = match target {
        LogTarget::Stdout => tracing::subscriber::set_global_default(builder.finish()),
        LogTarget::Stderr => tracing::subscriber::set_global_default(
            builder.with_writer(std::io::stderr).finish(),
        ),
    };
    if let Err(err) = result {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
