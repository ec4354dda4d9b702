//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;


/// Install a stderr subscriber. `RUST_LOG` wins over `verbosity`.
pub fn init(verbosity: u8) {
    let default = match verbosity {
        0 => "watersmart=warn",
        1 => "watersmart=info",
        _ => "watersmart=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
