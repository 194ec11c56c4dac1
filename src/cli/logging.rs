/// Tracing subscriber setup. Logs go to stderr; reporter lines own stdout.
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` overrides the verbosity default.
pub fn init_tracing(verbose: u8) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level(verbose).into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn default_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}
