use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// JSON logging for the Lambda functions, shaped for CloudWatch.
pub fn init() {
    tracing_subscriber::fmt()
        .json()
        .with_max_level(tracing::Level::INFO)
        .with_current_span(false)
        .with_span_list(false)
        .with_ansi(false)
        .without_time()
        .with_target(false)
        .with_line_number(true)
        .init();
}

/// Human readable logging for the template generator. `RUST_LOG` overrides
/// the INFO default.
pub fn init_cli() {
    tracing_subscriber::fmt()
        .compact()
        .with_env_filter(cli_filter())
        .without_time()
        .with_target(false)
        .init();
}

fn cli_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy()
}
