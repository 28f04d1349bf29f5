pub mod config;
pub mod errors;
pub mod llm;
pub mod perception;

/// Installs the global `fmt` subscriber. `RUST_LOG` overrides the default
/// `info` filter. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}
