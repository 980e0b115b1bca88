use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// `RUST_LOG` wins; otherwise this crate logs at info, or debug when verbose.
fn library_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose {
            "small_library=debug,info"
        } else {
            "small_library=info"
        })
    })
}

/// Human-readable log lines on stderr, leaving stdout for command output.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(library_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(library_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false), // 借還事件的 patron_id / book_id 等欄位直接成為 JSON 鍵
        )
        .init();
}
