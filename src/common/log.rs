use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Installs the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise the level is derived from the number of
/// `-v` flags given on the command line.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    let layer = HierarchicalLayer::new(2)
        .with_writer(std::io::stderr)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_indent_lines(true);

    if let Err(e) = tracing_subscriber::registry().with(filter).with(layer).try_init() {
        eprintln!("Failed to install log subscriber: {e}");
    }
}

fn default_directive(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("warn,sway_out={level}")
}
