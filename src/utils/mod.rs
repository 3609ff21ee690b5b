pub mod files;
pub mod paths;

use std::sync::Once;

pub use paths::{ensure_dir, PathResolver};

static TRACING_INIT: Once = Once::new();

const DEFAULT_DIRECTIVE: &str = "booking_core=info";

/// Installs the global `fmt` subscriber on stderr. The crate logs at `info`; other
/// targets follow `RUST_LOG`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let mut filter = EnvFilter::from_default_env();
        if let Ok(directive) = DEFAULT_DIRECTIVE.parse() {
            filter = filter.add_directive(directive);
        }

        // A host may already own the global subscriber.
        let _ = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
        tracing::info!("Booking Core tracing initialized.");
    });
}
