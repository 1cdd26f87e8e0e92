//! Observability module providing structured logging.
//!
//! Log output is configured under `[observability.logging]` with a pretty,
//! compact or JSON format. `RUST_LOG` overrides the configured filter.

mod tracing_init;

pub use tracing_init::*;
