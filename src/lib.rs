pub mod chat;
pub mod error;
pub mod graph;
pub mod llm;
pub mod prompt;
pub mod session;
pub mod settings;
pub mod web;

pub use chat::{ChatOrchestrator, Reply};
pub use error::Error;
pub use session::{Session, Turn};
pub use settings::Settings;

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Driver chatter from
/// `neo4rs` is limited to errors unless `RUST_LOG` says otherwise.
pub fn init_tracing(default_filter: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("{default_filter},neo4rs=error"))
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
