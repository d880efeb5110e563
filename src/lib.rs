pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod narration;
pub mod perception;

pub use agent_engine::engine::{AgentLoop, LoopConfig};
pub use agent_engine::state::RunOutcome;
pub use errors::{OmniPilotError, OmniPilotResult};

/// Installs the global tracing subscriber. RUST_LOG overrides the default
/// `info` filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
