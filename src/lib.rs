pub mod agent_engine;
pub mod config;
pub mod errors;
pub mod executor;
pub mod llm;
pub mod perception;

use std::sync::Arc;

use crate::agent_engine::engine::AgentRunner;
use crate::agent_engine::interpreter::StepInterpreter;
use crate::agent_engine::session::setup_device;
use crate::errors::TapClawResult;
use crate::executor::text_input::{TextEncoder, UnicodeHelper};
use crate::llm::client::OpenAiCompatClient;

/// Initialise logging and environment; call once from the binary.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();
}

/// Wire up a runner from config.toml and drive `goal` to completion.
/// Returns true when the model declared the task finished or impossible.
pub async fn run_task(goal: &str) -> TapClawResult<bool> {
    let cfg = config::load_config()?;

    let session = setup_device(&cfg.device).await?;
    tracing::info!(
        device = session.device_id(),
        resolution = ?session.resolution(),
        "device ready"
    );

    let interpreter = StepInterpreter::new(
        session,
        TextEncoder::new(cfg.device.space_token.clone()),
        Arc::new(UnicodeHelper::new(cfg.device.helper_path.clone())),
    );
    let client = OpenAiCompatClient::new(&cfg.model);
    let mut runner = AgentRunner::new(interpreter, Box::new(client), &cfg.agent);
    runner.run(goal).await
}
