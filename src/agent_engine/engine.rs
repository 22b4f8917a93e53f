use std::time::Duration;

use crate::agent_engine::interpreter::StepInterpreter;
use crate::agent_engine::journal::{JournalEntry, SessionJournal};
use crate::config::AgentConfig;
use crate::errors::TapClawResult;
use crate::llm::client::ModelClient;
use crate::llm::types::DecodedAction;
use crate::perception::screenshot;

/// Drives one device through the capture → predict → execute loop.
pub struct AgentRunner {
    interpreter: StepInterpreter,
    client: Box<dyn ModelClient>,
    journal: SessionJournal,
    pacing: Duration,
    screenshot_max_edge: u32,
    max_steps: Option<u32>,
}

impl AgentRunner {
    pub fn new(interpreter: StepInterpreter, client: Box<dyn ModelClient>, cfg: &AgentConfig) -> Self {
        Self {
            interpreter,
            client,
            journal: SessionJournal::new(),
            pacing: Duration::from_millis(cfg.pacing_ms),
            screenshot_max_edge: cfg.screenshot_max_edge,
            max_steps: cfg.max_steps,
        }
    }

    /// Run until the model emits a terminal status. Returns true when the
    /// task concluded (finished or declared impossible), false when the
    /// configured step bound cut the run short.
    pub async fn run(&mut self, goal: &str) -> TapClawResult<bool> {
        tracing::info!(
            goal,
            session = %self.journal.session_id,
            device = self.interpreter.session().device_id(),
            "starting run"
        );
        let mut steps = 0u32;

        loop {
            if let Some(bound) = self.max_steps {
                if steps >= bound {
                    tracing::warn!(bound, "step bound reached before terminal status");
                    return Ok(false);
                }
            }

            let shot = screenshot::capture(
                self.interpreter.session().executor(),
                self.interpreter.session().command_timeout(),
                Some(self.screenshot_max_edge),
            )
            .await?;

            let turn = self.client.predict(goal, &[shot]).await?;
            steps += 1;

            let terminal = match &turn.decoded {
                DecodedAction::Action(action) => {
                    let terminal = self.interpreter.step(action).await?;
                    self.journal.push(JournalEntry {
                        ts: chrono::Utc::now().timestamp_millis(),
                        goal: goal.to_string(),
                        action: serde_json::to_value(action).ok(),
                        terminal,
                    });
                    terminal
                }
                DecodedAction::Unparsed(text) => {
                    // Not actionable; keep looping rather than fail the run.
                    tracing::warn!(text = %text, "model output not actionable this turn");
                    self.journal.push(JournalEntry {
                        ts: chrono::Utc::now().timestamp_millis(),
                        goal: goal.to_string(),
                        action: None,
                        terminal: false,
                    });
                    false
                }
            };
            if let Err(e) = self.journal.flush() {
                tracing::warn!(error = %e, "journal flush failed");
            }

            if terminal {
                tracing::info!(steps, "run finished");
                return Ok(true);
            }
            tokio::time::sleep(self.pacing).await;
        }
    }
}
