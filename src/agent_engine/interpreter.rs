use std::sync::Arc;

use crate::agent_engine::action::{ActionDescriptor, SwipeTarget};
use crate::agent_engine::session::DeviceSession;
use crate::errors::TapClawResult;
use crate::executor::coords::{directional_end, map_point, DEFAULT_SWIPE_DURATION_MS};
use crate::executor::input::Gestures;
use crate::executor::text_input::{TextCommand, TextEncoder, UnicodeHelper};

/// Turns a decoded action descriptor into device gestures and decides whether
/// the task has reached its terminal state.
pub struct StepInterpreter {
    session: DeviceSession,
    gestures: Gestures,
    encoder: TextEncoder,
    helper: Arc<UnicodeHelper>,
}

impl StepInterpreter {
    pub fn new(session: DeviceSession, encoder: TextEncoder, helper: Arc<UnicodeHelper>) -> Self {
        let gestures = Gestures::new(session.executor().clone(), session.command_timeout());
        Self {
            session,
            gestures,
            encoder,
            helper,
        }
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Execute every field present in the descriptor, in fixed order: POINT,
    /// PRESS, TYPE, CLEAR. Returns true iff STATUS is terminal.
    pub async fn step(&mut self, action: &ActionDescriptor) -> TapClawResult<bool> {
        tracing::debug!(?action, "step");

        if let Some(point) = action.point {
            self.handle_point(point, action).await?;
        }
        if let Some(key) = &action.press {
            self.gestures.send_key(key).await?;
        }
        if let Some(payload) = &action.type_text {
            self.handle_type(payload).await?;
        }
        if action.wants_clear() {
            self.gestures.clear().await?;
        }
        self.session.mark_step();

        if action.is_terminal() {
            tracing::info!(status = ?action.status, "task reached terminal status");
            return Ok(true);
        }
        Ok(false)
    }

    async fn handle_point(&self, point: [i64; 2], action: &ActionDescriptor) -> TapClawResult<()> {
        let (width, height) = self.session.resolution();
        let (x, y) = map_point(point, width, height);

        match &action.to {
            None => self.gestures.tap(x, y).await,
            Some(target) => {
                let (x2, y2) = match target {
                    SwipeTarget::Point(end) => map_point(*end, width, height),
                    SwipeTarget::Direction(dir) => directional_end(x, y, dir, width, height)?,
                };
                let duration = action.duration.unwrap_or(DEFAULT_SWIPE_DURATION_MS);
                self.gestures.swipe(x, y, x2, y2, duration).await
            }
        }
    }

    async fn handle_type(&self, payload: &str) -> TapClawResult<()> {
        match self.encoder.encode(payload)? {
            TextCommand::Direct(encoded) => self.gestures.send_text(&encoded).await,
            TextCommand::Helper(escaped) => {
                self.helper
                    .ensure_staged(
                        self.session.device_id(),
                        self.session.executor(),
                        self.session.command_timeout(),
                    )
                    .await?;
                self.helper.send_text(&self.gestures, &escaped).await
            }
        }
    }
}
