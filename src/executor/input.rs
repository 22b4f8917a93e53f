use std::sync::Arc;
use std::time::Duration;

use crate::errors::{TapClawError, TapClawResult};
use crate::executor::DeviceExecutor;

/// Symbolic key names the action protocol accepts, with their Android
/// keyevent codes.
const KEY_TABLE: &[(&str, &str)] = &[
    ("HOME", "KEYCODE_HOME"),
    ("BACK", "KEYCODE_BACK"),
    ("MENU", "KEYCODE_MENU"),
    ("ENTER", "KEYCODE_ENTER"),
    ("APPSELECT", "KEYCODE_APP_SWITCH"),
    ("power", "KEYCODE_POWER"),
    ("volume_up", "KEYCODE_VOLUME_UP"),
    ("volume_down", "KEYCODE_VOLUME_DOWN"),
    ("volume_mute", "KEYCODE_VOLUME_MUTE"),
];

pub fn keycode_for(name: &str) -> TapClawResult<&'static str> {
    KEY_TABLE
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, code)| *code)
        .ok_or_else(|| TapClawError::Protocol(format!("unknown PRESS value: {name}")))
}

/// Translates decided gestures into literal `input` shell commands. No
/// decision logic lives here; executor failures propagate unmodified.
pub struct Gestures {
    exec: Arc<dyn DeviceExecutor>,
    timeout: Duration,
}

impl Gestures {
    pub fn new(exec: Arc<dyn DeviceExecutor>, timeout: Duration) -> Self {
        Self { exec, timeout }
    }

    pub async fn tap(&self, x: i64, y: i64) -> TapClawResult<()> {
        tracing::debug!(x, y, "tap");
        self.exec
            .execute(
                &["shell", "input", "tap", &x.to_string(), &y.to_string()],
                self.timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn swipe(
        &self,
        x1: i64,
        y1: i64,
        x2: i64,
        y2: i64,
        duration_ms: u64,
    ) -> TapClawResult<()> {
        tracing::debug!(x1, y1, x2, y2, duration_ms, "swipe");
        self.exec
            .execute(
                &[
                    "shell",
                    "input",
                    "swipe",
                    &x1.to_string(),
                    &y1.to_string(),
                    &x2.to_string(),
                    &y2.to_string(),
                    &duration_ms.to_string(),
                ],
                self.timeout,
            )
            .await?;
        Ok(())
    }

    pub async fn send_key(&self, name: &str) -> TapClawResult<()> {
        let code = keycode_for(name)?;
        tracing::debug!(key = name, code, "keyevent");
        self.exec
            .execute(&["shell", "input", "keyevent", code], self.timeout)
            .await?;
        Ok(())
    }

    /// Sends an already-encoded payload via the `input text` fast path.
    pub async fn send_text(&self, encoded: &str) -> TapClawResult<()> {
        self.exec
            .execute(&["shell", "input", "text", encoded], self.timeout)
            .await?;
        Ok(())
    }

    pub async fn clear(&self) -> TapClawResult<()> {
        self.exec
            .execute(&["shell", "input", "keyevent", "KEYCODE_CLEAR"], self.timeout)
            .await?;
        Ok(())
    }

    /// Runs an arbitrary shell command line on the device (helper invocation).
    pub async fn shell(&self, command: &str) -> TapClawResult<Vec<u8>> {
        self.exec.execute(&["shell", command], self.timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::RecordingExecutor;

    #[test]
    fn key_table_covers_protocol_names() {
        assert_eq!(keycode_for("HOME").unwrap(), "KEYCODE_HOME");
        assert_eq!(keycode_for("APPSELECT").unwrap(), "KEYCODE_APP_SWITCH");
        assert_eq!(keycode_for("volume_mute").unwrap(), "KEYCODE_VOLUME_MUTE");
    }

    #[test]
    fn unmapped_key_is_a_protocol_error() {
        let err = keycode_for("CAPSLOCK").unwrap_err();
        assert!(matches!(err, TapClawError::Protocol(ref m) if m.contains("CAPSLOCK")));
    }

    #[tokio::test]
    async fn tap_issues_a_single_input_command() {
        let exec = Arc::new(RecordingExecutor::new());
        let gestures = Gestures::new(exec.clone(), Duration::from_secs(30));
        gestures.tap(540, 1200).await.unwrap();
        let calls = exec.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], vec!["shell", "input", "tap", "540", "1200"]);
    }

    #[tokio::test]
    async fn swipe_carries_duration() {
        let exec = Arc::new(RecordingExecutor::new());
        let gestures = Gestures::new(exec.clone(), Duration::from_secs(30));
        gestures.swipe(540, 2160, 540, 1800, 150).await.unwrap();
        let calls = exec.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            vec!["shell", "input", "swipe", "540", "2160", "540", "1800", "150"]
        );
    }
}
