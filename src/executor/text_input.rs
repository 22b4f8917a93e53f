use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::errors::{TapClawError, TapClawResult};
use crate::executor::input::Gestures;
use crate::executor::DeviceExecutor;

/// On-device directory the keyboard helper is pushed to.
const HELPER_REMOTE_DIR: &str = "/data/local/tmp";

/// Chosen input path for one text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextCommand {
    /// ASCII-only payload, spaces already substituted; goes out as one
    /// `input text` command.
    Direct(String),
    /// Payload contains non-ASCII glyphs `input text` cannot represent;
    /// quotes already shell-escaped for the helper invocation.
    Helper(String),
}

/// Encodes a URL-encoded payload and picks the input path. The branch is
/// purely a function of character range, never per-call configuration.
#[derive(Debug, Clone)]
pub struct TextEncoder {
    /// Token the device shell expects in place of spaces on the direct path.
    space_token: String,
}

impl TextEncoder {
    pub fn new(space_token: impl Into<String>) -> Self {
        Self {
            space_token: space_token.into(),
        }
    }

    pub fn encode(&self, raw: &str) -> TapClawResult<TextCommand> {
        let text = urlencoding::decode(raw)
            .map_err(|e| TapClawError::MalformedAction(format!("TYPE payload not UTF-8: {e}")))?;
        if text.is_ascii() {
            Ok(TextCommand::Direct(text.replace(' ', &self.space_token)))
        } else {
            Ok(TextCommand::Helper(text.replace('\'', "'\\''")))
        }
    }
}

impl Default for TextEncoder {
    fn default() -> Self {
        Self::new("%s")
    }
}

/// Stages and invokes the Unicode keyboard helper. The staged set is keyed by
/// device identity so concurrent runners against distinct handsets each push
/// once; the lock is held across the push so a single device never sees two
/// staging commands.
pub struct UnicodeHelper {
    local_path: PathBuf,
    staged: Mutex<HashSet<String>>,
}

impl UnicodeHelper {
    pub fn new(local_path: impl Into<PathBuf>) -> Self {
        Self {
            local_path: local_path.into(),
            staged: Mutex::new(HashSet::new()),
        }
    }

    /// File name the push keeps on the device; the invocation classpath must
    /// reference the same name.
    fn remote_name(&self) -> TapClawResult<&str> {
        self.local_path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                TapClawError::Config(format!(
                    "helper_path has no file name: {}",
                    self.local_path.display()
                ))
            })
    }

    /// Push the helper to `device_id` unless already staged this process.
    pub async fn ensure_staged(
        &self,
        device_id: &str,
        exec: &Arc<dyn DeviceExecutor>,
        timeout: Duration,
    ) -> TapClawResult<()> {
        let mut staged = self.staged.lock().await;
        if staged.contains(device_id) {
            return Ok(());
        }
        if !Path::new(&self.local_path).exists() {
            return Err(TapClawError::Precondition(format!(
                "Unicode helper not found: {}",
                self.local_path.display()
            )));
        }
        let local = self.local_path.to_string_lossy();
        exec.execute(&["push", &local, HELPER_REMOTE_DIR], timeout)
            .await?;
        staged.insert(device_id.to_string());
        tracing::info!(device = device_id, "Unicode helper pushed to device");
        Ok(())
    }

    /// Invoke the staged helper as a keyboard-injection process.
    pub async fn send_text(&self, gestures: &Gestures, escaped: &str) -> TapClawResult<()> {
        let name = self.remote_name()?;
        let command = format!(
            "app_process -Djava.class.path={dir}/{name} {dir} com.ysbing.yadb.Main -keyboard '{escaped}'",
            dir = HELPER_REMOTE_DIR,
        );
        gestures.shell(&command).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::testing::RecordingExecutor;

    #[test]
    fn ascii_takes_the_direct_path_with_space_token() {
        let encoder = TextEncoder::default();
        assert_eq!(
            encoder.encode("hello%20world").unwrap(),
            TextCommand::Direct("hello%sworld".into())
        );
    }

    #[test]
    fn space_token_is_pluggable() {
        let encoder = TextEncoder::new("\\ ");
        assert_eq!(
            encoder.encode("a b").unwrap(),
            TextCommand::Direct("a\\ b".into())
        );
    }

    #[test]
    fn non_ascii_takes_the_helper_path() {
        let encoder = TextEncoder::default();
        match encoder.encode("%E4%BD%A0%E5%A5%BD").unwrap() {
            TextCommand::Helper(text) => assert_eq!(text, "你好"),
            other => panic!("expected helper path, got {other:?}"),
        }
    }

    #[test]
    fn helper_path_escapes_single_quotes() {
        let encoder = TextEncoder::default();
        assert_eq!(
            encoder.encode("caf%C3%A9%20d%27or").unwrap(),
            TextCommand::Helper("café d'\\''or".into())
        );
    }

    #[tokio::test]
    async fn staging_is_idempotent_per_device() {
        let dir = std::env::temp_dir().join("tapclaw-helper-test");
        std::fs::create_dir_all(&dir).unwrap();
        let helper_file = dir.join("yadb");
        std::fs::write(&helper_file, b"binary").unwrap();

        let helper = UnicodeHelper::new(&helper_file);
        let rec = Arc::new(RecordingExecutor::new());
        let exec: Arc<dyn DeviceExecutor> = rec.clone();
        let timeout = Duration::from_secs(30);

        helper.ensure_staged("serial-a", &exec, timeout).await.unwrap();
        helper.ensure_staged("serial-a", &exec, timeout).await.unwrap();
        helper.ensure_staged("serial-b", &exec, timeout).await.unwrap();

        // one push per distinct device, never two for the same serial
        let calls = rec.recorded();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0][0], "push");
        assert_eq!(calls[1][0], "push");
    }

    #[tokio::test]
    async fn invocation_classpath_matches_the_staged_file_name() {
        let rec = Arc::new(RecordingExecutor::new());
        let exec: Arc<dyn DeviceExecutor> = rec.clone();
        let gestures = Gestures::new(exec, Duration::from_secs(30));

        let helper = UnicodeHelper::new("/opt/tools/kbd-helper");
        helper.send_text(&gestures, "你好").await.unwrap();

        let calls = rec.recorded();
        assert_eq!(calls[0][0], "shell");
        assert!(
            calls[0][1].contains("-Djava.class.path=/data/local/tmp/kbd-helper"),
            "classpath should name the pushed file: {}",
            calls[0][1]
        );
    }

    #[tokio::test]
    async fn missing_helper_artifact_is_fatal() {
        let helper = UnicodeHelper::new("/nonexistent/yadb");
        let exec: Arc<dyn DeviceExecutor> = Arc::new(RecordingExecutor::new());
        let err = helper
            .ensure_staged("serial-a", &exec, Duration::from_secs(30))
            .await
            .unwrap_err();
        assert!(matches!(err, TapClawError::Precondition(_)));
    }
}
