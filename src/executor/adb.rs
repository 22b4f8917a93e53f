use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::errors::{TapClawError, TapClawResult};
use crate::executor::DeviceExecutor;

/// Runs `adb [-s serial] <args>` as a child process.
pub struct AdbExecutor {
    serial: Option<String>,
}

impl AdbExecutor {
    pub fn new(serial: Option<String>) -> Self {
        Self { serial }
    }

    fn build_command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("adb");
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd.args(args);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

#[async_trait]
impl DeviceExecutor for AdbExecutor {
    async fn execute(&self, args: &[&str], timeout: Duration) -> TapClawResult<Vec<u8>> {
        tracing::debug!(args = ?args, "$ adb");
        let output = tokio::time::timeout(timeout, self.build_command(args).output())
            .await
            .map_err(|_| {
                TapClawError::DeviceCommand(format!(
                    "adb {} timed out after {}s",
                    args.join(" "),
                    timeout.as_secs()
                ))
            })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TapClawError::DeviceCommand(format!(
                "adb {} exited with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

/// List serials of connected, authorised devices (`adb devices` parse).
pub async fn list_devices(timeout: Duration) -> TapClawResult<Vec<String>> {
    let exec = AdbExecutor::new(None);
    let raw = exec.execute(&["devices"], timeout).await?;
    let text = String::from_utf8_lossy(&raw);
    let serials = text
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect();
    Ok(serials)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_is_threaded_into_argv() {
        let exec = AdbExecutor::new(Some("emulator-5554".into()));
        let cmd = exec.build_command(&["shell", "wm", "size"]);
        let argv: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(argv, ["-s", "emulator-5554", "shell", "wm", "size"]);
    }

    #[test]
    fn no_serial_means_bare_adb() {
        let exec = AdbExecutor::new(None);
        let cmd = exec.build_command(&["devices"]);
        let argv: Vec<String> = cmd
            .as_std()
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(argv, ["devices"]);
    }
}
