pub mod adb;
pub mod coords;
pub mod input;
pub mod text_input;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::TapClawResult;

/// Boundary to the device command transport. Everything this crate does to a
/// handset goes through one blocking `execute` call.
#[async_trait]
pub trait DeviceExecutor: Send + Sync {
    /// Run a command against the connected device and return raw stdout.
    /// Non-zero exit or hitting the timeout fails with `DeviceCommand`.
    async fn execute(&self, args: &[&str], timeout: Duration) -> TapClawResult<Vec<u8>>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Records every issued command and answers from a scripted reply queue
    /// (empty stdout once the queue runs dry).
    pub struct RecordingExecutor {
        pub calls: Mutex<Vec<Vec<String>>>,
        pub replies: Mutex<Vec<Vec<u8>>>,
    }

    impl RecordingExecutor {
        pub fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(Vec::new()),
            }
        }

        pub fn with_replies(replies: Vec<Vec<u8>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                replies: Mutex::new(replies),
            }
        }

        pub fn recorded(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DeviceExecutor for RecordingExecutor {
        async fn execute(&self, args: &[&str], _timeout: Duration) -> TapClawResult<Vec<u8>> {
            self.calls
                .lock()
                .unwrap()
                .push(args.iter().map(|s| s.to_string()).collect());
            let mut replies = self.replies.lock().unwrap();
            if replies.is_empty() {
                Ok(Vec::new())
            } else {
                Ok(replies.remove(0))
            }
        }
    }
}
