use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use regex::Regex;

use crate::config::DeviceConfig;
use crate::errors::{TapClawError, TapClawResult};
use crate::executor::adb::{list_devices, AdbExecutor};
use crate::executor::DeviceExecutor;

/// One already-connected handset, exclusively owned by the runner driving it.
pub struct DeviceSession {
    serial: Option<String>,
    width: u32,
    height: u32,
    last_step: DateTime<Utc>,
    exec: Arc<dyn DeviceExecutor>,
    command_timeout: Duration,
}

impl DeviceSession {
    pub fn new(
        serial: Option<String>,
        exec: Arc<dyn DeviceExecutor>,
        command_timeout: Duration,
    ) -> Self {
        Self {
            serial,
            width: 0,
            height: 0,
            last_step: Utc::now(),
            exec,
            command_timeout,
        }
    }

    pub fn executor(&self) -> &Arc<dyn DeviceExecutor> {
        &self.exec
    }

    pub fn command_timeout(&self) -> Duration {
        self.command_timeout
    }

    /// Stable identity for per-device bookkeeping (helper staging).
    pub fn device_id(&self) -> &str {
        self.serial.as_deref().unwrap_or("<default>")
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn last_step(&self) -> DateTime<Utc> {
        self.last_step
    }

    /// Record that a step just executed against this device.
    pub fn mark_step(&mut self) {
        self.last_step = Utc::now();
    }

    /// Query `wm size` and cache the physical resolution.
    pub async fn refresh_resolution(&mut self) -> TapClawResult<()> {
        let raw = self
            .exec
            .execute(&["shell", "wm", "size"], self.command_timeout)
            .await?;
        let text = String::from_utf8_lossy(&raw);
        let (width, height) = parse_wm_size(&text)?;
        self.width = width;
        self.height = height;
        tracing::info!(
            device = self.device_id(),
            width,
            height,
            "device resolution cached"
        );
        Ok(())
    }
}

fn parse_wm_size(raw: &str) -> TapClawResult<(u32, u32)> {
    let re = Regex::new(r"Physical size:\s*(\d+)x(\d+)").expect("static regex");
    let caps = re.captures(raw).ok_or_else(|| {
        TapClawError::DeviceCommand(format!("failed to parse wm size output: {raw}"))
    })?;
    let width = caps[1].parse().map_err(|_| {
        TapClawError::DeviceCommand(format!("failed to parse wm size output: {raw}"))
    })?;
    let height = caps[2].parse().map_err(|_| {
        TapClawError::DeviceCommand(format!("failed to parse wm size output: {raw}"))
    })?;
    Ok((width, height))
}

/// Detect the first connected, authorised device and return a session with
/// its resolution already cached.
pub async fn setup_device(cfg: &DeviceConfig) -> TapClawResult<DeviceSession> {
    let timeout = Duration::from_secs(cfg.command_timeout_secs);
    let serial = match &cfg.serial {
        Some(serial) => Some(serial.clone()),
        None => {
            let serials = list_devices(timeout).await?;
            if serials.is_empty() {
                return Err(TapClawError::DeviceCommand(
                    "no authorised Android device found; plug in and check adb".into(),
                ));
            }
            if serials.len() > 1 {
                tracing::warn!(
                    count = serials.len(),
                    chosen = %serials[0],
                    "multiple devices detected; defaulting to the first"
                );
            }
            Some(serials[0].clone())
        }
    };

    let exec: Arc<dyn DeviceExecutor> = Arc::new(AdbExecutor::new(serial.clone()));
    let mut session = DeviceSession::new(serial, exec, timeout);
    session.refresh_resolution().await?;
    Ok(session)
}
