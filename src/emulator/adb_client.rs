use std::path::PathBuf;
use std::process::Command;

use crate::emulator::device_channel::{DeviceChannel, DeviceCommand};
use crate::error::{AppError, DeviceError};

/// Device channel backed by the `adb` executable.
pub struct AdbClient {
    adb_path: PathBuf,
    serial: Option<String>,
}

impl AdbClient {
    pub fn new(adb_path: impl Into<PathBuf>, serial: Option<String>) -> Self {
        Self {
            adb_path: adb_path.into(),
            serial,
        }
    }

    fn describe(&self, command: &DeviceCommand) -> String {
        match &self.serial {
            Some(serial) => format!("{} -s {} {}", self.adb_path.display(), serial, command),
            None => format!("{} {}", self.adb_path.display(), command),
        }
    }
}

impl DeviceChannel for AdbClient {
    fn execute(&self, command: &DeviceCommand) -> Result<Vec<u8>, DeviceError> {
        let mut process = Command::new(&self.adb_path);
        // Server management is global; only device commands target a serial.
        if let Some(serial) = &self.serial {
            if !matches!(command, DeviceCommand::StartServer | DeviceCommand::Devices) {
                process.arg("-s").arg(serial);
            }
        }
        process.args(command.args());

        let output = process.output().map_err(|source| DeviceError::Spawn {
            command: self.describe(command),
            source,
        })?;
        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: self.describe(command),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output.stdout)
    }
}

/// Starts the bridge server and verifies a device is attached.
///
/// Returns the `devices` listing on success. A missing device is fatal since
/// nothing downstream can work without one.
pub fn connect(channel: &dyn DeviceChannel) -> Result<String, AppError> {
    tracing::info!("Starting device bridge server");
    if let Err(e) = channel.execute(&DeviceCommand::StartServer) {
        tracing::warn!("start-server failed: {}", e);
    }

    let devices = channel
        .execute_text(&DeviceCommand::Devices)
        .map_err(|e| AppError::Connection(e.to_string()))?;
    if !devices.contains("device") {
        tracing::error!("No connected device in listing: {:?}", devices);
        return Err(AppError::Connection(devices));
    }
    tracing::info!("Device bridge connected");
    Ok(devices)
}
