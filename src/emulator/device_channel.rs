use std::fmt;

use crate::error::DeviceError;

/// Commands understood by the device bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    StartServer,
    Devices,
    Screencap,
    Tap { x: u32, y: u32 },
    Swipe {
        x1: u32,
        y1: u32,
        x2: u32,
        y2: u32,
        duration_ms: u64,
    },
    Text(String),
}

impl DeviceCommand {
    /// Arguments passed to the bridge executable, in order.
    pub fn args(&self) -> Vec<String> {
        let shell_input = |rest: Vec<String>| {
            let mut args = vec!["shell".to_string(), "input".to_string()];
            args.extend(rest);
            args
        };
        match self {
            DeviceCommand::StartServer => vec!["start-server".to_string()],
            DeviceCommand::Devices => vec!["devices".to_string()],
            DeviceCommand::Screencap => vec![
                "exec-out".to_string(),
                "screencap".to_string(),
                "-p".to_string(),
            ],
            DeviceCommand::Tap { x, y } => {
                shell_input(vec!["tap".to_string(), x.to_string(), y.to_string()])
            }
            DeviceCommand::Swipe {
                x1,
                y1,
                x2,
                y2,
                duration_ms,
            } => shell_input(vec![
                "swipe".to_string(),
                x1.to_string(),
                y1.to_string(),
                x2.to_string(),
                y2.to_string(),
                duration_ms.to_string(),
            ]),
            // `input text` treats a literal space as an argument break.
            DeviceCommand::Text(text) => {
                shell_input(vec!["text".to_string(), text.replace(' ', "%s")])
            }
        }
    }
}

impl fmt::Display for DeviceCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.args().join(" "))
    }
}

/// Transport to a single emulator instance.
///
/// Implementations block until the bridge acknowledges the command and return
/// its raw stdout. Any call may fail; callers decide whether that is fatal.
pub trait DeviceChannel: Send + Sync {
    fn execute(&self, command: &DeviceCommand) -> Result<Vec<u8>, DeviceError>;

    fn execute_text(&self, command: &DeviceCommand) -> Result<String, DeviceError> {
        let output = self.execute(command)?;
        Ok(String::from_utf8_lossy(&output).trim().to_string())
    }
}
