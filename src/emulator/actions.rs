use std::sync::Arc;

use crate::emulator::device_channel::{DeviceChannel, DeviceCommand};

pub const DEFAULT_SWIPE_MS: u64 = 500;

/// Touch and text input. Fire-and-forget: the on-screen effect is never verified.
pub struct Actions {
    channel: Arc<dyn DeviceChannel>,
}

impl Actions {
    pub fn new(channel: Arc<dyn DeviceChannel>) -> Self {
        Self { channel }
    }

    pub fn tap(&self, x: u32, y: u32) -> bool {
        tracing::info!("Tap at ({}, {})", x, y);
        self.dispatch(DeviceCommand::Tap { x, y })
    }

    pub fn swipe(&self, x1: u32, y1: u32, x2: u32, y2: u32, duration_ms: u64) -> bool {
        tracing::info!(
            "Swipe from ({}, {}) to ({}, {}) over {}ms",
            x1,
            y1,
            x2,
            y2,
            duration_ms
        );
        self.dispatch(DeviceCommand::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        })
    }

    pub fn input_text(&self, text: &str) -> bool {
        tracing::info!("Input text {:?}", text);
        self.dispatch(DeviceCommand::Text(text.to_string()))
    }

    // A failed command is a no-op for the caller, which carries on regardless.
    fn dispatch(&self, command: DeviceCommand) -> bool {
        match self.channel.execute(&command) {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Command `{}` failed: {}", command, e);
                false
            }
        }
    }
}
