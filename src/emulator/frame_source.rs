use std::sync::Arc;

use crate::common::Frame;
use crate::emulator::device_channel::{DeviceChannel, DeviceCommand};
use crate::error::CaptureError;

/// Requests a fresh screenshot on every call. Nothing is cached.
pub struct FrameSource {
    channel: Arc<dyn DeviceChannel>,
}

impl FrameSource {
    pub fn new(channel: Arc<dyn DeviceChannel>) -> Self {
        Self { channel }
    }

    pub fn capture(&self) -> Result<Frame, CaptureError> {
        let bytes = self.channel.execute(&DeviceCommand::Screencap)?;
        if bytes.is_empty() {
            return Err(CaptureError::Empty);
        }
        let image = image::load_from_memory(&bytes)?.to_rgb8();
        let frame = Frame::captured_now(image);
        tracing::debug!(
            "Captured frame {} ({}x{})",
            frame.get_frame_id(),
            frame.width(),
            frame.height()
        );
        Ok(frame)
    }
}
