//! In-memory device used by unit tests.
use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::Mutex;

use image::{ImageFormat, RgbImage};

use crate::common::RunState;
use crate::emulator::device_channel::{DeviceChannel, DeviceCommand};
use crate::error::DeviceError;

/// Deterministic textured image so correlation scores are well defined.
pub fn noise_image(width: u32, height: u32, seed: u32) -> RgbImage {
    let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
    RgbImage::from_fn(width, height, |_, _| {
        let mut channel = || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        image::Rgb([channel(), channel(), channel()])
    })
}

pub fn encode_png(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, ImageFormat::Png)
        .expect("png encoding of an in-memory image");
    bytes.into_inner()
}

#[derive(Default)]
struct FakeState {
    commands: Vec<DeviceCommand>,
    // The last screen stays on display once the queue drains.
    screens: VecDeque<Vec<u8>>,
    devices: String,
    stop_after_taps: Option<(usize, RunState)>,
}

pub struct FakeDevice {
    state: Mutex<FakeState>,
    fails: Option<fn(&DeviceCommand) -> bool>,
}

impl FakeDevice {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                devices: "List of devices attached\nemulator-5554\tdevice".to_string(),
                ..FakeState::default()
            }),
            fails: None,
        }
    }

    pub fn with_devices(self, listing: &str) -> Self {
        self.state.lock().unwrap().devices = listing.to_string();
        self
    }

    /// Queues a screen. Each queued screen is shown for one capture, except
    /// the last which stays up.
    pub fn with_screen(self, screen: &RgbImage) -> Self {
        self.with_screen_bytes(encode_png(screen))
    }

    pub fn with_screen_bytes(self, bytes: Vec<u8>) -> Self {
        self.state.lock().unwrap().screens.push_back(bytes);
        self
    }

    pub fn failing_on(mut self, fails: fn(&DeviceCommand) -> bool) -> Self {
        self.fails = Some(fails);
        self
    }

    /// Flips `run_state` to stopped once `taps` taps have been dispatched.
    pub fn stop_after_taps(self, taps: usize, run_state: RunState) -> Self {
        self.state.lock().unwrap().stop_after_taps = Some((taps, run_state));
        self
    }

    pub fn commands(&self) -> Vec<DeviceCommand> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn taps(&self) -> Vec<(u32, u32)> {
        self.commands()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCommand::Tap { x, y } => Some((x, y)),
                _ => None,
            })
            .collect()
    }

    pub fn screencaps(&self) -> usize {
        self.commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::Screencap))
            .count()
    }
}

impl DeviceChannel for FakeDevice {
    fn execute(&self, command: &DeviceCommand) -> Result<Vec<u8>, DeviceError> {
        let mut state = self.state.lock().unwrap();
        state.commands.push(command.clone());

        if self.fails.is_some_and(|fails| fails(command)) {
            return Err(DeviceError::CommandFailed {
                command: command.to_string(),
                status: "exit status: 1".to_string(),
                stderr: "error: device offline".to_string(),
            });
        }

        match command {
            DeviceCommand::Devices => Ok(state.devices.clone().into_bytes()),
            DeviceCommand::Screencap => {
                let bytes = if state.screens.len() > 1 {
                    state.screens.pop_front().unwrap_or_default()
                } else {
                    state.screens.front().cloned().unwrap_or_default()
                };
                Ok(bytes)
            }
            DeviceCommand::Tap { .. } => {
                let taps = state
                    .commands
                    .iter()
                    .filter(|c| matches!(c, DeviceCommand::Tap { .. }))
                    .count();
                if let Some((limit, run_state)) = &state.stop_after_taps {
                    if taps >= *limit {
                        run_state.stop();
                    }
                }
                Ok(Vec::new())
            }
            _ => Ok(Vec::new()),
        }
    }
}
