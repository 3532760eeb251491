pub mod common;
pub mod config;
pub mod control;
pub mod coordinator;
pub mod emulator;
pub mod engine;
pub mod error;
pub mod vision;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use self::config::Configuration;
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use error::{AppError, CaptureError, DeviceError, MatchError, TemplateError};
