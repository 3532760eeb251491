pub mod actions;
pub mod adb_client;
pub mod device_channel;
pub mod frame_source;

pub use actions::Actions;
pub use adb_client::{connect, AdbClient};
pub use device_channel::{DeviceChannel, DeviceCommand};
pub use frame_source::FrameSource;
