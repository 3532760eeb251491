pub mod frame;
pub mod region;
pub mod run_state;

pub use frame::Frame;
pub use region::{Point, Region, Size};
pub use run_state::RunState;
