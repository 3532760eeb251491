pub mod console;
pub mod selection;

pub use console::{spawn_listener, ConsoleCommand, ConsoleListener, KeyAction, TerminalWriter};
pub use selection::SelectionBoard;
