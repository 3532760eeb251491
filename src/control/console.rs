use std::io::{self, BufRead, Write};
use std::thread::JoinHandle;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use crossterm::tty::IsTty;

use crate::common::RunState;
use crate::control::selection::SelectionBoard;

/// A line typed by the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Stop,
    Set { slot: String, value: String },
    Clear { slot: String },
    Show,
    Unknown(String),
}

impl ConsoleCommand {
    /// Blank lines parse to `None`.
    pub fn parse(line: &str, stop_key: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        if line == stop_key || line.eq_ignore_ascii_case("stop") {
            return Some(ConsoleCommand::Stop);
        }

        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next(), words.next(), words.next()) {
            (Some("set"), Some(slot), Some(value), None) => ConsoleCommand::Set {
                slot: slot.to_string(),
                value: value.to_string(),
            },
            (Some("clear"), Some(slot), None, None) => ConsoleCommand::Clear {
                slot: slot.to_string(),
            },
            (Some("show"), None, None, None) => ConsoleCommand::Show,
            _ => ConsoleCommand::Unknown(line.to_string()),
        };
        Some(command)
    }

    pub fn apply(self, run_state: &RunState, selections: &SelectionBoard) {
        match self {
            ConsoleCommand::Stop => run_state.stop(),
            ConsoleCommand::Set { slot, value } => selections.set(slot, value),
            ConsoleCommand::Clear { slot } => {
                if selections.clear(&slot).is_none() {
                    tracing::info!("Nothing selected for {}", slot);
                }
            }
            ConsoleCommand::Show => {
                let snapshot = selections.snapshot();
                if snapshot.is_empty() {
                    tracing::info!("No selections yet");
                }
                for (slot, value) in snapshot {
                    tracing::info!("{} = {}", slot, value);
                }
            }
            ConsoleCommand::Unknown(line) => {
                tracing::warn!(
                    "Unknown command {:?}; use `set <slot> <value>`, `clear <slot>`, `show` or `stop`",
                    line
                );
            }
        }
    }
}

// How long a key poll blocks before the stop flag is re-read.
const KEY_POLL: Duration = Duration::from_millis(100);

/// What a single key press asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Stop,
    /// Read one line command such as `set domain 4`.
    Prompt,
}

impl KeyAction {
    pub fn from_key(key: &KeyEvent, stop_key: char) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Char(c) if c == stop_key => Some(KeyAction::Stop),
            // Raw mode swallows the interrupt signal.
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyAction::Stop)
            }
            KeyCode::Char(':') | KeyCode::Enter => Some(KeyAction::Prompt),
            _ => None,
        }
    }
}

/// Handle to the operator input thread.
pub struct ConsoleListener {
    handle: JoinHandle<()>,
    interactive: bool,
}

impl ConsoleListener {
    /// Waits for a key listener so the terminal leaves raw mode. A line
    /// listener is blocked on stdin and is left to die with the process.
    pub fn shutdown(self) {
        if self.interactive && self.handle.join().is_err() {
            tracing::error!("Console listener panicked");
        }
    }
}

/// Watches operator input on a dedicated thread.
///
/// On a terminal the stop key acts on a single press and `:` opens a
/// command prompt. Piped stdin is read line by line instead.
pub fn spawn_listener(
    run_state: RunState,
    selections: SelectionBoard,
    stop_key: String,
) -> io::Result<ConsoleListener> {
    let interactive = io::stdin().is_tty();
    let key = stop_key.chars().next().unwrap_or('`');
    if interactive {
        tracing::info!("Press `{}` to stop, `:` to enter a command", key);
    } else {
        tracing::info!("Type `{}` or `stop` and press enter to stop", stop_key);
    }

    let handle = std::thread::Builder::new()
        .name("console-listener".to_string())
        .spawn(move || {
            let result = if interactive {
                listen_keys(&run_state, &selections, key)
            } else {
                listen_lines(&run_state, &selections, &stop_key)
            };
            if let Err(e) = result {
                tracing::error!("Console listener failed: {}", e);
            }
        })?;
    Ok(ConsoleListener {
        handle,
        interactive,
    })
}

struct RawMode;

impl RawMode {
    fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        Ok(RawMode)
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn listen_keys(run_state: &RunState, selections: &SelectionBoard, stop_key: char) -> io::Result<()> {
    let _raw = RawMode::enable()?;
    while run_state.is_running() {
        if !event::poll(KEY_POLL)? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        match KeyAction::from_key(&key, stop_key) {
            Some(KeyAction::Stop) => run_state.stop(),
            Some(KeyAction::Prompt) => prompt(run_state, selections, stop_key)?,
            None => {}
        }
    }
    Ok(())
}

fn prompt(run_state: &RunState, selections: &SelectionBoard, stop_key: char) -> io::Result<()> {
    terminal::disable_raw_mode()?;
    let mut stdout = io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()?;

    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    if let Some(command) = ConsoleCommand::parse(&line, &stop_key.to_string()) {
        command.apply(run_state, selections);
    }
    terminal::enable_raw_mode()
}

fn listen_lines(run_state: &RunState, selections: &SelectionBoard, stop_key: &str) -> io::Result<()> {
    for line in io::stdin().lock().lines() {
        if let Some(command) = ConsoleCommand::parse(&line?, stop_key) {
            command.apply(run_state, selections);
        }
        if !run_state.is_running() {
            break;
        }
    }
    Ok(())
}

/// Log writer that keeps lines aligned while the terminal is in raw mode,
/// where a bare newline no longer returns the cursor.
pub struct TerminalWriter<W> {
    inner: W,
    raw: bool,
}

impl TerminalWriter<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal::is_raw_mode_enabled().unwrap_or(false))
    }
}

impl<W: Write> TerminalWriter<W> {
    pub fn new(inner: W, raw: bool) -> Self {
        Self { inner, raw }
    }
}

impl<W: Write> Write for TerminalWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if !self.raw {
            return self.inner.write(buf);
        }
        for (i, line) in buf.split(|b| *b == b'\n').enumerate() {
            if i > 0 {
                self.inner.write_all(b"\r\n")?;
            }
            self.inner.write_all(line)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
