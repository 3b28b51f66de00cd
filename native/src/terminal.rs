//! TerminalBackend trait + crossterm and headless implementations.
//!
//! The render context depends on this trait, not on crossterm directly, so
//! tests run against a recording mock and CI runs headless.

use std::io::Write;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode as CtKeyCode, KeyEventKind, KeyModifiers};

use crate::error::{LotusError, Result};
use crate::types::{InputEvent, KeyCode, KeyEvent, Modifiers};

/// Used when the terminal size cannot be queried.
pub const FALLBACK_SIZE: (u16, u16) = (80, 24);

// ============================================================================
// Traits
// ============================================================================

pub trait TerminalBackend: Send {
    fn init(&mut self) -> Result<()>;
    fn shutdown(&mut self) -> Result<()>;
    fn size(&self) -> (u16, u16);
    fn write_frame(&mut self, frame: &str) -> Result<()>;
    fn flush(&mut self) -> Result<()>;

    /// Downcast support for test code.
    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

/// Blocking source of decoded input, driven from the event loop's input
/// thread.
pub trait InputSource: Send {
    /// Wait up to `timeout` for the next event. `Ok(None)` means nothing
    /// arrived in time.
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>>;
}

// ============================================================================
// CrosstermBackend
// ============================================================================

pub struct CrosstermBackend {
    width: u16,
    height: u16,
    out: std::io::Stdout,
}

impl Default for CrosstermBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CrosstermBackend {
    pub fn new() -> Self {
        Self::with_fallback(FALLBACK_SIZE)
    }

    pub fn with_fallback(fallback: (u16, u16)) -> Self {
        let (w, h) = crossterm::terminal::size().unwrap_or(fallback);
        Self {
            width: w,
            height: h,
            out: std::io::stdout(),
        }
    }
}

fn terminal_err(what: &str) -> impl FnOnce(std::io::Error) -> LotusError + '_ {
    move |e| LotusError::Terminal(format!("{what}: {e}"))
}

impl TerminalBackend for CrosstermBackend {
    fn init(&mut self) -> Result<()> {
        use crossterm::{
            cursor,
            terminal::{enable_raw_mode, EnterAlternateScreen},
            ExecutableCommand,
        };

        enable_raw_mode().map_err(terminal_err("raw mode"))?;
        self.out
            .execute(EnterAlternateScreen)
            .map_err(terminal_err("alternate screen"))?;
        // Input cursors are painted as reverse-video cells, so the OS cursor
        // stays hidden for the whole session.
        self.out
            .execute(cursor::Hide)
            .map_err(terminal_err("hide cursor"))?;

        if let Ok((w, h)) = crossterm::terminal::size() {
            self.width = w;
            self.height = h;
        }
        tracing::debug!(width = self.width, height = self.height, "terminal initialized");
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        use crossterm::{
            cursor,
            terminal::{disable_raw_mode, LeaveAlternateScreen},
            ExecutableCommand,
        };

        self.out
            .execute(cursor::Show)
            .map_err(terminal_err("show cursor"))?;
        self.out
            .execute(LeaveAlternateScreen)
            .map_err(terminal_err("leave alternate screen"))?;
        disable_raw_mode().map_err(terminal_err("disable raw mode"))?;
        tracing::debug!("terminal restored");
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        crossterm::terminal::size().unwrap_or((self.width, self.height))
    }

    fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.out.write_all(frame.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// CrosstermInput
// ============================================================================

/// Reads key presses and resizes from crossterm's global event queue.
#[derive(Debug, Default)]
pub struct CrosstermInput;

impl InputSource for CrosstermInput {
    fn poll_event(&mut self, timeout: Duration) -> Result<Option<InputEvent>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press => {
                decode_key(k.code, k.modifiers).map(InputEvent::Key)
            }
            Event::Resize(width, height) => Some(InputEvent::Resize { width, height }),
            _ => None,
        })
    }
}

/// Map a crossterm key to ours. Keys we have no name for are dropped.
pub fn decode_key(code: CtKeyCode, mods: KeyModifiers) -> Option<KeyEvent> {
    let code = match code {
        CtKeyCode::Char(c) => KeyCode::Char(c),
        CtKeyCode::Enter => KeyCode::Enter,
        CtKeyCode::Backspace => KeyCode::Backspace,
        CtKeyCode::Delete => KeyCode::Delete,
        CtKeyCode::Insert => KeyCode::Insert,
        CtKeyCode::Tab => KeyCode::Tab,
        CtKeyCode::BackTab => KeyCode::BackTab,
        CtKeyCode::Esc => KeyCode::Esc,
        CtKeyCode::Left => KeyCode::Left,
        CtKeyCode::Right => KeyCode::Right,
        CtKeyCode::Up => KeyCode::Up,
        CtKeyCode::Down => KeyCode::Down,
        CtKeyCode::Home => KeyCode::Home,
        CtKeyCode::End => KeyCode::End,
        CtKeyCode::PageUp => KeyCode::PageUp,
        CtKeyCode::PageDown => KeyCode::PageDown,
        CtKeyCode::F(n) => KeyCode::F(n),
        _ => return None,
    };

    let mut modifiers = Modifiers::empty();
    for (from, to) in [
        (KeyModifiers::SHIFT, Modifiers::SHIFT),
        (KeyModifiers::CONTROL, Modifiers::CTRL),
        (KeyModifiers::ALT, Modifiers::ALT),
        (KeyModifiers::SUPER, Modifiers::SUPER),
    ] {
        if mods.contains(from) {
            modifiers |= to;
        }
    }
    Some(KeyEvent { code, modifiers })
}

// ============================================================================
// HeadlessBackend (for CI environments and benchmarks)
// ============================================================================

/// Fixed-size backend that discards output but keeps byte counts.
#[derive(Debug, Clone)]
pub struct HeadlessBackend {
    pub width: u16,
    pub height: u16,
    pub frames: usize,
    pub bytes_written: usize,
}

impl HeadlessBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            frames: 0,
            bytes_written: 0,
        }
    }
}

impl TerminalBackend for HeadlessBackend {
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.frames += 1;
        self.bytes_written += frame.len();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    #[cfg(test)]
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

// ============================================================================
// MockBackend (for Rust unit tests only)
// ============================================================================

#[cfg(test)]
#[derive(Debug, Default)]
pub struct MockBackend {
    pub width: u16,
    pub height: u16,
    pub frames: Vec<String>,
    pub flushes: usize,
    pub initialized: bool,
}

#[cfg(test)]
impl MockBackend {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

#[cfg(test)]
impl TerminalBackend for MockBackend {
    fn init(&mut self) -> Result<()> {
        self.initialized = true;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.initialized = false;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn write_frame(&mut self, frame: &str) -> Result<()> {
        self.frames.push(frame.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_key_with_modifiers() {
        let k = decode_key(CtKeyCode::Char('c'), KeyModifiers::CONTROL).unwrap();
        assert_eq!(k.code, KeyCode::Char('c'));
        assert!(k.is_interrupt());

        let k = decode_key(CtKeyCode::Left, KeyModifiers::SHIFT | KeyModifiers::ALT).unwrap();
        assert_eq!(k.code, KeyCode::Left);
        assert_eq!(k.modifiers, Modifiers::SHIFT | Modifiers::ALT);

        assert_eq!(decode_key(CtKeyCode::F(5), KeyModifiers::NONE).unwrap().code, KeyCode::F(5));
        assert!(decode_key(CtKeyCode::CapsLock, KeyModifiers::NONE).is_none());
    }

    #[test]
    fn test_headless_counts_bytes() {
        let mut b = HeadlessBackend::new(40, 10);
        b.write_frame("abc").unwrap();
        b.write_frame("").unwrap();
        assert_eq!(b.frames, 2);
        assert_eq!(b.bytes_written, 3);
        assert_eq!(b.size(), (40, 10));
    }

    #[test]
    fn test_mock_downcast() {
        let mut boxed: Box<dyn TerminalBackend> = Box::new(MockBackend::new(10, 2));
        boxed.init().unwrap();
        boxed.write_frame("x").unwrap();
        let mock = boxed.as_any_mut().downcast_mut::<MockBackend>().unwrap();
        assert!(mock.initialized);
        assert_eq!(mock.frames, vec!["x".to_string()]);
    }
}
