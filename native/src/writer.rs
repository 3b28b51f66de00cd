//! ANSI frame writer.
//!
//! Turns a buffer (or a pair of buffers) into the byte stream that updates a
//! terminal: one cursor move per row for full frames, one per contiguous run
//! of changed cells for diff frames, and an SGR sequence only when the style
//! differs from the last cell written.

use std::fmt::Write as _;

use crossterm::cursor::MoveTo;
use crossterm::style::{Attribute, SetAttribute, SetBackgroundColor, SetForegroundColor};
use crossterm::Command;

use crate::types::{color_to_crossterm, Buffer, Cell, CellAttrs};

/// Clear screen and home the cursor.
pub const CLEAR_SCREEN: &str = "\x1b[2J\x1b[H";

/// A horizontal run of changed cells, `start..end` on `row`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeRun {
    pub row: u16,
    pub start: u16,
    pub end: u16,
}

impl ChangeRun {
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

struct FrameWriter {
    out: String,
    last: Option<Cell>,
}

impl FrameWriter {
    fn new() -> Self {
        Self {
            out: String::new(),
            last: None,
        }
    }

    fn raw(&mut self, s: &str) {
        self.out.push_str(s);
    }

    fn command(&mut self, cmd: impl Command) {
        // Writing into a String cannot fail.
        let _ = cmd.write_ansi(&mut self.out);
    }

    fn move_to(&mut self, col: u16, row: u16) {
        self.command(MoveTo(col, row));
    }

    fn style(&mut self, cell: &Cell) {
        if self.last.is_some_and(|l| l.same_style(cell)) {
            return;
        }
        self.command(SetAttribute(Attribute::Reset));
        for (flag, attr) in [
            (CellAttrs::BOLD, Attribute::Bold),
            (CellAttrs::ITALIC, Attribute::Italic),
            (CellAttrs::UNDERLINE, Attribute::Underlined),
            (CellAttrs::REVERSE, Attribute::Reverse),
        ] {
            if cell.attrs.contains(flag) {
                self.command(SetAttribute(attr));
            }
        }
        if let Some(fg) = color_to_crossterm(cell.fg) {
            self.command(SetForegroundColor(fg));
        }
        if let Some(bg) = color_to_crossterm(cell.bg) {
            self.command(SetBackgroundColor(bg));
        }
        self.last = Some(*cell);
    }

    /// Continuation cells are skipped: the terminal already advanced past
    /// them when the wide character was written.
    fn cells(&mut self, cells: &[Cell]) {
        for cell in cells {
            if cell.is_continuation() {
                continue;
            }
            self.style(cell);
            self.out.push(cell.ch);
        }
    }

    fn finish(mut self) -> String {
        if !self.out.is_empty() {
            self.command(SetAttribute(Attribute::Reset));
        }
        self.out
    }
}

/// Clear the screen and write every row.
pub fn full_frame(buffer: &Buffer) -> String {
    let mut w = FrameWriter::new();
    w.raw(CLEAR_SCREEN);
    for row in 0..buffer.height {
        w.move_to(0, row);
        w.cells(buffer.row(row));
    }
    w.finish()
}

/// Group changed cells into contiguous runs per row. A changed
/// continuation cell pulls its leading wide cell into the run so the
/// character is rewritten whole.
pub fn changed_runs(prev: &Buffer, cur: &Buffer) -> Vec<ChangeRun> {
    let mut runs = Vec::new();
    if prev.width != cur.width || prev.height != cur.height {
        return runs;
    }

    let width = cur.width as usize;
    let mut changed = vec![false; width];
    for row in 0..cur.height {
        let (p, c) = (prev.row(row), cur.row(row));
        for x in 0..width {
            changed[x] = p[x] != c[x];
        }
        for x in 1..width {
            if changed[x] && c[x].is_continuation() {
                changed[x - 1] = true;
            }
        }
        for x in 0..width.saturating_sub(1) {
            if changed[x] && c[x + 1].is_continuation() {
                changed[x + 1] = true;
            }
        }

        let mut x = 0;
        while x < width {
            if !changed[x] {
                x += 1;
                continue;
            }
            let start = x;
            while x < width && changed[x] {
                x += 1;
            }
            runs.push(ChangeRun {
                row,
                start: start as u16,
                end: x as u16,
            });
        }
    }
    runs
}

/// Write only what changed between `prev` and `cur`. Identical buffers
/// produce an empty string. Buffers of different size fall back to a full
/// frame.
pub fn diff_frame(prev: &Buffer, cur: &Buffer) -> String {
    if prev.width != cur.width || prev.height != cur.height {
        return full_frame(cur);
    }

    let mut w = FrameWriter::new();
    for run in changed_runs(prev, cur) {
        w.move_to(run.start, run.row);
        let row = cur.row(run.row);
        w.cells(&row[run.start as usize..run.end as usize]);
    }
    w.finish()
}

/// Rough count of SGR sequences in a frame. Used by tests and stats.
pub fn count_sgr(frame: &str) -> usize {
    let mut n = 0;
    let bytes = frame.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == 0x1b && bytes[i + 1] == b'[' {
            let mut j = i + 2;
            while j < bytes.len() && !(0x40..=0x7e).contains(&bytes[j]) {
                j += 1;
            }
            if j < bytes.len() && bytes[j] == b'm' {
                n += 1;
            }
            i = j;
        }
        i += 1;
    }
    n
}

/// Append a human-readable dump of a buffer, one line per row. Continuation
/// cells are omitted. Debug helper.
pub fn dump(buffer: &Buffer) -> String {
    let mut out = String::new();
    for row in 0..buffer.height {
        let _ = writeln!(out, "{}", buffer.row_text(row));
    }
    out
}
