//! Render Module — Paint the laid-out tree into a cell grid and emit ANSI.
//!
//! Responsibilities:
//! - Traverse the tree and paint visible nodes into the current buffer
//! - Border glyphs, background fill, aligned text, input prompt + cursor
//! - Keep the previous frame and hand both to the writer for diffing
//! - Invalidate the previous frame on dimension change (forces a full frame)

use crate::layout::{content_box, draws_border, input_content_width, text_align_offset};
use crate::style::inherited_style;
use crate::text_utils::{
    char_width, display_width, grapheme_count, grapheme_to_byte_idx, split_lines, strip_ansi,
};
use crate::tree::{NodeHandle, NodeTree};
use crate::types::{BorderStyle, Buffer, Cell, CellAttrs, Display, NodeType, Rect, TextAlign, CONTINUATION};
use crate::writer;

// ============================================================================
// Renderer
// ============================================================================

/// Output of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub output: String,
    pub full: bool,
}

impl Frame {
    pub fn len(&self) -> usize {
        self.output.len()
    }

    pub fn is_empty(&self) -> bool {
        self.output.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    current: Buffer,
    previous: Option<Buffer>,
}

impl Renderer {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            current: Buffer::new(width, height),
            previous: None,
        }
    }

    pub fn size(&self) -> (u16, u16) {
        (self.current.width, self.current.height)
    }

    /// Resize both grids. Returns whether the size actually changed; if so
    /// the next render is a full frame.
    pub fn resize(&mut self, width: u16, height: u16) -> bool {
        if self.size() == (width, height) {
            return false;
        }
        self.current.resize(width, height);
        self.previous = None;
        true
    }

    /// Drop the previous frame so the next render repaints everything.
    pub fn invalidate(&mut self) {
        self.previous = None;
    }

    pub fn current(&self) -> &Buffer {
        &self.current
    }

    pub fn previous(&self) -> Option<&Buffer> {
        self.previous.as_ref()
    }

    /// Paint `tree` and produce the bytes that bring the terminal from the
    /// previous frame to this one.
    pub fn render(&mut self, tree: &NodeTree, force_full: bool) -> Frame {
        self.current.clear();
        paint(tree, &mut self.current);

        let (output, full) = match (&self.previous, force_full) {
            (Some(prev), false) => (writer::diff_frame(prev, &self.current), false),
            _ => (writer::full_frame(&self.current), true),
        };

        self.previous = Some(self.current.clone());
        Frame { output, full }
    }
}

// ============================================================================
// Cell writes
// ============================================================================

/// Write a cell, respecting the clip rect. Keeps wide characters whole:
/// overwriting either half of a wide char blanks the other half.
fn clip_put(buffer: &mut Buffer, x: i32, y: i32, cell: Cell, clip: Rect) {
    if !clip.contains(x, y) || x < 0 || y < 0 {
        return;
    }
    let (ux, uy) = (x as u16, y as u16);

    if let Some(old) = buffer.get(ux, uy).copied() {
        if old.is_continuation() && ux > 0 {
            if let Some(lead) = buffer.get(ux - 1, uy).copied() {
                buffer.set(ux - 1, uy, Cell { ch: ' ', ..lead });
            }
        } else if let Some(next) = buffer.get(ux + 1, uy).copied() {
            if next.is_continuation() && !cell.is_continuation() {
                buffer.set(ux + 1, uy, Cell { ch: ' ', ..next });
            }
        }
    }
    buffer.set(ux, uy, cell);
}

/// Write one character; wide chars take two cells or none at all.
fn put_char(buffer: &mut Buffer, x: i32, y: i32, cell: Cell, clip: Rect) -> i32 {
    let w = char_width(cell.ch) as i32;
    match w {
        0 => 0,
        1 => {
            clip_put(buffer, x, y, cell, clip);
            1
        }
        _ => {
            if clip.contains(x, y) && clip.contains(x + 1, y) {
                clip_put(buffer, x, y, cell, clip);
                clip_put(buffer, x + 1, y, Cell { ch: CONTINUATION, ..cell }, clip);
            }
            w
        }
    }
}

// ============================================================================
// Paint
// ============================================================================

/// Paint the whole tree into `buffer`. Layout must already be computed.
pub fn paint(tree: &NodeTree, buffer: &mut Buffer) {
    if let Some(root) = tree.root() {
        let clip = buffer.bounds();
        paint_node(tree, root, buffer, clip, 0);
    }
}

fn paint_node(tree: &NodeTree, handle: NodeHandle, buffer: &mut Buffer, clip: Rect, parent_bg: u32) {
    let Some(node) = tree.get(handle) else { return };
    let style = &node.style;
    if style.display == Display::None {
        return;
    }

    let rect = Rect::new(node.x, node.y, node.width, node.height);
    let clip = clip.intersect(&rect);
    if clip.is_empty() {
        return;
    }

    let inherited = inherited_style(tree, handle);
    let fg = inherited.color;
    let bg = if style.background != 0 {
        style.background
    } else {
        parent_bg
    };

    if style.background != 0 {
        let fill = Cell {
            ch: ' ',
            fg,
            bg,
            attrs: CellAttrs::empty(),
        };
        for row in clip.y..clip.bottom() {
            for col in clip.x..clip.right() {
                clip_put(buffer, col, row, fill, clip);
            }
        }
    }

    if draws_border(style, rect.w, rect.h) {
        render_border(buffer, rect, style.border_style, fg, bg, clip);
    }

    let content = content_box(style, rect);
    let content_clip = clip.intersect(&content);
    let base = Cell {
        ch: ' ',
        fg,
        bg,
        attrs: inherited.attrs,
    };

    match node.node_type {
        NodeType::Text => {
            render_text(buffer, &node.content, content, inherited.text_align, base, content_clip);
        }
        NodeType::Input => {
            render_input(buffer, node, content, inherited.text_align, base, content_clip);
        }
        NodeType::Box => {
            for &child in &node.children {
                paint_node(tree, child, buffer, clip, bg);
            }
        }
    }
}

// ============================================================================
// Border Rendering
// ============================================================================

fn render_border(buffer: &mut Buffer, r: Rect, border_style: BorderStyle, fg: u32, bg: u32, clip: Rect) {
    let (tl, tr, bl, br, horiz, vert) = border_style.chars();
    let cell = |ch| Cell {
        ch,
        fg,
        bg,
        attrs: CellAttrs::empty(),
    };
    let (right, bottom) = (r.right() - 1, r.bottom() - 1);

    clip_put(buffer, r.x, r.y, cell(tl), clip);
    clip_put(buffer, right, r.y, cell(tr), clip);
    clip_put(buffer, r.x, bottom, cell(bl), clip);
    clip_put(buffer, right, bottom, cell(br), clip);

    for col in (r.x + 1).max(clip.x)..right.min(clip.right()) {
        clip_put(buffer, col, r.y, cell(horiz), clip);
        clip_put(buffer, col, bottom, cell(horiz), clip);
    }
    for row in (r.y + 1).max(clip.y)..bottom.min(clip.bottom()) {
        clip_put(buffer, r.x, row, cell(vert), clip);
        clip_put(buffer, right, row, cell(vert), clip);
    }
}

// ============================================================================
// Text Rendering
// ============================================================================

/// One line per row, no wrapping. Escape sequences are stripped; each line
/// is offset by its alignment inside the content box.
fn render_text(buffer: &mut Buffer, text: &str, content: Rect, align: TextAlign, base: Cell, clip: Rect) {
    let plain = strip_ansi(text);
    for (row, line) in split_lines(&plain).into_iter().enumerate() {
        let row = row as i32;
        if row >= content.h {
            break;
        }
        let offset = text_align_offset(align, content.w, display_width(line) as i32);
        write_line(
            buffer,
            line,
            content.x.saturating_add(offset),
            content.y.saturating_add(row),
            base,
            clip,
        );
    }
}

fn write_line(buffer: &mut Buffer, line: &str, x: i32, y: i32, base: Cell, clip: Rect) -> i32 {
    let mut col = x;
    for ch in line.chars() {
        if col >= clip.right() {
            break;
        }
        col += put_char(buffer, col, y, Cell { ch, ..base }, clip);
    }
    col - x
}

/// Prompt, then the value (or placeholder when empty). A focused input gets
/// a reverse-video cursor at the `cursor` grapheme index (default: end).
fn render_input(
    buffer: &mut Buffer,
    node: &crate::tree::Node,
    content: Rect,
    align: TextAlign,
    base: Cell,
    clip: Rect,
) {
    if content.h == 0 {
        return;
    }
    let prompt = strip_ansi(node.attr("prompt").unwrap_or(""));
    let value = strip_ansi(&node.content);
    let placeholder = value.is_empty();
    let body = if placeholder {
        strip_ansi(node.attr("placeholder").unwrap_or(""))
    } else {
        value.clone()
    };

    let offset = text_align_offset(align, content.w, input_content_width(node));
    let x = content.x.saturating_add(offset);
    let y = content.y;

    let prompt_w = write_line(buffer, &prompt, x, y, base, clip);
    let body_cell = if placeholder {
        Cell {
            attrs: base.attrs | CellAttrs::ITALIC,
            ..base
        }
    } else {
        base
    };
    write_line(buffer, &body, x + prompt_w, y, body_cell, clip);

    if node.attr("focused") == Some("true") {
        let cursor = node
            .attr("cursor")
            .and_then(|c| c.parse::<usize>().ok())
            .unwrap_or_else(|| grapheme_count(&value));
        let byte_idx = grapheme_to_byte_idx(&value, cursor);
        let cursor_x = x + prompt_w + display_width(&value[..byte_idx]) as i32;
        let under = value[byte_idx..].chars().next().unwrap_or(' ');
        put_char(
            buffer,
            cursor_x,
            y,
            Cell {
                ch: under,
                attrs: base.attrs | CellAttrs::REVERSE,
                ..base
            },
            clip,
        );
    }
}
