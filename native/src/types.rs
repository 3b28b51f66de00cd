//! Shared types, enums, and constants.
//!
//! Types that cross module boundaries (style, layout, paint, output) live here.

use bitflags::bitflags;

// ============================================================================
// Node Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeType {
    Box,
    Text,
    Input,
}

impl NodeType {
    /// Maps a markup tag / type selector name to a node type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "box" => Some(Self::Box),
            "text" => Some(Self::Text),
            "input" => Some(Self::Input),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Box => "box",
            Self::Text => "text",
            Self::Input => "input",
        }
    }

    /// Whether this node type is a leaf (cannot have children).
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::Text | Self::Input)
    }
}

// ============================================================================
// Color Encoding (u32)
// ============================================================================
//
// Bits 31-24: Mode tag
//   0x00 = Default (terminal default)
//   0x01 = RGB truecolor (bits 23-0 = 0xRRGGBB)
//   0x02 = Indexed (bits 7-0 = palette index 0-255)

pub const COLOR_DEFAULT: u32 = 0x00000000;

pub fn color_tag(color: u32) -> u8 {
    ((color >> 24) & 0xFF) as u8
}

pub fn rgb(r: u8, g: u8, b: u8) -> u32 {
    0x0100_0000 | ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

pub fn indexed(index: u8) -> u32 {
    0x0200_0000 | index as u32
}

pub fn color_to_crossterm(color: u32) -> Option<crossterm::style::Color> {
    match color_tag(color) {
        0x00 => None,
        0x01 => {
            let r = ((color >> 16) & 0xFF) as u8;
            let g = ((color >> 8) & 0xFF) as u8;
            let b = (color & 0xFF) as u8;
            Some(crossterm::style::Color::Rgb { r, g, b })
        }
        0x02 => Some(crossterm::style::Color::AnsiValue((color & 0xFF) as u8)),
        _ => None,
    }
}

const ANSI_NAMES: [&str; 8] = [
    "black", "red", "green", "yellow", "blue", "magenta", "cyan", "white",
];

/// Parses a CSS color value into the u32 encoding. Returns `None` for
/// anything unrecognized so the caller can leave the property untouched.
pub fn parse_color(value: &str) -> Option<u32> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "default" | "none" | "transparent" => return Some(COLOR_DEFAULT),
        "gray" | "grey" => return Some(indexed(8)),
        _ => {}
    }

    if let Some(hex) = v.strip_prefix('#') {
        return parse_hex(hex);
    }

    if let Some(inner) = v.strip_prefix("ansi(").and_then(|s| s.strip_suffix(')')) {
        return inner.trim().parse::<u8>().ok().map(indexed);
    }

    if let Some(base) = v.strip_prefix("bright-") {
        return ANSI_NAMES
            .iter()
            .position(|n| *n == base)
            .map(|i| indexed(i as u8 + 8));
    }

    if let Some(i) = ANSI_NAMES.iter().position(|n| *n == v) {
        return Some(indexed(i as u8));
    }

    v.parse::<u8>().ok().map(indexed)
}

fn parse_hex(hex: &str) -> Option<u32> {
    let expand = |c: u8| c * 17;
    match hex.len() {
        6 => {
            let n = u32::from_str_radix(hex, 16).ok()?;
            Some(0x0100_0000 | n)
        }
        3 => {
            let n = u16::from_str_radix(hex, 16).ok()?;
            let r = ((n >> 8) & 0xF) as u8;
            let g = ((n >> 4) & 0xF) as u8;
            let b = (n & 0xF) as u8;
            Some(rgb(expand(r), expand(g), expand(b)))
        }
        _ => None,
    }
}

// ============================================================================
// Border Style
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    Single,
    Rounded,
    Double,
}

impl BorderStyle {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "single" | "solid" => Some(Self::Single),
            "rounded" => Some(Self::Rounded),
            "double" => Some(Self::Double),
            _ => None,
        }
    }

    /// Returns the border characters: (top-left, top-right, bottom-left, bottom-right, horizontal, vertical)
    pub fn chars(self) -> (char, char, char, char, char, char) {
        match self {
            Self::Single => ('┌', '┐', '└', '┘', '─', '│'),
            Self::Rounded => ('╭', '╮', '╰', '╯', '─', '│'),
            Self::Double => ('╔', '╗', '╚', '╝', '═', '║'),
        }
    }
}

// ============================================================================
// Cell Attributes (bitflags)
// ============================================================================

bitflags! {
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct CellAttrs: u8 {
        const BOLD      = 0b0000_0001;
        const ITALIC    = 0b0000_0010;
        const UNDERLINE = 0b0000_0100;
        const REVERSE   = 0b0000_1000;
    }
}

// ============================================================================
// Terminal Input Events
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Char(char),
    Enter,
    Backspace,
    Delete,
    Insert,
    Tab,
    BackTab,
    Esc,
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
    PageUp,
    PageDown,
    F(u8),
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0x01;
        const CTRL  = 0x02;
        const ALT   = 0x04;
        const SUPER = 0x08;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self { code, modifiers }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c), Modifiers::empty())
    }

    /// Ctrl+C, the conventional interrupt.
    pub fn is_interrupt(&self) -> bool {
        self.code == KeyCode::Char('c') && self.modifiers.contains(Modifiers::CTRL)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize { width: u16, height: u16 },
}

// ============================================================================
// Layout Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum Dimension {
    #[default]
    Auto,
    Cells(i32),
    Percent(f32),
}

impl Dimension {
    /// Resolves against the parent's content size. `Auto` yields `None`.
    pub fn resolve(self, parent: i32) -> Option<i32> {
        match self {
            Self::Auto => None,
            Self::Cells(n) => Some(n.max(0)),
            Self::Percent(p) => Some(((parent.max(0) as f32) * p / 100.0).floor() as i32),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Display {
    #[default]
    Block,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlexDirection {
    Row,
    #[default]
    Column,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Position {
    #[default]
    Static,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// Four-sided insets: padding or margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Edges {
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
    pub left: i32,
}

impl Edges {
    pub fn all(v: i32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn horizontal(&self) -> i32 {
        self.left.saturating_add(self.right)
    }

    pub fn vertical(&self) -> i32 {
        self.top.saturating_add(self.bottom)
    }
}

// ============================================================================
// Computed Style
// ============================================================================

bitflags! {
    /// Inheritable properties that a rule set explicitly on this node.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct StyleMask: u8 {
        const COLOR      = 0b0000_0001;
        const TEXT_ALIGN = 0b0000_0010;
        const ATTRS      = 0b0000_0100;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComputedStyle {
    pub width: Dimension,
    pub height: Dimension,
    pub display: Display,
    pub flex_direction: FlexDirection,
    pub flex: f32,
    pub position: Position,
    pub top: Option<i32>,
    pub right: Option<i32>,
    pub bottom: Option<i32>,
    pub left: Option<i32>,
    pub padding: Edges,
    pub margin: Edges,
    pub color: u32,
    pub background: u32,
    pub border: bool,
    pub border_style: BorderStyle,
    pub text_align: TextAlign,
    pub attrs: CellAttrs,
    pub explicit: StyleMask,
}

impl Default for ComputedStyle {
    fn default() -> Self {
        Self {
            width: Dimension::Auto,
            height: Dimension::Auto,
            display: Display::Block,
            flex_direction: FlexDirection::Column,
            flex: 0.0,
            position: Position::Static,
            top: None,
            right: None,
            bottom: None,
            left: None,
            padding: Edges::default(),
            margin: Edges::default(),
            color: COLOR_DEFAULT,
            background: COLOR_DEFAULT,
            border: false,
            border_style: BorderStyle::Single,
            text_align: TextAlign::Left,
            attrs: CellAttrs::empty(),
            explicit: StyleMask::empty(),
        }
    }
}

// ============================================================================
// Geometry
// ============================================================================

/// Axis-aligned rectangle in cell coordinates. Used for layout boxes and
/// paint clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self {
            x,
            y,
            w: w.max(0),
            h: h.max(0),
        }
    }

    /// Shrinks by the given insets, clamping the size at zero.
    pub fn inset(&self, e: Edges) -> Self {
        Self::new(
            self.x.saturating_add(e.left),
            self.y.saturating_add(e.top),
            self.w.saturating_sub(e.horizontal()),
            self.h.saturating_sub(e.vertical()),
        )
    }

    pub fn intersect(&self, other: &Rect) -> Rect {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        Rect::new(x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }

    /// One past the last column.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    /// One past the last row.
    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    pub fn is_empty(&self) -> bool {
        self.w == 0 || self.h == 0
    }
}

// ============================================================================
// Cell & Buffer
// ============================================================================

/// Marks the second cell of a double-width character.
pub const CONTINUATION: char = '\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub fg: u32,
    pub bg: u32,
    pub attrs: CellAttrs,
}

impl Cell {
    pub fn is_continuation(&self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether two cells would be written with the same SGR state.
    pub fn same_style(&self, other: &Cell) -> bool {
        self.fg == other.fg && self.bg == other.bg && self.attrs == other.attrs
    }
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: 0,
            bg: 0,
            attrs: CellAttrs::empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Buffer {
    pub width: u16,
    pub height: u16,
    pub cells: Vec<Cell>,
}

impl Buffer {
    pub fn new(width: u16, height: u16) -> Self {
        let size = (width as usize) * (height as usize);
        Self {
            width,
            height,
            cells: vec![Cell::default(); size],
        }
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
        let size = (width as usize) * (height as usize);
        self.cells.resize(size, Cell::default());
        self.clear();
    }

    pub fn clear(&mut self) {
        self.cells.fill(Cell::default());
    }

    pub fn bounds(&self) -> Rect {
        Rect::new(0, 0, self.width as i32, self.height as i32)
    }

    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if x < self.width && y < self.height {
            Some(&self.cells[(y as usize) * (self.width as usize) + (x as usize)])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: u16, y: u16, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[(y as usize) * (self.width as usize) + (x as usize)] = cell;
        }
    }

    pub fn row(&self, y: u16) -> &[Cell] {
        let w = self.width as usize;
        let start = (y as usize) * w;
        &self.cells[start..start + w]
    }

    /// Row text with continuation cells dropped. Handy in tests.
    pub fn row_text(&self, y: u16) -> String {
        self.row(y)
            .iter()
            .filter(|c| !c.is_continuation())
            .map(|c| c.ch)
            .collect()
    }
}
