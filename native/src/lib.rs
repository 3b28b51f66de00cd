//! Lotus — a terminal UI rendering engine.
//!
//! Pipeline per frame:
//! 1. Style resolution: stylesheet cascade (type < class < multi-class < id,
//!    then the inline `style` attribute) into a `ComputedStyle` per node
//! 2. Layout: flexbox in whole terminal cells
//! 3. Paint: borders, backgrounds, text and inputs into a cell grid
//! 4. Write: diff the grid against the previous frame and emit minimal ANSI
//!
//! Element trees go through the reconciler first. When every patch is a text
//! or style update the live tree is patched in place and step 1 is skipped.
//!
//! ```no_run
//! use lotus::{CrosstermBackend, Element, RenderContext};
//!
//! # fn main() -> lotus::Result<()> {
//! let mut ctx = RenderContext::new(Box::new(CrosstermBackend::new()));
//! ctx.init()?;
//! ctx.set_stylesheet("#title { color: cyan; font-weight: bold; }");
//! ctx.render_element(Element::container(
//!     "root",
//!     [("border", "rounded"), ("padding", "1")],
//!     vec![Element::markup("title", "Hello")],
//! ))?;
//! ctx.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod diff;
pub mod element;
pub mod error;
pub mod event;
pub mod layout;
pub mod patch;
pub mod registry;
pub mod render;
pub mod style;
pub mod stylesheet;
pub mod terminal;
pub mod text_utils;
pub mod tree;
pub mod types;
pub mod writer;

pub use cache::StyleCache;
pub use config::LotusConfig;
pub use context::{RenderContext, RenderPath, RenderReport, RenderStats};
pub use diff::diff;
pub use element::{Component, Element, InlineStyles, Patch};
pub use error::{LotusError, Result};
pub use event::{EventLoop, LoopControl, RenderHandle, StopHandle};
pub use layout::compute_layout;
pub use patch::apply_patches;
pub use registry::ContextRegistry;
pub use render::{Frame, Renderer};
pub use style::resolve_styles;
pub use stylesheet::Stylesheet;
pub use terminal::{CrosstermBackend, CrosstermInput, HeadlessBackend, InputSource, TerminalBackend};
pub use tree::{NodeHandle, NodeTree};
pub use types::{Buffer, Cell, ComputedStyle, InputEvent, KeyCode, KeyEvent, Modifiers, NodeType, Rect};
