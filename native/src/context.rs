//! RenderContext — one UI instance and the pipeline that drives it.
//!
//! A context owns the live node tree, the double-buffered renderer and the
//! terminal backend. Rendering an element tree reconciles it against the
//! previous one: text/style-only changes are patched into the live tree and
//! skip style resolution; anything structural rebuilds the tree.

use std::sync::Arc;
use std::time::Instant;

use crate::cache::StyleCache;
use crate::config::LotusConfig;
use crate::diff::diff;
use crate::element::Element;
use crate::error::Result;
use crate::layout::compute_layout;
use crate::patch::{apply_patches, is_fast_path};
use crate::render::Renderer;
use crate::style::resolve_styles;
use crate::stylesheet::Stylesheet;
use crate::terminal::TerminalBackend;
use crate::tree::NodeTree;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPath {
    /// Styles resolved from scratch on a freshly built tree.
    Full,
    /// Patches applied in place; style resolution skipped.
    Fast,
    /// Layout and paint only, on the current tree.
    Repaint,
}

impl RenderPath {
    pub fn name(self) -> &'static str {
        match self {
            RenderPath::Full => "full",
            RenderPath::Fast => "fast",
            RenderPath::Repaint => "repaint",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderReport {
    pub path: RenderPath,
    /// Patches produced by the reconciler (zero for non-element renders).
    pub patches: usize,
    /// Bytes written to the terminal.
    pub bytes: usize,
    /// Whether the frame repainted the whole screen.
    pub full_frame: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub renders: u64,
    pub full_renders: u64,
    pub fast_renders: u64,
    pub style_passes: u64,
    pub layout_passes: u64,
    pub last_frame_bytes: usize,
    pub last_layout_us: u64,
    pub last_paint_us: u64,
}

pub struct RenderContext {
    tree: NodeTree,
    renderer: Renderer,
    stylesheet: Arc<Stylesheet>,
    cache: Arc<StyleCache>,
    backend: Box<dyn TerminalBackend>,
    previous: Option<Element>,
    // Set when the stylesheet changes under a live tree.
    styles_stale: bool,
    stats: RenderStats,
}

impl RenderContext {
    /// Context using the process-wide style cache.
    pub fn new(backend: Box<dyn TerminalBackend>) -> Self {
        Self::with_cache(backend, StyleCache::global())
    }

    pub fn with_cache(backend: Box<dyn TerminalBackend>, cache: Arc<StyleCache>) -> Self {
        let (w, h) = backend.size();
        Self {
            tree: NodeTree::new(),
            renderer: Renderer::new(w, h),
            stylesheet: Arc::new(Stylesheet::new()),
            cache,
            backend,
            previous: None,
            styles_stale: false,
            stats: RenderStats::default(),
        }
    }

    pub fn with_config(
        backend: Box<dyn TerminalBackend>,
        cache: Arc<StyleCache>,
        config: &LotusConfig,
    ) -> Self {
        cache.set_enabled(config.css_cache);
        Self::with_cache(backend, cache)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    pub fn stylesheet(&self) -> &Arc<Stylesheet> {
        &self.stylesheet
    }

    pub fn backend(&self) -> &dyn TerminalBackend {
        self.backend.as_ref()
    }

    pub fn backend_mut(&mut self) -> &mut dyn TerminalBackend {
        self.backend.as_mut()
    }

    /// Give the backend back, e.g. to shut the terminal down after the
    /// context is removed from a registry.
    pub fn into_backend(self) -> Box<dyn TerminalBackend> {
        self.backend
    }

    pub fn init(&mut self) -> Result<()> {
        self.backend.init()?;
        let (w, h) = self.backend.size();
        self.renderer.resize(w, h);
        Ok(())
    }

    pub fn shutdown(&mut self) -> Result<()> {
        self.backend.shutdown()
    }

    // ------------------------------------------------------------------
    // Pipeline
    // ------------------------------------------------------------------

    /// Swap the stylesheet. The next render resolves styles from scratch.
    pub fn set_stylesheet(&mut self, css: &str) {
        let sheet = self.cache.get_or_parse(css);
        if !Arc::ptr_eq(&sheet, &self.stylesheet) {
            self.stylesheet = sheet;
            self.styles_stale = true;
        }
    }

    /// Render a caller-built node tree through the full pipeline. The
    /// element history is dropped, so the next `render_element` rebuilds.
    pub fn render_tree(&mut self, tree: NodeTree) -> Result<RenderReport> {
        self.tree = tree;
        self.previous = None;
        self.resolve();
        self.finish(RenderPath::Full, 0)
    }

    /// Reconcile `element` against the previous element tree and render.
    pub fn render_element(&mut self, element: Element) -> Result<RenderReport> {
        let mut path = RenderPath::Full;
        let mut count = 0;

        if let (Some(prev), false) = (&self.previous, self.styles_stale) {
            let patches = diff(Some(prev), Some(&element));
            count = patches.len();
            if is_fast_path(&patches) {
                match apply_patches(&mut self.tree, &patches) {
                    Ok(()) => path = RenderPath::Fast,
                    Err(e) if e.requires_rebuild() => {
                        tracing::warn!(error = %e, "patch batch rejected, rebuilding");
                    }
                    Err(e) => return Err(e),
                }
            }
        }

        if path == RenderPath::Full {
            self.tree = NodeTree::from_element(&element);
            self.resolve();
        }
        self.previous = Some(element);
        self.finish(path, count)
    }

    /// Layout and paint the current tree, e.g. after a tick or a resize.
    pub fn rerender(&mut self) -> Result<RenderReport> {
        self.finish(RenderPath::Repaint, 0)
    }

    /// Adopt a new viewport and repaint. A changed size always produces a
    /// full frame.
    pub fn handle_resize(&mut self, width: u16, height: u16) -> Result<RenderReport> {
        if self.renderer.resize(width, height) {
            tracing::debug!(width, height, "viewport resized");
        }
        self.paint_and_write(RenderPath::Repaint, 0, (width, height))
    }

    fn resolve(&mut self) {
        resolve_styles(&mut self.tree, &self.stylesheet);
        self.styles_stale = false;
        self.stats.style_passes += 1;
    }

    fn finish(&mut self, path: RenderPath, patches: usize) -> Result<RenderReport> {
        let viewport = self.backend.size();
        if self.renderer.resize(viewport.0, viewport.1) {
            tracing::debug!(width = viewport.0, height = viewport.1, "viewport changed");
        }
        self.paint_and_write(path, patches, viewport)
    }

    fn paint_and_write(
        &mut self,
        path: RenderPath,
        patches: usize,
        (width, height): (u16, u16),
    ) -> Result<RenderReport> {
        let layout_us = compute_layout(&mut self.tree, width, height);
        self.stats.layout_passes += 1;

        let start = Instant::now();
        let frame = self.renderer.render(&self.tree, false);
        let paint_us = start.elapsed().as_micros() as u64;

        self.backend.write_frame(&frame.output)?;
        self.backend.flush()?;

        let stats = &mut self.stats;
        stats.renders += 1;
        match path {
            RenderPath::Full => stats.full_renders += 1,
            RenderPath::Fast => stats.fast_renders += 1,
            RenderPath::Repaint => {}
        }
        stats.last_frame_bytes = frame.len();
        stats.last_layout_us = layout_us;
        stats.last_paint_us = paint_us;

        tracing::debug!(
            path = path.name(),
            patches,
            bytes = frame.len(),
            full_frame = frame.full,
            layout_us,
            paint_us,
            "render"
        );

        Ok(RenderReport {
            path,
            patches,
            bytes: frame.len(),
            full_frame: frame.full,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::MockBackend;
    use crate::writer::CLEAR_SCREEN;

    fn ctx(w: u16, h: u16) -> RenderContext {
        RenderContext::with_cache(Box::new(MockBackend::new(w, h)), Arc::new(StyleCache::new()))
    }

    fn mock(ctx: &mut RenderContext) -> &mut MockBackend {
        ctx.backend_mut()
            .as_any_mut()
            .downcast_mut::<MockBackend>()
            .unwrap()
    }

    fn screen(title: &str, color: &str) -> Element {
        Element::container(
            "root",
            [("color", color)],
            vec![Element::markup("title", title), Element::markup("status", "ok")],
        )
    }

    #[test]
    fn test_first_render_is_full() {
        let mut c = ctx(20, 4);
        let report = c.render_element(screen("hello", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Full);
        assert!(report.full_frame);
        assert!(report.bytes > 0);

        let m = mock(&mut c);
        assert_eq!(m.frames.len(), 1);
        assert!(m.frames[0].starts_with(CLEAR_SCREEN));
        assert!(m.frames[0].contains("hello"));
        assert_eq!(m.flushes, 1);
    }

    #[test]
    fn test_identical_render_writes_nothing() {
        let mut c = ctx(20, 4);
        c.render_element(screen("hello", "red")).unwrap();
        let report = c.render_element(screen("hello", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Fast);
        assert_eq!(report.patches, 0);
        assert_eq!(report.bytes, 0);
        assert_eq!(mock(&mut c).frames.last().map(String::as_str), Some(""));
    }

    #[test]
    fn test_text_change_takes_fast_path() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        let passes = c.stats().style_passes;

        let report = c.render_element(screen("foobar", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Fast);
        assert_eq!(report.patches, 1);
        assert!(!report.full_frame);
        assert_eq!(c.stats().style_passes, passes);
        assert_eq!(c.stats().fast_renders, 1);

        let frame = mock(&mut c).frames.last().cloned().unwrap();
        assert!(frame.contains("bar"));
        assert!(!frame.contains(CLEAR_SCREEN));
    }

    #[test]
    fn test_style_change_takes_fast_path() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        let report = c.render_element(screen("foo", "blue")).unwrap();
        assert_eq!(report.path, RenderPath::Fast);
        assert!(report.bytes > 0);
        let root = c.tree().root().unwrap();
        assert_eq!(
            c.tree().node(root).unwrap().style.color,
            crate::types::indexed(4)
        );
    }

    #[test]
    fn test_fast_path_matches_rebuild_for_mixed_case_keys() {
        let styled = |color: &str| {
            Element::container("root", [("Color", color)], vec![Element::markup("t", "hi")])
        };

        let mut fast = ctx(10, 2);
        fast.render_element(styled("red")).unwrap();
        let report = fast.render_element(styled("blue")).unwrap();
        assert_eq!(report.path, RenderPath::Fast);

        let mut full = ctx(10, 2);
        let report = full.render_element(styled("blue")).unwrap();
        assert_eq!(report.path, RenderPath::Full);

        let fast_root = fast.tree().root().unwrap();
        let full_root = full.tree().root().unwrap();
        assert_eq!(
            fast.tree().node(fast_root).unwrap().style,
            full.tree().node(full_root).unwrap().style
        );
        assert_eq!(
            fast.tree().node(fast_root).unwrap().style.color,
            crate::types::indexed(4)
        );
        assert_eq!(fast.renderer().current(), full.renderer().current());
    }

    #[test]
    fn test_structural_change_rebuilds() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        let passes = c.stats().style_passes;

        let grown = Element::container(
            "root",
            [("color", "red")],
            vec![
                Element::markup("title", "foo"),
                Element::markup("status", "ok"),
                Element::markup("extra", "more"),
            ],
        );
        let report = c.render_element(grown).unwrap();
        assert_eq!(report.path, RenderPath::Full);
        assert_eq!(c.stats().style_passes, passes + 1);
        assert!(c.tree().find_by_id("extra").is_some());
        // The grid survived, so only changed cells are written.
        assert!(!report.full_frame);
    }

    #[test]
    fn test_missing_target_falls_back_to_rebuild() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();

        // Make the live tree disagree with the element history.
        let mut tree = NodeTree::from_element(&screen("foo", "red"));
        let h = tree.find_by_id("title").unwrap();
        tree.node_mut(h).unwrap().id = "renamed".into();
        c.tree = tree;

        let report = c.render_element(screen("foobar", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Full);
        assert!(c.tree().find_by_id("title").is_some());
    }

    #[test]
    fn test_stylesheet_change_forces_full() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        c.set_stylesheet("#status { color: green; }");
        let report = c.render_element(screen("foo", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Full);

        // Same text again resolves to the cached sheet and stays fast.
        c.set_stylesheet("#status { color: green; }");
        let report = c.render_element(screen("foo", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Fast);
    }

    #[test]
    fn test_backend_resize_forces_full_frame() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        mock(&mut c).width = 30;

        let report = c.rerender().unwrap();
        assert_eq!(report.path, RenderPath::Repaint);
        assert!(report.full_frame);
        assert_eq!(c.renderer().size(), (30, 4));
    }

    #[test]
    fn test_handle_resize() {
        let mut c = ctx(20, 4);
        c.render_element(screen("foo", "red")).unwrap();
        let report = c.handle_resize(10, 2).unwrap();
        assert!(report.full_frame);
        let root = c.tree().root().unwrap();
        assert_eq!(c.tree().node(root).unwrap().width, 10);

        let report = c.handle_resize(10, 2).unwrap();
        assert!(!report.full_frame);
        assert_eq!(report.bytes, 0);
    }

    #[test]
    fn test_render_tree_clears_history() {
        let mut c = ctx(10, 2);
        c.render_element(screen("foo", "red")).unwrap();
        c.render_tree(NodeTree::from_element(&Element::markup("t", "x")))
            .unwrap();
        let report = c.render_element(screen("foo", "red")).unwrap();
        assert_eq!(report.path, RenderPath::Full);
        assert_eq!(c.stats().renders, 3);
        assert_eq!(c.stats().full_renders, 3);
    }

    #[test]
    fn test_with_config_toggles_cache() {
        let cache = Arc::new(StyleCache::new());
        let config = LotusConfig {
            css_cache: false,
            ..LotusConfig::default()
        };
        let mut c = RenderContext::with_config(Box::new(MockBackend::new(4, 1)), cache.clone(), &config);
        c.set_stylesheet("box { color: red; }");
        assert!(!cache.is_enabled());
        assert!(cache.is_empty());
    }
}
