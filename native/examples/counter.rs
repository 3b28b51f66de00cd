//! Counter demo: element re-rendering driven by the event loop.
//!
//! Run with: cargo run --example counter
//! Logs go to lotus-demo.log (filter with RUST_LOG).

use std::sync::Mutex;

use lotus::terminal::FALLBACK_SIZE;
use lotus::{
    CrosstermBackend, CrosstermInput, Element, EventLoop, KeyCode, LoopControl, LotusConfig,
    RenderContext, StyleCache,
};
use tracing_subscriber::EnvFilter;

const CSS: &str = r#"
    /* layout */
    box { padding: 0 1; }
    #root { border: rounded; }
    #bar { flex-direction: row; height: 1; }

    #title { color: cyan; font-weight: bold; text-align: center; }
    #count { text-align: center; }
    #help { color: gray; font-style: italic; }
"#;

struct App {
    ctx: RenderContext,
    count: i64,
}

impl App {
    fn view(&self) -> Element {
        let color = if self.count < 0 { "red" } else { "green" };
        Element::group(
            "root",
            vec![
                Element::markup("title", "Lotus counter"),
                Element::container("body", [("flex", "1"), ("color", color)], vec![
                    Element::markup("count", format!("{}", self.count)),
                ]),
                Element::group("bar", vec![Element::markup("help", "+/- change  q quit")]),
            ],
        )
    }

    fn redraw(&mut self) -> LoopControl {
        let view = self.view();
        match self.ctx.render_element(view) {
            Ok(report) => {
                tracing::debug!(path = report.path.name(), bytes = report.bytes, "redraw");
                LoopControl::Continue
            }
            Err(e) => {
                tracing::error!(error = %e, "render failed");
                LoopControl::Stop
            }
        }
    }
}

fn main() -> lotus::Result<()> {
    let log = std::fs::File::create("lotus-demo.log")?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lotus=debug")),
        )
        .with_writer(Mutex::new(log))
        .with_ansi(false)
        .init();

    let config = LotusConfig::default();
    let backend = CrosstermBackend::with_fallback(config.fallback_size());
    let mut ctx = RenderContext::with_config(Box::new(backend), StyleCache::global(), &config);
    ctx.init()?;
    ctx.set_stylesheet(CSS);

    let mut app = App { ctx, count: 0 };
    let result = run(&mut app, &config);
    app.ctx.shutdown()?;
    result
}

fn run(app: &mut App, config: &LotusConfig) -> lotus::Result<()> {
    if app.redraw() == LoopControl::Stop {
        return Ok(());
    }

    let mut events = EventLoop::<App>::new();
    let (w, h) = app.ctx.backend().size();
    events.set_initial_size(w, h);

    let render = events.render_handle();
    events
        .on_key(move |app, key| {
            if key.is_interrupt() {
                return LoopControl::Stop;
            }
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return LoopControl::Stop,
                KeyCode::Char('+') | KeyCode::Up => app.count += 1,
                KeyCode::Char('-') | KeyCode::Down => app.count -= 1,
                _ => return LoopControl::Continue,
            }
            render.request_render();
            LoopControl::Continue
        })
        .on_resize(|app, w, h| match app.ctx.handle_resize(w, h) {
            Ok(_) => LoopControl::Continue,
            Err(e) => {
                tracing::error!(error = %e, "resize failed");
                LoopControl::Stop
            }
        })
        .on_render(App::redraw);

    events.start(config, CrosstermInput, || {
        crossterm::terminal::size().unwrap_or(FALLBACK_SIZE)
    })?;
    events.run(app)
}
