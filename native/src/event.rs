//! Event Module — channel-based boundary loop.
//!
//! Responsibilities:
//! - Input thread: block on an `InputSource`, forward keys and resizes
//! - Resize watcher: poll a size function, forward changes
//! - Optional ticker for periodic redraws
//! - Coalesce render requests through a bounded(1) channel
//! - Dispatch to registered handlers one at a time on the caller's thread
//!
//! The render pipeline itself never runs on these helper threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::LotusConfig;
use crate::error::{LotusError, Result};
use crate::terminal::InputSource;
use crate::types::{InputEvent, KeyEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Cheap handle for asking the loop to redraw.
#[derive(Debug, Clone)]
pub struct RenderHandle {
    tx: flume::Sender<()>,
}

impl RenderHandle {
    /// Queue a render. Returns `false` if one is already pending, in which
    /// case this request is folded into it.
    pub fn request_render(&self) -> bool {
        self.tx.try_send(()).is_ok()
    }
}

#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: flume::Sender<()>,
    shutdown: Arc<AtomicBool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        let _ = self.tx.try_send(());
    }
}

#[derive(Debug)]
enum Dispatch {
    Key(KeyEvent),
    Resize(u16, u16),
    Tick,
    Render,
    Stop,
    Closed,
}

type KeyHandler<S> = Box<dyn FnMut(&mut S, KeyEvent) -> LoopControl>;
type ResizeHandler<S> = Box<dyn FnMut(&mut S, u16, u16) -> LoopControl>;
type PlainHandler<S> = Box<dyn FnMut(&mut S) -> LoopControl>;

pub struct EventLoop<S> {
    key_tx: flume::Sender<KeyEvent>,
    key_rx: flume::Receiver<KeyEvent>,
    resize_tx: flume::Sender<(u16, u16)>,
    resize_rx: flume::Receiver<(u16, u16)>,
    tick_tx: flume::Sender<()>,
    tick_rx: flume::Receiver<()>,
    render_tx: flume::Sender<()>,
    render_rx: flume::Receiver<()>,
    stop_tx: flume::Sender<()>,
    stop_rx: flume::Receiver<()>,

    shutdown: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
    last_size: Option<(u16, u16)>,

    on_key: Option<KeyHandler<S>>,
    on_resize: Option<ResizeHandler<S>>,
    on_tick: Option<PlainHandler<S>>,
    on_render: Option<PlainHandler<S>>,
}

impl<S> Default for EventLoop<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> EventLoop<S> {
    pub fn new() -> Self {
        let (key_tx, key_rx) = flume::unbounded();
        let (resize_tx, resize_rx) = flume::unbounded();
        let (tick_tx, tick_rx) = flume::bounded(1);
        let (render_tx, render_rx) = flume::bounded(1);
        let (stop_tx, stop_rx) = flume::bounded(1);
        Self {
            key_tx,
            key_rx,
            resize_tx,
            resize_rx,
            tick_tx,
            tick_rx,
            render_tx,
            render_rx,
            stop_tx,
            stop_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            threads: Vec::new(),
            last_size: None,
            on_key: None,
            on_resize: None,
            on_tick: None,
            on_render: None,
        }
    }

    // ------------------------------------------------------------------
    // Handles and handlers
    // ------------------------------------------------------------------

    pub fn render_handle(&self) -> RenderHandle {
        RenderHandle {
            tx: self.render_tx.clone(),
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
            shutdown: self.shutdown.clone(),
        }
    }

    /// Sender for injecting key events from outside the input thread.
    pub fn key_sender(&self) -> flume::Sender<KeyEvent> {
        self.key_tx.clone()
    }

    pub fn resize_sender(&self) -> flume::Sender<(u16, u16)> {
        self.resize_tx.clone()
    }

    /// Without a key handler, Ctrl+C stops the loop and other keys are
    /// ignored.
    pub fn on_key(&mut self, f: impl FnMut(&mut S, KeyEvent) -> LoopControl + 'static) -> &mut Self {
        self.on_key = Some(Box::new(f));
        self
    }

    /// Called only when the size differs from the last one seen.
    pub fn on_resize(&mut self, f: impl FnMut(&mut S, u16, u16) -> LoopControl + 'static) -> &mut Self {
        self.on_resize = Some(Box::new(f));
        self
    }

    pub fn on_tick(&mut self, f: impl FnMut(&mut S) -> LoopControl + 'static) -> &mut Self {
        self.on_tick = Some(Box::new(f));
        self
    }

    pub fn on_render(&mut self, f: impl FnMut(&mut S) -> LoopControl + 'static) -> &mut Self {
        self.on_render = Some(Box::new(f));
        self
    }

    /// Seed the size used for resize de-duplication.
    pub fn set_initial_size(&mut self, width: u16, height: u16) {
        self.last_size = Some((width, height));
    }

    // ------------------------------------------------------------------
    // Helper threads
    // ------------------------------------------------------------------

    pub fn spawn_input<I>(&mut self, mut source: I, poll: Duration) -> Result<()>
    where
        I: InputSource + 'static,
    {
        let shutdown = self.shutdown.clone();
        let keys = self.key_tx.clone();
        let resizes = self.resize_tx.clone();
        let handle = thread::Builder::new()
            .name("lotus-input".into())
            .spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let sent = match source.poll_event(poll) {
                        Ok(Some(InputEvent::Key(k))) => keys.send(k).is_ok(),
                        Ok(Some(InputEvent::Resize { width, height })) => {
                            resizes.send((width, height)).is_ok()
                        }
                        Ok(None) => true,
                        Err(e) => {
                            tracing::warn!(error = %e, "input source failed");
                            false
                        }
                    };
                    if !sent {
                        break;
                    }
                }
                tracing::trace!("input thread exiting");
            })?;
        self.threads.push(handle);
        Ok(())
    }

    /// Poll `size` every `interval` and forward changes.
    pub fn spawn_resize_watcher<F>(&mut self, size: F, interval: Duration) -> Result<()>
    where
        F: Fn() -> (u16, u16) + Send + 'static,
    {
        let shutdown = self.shutdown.clone();
        let resizes = self.resize_tx.clone();
        let mut last = self.last_size;
        let handle = thread::Builder::new()
            .name("lotus-resize".into())
            .spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    let now = size();
                    if last != Some(now) {
                        last = Some(now);
                        if resizes.send(now).is_err() {
                            break;
                        }
                    }
                    thread::sleep(interval);
                }
            })?;
        self.threads.push(handle);
        Ok(())
    }

    /// Ticks are bounded(1) too: a slow handler sees one tick, not a backlog.
    pub fn spawn_ticker(&mut self, interval: Duration) -> Result<()> {
        let shutdown = self.shutdown.clone();
        let ticks = self.tick_tx.clone();
        let handle = thread::Builder::new()
            .name("lotus-tick".into())
            .spawn(move || {
                while !shutdown.load(Ordering::Acquire) {
                    thread::sleep(interval);
                    if let Err(flume::TrySendError::Disconnected(_)) = ticks.try_send(()) {
                        break;
                    }
                }
            })?;
        self.threads.push(handle);
        Ok(())
    }

    /// Spawn every helper thread the configuration asks for.
    pub fn start<I, F>(&mut self, config: &LotusConfig, input: I, size: F) -> Result<()>
    where
        I: InputSource + 'static,
        F: Fn() -> (u16, u16) + Send + 'static,
    {
        self.spawn_input(input, Duration::from_millis(config.input_poll_ms))?;
        self.spawn_resize_watcher(size, Duration::from_millis(config.resize_poll_ms))?;
        if let Some(ms) = config.tick_interval_ms {
            self.spawn_ticker(Duration::from_millis(ms))?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Block and dispatch until stopped.
    pub fn run(&mut self, state: &mut S) -> Result<()> {
        let result = loop {
            match self.wait() {
                Dispatch::Closed => break Err(LotusError::Disconnected),
                next => {
                    if self.dispatch(state, next) == LoopControl::Stop {
                        break Ok(());
                    }
                }
            }
        };
        self.shutdown();
        result
    }

    /// Dispatch everything already queued without blocking. Render requests
    /// are drained last so requests made by other handlers fold into one.
    pub fn pump(&mut self, state: &mut S) -> LoopControl {
        loop {
            let next = if self.stop_rx.try_recv().is_ok() {
                Dispatch::Stop
            } else if let Ok(k) = self.key_rx.try_recv() {
                Dispatch::Key(k)
            } else if let Ok((w, h)) = self.resize_rx.try_recv() {
                Dispatch::Resize(w, h)
            } else if self.tick_rx.try_recv().is_ok() {
                Dispatch::Tick
            } else if self.render_rx.try_recv().is_ok() {
                Dispatch::Render
            } else {
                return LoopControl::Continue;
            };
            if self.dispatch(state, next) == LoopControl::Stop {
                return LoopControl::Stop;
            }
        }
    }

    fn wait(&self) -> Dispatch {
        fn or_closed<T>(r: std::result::Result<T, flume::RecvError>, f: impl FnOnce(T) -> Dispatch) -> Dispatch {
            r.map_or(Dispatch::Closed, f)
        }

        flume::Selector::new()
            .recv(&self.stop_rx, |r| or_closed(r, |_| Dispatch::Stop))
            .recv(&self.key_rx, |r| or_closed(r, Dispatch::Key))
            .recv(&self.resize_rx, |r| or_closed(r, |(w, h)| Dispatch::Resize(w, h)))
            .recv(&self.tick_rx, |r| or_closed(r, |_| Dispatch::Tick))
            .recv(&self.render_rx, |r| or_closed(r, |_| Dispatch::Render))
            .wait()
    }

    fn dispatch(&mut self, state: &mut S, next: Dispatch) -> LoopControl {
        match next {
            Dispatch::Key(key) => match self.on_key.as_mut() {
                Some(f) => f(state, key),
                None if key.is_interrupt() => LoopControl::Stop,
                None => LoopControl::Continue,
            },
            Dispatch::Resize(w, h) => {
                if self.last_size == Some((w, h)) {
                    return LoopControl::Continue;
                }
                self.last_size = Some((w, h));
                tracing::debug!(width = w, height = h, "resize");
                self.on_resize
                    .as_mut()
                    .map_or(LoopControl::Continue, |f| f(state, w, h))
            }
            Dispatch::Tick => self
                .on_tick
                .as_mut()
                .map_or(LoopControl::Continue, |f| f(state)),
            Dispatch::Render => self
                .on_render
                .as_mut()
                .map_or(LoopControl::Continue, |f| f(state)),
            Dispatch::Stop | Dispatch::Closed => LoopControl::Stop,
        }
    }

    /// Signal helper threads to exit and wait for them.
    pub fn shutdown(&mut self) {
        self.shutdown.store(true, Ordering::Release);
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("event loop helper thread panicked");
            }
        }
    }
}

impl<S> Drop for EventLoop<S> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
