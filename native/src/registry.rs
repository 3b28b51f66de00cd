//! Registry of live render contexts keyed by context ID.
//!
//! One mutex guards the whole map. Contexts are created on first use and
//! live until `destroy` is called.

use std::collections::HashMap;
use std::sync::OnceLock;

use parking_lot::Mutex;

use crate::context::RenderContext;
use crate::terminal::TerminalBackend;

#[derive(Default)]
pub struct ContextRegistry {
    contexts: Mutex<HashMap<String, RenderContext>>,
}

impl ContextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry.
    pub fn global() -> &'static ContextRegistry {
        static GLOBAL: OnceLock<ContextRegistry> = OnceLock::new();
        GLOBAL.get_or_init(ContextRegistry::new)
    }

    /// Run `f` against the context for `id`, creating it with a backend from
    /// `make_backend` if it does not exist yet. The registry lock is held
    /// for the duration of `f`.
    pub fn with_context<B, F, R>(&self, id: &str, make_backend: B, f: F) -> R
    where
        B: FnOnce() -> Box<dyn TerminalBackend>,
        F: FnOnce(&mut RenderContext) -> R,
    {
        let mut contexts = self.contexts.lock();
        let ctx = contexts.entry(id.to_string()).or_insert_with(|| {
            tracing::debug!(context = id, "creating render context");
            RenderContext::new(make_backend())
        });
        f(ctx)
    }

    /// Remove a context and hand it back so its terminal can be restored.
    pub fn destroy(&self, id: &str) -> Option<RenderContext> {
        let removed = self.contexts.lock().remove(id);
        if removed.is_some() {
            tracing::debug!(context = id, "destroyed render context");
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.contexts.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.contexts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.contexts.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}
