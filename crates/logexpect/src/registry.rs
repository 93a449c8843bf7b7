//! Named engines and named log sources.
//!
//! A [`Registry`] is the explicit, harness-owned collection the
//! directive surface operates on. Engines come into existence on first
//! reference by name and live until [`Registry::teardown`], which
//! cancels and reaps whatever is still running. Nothing here is global
//! state; a harness passes its registry by reference.

use std::collections::HashMap;
use std::sync::Arc;

use logtap::LogSource;

use crate::engine::LogExpect;

/// Named engines plus the log sources directives can refer to.
#[derive(Default)]
pub struct Registry {
    engines: Vec<LogExpect>,
    sources: HashMap<String, Arc<dyn LogSource>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a log source available to directives under `id`.
    pub fn register_source(&mut self, id: impl Into<String>, source: Arc<dyn LogSource>) {
        self.sources.insert(id.into(), source);
    }

    /// Look up a registered log source.
    #[must_use]
    pub fn source(&self, id: &str) -> Option<Arc<dyn LogSource>> {
        self.sources.get(id).cloned()
    }

    /// The engine named `name`, created idle on first reference.
    pub fn engine(&mut self, name: &str) -> &mut LogExpect {
        let slot = self.engine_slot(name);
        &mut self.engines[slot]
    }

    /// Look up an engine without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LogExpect> {
        self.engines.iter().find(|e| e.name() == name)
    }

    /// Engines in creation order.
    #[must_use]
    pub fn engines(&self) -> &[LogExpect] {
        &self.engines
    }

    pub(crate) fn engine_slot(&mut self, name: &str) -> usize {
        match self.engines.iter().position(|e| e.name() == name) {
            Some(slot) => slot,
            None => {
                self.engines.push(LogExpect::new(name));
                self.engines.len() - 1
            }
        }
    }

    pub(crate) fn engine_mut(&mut self, slot: usize) -> &mut LogExpect {
        &mut self.engines[slot]
    }

    /// Shut every engine down concurrently, then drop them all.
    ///
    /// Running engines are cancelled and reaped; their outcomes are
    /// logged, never raised, because teardown must always complete.
    pub async fn teardown(&mut self) {
        futures::future::join_all(self.engines.iter_mut().map(|engine| engine.shutdown())).await;
        self.engines.clear();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("engines", &self.engines)
            .field("sources", &self.sources.keys().collect::<Vec<_>>())
            .finish()
    }
}
