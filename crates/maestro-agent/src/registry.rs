use crate::Agent;
use maestro_core::{MaestroError, MaestroResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory producing an [`Agent`] instance for one task.
///
/// A factory may build a fresh agent per call or hand out clones of a shared
/// `Arc` to pool one instance across tasks.
pub type AgentFactory = Box<dyn Fn() -> Arc<dyn Agent> + Send + Sync>;

/// Maps an agent-kind tag to the factory that produces instances of it.
///
/// This is the single place dynamic dispatch by kind tag occurs; the
/// scheduler never matches on agent kinds directly. The registry is
/// read-mostly: populated once at startup, then shared across workers behind
/// a cheap read lock.
#[derive(Default)]
pub struct AgentRegistry {
    factories: RwLock<HashMap<String, AgentFactory>>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `kind`, replacing any previous registration.
    pub fn register(&self, kind: impl Into<String>, factory: AgentFactory) {
        let kind = kind.into();
        tracing::debug!(kind = %kind, "registering agent kind");
        self.factories.write().insert(kind, factory);
    }

    /// Produces an agent for `kind`.
    ///
    /// Fails with [`MaestroError::UnknownAgentKind`] if `kind` was never
    /// registered.
    pub fn create(&self, kind: &str) -> MaestroResult<Arc<dyn Agent>> {
        let factories = self.factories.read();
        let factory = factories
            .get(kind)
            .ok_or_else(|| MaestroError::UnknownAgentKind(kind.to_string()))?;
        Ok(factory())
    }

    /// Whether `kind` has a registered factory.
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.read().contains_key(kind)
    }

    /// All registered kind tags, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }
}
