//! Hooks invoked around every migration unit

use std::fmt;
use std::sync::Arc;

use crate::unit::MigrationUnit;

/// When a hook runs relative to the unit it brackets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Pre,
    Post,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Pre => f.write_str("pre"),
            HookPhase::Post => f.write_str("post"),
        }
    }
}

/// Rejection returned by a hook
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct HookError(pub String);

impl HookError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A hook function. Returning an error aborts the remaining sequence.
pub type Hook = Arc<dyn Fn(&MigrationUnit) -> Result<(), HookError> + Send + Sync>;

/// Ordered pre- and post-hooks handed to the engine at construction
#[derive(Clone, Default)]
pub struct HookConfig {
    pub pre: Vec<Hook>,
    pub post: Vec<Hook>,
}

impl HookConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a hook that runs before each unit is applied
    pub fn before<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MigrationUnit) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.pre.push(Arc::new(hook));
        self
    }

    /// Add a hook that runs after each unit is applied
    pub fn after<F>(mut self, hook: F) -> Self
    where
        F: Fn(&MigrationUnit) -> Result<(), HookError> + Send + Sync + 'static,
    {
        self.post.push(Arc::new(hook));
        self
    }

    pub fn hooks(&self, phase: HookPhase) -> &[Hook] {
        match phase {
            HookPhase::Pre => &self.pre,
            HookPhase::Post => &self.post,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.post.is_empty()
    }
}

impl fmt::Debug for HookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookConfig")
            .field("pre", &self.pre.len())
            .field("post", &self.post.len())
            .finish()
    }
}
