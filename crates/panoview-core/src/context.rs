//! Graphics contexts with explicit, scoped binding to a thread.
//!
//! Every context wraps a shared [`TileBackend`]; contexts created with
//! [`GraphicsContext::share`] see the same textures but are bound
//! independently. A context can be current on at most one thread at a
//! time, and GPU work requires the [`CurrentContext`] guard.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use crate::error::{PanoviewError, Result};
use crate::texture::TileBackend;

pub struct GraphicsContext {
    label: String,
    backend: Arc<dyn TileBackend>,
    binding: Mutex<()>,
}

impl GraphicsContext {
    /// The render thread's context.
    pub fn primary(backend: Arc<dyn TileBackend>) -> Self {
        Self::with_label("primary", backend)
    }

    fn with_label(label: &str, backend: Arc<dyn TileBackend>) -> Self {
        Self {
            label: label.to_string(),
            backend,
            binding: Mutex::new(()),
        }
    }

    /// A new context in the same object namespace, with its own binding.
    pub fn share(&self, label: &str) -> Self {
        Self::with_label(label, Arc::clone(&self.backend))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn backend(&self) -> &Arc<dyn TileBackend> {
        &self.backend
    }

    /// Bind this context to the calling thread until the guard drops,
    /// waiting if another thread holds it.
    pub fn make_current(&self) -> Result<CurrentContext<'_>> {
        let guard = self.binding.lock().map_err(|_| {
            PanoviewError::Context(format!("context '{}' was poisoned by a panic", self.label))
        })?;
        tracing::trace!(context = %self.label, "make current");
        Ok(CurrentContext {
            context: self,
            _guard: guard,
        })
    }

    /// Like [`GraphicsContext::make_current`] but fails instead of waiting.
    pub fn try_make_current(&self) -> Result<CurrentContext<'_>> {
        let guard = self.binding.try_lock().map_err(|e| match e {
            TryLockError::WouldBlock => {
                PanoviewError::Context(format!("context '{}' is current on another thread", self.label))
            }
            TryLockError::Poisoned(_) => {
                PanoviewError::Context(format!("context '{}' was poisoned by a panic", self.label))
            }
        })?;
        Ok(CurrentContext {
            context: self,
            _guard: guard,
        })
    }
}

impl std::fmt::Debug for GraphicsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphicsContext")
            .field("label", &self.label)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Proof that a context is bound to this thread.
pub struct CurrentContext<'a> {
    context: &'a GraphicsContext,
    _guard: MutexGuard<'a, ()>,
}

impl CurrentContext<'_> {
    pub fn backend(&self) -> &dyn TileBackend {
        self.context.backend.as_ref()
    }

    pub fn label(&self) -> &str {
        &self.context.label
    }
}

impl Drop for CurrentContext<'_> {
    fn drop(&mut self) {
        tracing::trace!(context = %self.context.label, "done current");
    }
}
