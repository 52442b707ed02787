//! Handler registry mapping event kinds to behaviour.
//!
//! Registration happens during startup through a [`RegistryBuilder`]. Calling
//! [`RegistryBuilder::build`] freezes the bindings into a [`HandlerRegistry`]
//! that only supports lookups, so concurrent dispatch never observes a
//! partially updated table.

mod handler;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::event::Event;

pub use self::handler::{
    FnHandler, Handler, HandlerContext, HandlerError, HandlerMode, handler_fn,
};
#[cfg(test)]
pub(crate) use self::handler::MockHandler;

/// Predicate consulted before a handler is invoked.
pub type Guard = dyn Fn(&Event) -> bool + Send + Sync;

/// Errors raised while registering handlers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A handler is already bound to the kind.
    #[error("a handler is already registered for kind '{kind}'")]
    DuplicateKind {
        /// Kind that was registered twice.
        kind: String,
    },
    /// The kind was empty after trimming.
    #[error("event kind must not be empty")]
    EmptyKind,
}

/// One kind-to-handler binding.
#[derive(Clone)]
pub struct Registration {
    kind: String,
    handler: Arc<dyn Handler>,
    guard: Option<Arc<Guard>>,
}

impl Registration {
    /// Kind the handler is bound to.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Bound handler.
    #[must_use]
    pub const fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }

    /// Dispatch mode of the bound handler.
    #[must_use]
    pub fn mode(&self) -> HandlerMode {
        self.handler.mode()
    }

    /// Returns `true` when the guard, if any, accepts `event`.
    #[must_use]
    pub fn accepts(&self, event: &Event) -> bool {
        self.guard.as_ref().is_none_or(|guard| guard(event))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Registration")
            .field("kind", &self.kind)
            .field("mode", &self.mode())
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Mutable registration phase of the registry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    bindings: BTreeMap<String, Registration>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `handler` to `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::DuplicateKind`] when `kind` is already bound
    /// (the existing binding is kept) or [`RegistryError::EmptyKind`] when
    /// `kind` is blank.
    pub fn register<H>(&mut self, kind: &str, handler: H) -> Result<&mut Self, RegistryError>
    where
        H: Handler + 'static,
    {
        self.insert(kind, Arc::new(handler), None)
    }

    /// Binds an already shared handler to `kind`.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn register_shared(
        &mut self,
        kind: &str,
        handler: Arc<dyn Handler>,
    ) -> Result<&mut Self, RegistryError> {
        self.insert(kind, handler, None)
    }

    /// Binds `handler` to `kind`, invoking it only for events `guard` accepts.
    ///
    /// # Errors
    ///
    /// See [`RegistryBuilder::register`].
    pub fn register_guarded<H, G>(
        &mut self,
        kind: &str,
        guard: G,
        handler: H,
    ) -> Result<&mut Self, RegistryError>
    where
        H: Handler + 'static,
        G: Fn(&Event) -> bool + Send + Sync + 'static,
    {
        self.insert(kind, Arc::new(handler), Some(Arc::new(guard)))
    }

    /// Returns `true` when `kind` is already bound.
    #[must_use]
    pub fn contains(&self, kind: &str) -> bool {
        self.bindings.contains_key(kind.trim())
    }

    /// Number of bindings registered so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` when nothing has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Freezes the bindings.
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            bindings: self.bindings,
        }
    }

    fn insert(
        &mut self,
        kind: &str,
        handler: Arc<dyn Handler>,
        guard: Option<Arc<Guard>>,
    ) -> Result<&mut Self, RegistryError> {
        let kind = kind.trim();
        if kind.is_empty() {
            return Err(RegistryError::EmptyKind);
        }
        if self.bindings.contains_key(kind) {
            return Err(RegistryError::DuplicateKind {
                kind: kind.to_owned(),
            });
        }
        self.bindings.insert(
            kind.to_owned(),
            Registration {
                kind: kind.to_owned(),
                handler,
                guard,
            },
        );
        Ok(self)
    }
}

/// Frozen kind-to-handler table shared by dispatcher threads.
#[derive(Debug, Default)]
pub struct HandlerRegistry {
    bindings: BTreeMap<String, Registration>,
}

impl HandlerRegistry {
    /// Looks up the binding for `kind`. Kinds match exactly.
    #[must_use]
    pub fn resolve(&self, kind: &str) -> Option<&Registration> {
        self.bindings.get(kind)
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.bindings.keys().map(String::as_str)
    }

    /// Number of bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns `true` when no handlers are bound.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
