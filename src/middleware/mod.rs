//! Middleware hooks.
//!
//! A [`Middleware`] is an optional *before* hook, which sees the
//! [`Request`] before the handler runs, and an optional *after* hook, which
//! sees the [`Response`] once the handler has produced it. Neither hook can
//! change which handler runs; they are for cross-cutting edits such as
//! stamping headers.
//!
//! Middleware attaches at three scopes, and runs in this order around a
//! handler:
//!
//! ```text
//! before:  app → controller → controller (named routes) → route
//!          handler
//! after:   route → controller (named routes) → controller → app
//! ```
//!
//! ```rust
//! use gantry::Middleware;
//!
//! let stamp = Middleware::after(|res| {
//!     res.set_header("Controller-Middleware", "Yes");
//! });
//! ```

use std::fmt;
use std::sync::Arc;

use crate::request::Request;
use crate::response::Response;

type BeforeHook = Arc<dyn Fn(&mut Request) + Send + Sync + 'static>;
type AfterHook = Arc<dyn Fn(&mut Response) + Send + Sync + 'static>;

/// A before/after hook pair. Cloning is cheap; hooks are shared.
#[derive(Clone, Default)]
pub struct Middleware {
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
}

impl Middleware {
    /// A middleware with no hooks. Add them with
    /// [`with_before`](Middleware::with_before) / [`with_after`](Middleware::with_after).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        Self::new().with_before(hook)
    }

    pub fn after(hook: impl Fn(&mut Response) + Send + Sync + 'static) -> Self {
        Self::new().with_after(hook)
    }

    pub fn with_before(mut self, hook: impl Fn(&mut Request) + Send + Sync + 'static) -> Self {
        self.before = Some(Arc::new(hook));
        self
    }

    pub fn with_after(mut self, hook: impl Fn(&mut Response) + Send + Sync + 'static) -> Self {
        self.after = Some(Arc::new(hook));
        self
    }

    pub(crate) fn run_before(&self, req: &mut Request) {
        if let Some(hook) = &self.before {
            hook(req);
        }
    }

    pub(crate) fn run_after(&self, res: &mut Response) {
        if let Some(hook) = &self.after {
            hook(res);
        }
    }
}

impl fmt::Debug for Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Middleware")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .finish()
    }
}

/// Runs every before hook of `chain`, outermost first.
pub(crate) fn run_before(chain: &[Middleware], req: &mut Request) {
    for m in chain {
        m.run_before(req);
    }
}

/// Runs every after hook of `chain`, innermost first.
pub(crate) fn run_after(chain: &[Middleware], res: &mut Response) {
    for m in chain.iter().rev() {
        m.run_after(res);
    }
}
