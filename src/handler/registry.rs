//! Handler registration and compilation.
//!
//! # Responsibilities
//! - Define the `Handler` trait every dynamic route implements
//! - Map handler file paths to explicit registrations
//! - Compile unregistered handler sources through a pluggable factory
//!
//! # Design Decisions
//! - A handler signals completion exactly once through `Completion`;
//!   the signal is consumed by value, so double completion cannot compile
//! - Compilation happens once at plant/replant time, never per request
//! - A file that yields no handler is a fatal configuration error at
//!   plant time

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::ArborError;
use crate::handler::context::Context;

/// Single-shot completion signal handed to a handler alongside its
/// context. Dropping it without calling `done` or `fail` surfaces as a
/// handler error to the pending load.
pub struct Completion {
    tx: oneshot::Sender<Result<Context, String>>,
}

impl Completion {
    pub(crate) fn new() -> (Self, oneshot::Receiver<Result<Context, String>>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// Resolve the pending load with the completed context.
    pub fn done(self, ctx: Context) {
        if self.tx.send(Ok(ctx)).is_err() {
            tracing::warn!("completion signalled after the load was abandoned");
        }
    }

    /// Resolve the pending load with a handler error.
    pub fn fail(self, reason: impl Into<String>) {
        let _ = self.tx.send(Err(reason.into()));
    }
}

/// A compiled dynamic route handler.
pub trait Handler: Send + Sync {
    /// Execute against the context. Implementations may spawn tasks and
    /// complete later; the loader enforces a timeout either way.
    fn call(&self, ctx: Context, completion: Completion);
}

/// Adapter turning a closure into a `Handler`.
pub struct FnHandler<F>(pub F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(Context, Completion) + Send + Sync,
{
    fn call(&self, ctx: Context, completion: Completion) {
        (self.0)(ctx, completion)
    }
}

/// Convenience constructor for closure handlers.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(Context, Completion) + Send + Sync + 'static,
{
    Arc::new(FnHandler(f))
}

/// Compiles handler file source into a callable, once per plant/replant.
pub trait HandlerFactory: Send + Sync {
    fn compile(&self, rel_path: &str, source: &str) -> Result<Arc<dyn Handler>, ArborError>;
}

/// Default factory: the file's (already minified) source is served as the
/// response body. Sites wanting real logic register handlers explicitly
/// or install their own factory.
pub struct TemplateFactory;

struct TemplateHandler {
    body: String,
}

impl Handler for TemplateHandler {
    fn call(&self, mut ctx: Context, completion: Completion) {
        ctx.set_value(self.body.clone());
        completion.done(ctx);
    }
}

impl HandlerFactory for TemplateFactory {
    fn compile(&self, _rel_path: &str, source: &str) -> Result<Arc<dyn Handler>, ArborError> {
        Ok(Arc::new(TemplateHandler {
            body: source.to_string(),
        }))
    }
}

/// Registry consulted by the tree builder for every dynamic file.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
    factory: Arc<dyn HandlerFactory>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
            factory: Arc::new(TemplateFactory),
        }
    }
}

impl HandlerRegistry {
    pub fn with_factory(factory: Arc<dyn HandlerFactory>) -> Self {
        Self {
            handlers: HashMap::new(),
            factory,
        }
    }

    /// Register a handler for a specific file path (e.g. `www/a/b.njs`).
    /// Explicit registrations take precedence over the factory.
    pub fn register(&mut self, rel_path: impl Into<String>, handler: Arc<dyn Handler>) {
        self.handlers.insert(rel_path.into(), handler);
    }

    /// Resolve the handler for a dynamic file, compiling through the
    /// factory when no explicit registration exists.
    pub fn resolve(&self, rel_path: &str, source: &str) -> Result<Arc<dyn Handler>, ArborError> {
        if let Some(handler) = self.handlers.get(rel_path) {
            return Ok(handler.clone());
        }
        self.factory
            .compile(rel_path, source)
            .map_err(|e| match e {
                ArborError::Configuration(msg) => {
                    ArborError::Configuration(format!("{}: {}", rel_path, msg))
                }
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_registration_beats_factory() {
        let mut registry = HandlerRegistry::default();
        registry.register(
            "www/x.njs",
            handler_fn(|mut ctx, completion| {
                ctx.set_value("registered");
                completion.done(ctx);
            }),
        );

        let handler = registry.resolve("www/x.njs", "source text").unwrap();
        let (completion, mut rx) = Completion::new();
        handler.call(Context::default(), completion);
        let ctx = rx.try_recv().unwrap().unwrap();
        assert_eq!(ctx.value, b"registered");
    }

    #[test]
    fn template_factory_serves_source() {
        let registry = HandlerRegistry::default();
        let handler = registry.resolve("www/y.njs", "<p>hi</p>").unwrap();
        let (completion, mut rx) = Completion::new();
        handler.call(Context::default(), completion);
        let ctx = rx.try_recv().unwrap().unwrap();
        assert_eq!(ctx.value, b"<p>hi</p>");
    }
}
