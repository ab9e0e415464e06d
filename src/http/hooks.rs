//! Per-request response hooks
//!
//! Hooks are attached to a single request and run by the connector the
//! moment that request's response arrives, before anyone awaits or reads
//! the response. A hook returning an error fails the send.

use super::response::Response;
use crate::error::Result;
use std::sync::Arc;

/// Callback run once per arrived response
pub trait ResponseHook: Send + Sync {
    /// Inspect the response; returning an error aborts the send
    fn on_response(&self, response: &Response) -> Result<()>;
}

impl<F> ResponseHook for F
where
    F: Fn(&Response) -> Result<()> + Send + Sync,
{
    fn on_response(&self, response: &Response) -> Result<()> {
        self(response)
    }
}

/// Ordered list of hooks attached to a request
#[derive(Clone, Default)]
pub struct ResponseHooks {
    hooks: Vec<Arc<dyn ResponseHook>>,
}

impl ResponseHooks {
    /// Append a hook
    pub fn push(&mut self, hook: Arc<dyn ResponseHook>) {
        self.hooks.push(hook);
    }

    /// Number of registered hooks
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Whether no hooks are registered
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Run every hook in registration order, stopping at the first error
    pub fn run(&self, response: &Response) -> Result<()> {
        for hook in &self.hooks {
            hook.on_response(response)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for ResponseHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseHooks")
            .field("len", &self.hooks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_hooks_run_in_order_and_stop_on_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hooks = ResponseHooks::default();

        let first = Arc::clone(&calls);
        hooks.push(Arc::new(move |_: &Response| -> Result<()> {
            first.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        hooks.push(Arc::new(|response: &Response| -> Result<()> {
            response.throw()?;
            Ok(())
        }));
        let third = Arc::clone(&calls);
        hooks.push(Arc::new(move |_: &Response| -> Result<()> {
            third.fetch_add(100, Ordering::SeqCst);
            Ok(())
        }));

        let ok = Response::new(200, "{}");
        hooks.run(&ok).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 101);

        let failed = Response::new(503, "down");
        let err = hooks.run(&failed).unwrap_err();
        assert!(matches!(err, Error::HttpStatus { status: 503, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 102);
    }

    #[test]
    fn test_empty_hooks() {
        let hooks = ResponseHooks::default();
        assert!(hooks.is_empty());
        assert_eq!(hooks.len(), 0);
        hooks.run(&Response::new(500, "")).unwrap();
    }
}
