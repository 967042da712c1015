//! Onion-style composition of middleware into a single callable chain.
//!
//! The layer list is flattened and frozen once, when a route is registered.
//! Each request then folds it right to left around the caller's continuation:
//!
//! ```text
//! [m1, m2, ..., mn] + next
//!     current = next
//!     current = |req| mn.handle(req, current)
//!     ...
//!     current = |req| m1.handle(req, current)
//!     current(req)
//! ```
//!
//! `m1` runs first. Work a layer does after awaiting its continuation runs
//! only once every inner layer has completed. A layer that never calls its
//! continuation ends the chain there, and errors travel outward untouched.

use crate::logging::trace;
use crate::middleware::{BoxFuture, BoxedMiddleware, Next};
use crate::HttpRequest;
use std::fmt;
use std::sync::Arc;

/// An ordered, immutable middleware stack ready to be invoked.
#[derive(Clone)]
pub struct ComposedChain {
    layers: Arc<[BoxedMiddleware]>,
}

impl ComposedChain {
    pub fn new(layers: Vec<BoxedMiddleware>) -> Self {
        Self {
            layers: layers.into(),
        }
    }

    /// Number of layers, the terminal handler included
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Run the chain with `next` as the outermost continuation.
    ///
    /// An empty chain calls `next` directly.
    pub fn call(&self, req: HttpRequest, next: Next) -> BoxFuture {
        trace!(layers = self.layers.len(), "Executing composed chain");

        let mut current = next;
        for layer in self.layers.iter().rev() {
            let layer = Arc::clone(layer);
            let inner = current;
            current = Box::new(move |req: HttpRequest| -> BoxFuture {
                Box::pin(async move { layer.handle(req, inner).await })
            });
        }

        current(req)
    }
}

impl fmt::Debug for ComposedChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComposedChain")
            .field("layers", &self.layers.len())
            .finish()
    }
}

/// Compose `layers` into a single chain, first element outermost.
pub fn compose(layers: Vec<BoxedMiddleware>) -> ComposedChain {
    ComposedChain::new(layers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{from_fn, handler_fn, next_fn, not_found};
    use crate::{Error, HttpResponse};
    use parking_lot::Mutex;

    fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
        Arc::new(Mutex::new(Vec::new()))
    }

    #[tokio::test]
    async fn test_onion_order() {
        let log = recorder();

        let (a_log, b_log, h_log) = (log.clone(), log.clone(), log.clone());
        let chain = compose(vec![
            from_fn(move |req, next| {
                let log = a_log.clone();
                async move {
                    log.lock().push("before");
                    let res = next(req).await;
                    log.lock().push("after");
                    res
                }
            }),
            from_fn(move |req, next| {
                let log = b_log.clone();
                async move {
                    log.lock().push("mid");
                    next(req).await
                }
            }),
            handler_fn(move |_req| {
                let log = h_log.clone();
                async move {
                    log.lock().push("handler");
                    Ok(HttpResponse::ok())
                }
            }),
        ]);

        let res = chain
            .call(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap();

        assert_eq!(res.status, 200);
        assert_eq!(*log.lock(), vec!["before", "mid", "handler", "after"]);
    }

    #[tokio::test]
    async fn test_short_circuit() {
        let log = recorder();
        let h_log = log.clone();

        let chain = compose(vec![
            from_fn(|_req, _next| async { Ok(HttpResponse::unauthorized()) }),
            handler_fn(move |_req| {
                let log = h_log.clone();
                async move {
                    log.lock().push("handler");
                    Ok(HttpResponse::ok())
                }
            }),
        ]);

        let res = chain
            .call(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap();

        assert_eq!(res.status, 401);
        assert!(log.lock().is_empty());
    }

    #[tokio::test]
    async fn test_errors_propagate() {
        let chain = compose(vec![
            from_fn(|req, next| async move { next(req).await }),
            handler_fn(|_req| async { Err(Error::BadRequest("bad input".into())) }),
        ]);

        let err = chain
            .call(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(msg) if msg == "bad input"));
    }

    #[tokio::test]
    async fn test_terminal_continuation_reaches_outer_next() {
        // A "handler" that does call next falls through to the caller's continuation
        let chain = compose(vec![from_fn(|req, next| async move { next(req).await })]);
        let next = next_fn(|_req| async { Ok(HttpResponse::new(418)) });

        let res = chain.call(HttpRequest::new("GET", "/"), next).await.unwrap();
        assert_eq!(res.status, 418);
    }

    #[tokio::test]
    async fn test_empty_chain_calls_next() {
        let chain = compose(Vec::new());
        assert!(chain.is_empty());

        let res = chain
            .call(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap();
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn test_request_mutation_flows_inward() {
        let chain = compose(vec![
            from_fn(|req, next| async move { next(req.with_header("X-User", "alice")).await }),
            handler_fn(|req| async move {
                Ok(HttpResponse::text(req.header("X-User").unwrap_or("anonymous").to_string()))
            }),
        ]);

        let res = chain
            .call(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap();
        assert_eq!(res.body_str(), Some("alice"));
    }
}
