// Middleware capability and adapters

use crate::logging::{debug, info, warn};
use crate::{Error, HttpRequest, HttpResponse};
use async_trait::async_trait;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;

/// Future returned by every step of a chain
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<HttpResponse, Error>> + Send>>;

/// Continuation handed to a middleware.
///
/// `FnOnce` and taken by value: a middleware can run the rest of the chain at
/// most once. Dropping it without calling it short-circuits the chain.
pub type Next = Box<dyn FnOnce(HttpRequest) -> BoxFuture + Send>;

/// Shared, type-erased middleware as stored in chains
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// A unit of a handler chain.
///
/// Terminal handlers implement the same trait; they are simply expected not to
/// call `next`.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process the request and optionally pass it down the chain
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error>;
}

/// Middleware backed by an async closure taking the continuation.
pub struct FnMiddleware<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnMiddleware<F>
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        (self.f)(req, next).await
    }
}

/// Terminal handler backed by an async closure that never sees the continuation.
pub struct FnHandler<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Middleware for FnHandler<F>
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    async fn handle(&self, req: HttpRequest, _next: Next) -> Result<HttpResponse, Error> {
        (self.f)(req).await
    }
}

/// Wrap `async |req, next| ...` as middleware.
///
/// ```
/// use junction_core::from_fn;
///
/// let tagged = from_fn(|req, next| async move {
///     next(req).await.map(|res| res.with_header("X-Handled", "1"))
/// });
/// # let _ = tagged;
/// ```
pub fn from_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(HttpRequest, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(FnMiddleware { f })
}

/// Wrap `async |req| ...` as a terminal handler.
pub fn handler_fn<F, Fut>(f: F) -> BoxedMiddleware
where
    F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Arc::new(FnHandler { f })
}

/// Build a continuation, typically the host's fallback for unmatched requests.
pub fn next_fn<F, Fut>(f: F) -> Next
where
    F: FnOnce(HttpRequest) -> Fut + Send + 'static,
    Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
{
    Box::new(move |req| Box::pin(f(req)))
}

/// Fallback continuation answering every request with an empty 404.
pub fn not_found() -> Next {
    next_fn(|req: HttpRequest| async move {
        debug!(method = %req.method, url = %req.url, "Fallback continuation reached");
        Ok(HttpResponse::not_found())
    })
}

/// Request logging middleware.
///
/// Emits one event when the request enters the chain and one when the
/// downstream chain settles, with status and elapsed time.
#[derive(Debug, Clone, Default)]
pub struct LoggingMiddleware {
    /// Also log request body sizes
    pub log_body_size: bool,
}

impl LoggingMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body_size(mut self) -> Self {
        self.log_body_size = true;
        self
    }
}

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn handle(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let start = Instant::now();
        let method = req.method.clone();
        let url = req.url.clone();

        if self.log_body_size {
            debug!(method = %method, url = %url, body_bytes = req.body.len(), "Request started");
        } else {
            debug!(method = %method, url = %url, "Request started");
        }

        let result = next(req).await;
        let elapsed_us = start.elapsed().as_micros() as u64;

        match &result {
            Ok(response) => {
                info!(
                    method = %method,
                    url = %url,
                    status = response.status,
                    elapsed_us,
                    "Request completed"
                );
            }
            Err(e) => {
                warn!(
                    method = %method,
                    url = %url,
                    error = %e,
                    elapsed_us,
                    "Request failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_fn_ignores_next() {
        let handler = handler_fn(|_req| async { Ok(HttpResponse::text("done")) });
        let next = next_fn(|_req| async { Err(Error::Internal("should not run".into())) });

        let response = handler.handle(HttpRequest::new("GET", "/"), next).await.unwrap();
        assert_eq!(response.body_str(), Some("done"));
    }

    #[tokio::test]
    async fn test_from_fn_passes_through() {
        let mw = from_fn(|req, next| async move {
            next(req).await.map(|res| res.with_header("X-Seen", "yes"))
        });

        let res = mw
            .handle(HttpRequest::new("GET", "/"), not_found())
            .await
            .unwrap();
        assert_eq!(res.status, 404);
        assert_eq!(res.headers.get("X-Seen").map(String::as_str), Some("yes"));
    }

    #[tokio::test]
    async fn test_logging_middleware_propagates_errors() {
        let mw = LoggingMiddleware::new().with_body_size();
        let next = next_fn(|_req| async { Err(Error::Forbidden("denied".into())) });

        let err = mw
            .handle(HttpRequest::new("POST", "/secret"), next)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(_)));
    }
}
