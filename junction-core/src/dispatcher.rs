// Route registration and the request entry point

use crate::compose::compose;
use crate::handler_chain::{ChainOutcome, HandlerChain};
use crate::logging::{debug, trace};
use crate::matcher::{PathMatcher, RadixMatcher, RouteMatch};
use crate::middleware::{BoxedMiddleware, Next};
use crate::pattern::RoutePattern;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Method used when a registration does not name one
pub const DEFAULT_METHOD: &str = "GET";

/// Everything needed to register one (path, method) pair.
///
/// # Examples
///
/// ```
/// use junction_core::{handler_fn, Dispatcher, HttpResponse, RouteData};
///
/// let dispatcher = Dispatcher::new();
/// dispatcher
///     .register(
///         RouteData::new("/users/:id")
///             .method("PUT")
///             .handler(handler_fn(|_req| async { Ok(HttpResponse::no_content()) })),
///     )
///     .unwrap();
/// ```
#[derive(Clone, Default)]
pub struct RouteData {
    path: String,
    method: Option<String>,
    middleware: Vec<BoxedMiddleware>,
    handler: Option<BoxedMiddleware>,
    handlers: Option<Vec<BoxedMiddleware>>,
}

impl RouteData {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Method token; defaults to `GET`
    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    /// Route-specific middleware, run after global middleware
    pub fn middleware(mut self, middleware: Vec<BoxedMiddleware>) -> Self {
        self.middleware = middleware;
        self
    }

    /// Terminal handler, run last
    pub fn handler(mut self, handler: BoxedMiddleware) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Handler list, run in order after the middleware and before `handler`
    pub fn handlers(mut self, handlers: Vec<BoxedMiddleware>) -> Self {
        self.handlers = Some(handlers);
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Check the registration rules without registering anything.
    ///
    /// Returns the parsed pattern and method. Fails with `MissingPath`,
    /// `InvalidPattern`, `UnsupportedMethod`, `MissingHandler` or
    /// `EmptyHandlerList`.
    pub fn validate(&self) -> Result<(RoutePattern, HttpMethod), Error> {
        let pattern = RoutePattern::parse(&self.path)?;

        let token = self.method.as_deref().unwrap_or(DEFAULT_METHOD);
        let method = HttpMethod::from_str(token)
            .ok_or_else(|| Error::UnsupportedMethod(token.to_string()))?;

        match (&self.handlers, &self.handler) {
            (None, None) => Err(Error::MissingHandler),
            (Some(list), None) if list.is_empty() => Err(Error::EmptyHandlerList),
            _ => Ok((pattern, method)),
        }
    }
}

impl fmt::Debug for RouteData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteData")
            .field("path", &self.path)
            .field("method", &self.method)
            .field("middleware", &self.middleware.len())
            .field("handler", &self.handler.is_some())
            .field("handlers", &self.handlers.as_ref().map(Vec::len))
            .finish()
    }
}

/// A registered route as reported by [`Dispatcher::routes`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteInfo {
    pub pattern: String,
    pub methods: Vec<HttpMethod>,
}

struct RouteTable {
    matcher: Box<dyn PathMatcher<Arc<HandlerChain>>>,
    entries: BTreeMap<String, Arc<HandlerChain>>,
}

struct DispatcherInner {
    table: RwLock<RouteTable>,
    middleware: RwLock<Vec<BoxedMiddleware>>,
}

/// Owns the route table and global middleware of one application.
///
/// Chains are composed when a route is registered: global middleware is
/// captured at that moment, so [`use_middleware`](Self::use_middleware)
/// only affects routes registered after it.
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::with_matcher(Box::new(RadixMatcher::new()))
    }

    /// Create a dispatcher whose global middleware starts as `middleware`
    pub fn with_middleware(middleware: Vec<BoxedMiddleware>) -> Self {
        let dispatcher = Self::new();
        dispatcher.use_all(middleware);
        dispatcher
    }

    /// Create a dispatcher on top of a custom path matcher
    pub fn with_matcher(matcher: Box<dyn PathMatcher<Arc<HandlerChain>>>) -> Self {
        Self {
            inner: Arc::new(DispatcherInner {
                table: RwLock::new(RouteTable {
                    matcher,
                    entries: BTreeMap::new(),
                }),
                middleware: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Append global middleware
    pub fn use_middleware(&self, middleware: BoxedMiddleware) -> &Self {
        self.inner.middleware.write().push(middleware);
        self
    }

    /// Append several global middleware, preserving their order
    pub fn use_all(&self, middleware: impl IntoIterator<Item = BoxedMiddleware>) -> &Self {
        self.inner.middleware.write().extend(middleware);
        self
    }

    pub fn middleware_count(&self) -> usize {
        self.inner.middleware.read().len()
    }

    /// Register a route.
    ///
    /// The chain is global middleware, then the route's middleware, then
    /// `handlers`, then `handler`. Registering a pattern again reuses its
    /// entry and replaces only the chain for this method.
    pub fn register(&self, route: RouteData) -> Result<&Self, Error> {
        let (pattern, method) = route.validate()?;
        let RouteData {
            middleware,
            handler,
            handlers,
            ..
        } = route;

        let mut terminal = handlers.unwrap_or_default();
        terminal.extend(handler);

        let mut layers = self.inner.middleware.read().clone();
        layers.extend(middleware);
        layers.extend(terminal);
        let chain = compose(layers);
        let layer_count = chain.len();

        let key = pattern.canonical();
        let mut table = self.inner.table.write();

        if let Some(existing) = table.entries.get(&key).cloned() {
            existing.set_method_chain(method, chain);
        } else {
            // Fully built before it becomes reachable through the matcher
            let entry = Arc::new(HandlerChain::new(key.clone()));
            entry.set_method_chain(method, chain);
            table.matcher.insert(&pattern, Arc::clone(&entry))?;
            table.entries.insert(key.clone(), entry);
        }
        drop(table);

        debug!(pattern = %key, method = %method, layers = layer_count, "Route registered");
        Ok(self)
    }

    /// Register `handlers` for `method`: the last one is the terminal
    /// handler, the rest are route middleware.
    pub fn route(
        &self,
        method: HttpMethod,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        let mut middleware: Vec<_> = handlers.into_iter().collect();
        let handler = middleware.pop().ok_or(Error::EmptyHandlerList)?;

        self.register(
            RouteData::new(path)
                .method(method.as_str())
                .middleware(middleware)
                .handler(handler),
        )
    }

    pub fn get(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::GET, path, handlers)
    }

    pub fn post(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::POST, path, handlers)
    }

    pub fn put(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::PUT, path, handlers)
    }

    pub fn delete(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::DELETE, path, handlers)
    }

    pub fn patch(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::PATCH, path, handlers)
    }

    pub fn head(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::HEAD, path, handlers)
    }

    pub fn options(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::OPTIONS, path, handlers)
    }

    pub fn connect(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::CONNECT, path, handlers)
    }

    pub fn trace(
        &self,
        path: &str,
        handlers: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Result<&Self, Error> {
        self.route(HttpMethod::TRACE, path, handlers)
    }

    /// The single entry point to plug into a server pipeline.
    ///
    /// The returned handler shares this dispatcher's tables, so routes
    /// registered later are visible to it.
    pub fn request_handler(&self) -> RequestHandler {
        RequestHandler {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Shorthand for `self.request_handler().call(req, next)`
    pub async fn dispatch(&self, req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        self.request_handler().call(req, next).await
    }

    /// Entry registered under `pattern`, in either pattern syntax
    pub fn handler_chain(&self, pattern: &str) -> Option<Arc<HandlerChain>> {
        let key = RoutePattern::parse(pattern).ok()?.canonical();
        self.inner.table.read().entries.get(&key).cloned()
    }

    /// Registered patterns and their methods, sorted by pattern
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.inner
            .table
            .read()
            .entries
            .iter()
            .map(|(pattern, chain)| RouteInfo {
                pattern: pattern.clone(),
                methods: chain.methods(),
            })
            .collect()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes())
            .field("middleware", &self.middleware_count())
            .finish()
    }
}

/// Cloneable request entry point returned by [`Dispatcher::request_handler`].
#[derive(Clone)]
pub struct RequestHandler {
    inner: Arc<DispatcherInner>,
}

impl RequestHandler {
    /// Route `req` to its chain, or hand it to `next`.
    ///
    /// An unknown path or a path without a chain for the request's method is
    /// not an error: the request goes to `next` untouched. Errors raised by
    /// the chain itself are returned as-is.
    pub async fn call(&self, mut req: HttpRequest, next: Next) -> Result<HttpResponse, Error> {
        let found = {
            let path = normalize_path(&req.url);
            let table = self.inner.table.read();
            let found = table.matcher.lookup(path);
            trace!(path = %path, matched = found.is_some(), "Route lookup");
            found
        };

        let Some(RouteMatch {
            data: chain,
            params,
        }) = found
        else {
            debug!(method = %req.method, url = %req.url, reason = "no_route", "Delegating to fallback");
            return next(req).await;
        };

        req.params = params;

        match chain.handle(req, next).await {
            ChainOutcome::Handled(result) => result,
            ChainOutcome::NoChain { request, fallback } => {
                debug!(
                    method = %request.method,
                    url = %request.url,
                    pattern = %chain.pattern(),
                    reason = "no_method",
                    "Delegating to fallback"
                );
                fallback(request).await
            }
        }
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler").finish_non_exhaustive()
    }
}

/// Strip the query string and fragment from a request target
pub fn normalize_path(url: &str) -> &str {
    match url.find(['?', '#']) {
        Some(idx) => &url[..idx],
        None => url,
    }
}
