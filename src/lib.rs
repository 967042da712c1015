// Junction - method-aware route dispatch for async HTTP servers
//
// This library registers routes as (path, method) pairs, composes each pair's
// middleware into an onion-style chain, and exposes a single request handler
// that a server pipeline can call with its own fallback continuation.

// Re-export core functionality
pub use junction_core::*;

// Re-export optional crates
#[cfg(feature = "config")]
pub use junction_config;

// Prelude for common imports
pub mod prelude {
    pub use crate::{
        BoxedMiddleware, Dispatcher, Error, HttpMethod, HttpRequest, HttpResponse,
        LoggingMiddleware, Middleware, Next, RequestHandler, RouteData, from_fn, handler_fn,
        next_fn, not_found,
    };

    #[cfg(feature = "config")]
    pub use crate::junction_config::{FunctionRegistry, RouteManifest};
}
