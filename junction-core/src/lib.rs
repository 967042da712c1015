// Core library for junction
// Route dispatch, per-method handler chains and onion-style middleware composition

pub mod compose;
pub mod dispatcher;
pub mod error;
pub mod handler_chain;
pub mod http;
pub mod logging;
pub mod matcher;
pub mod method;
pub mod middleware;
pub mod pattern;

// Re-export commonly used types
pub use compose::{ComposedChain, compose};
pub use dispatcher::{
    DEFAULT_METHOD, Dispatcher, RequestHandler, RouteData, RouteInfo, normalize_path,
};
pub use error::*;
pub use handler_chain::{ChainOutcome, HandlerChain};
pub use http::*;
pub use matcher::{PathMatcher, RadixMatcher, RouteMatch};
pub use method::HttpMethod;
pub use middleware::*;
pub use pattern::{DEFAULT_WILDCARD, RoutePattern, Segment};
