// Per-route storage of one composed chain per HTTP method

use crate::compose::ComposedChain;
use crate::logging::trace;
use crate::middleware::Next;
use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;

/// Outcome of asking a [`HandlerChain`] to serve a request.
pub enum ChainOutcome {
    /// A chain was registered for the request's method and ran
    Handled(Result<HttpResponse, Error>),
    /// No chain for this method; the request and fallback are handed back
    NoChain { request: HttpRequest, fallback: Next },
}

impl ChainOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, ChainOutcome::Handled(_))
    }
}

impl fmt::Debug for ChainOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainOutcome::Handled(result) => f.debug_tuple("Handled").field(result).finish(),
            ChainOutcome::NoChain { request, .. } => f
                .debug_struct("NoChain")
                .field("method", &request.method)
                .field("url", &request.url)
                .finish(),
        }
    }
}

/// All method chains registered under one route pattern.
///
/// Registering a method only ever adds or replaces that method's chain;
/// other methods on the same pattern are left as they were.
pub struct HandlerChain {
    pattern: String,
    chains: RwLock<HashMap<HttpMethod, ComposedChain>>,
}

impl HandlerChain {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            chains: RwLock::new(HashMap::new()),
        }
    }

    /// The canonical pattern this chain is registered under
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Store or overwrite the chain for `method`
    pub fn set_method_chain(&self, method: HttpMethod, chain: ComposedChain) {
        self.chains.write().insert(method, chain);
    }

    pub fn chain_for(&self, method: HttpMethod) -> Option<ComposedChain> {
        self.chains.read().get(&method).cloned()
    }

    pub fn has_method(&self, method: HttpMethod) -> bool {
        self.chains.read().contains_key(&method)
    }

    /// Registered methods, sorted
    pub fn methods(&self) -> Vec<HttpMethod> {
        let mut methods: Vec<_> = self.chains.read().keys().copied().collect();
        methods.sort();
        methods
    }

    /// Run the chain registered for the request's method.
    ///
    /// The lock is released before the chain starts, so a slow chain never
    /// blocks registration on the same route.
    pub async fn handle(&self, req: HttpRequest, fallback: Next) -> ChainOutcome {
        let chain = HttpMethod::from_str(&req.method).and_then(|m| self.chain_for(m));

        match chain {
            Some(chain) => {
                trace!(pattern = %self.pattern, method = %req.method, "Method chain found");
                ChainOutcome::Handled(chain.call(req, fallback).await)
            }
            None => ChainOutcome::NoChain {
                request: req,
                fallback,
            },
        }
    }
}

impl fmt::Debug for HandlerChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerChain")
            .field("pattern", &self.pattern)
            .field("methods", &self.methods())
            .finish()
    }
}
