//! Path matching contract and its radix-tree implementation.
//!
//! The dispatcher only needs two operations from a matcher: insert data
//! under a pattern, and resolve a concrete path to the most specific
//! pattern's data plus the parameters it bound. [`RadixMatcher`] backs this
//! with `matchit`, where static segments win over parameters and parameters
//! win over a trailing wildcard.

use crate::http::Params;
use crate::pattern::{RoutePattern, Segment};
use crate::Error;

/// Result of a successful lookup
#[derive(Debug, Clone)]
pub struct RouteMatch<T> {
    pub data: T,
    pub params: Params,
}

/// Storage that resolves request paths to previously inserted patterns.
pub trait PathMatcher<T>: Send + Sync {
    /// Register `data` under `pattern`.
    ///
    /// Fails with [`Error::RouteConflict`] if the pattern cannot coexist with
    /// one already inserted.
    fn insert(&mut self, pattern: &RoutePattern, data: T) -> Result<(), Error>;

    /// Resolve a concrete, already normalized path.
    fn lookup(&self, path: &str) -> Option<RouteMatch<T>>;
}

/// Default matcher backed by `matchit::Router`.
///
/// `matchit` refuses a trailing wildcard next to a parameter at the same
/// position (`/a/:x` and `/a/*rest`). Such wildcards go to a second router
/// that is only consulted when the primary one has no match, so parameters
/// still win over wildcards.
pub struct RadixMatcher<T> {
    routes: Vec<(RoutePattern, T)>,
    primary: matchit::Router<T>,
    fallback: matchit::Router<T>,
}

impl<T> RadixMatcher<T> {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            primary: matchit::Router::new(),
            fallback: matchit::Router::new(),
        }
    }
}

impl<T> Default for RadixMatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> RadixMatcher<T> {
    /// Build both routers from scratch.
    ///
    /// Patterns without a wildcard are inserted first, so where a wildcard
    /// lands does not depend on registration order.
    fn build(
        routes: &[(RoutePattern, T)],
    ) -> Result<(matchit::Router<T>, matchit::Router<T>), Error> {
        let mut primary = matchit::Router::new();
        let mut fallback = matchit::Router::new();

        for (pattern, data) in routes.iter().filter(|(p, _)| !p.has_wildcard()) {
            primary
                .insert(pattern.to_matchit(), data.clone())
                .map_err(|e| conflict(pattern, e))?;
        }

        for (pattern, data) in routes.iter().filter(|(p, _)| p.has_wildcard()) {
            let mut attempt = primary.clone();
            match attempt.insert(pattern.to_matchit(), data.clone()) {
                Ok(()) => primary = attempt,
                Err(_) => fallback
                    .insert(pattern.to_matchit(), data.clone())
                    .map_err(|e| conflict(pattern, e))?,
            }
        }

        Ok((primary, fallback))
    }
}

impl<T: Clone + Send + Sync> PathMatcher<T> for RadixMatcher<T> {
    fn insert(&mut self, pattern: &RoutePattern, data: T) -> Result<(), Error> {
        // Same shape under other names would land unreachable in the fallback
        let new_shape = shape(pattern);
        if let Some((existing, _)) = self.routes.iter().find(|(p, _)| shape(p) == new_shape) {
            return Err(Error::RouteConflict(format!(
                "{}: same shape as {}",
                pattern, existing
            )));
        }

        let mut routes = self.routes.clone();
        routes.push((pattern.clone(), data));

        // Nothing changes unless the whole table builds
        let (primary, fallback) = Self::build(&routes)?;
        self.routes = routes;
        self.primary = primary;
        self.fallback = fallback;
        Ok(())
    }

    fn lookup(&self, path: &str) -> Option<RouteMatch<T>> {
        let matched = self
            .primary
            .at(path)
            .or_else(|_| self.fallback.at(path))
            .ok()?;
        let params = matched.params.iter().collect();

        Some(RouteMatch {
            data: matched.value.clone(),
            params,
        })
    }
}

/// Pattern with parameter names erased
fn shape(pattern: &RoutePattern) -> String {
    pattern
        .segments()
        .iter()
        .map(|segment| match segment {
            Segment::Literal(lit) => lit.as_str(),
            Segment::Param(_) => ":",
            Segment::Wildcard(_) => "*",
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn conflict(pattern: &RoutePattern, err: matchit::InsertError) -> Error {
    Error::RouteConflict(format!("{}: {}", pattern, err))
}
