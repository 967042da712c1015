//! Declarative route manifests.
//!
//! A manifest names its middleware and handlers; the functions themselves
//! come from a [`FunctionRegistry`] supplied by the application:
//!
//! ```json
//! {
//!   "middleware": ["request_log"],
//!   "routes": [
//!     { "path": "/users/:id", "method": "GET", "middleware": ["auth"], "handler": "show_user" },
//!     { "path": "/health", "handlers": ["no_cache", "health"] }
//!   ]
//! }
//! ```
//!
//! Untyped input is checked in two passes. [`RouteManifest::from_value`]
//! rejects entries with the wrong shape, and [`RouteManifest::apply`]
//! resolves every name and validates every route before the first one is
//! registered.

use crate::loader::{ConfigLoader, FileFormat};
use crate::{ConfigError, Result};
use junction_core::{BoxedMiddleware, Dispatcher, Error, RouteData};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Named middleware and handlers that manifests can refer to
#[derive(Clone, Default)]
pub struct FunctionRegistry {
    functions: HashMap<String, BoxedMiddleware>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous entry
    pub fn register(&mut self, name: impl Into<String>, function: BoxedMiddleware) -> &mut Self {
        self.functions.insert(name.into(), function);
        self
    }

    /// Builder form of [`register`](Self::register)
    pub fn with(mut self, name: impl Into<String>, function: BoxedMiddleware) -> Self {
        self.register(name, function);
        self
    }

    pub fn get(&self, name: &str) -> Option<BoxedMiddleware> {
        self.functions.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// One route of a manifest, with functions still referred to by name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub path: String,
    pub method: Option<String>,
    pub middleware: Vec<String>,
    pub handler: Option<String>,
    pub handlers: Option<Vec<String>>,
}

impl RouteEntry {
    fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(obj) = value else {
            return Err(Error::MissingRouteData.into());
        };

        let path = match obj.get("path") {
            None | Some(Value::Null) => return Err(Error::MissingPath.into()),
            Some(Value::String(path)) if path.is_empty() => return Err(Error::MissingPath.into()),
            Some(Value::String(path)) => path.clone(),
            Some(other) => return Err(Error::InvalidPathType(type_name(other).to_string()).into()),
        };

        // An empty method falls back to the default, like an absent one
        let method = match obj.get("method") {
            None | Some(Value::Null) => None,
            Some(Value::String(method)) if method.is_empty() => None,
            Some(Value::String(method)) => Some(method.clone()),
            Some(other) => return Err(Error::UnsupportedMethod(other.to_string()).into()),
        };

        let middleware = match obj.get("middleware") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => names(items, Error::InvalidMiddlewareFunction)?,
            Some(other) => {
                return Err(Error::InvalidMiddlewareList(type_name(other).to_string()).into());
            }
        };

        let handler = match obj.get("handler") {
            None | Some(Value::Null) => None,
            Some(Value::String(name)) => Some(name.clone()),
            Some(other) => {
                return Err(Error::InvalidHandlerFunction(format!(
                    "expected a name, got {}",
                    type_name(other)
                ))
                .into());
            }
        };

        let handlers = match obj.get("handlers") {
            None | Some(Value::Null) => None,
            Some(Value::Array(items)) => Some(names(items, Error::InvalidHandlerFunction)?),
            Some(other) => {
                return Err(Error::InvalidHandlerFunction(format!(
                    "handlers must be an array of names, got {}",
                    type_name(other)
                ))
                .into());
            }
        };

        Ok(Self {
            path,
            method,
            middleware,
            handler,
            handlers,
        })
    }

    /// Resolve names and check the registration rules without registering
    fn resolve(&self, registry: &FunctionRegistry) -> Result<RouteData> {
        let middleware = lookup_all(&self.middleware, registry, Error::InvalidMiddlewareFunction)?;

        let handler = self
            .handler
            .as_deref()
            .map(|name| lookup(name, registry, Error::InvalidHandlerFunction))
            .transpose()?;

        let handlers = self
            .handlers
            .as_deref()
            .map(|names| lookup_all(names, registry, Error::InvalidHandlerFunction))
            .transpose()?;

        let mut route = RouteData::new(self.path.as_str()).middleware(middleware);
        if let Some(method) = &self.method {
            route = route.method(method.as_str());
        }
        if let Some(handlers) = handlers {
            route = route.handlers(handlers);
        }
        if let Some(handler) = handler {
            route = route.handler(handler);
        }

        route.validate()?;
        Ok(route)
    }
}

/// A parsed route manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteManifest {
    /// Global middleware names, applied to every route
    pub middleware: Vec<String>,
    pub routes: Vec<RouteEntry>,
}

impl RouteManifest {
    /// Load a manifest file, picking the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let loader = ConfigLoader::auto(path.as_ref())?;
        Self::from_value(&loader.load_file(path)?)
    }

    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        Self::from_value(&ConfigLoader::new(format).parse(content)?)
    }

    /// Decode a manifest from untyped data.
    ///
    /// Only the shape is checked here. Names are resolved by
    /// [`apply`](Self::apply).
    pub fn from_value(value: &Value) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(ConfigError::ValidationError(format!(
                "manifest must be an object, got {}",
                type_name(value)
            )));
        };

        let middleware = match root.get("middleware") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => names(items, Error::InvalidMiddlewareFunction)?,
            Some(other) => {
                return Err(Error::InvalidMiddlewareList(type_name(other).to_string()).into());
            }
        };

        let routes = match root.get("routes") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(RouteEntry::from_value)
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(ConfigError::ValidationError(format!(
                    "routes must be an array, got {}",
                    type_name(other)
                )));
            }
        };

        debug!(
            routes = routes.len(),
            middleware = middleware.len(),
            "Route manifest parsed"
        );

        Ok(Self { middleware, routes })
    }

    /// Check every name and route without building a dispatcher
    pub fn validate(&self, registry: &FunctionRegistry) -> Result<()> {
        self.resolve(registry).map(|_| ())
    }

    /// Build a dispatcher from this manifest.
    ///
    /// Every route is resolved and validated first, so an invalid entry
    /// anywhere in the manifest fails before any route is registered. A
    /// conflict between two valid patterns is only detected on insertion;
    /// the partially built dispatcher is dropped in that case.
    pub fn apply(&self, registry: &FunctionRegistry) -> Result<Dispatcher> {
        let (global, routes) = self.resolve(registry)?;

        let dispatcher = Dispatcher::with_middleware(global);
        for route in routes {
            dispatcher.register(route)?;
        }

        info!(
            routes = self.routes.len(),
            middleware = self.middleware.len(),
            "Route manifest applied"
        );
        Ok(dispatcher)
    }

    fn resolve(
        &self,
        registry: &FunctionRegistry,
    ) -> Result<(Vec<BoxedMiddleware>, Vec<RouteData>)> {
        let global = lookup_all(&self.middleware, registry, Error::InvalidMiddlewareFunction)?;
        let routes = self
            .routes
            .iter()
            .map(|route| route.resolve(registry))
            .collect::<Result<Vec<_>>>()?;
        Ok((global, routes))
    }
}

fn names(items: &[Value], invalid: fn(String) -> Error) -> Result<Vec<String>> {
    items
        .iter()
        .map(|item| match item {
            Value::String(name) => Ok(name.clone()),
            other => Err(ConfigError::from(invalid(format!(
                "expected a name, got {}",
                type_name(other)
            )))),
        })
        .collect()
}

fn lookup(
    name: &str,
    registry: &FunctionRegistry,
    invalid: fn(String) -> Error,
) -> Result<BoxedMiddleware> {
    registry
        .get(name)
        .ok_or_else(|| ConfigError::from(invalid(format!("'{}' is not registered", name))))
}

fn lookup_all(
    names: &[String],
    registry: &FunctionRegistry,
    invalid: fn(String) -> Error,
) -> Result<Vec<BoxedMiddleware>> {
    names
        .iter()
        .map(|name| lookup(name, registry, invalid))
        .collect()
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn route_error(value: Value) -> Error {
        match RouteManifest::from_value(&json!({ "routes": [value] })) {
            Err(ConfigError::Route(err)) => err,
            other => panic!("expected a route error, got {:?}", other),
        }
    }

    #[test]
    fn test_decodes_full_entry() {
        let manifest = RouteManifest::from_value(&json!({
            "middleware": ["log"],
            "routes": [{
                "path": "/users/:id",
                "method": "PUT",
                "middleware": ["auth"],
                "handlers": ["validate"],
                "handler": "update"
            }]
        }))
        .unwrap();

        assert_eq!(manifest.middleware, vec!["log"]);
        assert_eq!(
            manifest.routes[0],
            RouteEntry {
                path: "/users/:id".to_string(),
                method: Some("PUT".to_string()),
                middleware: vec!["auth".to_string()],
                handler: Some("update".to_string()),
                handlers: Some(vec!["validate".to_string()]),
            }
        );
    }

    #[test]
    fn test_empty_method_means_default() {
        let manifest = RouteManifest::from_value(&json!({
            "routes": [{ "path": "/a", "method": "", "handler": "h" }]
        }))
        .unwrap();
        assert_eq!(manifest.routes[0].method, None);
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(route_error(json!(null)), Error::MissingRouteData));
        assert!(matches!(route_error(json!(42)), Error::MissingRouteData));
        assert!(matches!(route_error(json!({ "handler": "h" })), Error::MissingPath));
        assert!(matches!(route_error(json!({ "path": "", "handler": "h" })), Error::MissingPath));
        assert!(matches!(
            route_error(json!({ "path": 7, "handler": "h" })),
            Error::InvalidPathType(t) if t == "number"
        ));
        assert!(matches!(
            route_error(json!({ "path": "/a", "method": 1, "handler": "h" })),
            Error::UnsupportedMethod(_)
        ));
        assert!(matches!(
            route_error(json!({ "path": "/a", "middleware": "auth", "handler": "h" })),
            Error::InvalidMiddlewareList(t) if t == "string"
        ));
        assert!(matches!(
            route_error(json!({ "path": "/a", "middleware": [true], "handler": "h" })),
            Error::InvalidMiddlewareFunction(_)
        ));
        assert!(matches!(
            route_error(json!({ "path": "/a", "handler": {} })),
            Error::InvalidHandlerFunction(_)
        ));
        assert!(matches!(
            route_error(json!({ "path": "/a", "handlers": "h" })),
            Error::InvalidHandlerFunction(_)
        ));
    }

    #[test]
    fn test_top_level_errors() {
        assert!(matches!(
            RouteManifest::from_value(&json!([])),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            RouteManifest::from_value(&json!({ "routes": {} })),
            Err(ConfigError::ValidationError(_))
        ));
        assert!(matches!(
            RouteManifest::from_value(&json!({ "middleware": "log" })),
            Err(ConfigError::Route(Error::InvalidMiddlewareList(_)))
        ));
        assert_eq!(RouteManifest::from_value(&json!({})).unwrap(), RouteManifest::default());
    }

    #[test]
    fn test_registry() {
        let handler = junction_core::handler_fn(|_req| async { Ok(junction_core::HttpResponse::ok()) });
        let mut registry = FunctionRegistry::new();
        registry.register("b", handler.clone()).register("a", handler);

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(registry.get("missing").is_none());
        assert_eq!(registry.names(), vec!["a", "b"]);
    }
}
