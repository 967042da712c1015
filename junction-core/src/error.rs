// Error types for the junction dispatcher

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    // Registration errors, raised synchronously while routes are being set up
    #[error("An object specifying route data must be provided")]
    MissingRouteData,

    #[error("The route's path must be specified")]
    MissingPath,

    #[error("The route's path attribute must be a string, got {0}")]
    InvalidPathType(String),

    #[error("Invalid route pattern: {0}")]
    InvalidPattern(String),

    #[error("Method: \"{0}\" is not supported")]
    UnsupportedMethod(String),

    #[error("The route's middleware must be provided as an array, got {0}")]
    InvalidMiddlewareList(String),

    #[error("Route middleware must be a function: {0}")]
    InvalidMiddlewareFunction(String),

    #[error("Route handler must be provided")]
    MissingHandler,

    #[error("Route handler must be a function: {0}")]
    InvalidHandlerFunction(String),

    #[error("Route handler list must not be empty")]
    EmptyHandlerList,

    #[error("Route conflicts with an existing route: {0}")]
    RouteConflict(String),

    // Request-time errors, produced by user middleware and handlers
    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Method not allowed: {0}")]
    MethodNotAllowed(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) => 400,
            Error::Unauthorized(_) => 401,
            Error::Forbidden(_) => 403,
            Error::NotFound(_) => 404,
            Error::MethodNotAllowed(_) => 405,

            // Registration errors surfacing at request time are server bugs
            _ => 500,
        }
    }

    /// Check if this error comes from route registration rather than
    /// from a running chain
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            Error::MissingRouteData
                | Error::MissingPath
                | Error::InvalidPathType(_)
                | Error::InvalidPattern(_)
                | Error::UnsupportedMethod(_)
                | Error::InvalidMiddlewareList(_)
                | Error::InvalidMiddlewareFunction(_)
                | Error::MissingHandler
                | Error::InvalidHandlerFunction(_)
                | Error::EmptyHandlerList
                | Error::RouteConflict(_)
        )
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}
