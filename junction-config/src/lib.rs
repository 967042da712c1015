// Declarative route configuration for junction

pub mod error;
pub mod loader;
pub mod manifest;

pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use manifest::{FunctionRegistry, RouteEntry, RouteManifest};
