//! Logging for junction.
//!
//! The dispatcher emits `tracing` events (registrations at DEBUG, lookups at
//! TRACE, fallback delegations at DEBUG). Nothing is printed until the host
//! installs a subscriber. Hosts with their own subscriber need nothing from
//! here; others can install a stdout one with [`LogConfig`].
//!
//! ```no_run
//! use junction_core::logging::{LogConfig, LogFormat};
//!
//! LogConfig::from_env()
//!     .format(LogFormat::Pretty)
//!     .init()
//!     .ok();
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub use tracing::{debug, error, info, trace, warn};
pub use tracing_subscriber::util::TryInitError;

const DEFAULT_FILTER: &str = "info";

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, for development
    Pretty,
    Compact,
}

impl LogFormat {
    /// Case-insensitive name lookup
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

/// Stdout subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `"debug"` or `"junction_core=trace,info"`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            format: LogFormat::default(),
        }
    }
}

impl LogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter from `JUNCTION_LOG_LEVEL`, then `RUST_LOG`, format from
    /// `JUNCTION_LOG_FORMAT`. Unset or unknown values keep the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(filter) = var("JUNCTION_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            config.filter = filter;
        }
        if let Some(format) = var("JUNCTION_LOG_FORMAT").and_then(|f| LogFormat::parse(&f)) {
            config.format = format;
        }
        config
    }

    pub fn filter(mut self, directive: impl Into<String>) -> Self {
        self.filter = directive.into();
        self
    }

    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Install the global subscriber.
    ///
    /// An unparsable filter falls back to `info`. Fails if a global
    /// subscriber is already installed.
    pub fn init(self) -> Result<(), TryInitError> {
        let filter =
            EnvFilter::try_new(&self.filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let registry = tracing_subscriber::registry().with(filter);

        match self.format {
            LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
            LogFormat::Pretty => registry.with(fmt::layer().pretty()).try_init(),
            LogFormat::Compact => registry.with(fmt::layer().compact()).try_init(),
        }
    }
}
