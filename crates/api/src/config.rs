//! Application configuration loaded from environment variables.

/// Which saga driver the server runs with, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SagaMode {
    /// One coordinator drives each order to a terminal state within the
    /// request; `POST /create_order` blocks until done.
    #[default]
    Orchestrated,
    /// Event handlers advance orders asynchronously; `POST
    /// /create_order` returns `202` and clients poll `GET /order/{id}`.
    Choreographed,
}

impl SagaMode {
    /// Parses a mode name, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "orchestrated" => Some(Self::Orchestrated),
            "choreographed" => Some(Self::Choreographed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Orchestrated => "orchestrated",
            Self::Choreographed => "choreographed",
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `SAGA_MODE` — `"orchestrated"` or `"choreographed"` (default:
///   `"orchestrated"`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub mode: SagaMode,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            mode: std::env::var("SAGA_MODE")
                .ok()
                .and_then(|m| SagaMode::parse(&m))
                .unwrap_or_default(),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            mode: SagaMode::Orchestrated,
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.mode, SagaMode::Orchestrated);
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            mode: SagaMode::Choreographed,
            log_level: "debug".to_string(),
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!(SagaMode::parse("orchestrated"), Some(SagaMode::Orchestrated));
        assert_eq!(
            SagaMode::parse("Choreographed"),
            Some(SagaMode::Choreographed)
        );
        assert_eq!(SagaMode::parse("hybrid"), None);
    }
}
