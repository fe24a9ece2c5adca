//! Server configuration.

use std::net::SocketAddr;

use crate::config::ServerSection;
use crate::error::{Result, TokCountError};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address
    pub addr: SocketAddr,
    /// Maximum request body size (bytes)
    pub max_body_size: usize,
    /// Enable request tracing
    pub logging: bool,
    /// CORS enabled
    pub cors_enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            max_body_size: 2 * 1024 * 1024, // 2MB
            logging: true,
            cors_enabled: true,
        }
    }
}

impl ServerConfig {
    /// Build from the `[server]` config section
    pub fn from_section(section: &ServerSection) -> Result<Self> {
        let addr: SocketAddr = section.listen_addr().parse().map_err(|e| {
            TokCountError::Config(format!("Invalid listen address {}: {e}", section.listen_addr()))
        })?;

        Ok(Self {
            addr,
            max_body_size: section.max_body_size,
            cors_enabled: section.cors,
            ..Self::default()
        })
    }

    /// Create with custom port
    pub fn with_port(mut self, port: u16) -> Self {
        self.addr.set_port(port);
        self
    }

    /// Bind to all interfaces
    pub fn bind_all(mut self) -> Self {
        self.addr = SocketAddr::from(([0, 0, 0, 0], self.addr.port()));
        self
    }

    /// Set address directly
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    /// Set max body size
    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Disable logging
    pub fn without_logging(mut self) -> Self {
        self.logging = false;
        self
    }

    /// Disable CORS
    pub fn without_cors(mut self) -> Self {
        self.cors_enabled = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_section() {
        let section = ServerSection {
            host: "0.0.0.0".to_string(),
            port: 8123,
            cors: false,
            max_body_size: 1024,
        };
        let config = ServerConfig::from_section(&section).unwrap();
        assert_eq!(config.addr.to_string(), "0.0.0.0:8123");
        assert!(!config.cors_enabled);
        assert_eq!(config.max_body_size, 1024);
    }

    #[test]
    fn test_invalid_host() {
        let section = ServerSection {
            host: "not a host".to_string(),
            ..ServerSection::default()
        };
        assert!(ServerConfig::from_section(&section).is_err());
    }

    #[test]
    fn test_builders() {
        let config = ServerConfig::default().with_port(9000).bind_all();
        assert_eq!(config.addr.to_string(), "0.0.0.0:9000");
        assert!(!config.without_logging().logging);
    }
}
