// MIT License - Copyright (c) 2026 Peter Wright

/// Telnet port the bridge listens on.
pub const DEFAULT_PORT: u16 = 23;
/// Login used by the whole device family when none is configured.
pub const DEFAULT_USERNAME: &str = "lutron";
/// Password paired with [`DEFAULT_USERNAME`].
pub const DEFAULT_PASSWORD: &str = "integration";

const DEFAULT_KEEPALIVE_MS: u64 = 60_000;

/// Configuration for connecting to a Lutron bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bridge host name or IP address
    pub host: String,
    /// Bridge telnet port (default: 23)
    pub port: u16,
    /// Login user name (default: "lutron")
    pub username: String,
    /// Login password (default: "integration")
    pub password: String,
    /// Keepalive ping interval in milliseconds (default: 60000)
    pub keepalive_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: DEFAULT_USERNAME.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
            keepalive_interval_ms: DEFAULT_KEEPALIVE_MS,
        }
    }
}

impl BridgeConfig {
    /// Create a new config builder starting from defaults.
    pub fn builder() -> BridgeConfigBuilder {
        BridgeConfigBuilder::default()
    }
}

/// Builder for BridgeConfig.
#[derive(Debug, Clone, Default)]
pub struct BridgeConfigBuilder {
    config: BridgeConfig,
}

impl BridgeConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = username.into();
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = password.into();
        self
    }

    pub fn keepalive_interval_ms(mut self, ms: u64) -> Self {
        self.config.keepalive_interval_ms = ms;
        self
    }

    pub fn build(self) -> BridgeConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.port, 23);
        assert_eq!(config.username, "lutron");
        assert_eq!(config.password, "integration");
        assert_eq!(config.keepalive_interval_ms, 60_000);
    }

    #[test]
    fn test_config_builder() {
        let config = BridgeConfig::builder()
            .host("192.168.1.50")
            .port(2023)
            .username("admin")
            .password("hunter2")
            .keepalive_interval_ms(5_000)
            .build();

        assert_eq!(config.host, "192.168.1.50");
        assert_eq!(config.port, 2023);
        assert_eq!(config.username, "admin");
        assert_eq!(config.password, "hunter2");
        assert_eq!(config.keepalive_interval_ms, 5_000);
    }

    #[test]
    fn test_builder_keeps_defaults() {
        let config = BridgeConfig::builder().host("bridge.local").build();
        assert_eq!(config.host, "bridge.local");
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.username, DEFAULT_USERNAME);
        assert_eq!(config.password, DEFAULT_PASSWORD);
    }
}
