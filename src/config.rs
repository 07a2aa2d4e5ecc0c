//! Configuration types.

/// Wizard service configuration.
#[derive(Debug, Clone)]
pub struct FlowConfig {
    /// Service name for identification.
    pub name: String,
    /// Port the HTTP/WS server binds to.
    pub port: u16,
    /// Base URL of the external property backend.
    pub api_base_url: String,
    /// Bearer token for the property backend, if it requires one.
    pub api_token: Option<String>,
    /// Optional directory for daily-rolling log files.
    pub log_dir: Option<String>,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            name: "offer-flow".to_string(),
            port: 8080,
            api_base_url: "http://localhost:9000/api".to_string(),
            api_token: None,
            log_dir: None,
        }
    }
}

impl FlowConfig {
    /// Build a config from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("OFFER_FLOW_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let api_base_url =
            std::env::var("OFFER_FLOW_API_BASE").unwrap_or(defaults.api_base_url);

        let api_token = std::env::var("OFFER_FLOW_API_TOKEN").ok();
        let log_dir = std::env::var("OFFER_FLOW_LOG_DIR").ok();

        Self {
            name: defaults.name,
            port,
            api_base_url,
            api_token,
            log_dir,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let c = FlowConfig::default();
        assert_eq!(c.name, "offer-flow");
        assert_eq!(c.port, 8080);
        assert!(c.api_base_url.starts_with("http://"));
        assert!(c.api_token.is_none());
        assert!(c.log_dir.is_none());
    }
}
