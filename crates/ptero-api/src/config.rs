//! This service's own listen address and database URL, read the same way
//! `ptero_clients::ClientsConfig` reads the Petri/fork endpoints —
//! `std::env::var(..).ok()` with an accessor supplying the default.

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: Option<String>,
    pub port: Option<String>,
    pub database_url: String,
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable required"))?;
        Ok(Self {
            host: std::env::var("PTERO_WORKFLOW_HOST").ok(),
            port: std::env::var("PTERO_WORKFLOW_PORT").ok(),
            database_url,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.host.clone().unwrap_or_else(|| "0.0.0.0".to_string()),
            self.port.clone().unwrap_or_else(|| "80".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_addr_defaults_when_unset() {
        let config = ApiConfig {
            host: None,
            port: None,
            database_url: "postgres://localhost/test".to_string(),
        };
        assert_eq!(config.bind_addr(), "0.0.0.0:80");
    }

    #[test]
    fn bind_addr_applies_overrides() {
        let config = ApiConfig {
            host: Some("127.0.0.1".to_string()),
            port: Some("9090".to_string()),
            database_url: "postgres://localhost/test".to_string(),
        };
        assert_eq!(config.bind_addr(), "127.0.0.1:9090");
    }
}
