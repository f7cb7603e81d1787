//! Environment-driven configuration for the outbound clients: every field
//! is `Option<String>` from `std::env::var(..).ok()`, with an accessor
//! supplying the default.

#[derive(Debug, Clone, Default)]
pub struct ClientsConfig {
    pub petri_host: Option<String>,
    pub petri_port: Option<String>,
    pub fork_host: Option<String>,
    pub fork_port: Option<String>,
    /// This service's own externally reachable address, embedded in
    /// notify callback URLs the translator generates.
    pub self_host: Option<String>,
    pub self_port: Option<String>,
}

impl ClientsConfig {
    pub fn from_env() -> Self {
        Self {
            petri_host: std::env::var("PTERO_PETRI_HOST").ok(),
            petri_port: std::env::var("PTERO_PETRI_PORT").ok(),
            fork_host: std::env::var("PTERO_FORK_HOST").ok(),
            fork_port: std::env::var("PTERO_FORK_PORT").ok(),
            self_host: std::env::var("PTERO_WORKFLOW_HOST").ok(),
            self_port: std::env::var("PTERO_WORKFLOW_PORT").ok(),
        }
    }

    pub fn petri_base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.petri_host.clone().unwrap_or_else(|| "localhost".to_string()),
            self.petri_port.clone().unwrap_or_else(|| "80".to_string()),
        )
    }

    pub fn fork_base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.fork_host.clone().unwrap_or_else(|| "localhost".to_string()),
            self.fork_port.clone().unwrap_or_else(|| "80".to_string()),
        )
    }

    pub fn self_base_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.self_host.clone().unwrap_or_else(|| "localhost".to_string()),
            self.self_port.clone().unwrap_or_else(|| "80".to_string()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let config = ClientsConfig::default();
        assert_eq!(config.petri_base_url(), "http://localhost:80");
        assert_eq!(config.fork_base_url(), "http://localhost:80");
    }

    #[test]
    fn overrides_apply() {
        let config = ClientsConfig {
            petri_host: Some("petri.internal".to_string()),
            petri_port: Some("9001".to_string()),
            ..Default::default()
        };
        assert_eq!(config.petri_base_url(), "http://petri.internal:9001");
    }
}
