use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Identity-provider base URL used to verify bearer tokens.
    pub auth_api_url: String,
    /// Token-ledger relay base URL for mint calls.
    pub token_ledger_url: String,
    /// Address of the entitlement token contract.
    pub contract_address: String,
    /// Slot capacity given to newly created clusters.
    pub cluster_slots: i64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let auth_api_url = env_map
            .get("AUTH_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("AUTH_API_URL".to_string()))?;

        let token_ledger_url = env_map
            .get("TOKEN_LEDGER_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("TOKEN_LEDGER_URL".to_string()))?;

        let contract_address = env_map
            .get("CONTRACT_ADDRESS")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("CONTRACT_ADDRESS".to_string()))?;

        let cluster_slots = env_map
            .get("CLUSTER_SLOTS")
            .map(|s| s.as_str())
            .unwrap_or("10")
            .parse::<i64>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "CLUSTER_SLOTS".to_string(),
                    "must be a valid integer".to_string(),
                )
            })?;

        if cluster_slots < 1 {
            return Err(ConfigError::InvalidValue(
                "CLUSTER_SLOTS".to_string(),
                "must be >= 1".to_string(),
            ));
        }

        Ok(Config {
            port,
            database_path,
            auth_api_url,
            token_ledger_url,
            contract_address,
            cluster_slots,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_required_env() -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("DATABASE_PATH".to_string(), "/tmp/test.db".to_string());
        map.insert(
            "AUTH_API_URL".to_string(),
            "https://auth.example.invalid".to_string(),
        );
        map.insert(
            "TOKEN_LEDGER_URL".to_string(),
            "https://relay.example.invalid".to_string(),
        );
        map.insert("CONTRACT_ADDRESS".to_string(), "0xc0ffee".to_string());
        map
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_env_map(setup_required_env()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.cluster_slots, 10);
    }

    #[test]
    fn test_missing_database_path() {
        let mut env_map = setup_required_env();
        env_map.remove("DATABASE_PATH");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "DATABASE_PATH"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_auth_api_url() {
        let mut env_map = setup_required_env();
        env_map.remove("AUTH_API_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "AUTH_API_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_missing_token_ledger_url() {
        let mut env_map = setup_required_env();
        env_map.remove("TOKEN_LEDGER_URL");
        match Config::from_env_map(env_map) {
            Err(ConfigError::MissingEnv(s)) => assert_eq!(s, "TOKEN_LEDGER_URL"),
            _ => panic!("Expected MissingEnv error"),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut env_map = setup_required_env();
        env_map.insert("PORT".to_string(), "not_a_number".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "PORT"),
            _ => panic!("Expected InvalidValue error"),
        }
    }

    #[test]
    fn test_zero_slots_rejected() {
        let mut env_map = setup_required_env();
        env_map.insert("CLUSTER_SLOTS".to_string(), "0".to_string());
        match Config::from_env_map(env_map) {
            Err(ConfigError::InvalidValue(k, _)) => assert_eq!(k, "CLUSTER_SLOTS"),
            _ => panic!("Expected InvalidValue error"),
        }
    }
}
